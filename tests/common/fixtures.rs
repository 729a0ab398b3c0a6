/// A small site: a layout page importing a partial, a script with a
/// relative import and a stylesheet with an `@import` and an image.
pub fn site() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "index.html",
            r#"<html><head><link rel="stylesheet" href="css/site.css"><script type="module" src="js/app.js"></script></head><body><import src="partials/nav" class="main-nav"/><p>#{title}</p><img src="img/logo.png"></body></html>"#,
        ),
        (
            "partials/nav.html",
            r#"<nav><a href="/">Home</a><img src="../img/logo.png"></nav>"#,
        ),
        ("js/app.js", "import { render } from './lib/render.js';\nrender();"),
        ("js/lib/render.js", "export function render() {}"),
        ("css/site.css", "@import 'base.css';\nheader { background: url(../img/bg.png) }"),
        ("css/base.css", "body { margin: 0 }"),
        ("img/logo.png", "png"),
        ("img/bg.png", "png"),
    ]
}
