use clap::Parser;
use std::env;
use std::fs;
use trellis::{Engine, EngineConfig, RenderError, Scope};

#[derive(Parser, Debug)]
#[command(version, about = "Renders a template from a views directory", long_about = None)]
struct Args {
    /// Views directory
    #[arg(long, default_value = "demos/views")]
    views: String,

    /// Template to render, relative to the views directory
    #[arg(default_value = "index")]
    template: String,

    /// JSON file holding the template scope
    #[arg(long)]
    data: Option<String>,

    /// Engine configuration as JSON
    #[arg(long)]
    config: Option<String>,

    /// Print the assets the page made public
    #[arg(long, default_value_t = false)]
    assets: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "trellis=info");
        }
    }
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(json) => EngineConfig::from_json(json)?,
        None => EngineConfig::default(),
    };
    let scope = match &args.data {
        Some(path) => Scope::try_from(serde_json::from_str::<serde_json::Value>(&fs::read_to_string(path)?)?)?,
        None => Scope::try_from(serde_json::json!({
            "title": "Trellis demo",
            "user": { "name": "Ada", "admin": false },
            "items": ["views", "imports", "assets"]
        }))?,
    };

    let engine = Engine::new(&args.views, config);
    let html = engine.render(&args.template, scope).inspect_err(|e: &RenderError| {
        eprintln!("Failed to render {}: {}", args.template, e);
    })?;
    println!("{}", html);

    if args.assets {
        let stats = engine.cache_stats();
        eprintln!(
            "\n{} scripts, {} styles, {} resources resolved",
            stats.scripts, stats.styles, stats.resources
        );
        for request in engine.public_paths() {
            match engine.public_asset(&request) {
                Some(asset) => eprintln!("  {} -> {} ({})", request, asset.path.display(), asset.content_type),
                None => eprintln!("  {} is missing", request),
            }
        }
    }
    Ok(())
}
