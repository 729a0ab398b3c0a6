//! Render throughput benchmarks
//!
//! Measures template rendering with:
//! - Repeat sizes (10, 100, 1000 rows)
//! - Warm vs cold asset caches
//!
//! Run benchmarks: `cargo bench --bench render_throughput`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use trellis::{Engine, EngineConfig, Scope};

const TABLE: &str = r#"<html><head><link rel="stylesheet" href="css/site.css"><script type="module" src="js/app.js"></script></head>
<body>
  <h1>#{title}</h1>
  <table>
    <repeat times="rows" index="i">
      <tr class="#{i % 2 == 0 ? 'even' : 'odd'}">
        <td>#{i}</td>
        <if condition="i % 10 == 0"><td><img src="img/mark.png"></td></if>
        <else><td>-</td></else>
      </tr>
    </repeat>
  </table>
</body></html>"#;

fn write_views(dir: &Path) {
    let files = [
        ("table.html", TABLE),
        ("css/site.css", "@import 'base.css'; body { background: url(../img/bg.png) }"),
        ("css/base.css", "* { box-sizing: border-box }"),
        ("js/app.js", "import { a } from './a.js'; import { b } from './b.js'; a(b);"),
        ("js/a.js", "export const a = (f) => f();"),
        ("js/b.js", "export const b = () => 1;"),
        ("img/mark.png", "png"),
        ("img/bg.png", "png"),
    ];
    for (path, content) in files {
        let path = dir.join(path);
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("Failed to create dir");
        fs::write(path, content).expect("Failed to write view");
    }
}

fn scope(rows: usize) -> Scope {
    Scope::try_from(json!({ "title": "Benchmark", "rows": rows })).expect("scope is an object")
}

/// Benchmark render time against the number of repeated rows
fn benchmark_repeat_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("repeat_rows");
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_views(dir.path());
    let engine = Engine::new(dir.path(), EngineConfig::default());

    for rows in [10, 100, 1000] {
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, &rows| {
            b.iter(|| engine.render("table", scope(rows)).expect("Failed to render"));
        });
    }

    group.finish();
}

/// Benchmark the cost of resolving assets on every render
fn benchmark_cache_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("asset_cache");
    let dir = TempDir::new().expect("Failed to create temp dir");
    write_views(dir.path());

    for cache in [true, false] {
        let engine = Engine::new(dir.path(), EngineConfig::default().with_cache(cache));
        let label = if cache { "warm" } else { "cold" };
        group.bench_function(label, |b| {
            b.iter(|| engine.render("table", scope(10)).expect("Failed to render"));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_repeat_rows, benchmark_cache_modes);
criterion_main!(benches);
