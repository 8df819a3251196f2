//! Prefix expansion and pruning benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use csspx::*;
use std::fs;
use tempfile::TempDir;

fn generate_stylesheet(rulesets: usize) -> String {
    let mut content = String::new();
    for i in 0..rulesets {
        content.push_str(&format!(
            ".item-{i} {{\n  display: flex;\n  flex: 1 1 {i}px;\n  transform: rotate({i}deg);\n  \
             width: calc(100% - {i}px);\n  background-image: linear-gradient(red, blue);\n  \
             color: red;\n}}\n"
        ));
    }
    content
}

fn bench_expansion(c: &mut Criterion) {
    let source = generate_stylesheet(500);
    let sheet = parse_stylesheet(&source, "bench.css").unwrap();

    c.bench_function("expansion_pass", |b| {
        b.iter(|| {
            let mut sheet = sheet.clone();
            let mut prefix_map = PrefixMap::new();
            ExpansionPass::new(default_rules(), &mut prefix_map).run(black_box(&mut sheet));
            prefix_map.flatten()
        })
    });
}

fn bench_prune_modes(c: &mut Criterion) {
    let source = generate_stylesheet(500);
    let manifest = SupportManifest::new()
        .allow_values("display", ["-ms-flexbox"])
        .allow_any("-webkit-transform");

    let mut group = c.benchmark_group("prune_modes");

    for mode in [PruneMode::RemoveAutoExpanded, PruneMode::RemoveOriginal] {
        let options = CompilerOptions {
            prune_mode: Some(mode),
            manifest: manifest.clone(),
            emit_capability_map: true,
            ..Default::default()
        };

        group.bench_with_input(format!("{:?}", mode), &options, |b, options| {
            b.iter(|| compile_source_with_options(black_box(&source), "bench.css", options).unwrap())
        });
    }

    group.finish();
}

fn bench_file_compilation(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("large.css");
    let output_path = temp_dir.path().join("large.out.css");
    fs::write(&input_path, generate_stylesheet(1000)).unwrap();

    c.bench_function("large_file_compilation", |b| {
        b.iter(|| {
            compile_file(
                black_box(input_path.to_str().unwrap()),
                black_box(output_path.to_str().unwrap()),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_expansion, bench_prune_modes, bench_file_compilation);

criterion_main!(benches);
