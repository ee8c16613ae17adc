// workspace_scan.rs - Performance benchmarks for workspace symbol queries
//
// Run with: cargo bench -p sprig --features test-support --bench workspace_scan
// Compare baselines: cargo bench --bench workspace_scan -- --baseline before

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sprig::change_feed::{ChangeFeed, FileObserver};
use sprig::config::SymbolsConfig;
use sprig::handler::WorkspaceSymbolHandler;
use sprig::project::ManifestProjectFinder;
use sprig::test_utils::fixture_workspace::{create_fixture_workspace, FixtureConfig};

fn handler(config: SymbolsConfig) -> WorkspaceSymbolHandler {
    let feed: Arc<dyn ChangeFeed> = Arc::new(FileObserver::new());
    let finder = Arc::new(ManifestProjectFinder::new(
        config.project_manifest.clone(),
        feed,
    ));
    WorkspaceSymbolHandler::with_defaults(finder, config)
}

// ---------------------------------------------------------------------------
// Benchmark: query against cached projects (type indexes already loaded)
// ---------------------------------------------------------------------------

fn bench_warm_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("warm_query");
    group.sample_size(10);

    let configs: &[(&str, FixtureConfig)] = &[
        ("small", FixtureConfig::small()),
        ("medium", FixtureConfig::medium()),
    ];

    for (label, config) in configs {
        // Pre-create the workspace so fixture generation isn't measured.
        let workspace = create_fixture_workspace(config);
        let handler = handler(SymbolsConfig::default());
        let expected = config.expected_symbol_count();

        group.bench_with_input(BenchmarkId::new("scan", *label), &workspace, |b, ws| {
            b.iter(|| {
                let outcome = handler.handle(black_box(ws.path())).expect("scan failed");
                assert_eq!(outcome.symbols.len(), expected);
                black_box(outcome)
            })
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: first query, including manifest loading and index builds
// ---------------------------------------------------------------------------

fn bench_cold_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("cold_query");
    group.sample_size(10);

    let config = FixtureConfig::small();
    let workspace = create_fixture_workspace(&config);

    group.bench_function("scan_small", |b| {
        b.iter(|| {
            let handler = handler(SymbolsConfig::default());
            black_box(handler.handle(black_box(workspace.path())).expect("scan failed"))
        })
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: parse pool size
// ---------------------------------------------------------------------------

fn bench_scan_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_threads");
    group.sample_size(10);

    let workspace = create_fixture_workspace(&FixtureConfig::medium());

    for threads in [1usize, 4] {
        let handler = handler(SymbolsConfig {
            scan_threads: threads,
            ..SymbolsConfig::default()
        });
        group.bench_with_input(BenchmarkId::new("medium", threads), &workspace, |b, ws| {
            b.iter(|| black_box(handler.handle(black_box(ws.path())).expect("scan failed")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_warm_query, bench_cold_query, bench_scan_threads);
criterion_main!(benches);
