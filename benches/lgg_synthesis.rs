use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use odin::dataset::DatasetKind;
use odin::mimicking::SyntheticSource;
use odin::querying::{render_select, synthesize};
use oxigraph::model::NamedNode;

/// Synthesis cost over one stream's worth of statements, per dataset kind
fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("lgg_synthesis");
    let graph = NamedNode::new_unchecked("http://www.graph1.com/");

    for kind in [DatasetKind::TransportData, DatasetKind::Twig, DatasetKind::Obs] {
        for population in [100usize, 1_000, 5_000] {
            let statements = match SyntheticSource::new(kind, 42, population).statements() {
                Ok(statements) => statements,
                Err(e) => panic!("mimicking {} failed: {}", kind, e),
            };
            group.bench_with_input(
                BenchmarkId::new(kind.name(), population),
                &statements,
                |b, statements| {
                    b.iter(|| render_select(&graph, &synthesize(black_box(statements))));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_synthesize);
criterion_main!(benches);
