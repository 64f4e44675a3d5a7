#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use interactome::annotation::AnnotationIndex;
use interactome::config::DatasetConfig;
use interactome::filter::{Combinator, Composition, FieldFilter};
use interactome::generator::{DataGenerator, Shape};
use interactome::visible::UnconnectedMode;
use interactome::{Dataset, Session, SessionOptions};

const GENE_COUNT: usize = 5_000;

fn dataset() -> Arc<Dataset> {
    let schema = DatasetConfig::default().schema().expect("default schema");
    let shape = Shape {
        genes: GENE_COUNT,
        ..Shape::default()
    };
    let mut generator = DataGenerator::new(0xC0FFEE);
    let nodes = generator.nodes(Arc::new(schema), &shape);
    let edges = generator.edges(&shape);
    Arc::new(Dataset::new(nodes, edges).expect("dataset"))
}

fn index_build(c: &mut Criterion) {
    let dataset = dataset();
    let mut group = c.benchmark_group("pipeline/annotations");
    group.sample_size(20);
    group.throughput(Throughput::Elements(dataset.nodes().len() as u64));
    group.bench_function("index_build", |b| {
        b.iter(|| black_box(AnnotationIndex::build(Arc::clone(dataset.nodes())).expect("index")));
    });
    group.finish();
}

fn filter_passes(c: &mut Criterion) {
    let dataset = dataset();
    let mut group = c.benchmark_group("pipeline/filter_pass");
    group.sample_size(30);

    for composition in [Composition::Progressive, Composition::Independent] {
        let options = SessionOptions {
            composition,
            ..SessionOptions::default()
        };
        let mut session = Session::new(Arc::clone(&dataset), options);
        session
            .set_filter("model_species", FieldFilter::new(["Mouse", "Human"], Combinator::Or))
            .expect("species filter");
        let tissues = [
            FieldFilter::new(["striatum", "cortex"], Combinator::And),
            FieldFilter::new(["liver"], Combinator::Not),
        ];
        let mut turn = 0usize;
        group.bench_function(format!("{composition:?}").to_lowercase(), |b| {
            b.iter(|| {
                turn += 1;
                let filter = tissues[turn % tissues.len()].clone();
                black_box(session.set_filter("tissue", filter).expect("tissue filter"))
            });
        });
    }
    group.finish();
}

fn visible_passes(c: &mut Criterion) {
    let dataset = dataset();
    let mut group = c.benchmark_group("pipeline/visible_pass");
    group.sample_size(40);

    for mode in [UnconnectedMode::Hide, UnconnectedMode::Show] {
        let options = SessionOptions {
            unconnected: mode,
            ..SessionOptions::default()
        };
        let mut session = Session::new(Arc::clone(&dataset), options);
        let caps = [50usize, 200];
        let mut turn = 0usize;
        group.bench_function(format!("{mode:?}").to_lowercase(), |b| {
            b.iter(|| {
                turn += 1;
                black_box(session.set_max_nodes(caps[turn % caps.len()]))
            });
        });
    }

    let mut session = Session::new(Arc::clone(&dataset), SessionOptions::default());
    let thresholds = [0.4, 0.7];
    let mut turn = 0usize;
    group.bench_function("threshold", |b| {
        b.iter(|| {
            turn += 1;
            black_box(session.set_score_threshold(thresholds[turn % thresholds.len()]))
        });
    });
    group.finish();
}

criterion_group!(benches, index_build, filter_passes, visible_passes);
criterion_main!(benches);
