//! Pipeline benchmark: events → labels → per-user feature table.

use churn_features::config::{LabelConfig, PipelineConfig};
use churn_features::events::{DatasetBounds, Event};
use churn_features::features::FeatureBuilder;
use churn_features::label::Labeler;
use churn_features::pipeline::ChurnPipeline;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const PAGES: [&str; 6] = ["NextSong", "NextSong", "Thumbs Up", "Roll Advert", "Add Friend", "Home"];

fn make_dummy_events(users: usize, per_user: usize) -> Vec<Event> {
    let mut out = Vec::with_capacity(users * per_user);
    for u in 0..users {
        for i in 0..per_user {
            let page = if u % 5 == 0 && i == per_user - 1 {
                "Cancellation Confirmation"
            } else {
                PAGES[i % PAGES.len()]
            };
            out.push(Event::new(
                format!("{}", u),
                (i as i64) * 60_000 + (u as i64) * 1_000,
                page,
                Some(0),
                (u * 100 + i / 20) as i64,
            ));
        }
    }
    out
}

fn bench_labelling(c: &mut Criterion) {
    let labeler = Labeler::new(&LabelConfig::default(), 4096);
    let events = make_dummy_events(200, 100);

    c.bench_function("label_20k_events", |b| {
        b.iter(|| black_box(labeler.compute(black_box(&events))))
    });
}

fn bench_feature_build(c: &mut Criterion) {
    let config = PipelineConfig::default();
    let labeler = Labeler::new(&config.label, config.features.partition_size);
    let events = make_dummy_events(200, 100);
    let bounds = DatasetBounds::compute(&events).unwrap();
    let (_, labeled) = labeler.label(events);
    let builder = FeatureBuilder::new(config.features.clone(), &config.label);

    c.bench_function("feature_build_20k_events", |b| {
        b.iter(|| black_box(builder.build(black_box(&labeled), &bounds).unwrap()))
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let pipeline = ChurnPipeline::new(PipelineConfig::default());
    let events = make_dummy_events(200, 100);

    c.bench_function("full_pipeline_events_to_reduced_table", |b| {
        b.iter(|| {
            let ev = black_box(events.clone());
            black_box(pipeline.run(ev).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_labelling,
    bench_feature_build,
    bench_full_pipeline
);
criterion_main!(benches);
