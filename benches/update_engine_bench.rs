use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use storyviz::animation::diff_series;
use storyviz::binding::{BindContext, LabelDatum, Layer, PhaseCallbacks, bind};
use storyviz::core::{ChartKind, DataPoint, Dataset, Viewport, row};
use storyviz::error::CollectingReporter;
use storyviz::layout::{LayoutConfig, compute_margins};
use storyviz::render::{NullRenderer, TextHAlign};
use storyviz::transition::{TransitionOverrides, TransitionPolicy};
use storyviz::{ChartConfig, StoryChart};

fn labels(offset: usize, count: usize) -> Vec<LabelDatum> {
    (offset..offset + count)
        .map(|i| LabelDatum {
            text: format!("k{i}"),
            x: i as f64,
            y: 0.0,
            font_size_px: 12.0,
            h_align: TextHAlign::Left,
        })
        .collect()
}

fn yearly(start: i32, count: i32) -> Dataset {
    Dataset::new(
        (start..start + count)
            .map(|year| {
                let value = f64::from(year % 17) * 3.5 + 10.0;
                row([("year", year.into()), ("value", value.into())])
            })
            .collect(),
    )
}

fn bench_bind_5k_shifted(c: &mut Criterion) {
    let policy = TransitionPolicy::default();
    let before = labels(0, 5_000);
    let after = labels(500, 5_000);

    c.bench_function("bind_5k_shifted", |b| {
        b.iter(|| {
            let mut reporter = CollectingReporter::default();
            let mut layer = Layer::new();
            let mut ctx = BindContext {
                kind: ChartKind::Bar,
                policy: &policy,
                overrides: TransitionOverrides::default(),
                now_ms: 0.0,
                reporter: &mut reporter,
            };
            bind(
                &mut layer,
                Some(before.as_slice()),
                |label: &LabelDatum| Ok(label.text.clone()),
                &mut PhaseCallbacks::new(),
                &mut ctx,
            );
            let result = bind(
                &mut layer,
                Some(black_box(after.as_slice())),
                |label: &LabelDatum| Ok(label.text.clone()),
                &mut PhaseCallbacks::new(),
                &mut ctx,
            );
            black_box(result);
        })
    });
}

fn bench_diff_series_10k(c: &mut Criterion) {
    let old: Vec<DataPoint> = (0..10_000)
        .map(|i| DataPoint::new(f64::from(i), f64::from(i % 97)))
        .collect();
    let new: Vec<DataPoint> = (250..10_250)
        .map(|i| DataPoint::new(f64::from(i), f64::from(i % 89)))
        .collect();

    c.bench_function("diff_series_10k", |b| {
        b.iter(|| {
            let diff = diff_series(black_box(&old), black_box(&new));
            black_box(diff.len());
        })
    });
}

fn bench_compute_margins_2k(c: &mut Criterion) {
    let dataset = yearly(1800, 2_000);
    let config = LayoutConfig::new(ChartKind::Line)
        .with_title("Population by year across two millennia")
        .with_legend(true);

    c.bench_function("compute_margins_2k", |b| {
        b.iter(|| {
            let metrics = compute_margins(
                black_box(&dataset),
                black_box(&config),
                black_box(Viewport::new(1600, 900)),
            );
            black_box(metrics);
        })
    });
}

fn bench_story_chart_smooth_step_500(c: &mut Criterion) {
    let first = yearly(1500, 500);
    let second = yearly(1550, 500);
    let config = ChartConfig::new(ChartKind::Line).with_smooth_update(true);

    c.bench_function("story_chart_smooth_step_500", |b| {
        b.iter(|| {
            let mut chart =
                StoryChart::new(NullRenderer::default(), Viewport::new(1600, 900), config.clone())
                    .expect("chart init");
            chart.render_step(&first).expect("first step");
            chart.render_step(&second).expect("second step");
            chart.finish_animations().expect("finish");
            black_box(chart.renderer().frames_rendered);
        })
    });
}

criterion_group!(
    benches,
    bench_bind_5k_shifted,
    bench_diff_series_10k,
    bench_compute_margins_2k,
    bench_story_chart_smooth_step_500
);
criterion_main!(benches);
