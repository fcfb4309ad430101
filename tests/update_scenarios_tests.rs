use storyviz::animation::{
    ChartScene, DiffAnimator, Scheduler, TargetId, diff_series, marker_layer, point_key,
};
use storyviz::binding::{
    BindContext, EntityKey, LabelDatum, Layer, PhaseCallbacks, bind,
};
use storyviz::core::{ChartKind, DataPoint, Dataset, Series, Viewport, row};
use storyviz::error::{CollectingReporter, VizResult};
use storyviz::layout::{LayoutConfig, compute_margins};
use storyviz::render::TextHAlign;
use storyviz::transition::{TransitionOverrides, TransitionPolicy};

fn series(points: &[(f64, f64)]) -> Series {
    Series::new(
        "default",
        points.iter().map(|(x, y)| DataPoint::new(*x, *y)).collect(),
    )
}

fn label(key: &str) -> LabelDatum {
    LabelDatum {
        text: key.to_owned(),
        x: 0.0,
        y: 0.0,
        font_size_px: 12.0,
        h_align: TextHAlign::Left,
    }
}

fn label_key(label: &LabelDatum) -> VizResult<EntityKey> {
    Ok(label.text.clone())
}

#[test]
fn shifted_year_window_removes_oldest_and_adds_newest() {
    let old = series(&[(2000.0, 10.0), (2001.0, 20.0)]);
    let new = series(&[(2001.0, 20.0), (2002.0, 30.0)]);

    let diff = diff_series(&old.values, &new.values);
    let removed: Vec<f64> = diff.to_remove.iter().map(|p| p.x).collect();
    let added: Vec<f64> = diff.to_add.iter().map(|p| p.x).collect();
    assert_eq!(removed, [2000.0]);
    assert_eq!(added, [2002.0]);

    let mut scheduler = Scheduler::new();
    let mut scene = ChartScene::default();
    scene.set_displayed("default", old.values.clone());
    let target = TargetId::new("chart/default");
    DiffAnimator::default().animate_diff(&mut scheduler, &mut scene, &target, &old, &new, 1000.0);
    scheduler.run_to_idle(&mut scene);

    let xs: Vec<f64> = scene
        .displayed("default")
        .expect("displayed series")
        .iter()
        .map(|p| p.x)
        .collect();
    assert_eq!(xs, [2001.0, 2002.0]);
}

#[test]
fn empty_old_series_takes_the_enter_path() {
    let mut scheduler = Scheduler::new();
    let mut scene = ChartScene::default();
    let target = TargetId::new("chart/default");
    let new = series(&[(2000.0, 10.0), (2001.0, 20.0)]);

    let handle = DiffAnimator::default().animate_diff(
        &mut scheduler,
        &mut scene,
        &target,
        &Series::new("default", Vec::new()),
        &new,
        1000.0,
    );
    assert!(handle.entered);
    assert!(handle.timers.is_empty());
    assert!(handle.diff.is_empty());

    let markers = scene.surface.layer(&marker_layer("default")).expect("markers");
    assert_eq!(markers.len(), 2);
    for marker in markers.iter() {
        assert_eq!(marker.attrs.radius, 0.0);
        assert_eq!(marker.attrs.opacity, 0.0);
        assert_eq!(marker.target_attrs().radius, scene.point_radius);
        assert_eq!(marker.target_attrs().opacity, 1.0);
    }

    // Line enter default is 800 ms.
    scene.surface.tick(800.0);
    let markers = scene.surface.layer(&marker_layer("default")).expect("markers");
    let grown = markers
        .get(&point_key("default", 2001.0))
        .expect("marker 2001");
    assert_eq!(grown.attrs.radius, scene.point_radius);
    assert!(grown.transition().is_none());
}

#[test]
fn thirty_five_character_title_adds_twenty_pixels_on_top() {
    let config = LayoutConfig::new(ChartKind::Line).with_title("x".repeat(35));
    let metrics = compute_margins(&Dataset::default(), &config, Viewport::new(1280, 720));
    assert_eq!(metrics.top, 70.0);
}

#[test]
fn legend_width_follows_longest_series_name() {
    let dataset = Dataset::new(
        ["abc", "abcde", "abcdefghij"]
            .iter()
            .map(|name| {
                row([
                    ("year", 2000.into()),
                    ("value", 1.into()),
                    ("series", (*name).into()),
                ])
            })
            .collect(),
    );
    let config = LayoutConfig::new(ChartKind::Line).with_legend(true);
    let metrics = compute_margins(&dataset, &config, Viewport::new(1280, 720));
    assert_eq!(metrics.right, 120.0);
}

#[test]
fn bind_partitions_abc_into_bcd() {
    let policy = TransitionPolicy::default();
    let mut reporter = CollectingReporter::default();
    let mut layer = Layer::new();

    let mut ctx = BindContext {
        kind: ChartKind::Line,
        policy: &policy,
        overrides: TransitionOverrides::default(),
        now_ms: 0.0,
        reporter: &mut reporter,
    };
    let first: Vec<LabelDatum> = ["A", "B", "C"].into_iter().map(label).collect();
    bind(
        &mut layer,
        Some(first.as_slice()),
        label_key,
        &mut PhaseCallbacks::new(),
        &mut ctx,
    );

    let second: Vec<LabelDatum> = ["B", "C", "D"].into_iter().map(label).collect();
    let result = bind(
        &mut layer,
        Some(second.as_slice()),
        label_key,
        &mut PhaseCallbacks::new(),
        &mut ctx,
    );

    assert_eq!(result.enter, ["D"]);
    assert_eq!(result.update, ["B", "C"]);
    assert_eq!(result.exit, ["A"]);
    assert_eq!(result.all, ["B", "C", "D"]);
    assert!(reporter.errors.is_empty());
}
