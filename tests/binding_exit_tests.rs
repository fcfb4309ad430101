use storyviz::binding::{
    BindContext, EntityKey, LabelDatum, LayerId, LayerKind, PhaseCallbacks, Surface, bind,
};
use storyviz::core::ChartKind;
use storyviz::error::{CollectingReporter, VizError, VizResult};
use storyviz::render::TextHAlign;
use storyviz::transition::{TransitionOverrides, TransitionPolicy};

fn labels(keys: &[&str]) -> Vec<LabelDatum> {
    keys.iter()
        .map(|key| LabelDatum {
            text: (*key).to_owned(),
            x: 10.0,
            y: 10.0,
            font_size_px: 12.0,
            h_align: TextHAlign::Left,
        })
        .collect()
}

fn label_key(label: &LabelDatum) -> VizResult<EntityKey> {
    Ok(label.text.clone())
}

fn bind_labels(
    surface: &mut Surface,
    id: &LayerId,
    keys: Option<&[&str]>,
    reporter: &mut CollectingReporter,
) {
    let policy = TransitionPolicy::default();
    let now_ms = surface.now_ms();
    let mut ctx = BindContext {
        kind: ChartKind::Line,
        policy: &policy,
        overrides: TransitionOverrides::default(),
        now_ms,
        reporter,
    };
    let data = keys.map(labels);
    bind(
        surface.layer_mut(id),
        data.as_deref(),
        label_key,
        &mut PhaseCallbacks::new(),
        &mut ctx,
    );
}

#[test]
fn exiting_entity_stays_until_its_fade_ends() {
    let mut surface = Surface::new();
    let mut reporter = CollectingReporter::default();
    let id = LayerId::new(LayerKind::Labels, "notes");

    bind_labels(&mut surface, &id, Some(&["a", "b"][..]), &mut reporter);
    bind_labels(&mut surface, &id, Some(&["b"][..]), &mut reporter);

    let layer = surface.layer(&id).expect("layer");
    assert_eq!(layer.len(), 2);
    assert!(layer.get("a").expect("a").is_exiting());
    assert_eq!(layer.live().count(), 1);

    // Line exit default is 400 ms.
    surface.tick(399.0);
    assert!(surface.layer(&id).expect("layer").contains("a"));

    surface.tick(400.0);
    let layer = surface.layer(&id).expect("layer");
    assert!(!layer.contains("a"));
    assert!(layer.contains("b"));
    assert!(reporter.errors.is_empty());
}

#[test]
fn key_returning_during_exit_is_revived() {
    let mut surface = Surface::new();
    let mut reporter = CollectingReporter::default();
    let id = LayerId::new(LayerKind::Labels, "notes");

    bind_labels(&mut surface, &id, Some(&["a"][..]), &mut reporter);
    bind_labels(&mut surface, &id, Some(&[] as &[&str]), &mut reporter);
    surface.tick(100.0);
    assert!(surface.layer(&id).expect("layer").get("a").expect("a").is_exiting());

    bind_labels(&mut surface, &id, Some(&["a"][..]), &mut reporter);
    surface.tick(1000.0);
    let layer = surface.layer(&id).expect("layer");
    let revived = layer.get("a").expect("a is kept");
    assert!(!revived.is_exiting());
}

#[test]
fn missing_dataset_exits_everything_and_reports() {
    let mut surface = Surface::new();
    let mut reporter = CollectingReporter::default();
    let id = LayerId::new(LayerKind::Labels, "notes");

    bind_labels(&mut surface, &id, Some(&["a", "b", "c"][..]), &mut reporter);
    bind_labels(&mut surface, &id, None, &mut reporter);

    assert!(matches!(reporter.errors.as_slice(), [VizError::DataShape(_)]));
    assert_eq!(surface.layer(&id).expect("layer").live().count(), 0);

    surface.tick(1000.0);
    assert!(surface.layer(&id).expect("layer").is_empty());
}

#[test]
fn duplicate_keys_keep_first_occurrence() {
    let mut surface = Surface::new();
    let mut reporter = CollectingReporter::default();
    let id = LayerId::new(LayerKind::Labels, "notes");

    bind_labels(&mut surface, &id, Some(&["a", "b", "a"][..]), &mut reporter);

    assert_eq!(surface.layer(&id).expect("layer").len(), 2);
    assert_eq!(reporter.errors.len(), 1);
    assert!(matches!(reporter.errors[0], VizError::DataShape(_)));
}
