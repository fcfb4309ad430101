//! Keyed enter/update/exit reconciliation of data against visual entities.

mod entity;
mod surface;

pub use entity::{
    Attrs, AxisSide, BarDatum, CellDatum, Datum, EntityKey, EntityTransition, KeyedEntity,
    LabelDatum, PersistedState, SeriesPoint, TickDatum,
};
pub use surface::{Layer, LayerId, LayerKind, Surface};

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::{ChartKind, Dataset, Row};
use crate::error::{ErrorReporter, VizError, VizResult};
use crate::transition::{Phase, TransitionOverrides, TransitionPolicy, TransitionSpec};

/// Phase hooks invoked by `bind`.
///
/// `on_enter` places a new entity in its initial state, `on_update` runs for
/// every entering and persisting entity, `on_exit` for removed keys. The
/// default exit fades the entity out and lets the surface remove it when the
/// fade ends.
pub trait BindCallbacks {
    fn on_enter(
        &mut self,
        entity: &mut KeyedEntity,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()>;

    fn on_update(
        &mut self,
        entity: &mut KeyedEntity,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()>;

    fn on_exit(
        &mut self,
        entity: &mut KeyedEntity,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        entity.fade_out(spec, now_ms);
        Ok(())
    }
}

type PhaseFn<'a> = Box<dyn FnMut(&mut KeyedEntity, TransitionSpec, f64) + 'a>;

/// Closure-based callbacks; a missing hook is a no-op, a missing exit hook
/// falls back to the default fade-and-remove.
#[derive(Default)]
pub struct PhaseCallbacks<'a> {
    enter: Option<PhaseFn<'a>>,
    update: Option<PhaseFn<'a>>,
    exit: Option<PhaseFn<'a>>,
}

impl<'a> PhaseCallbacks<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enter: None,
            update: None,
            exit: None,
        }
    }

    #[must_use]
    pub fn on_enter(
        mut self,
        hook: impl FnMut(&mut KeyedEntity, TransitionSpec, f64) + 'a,
    ) -> Self {
        self.enter = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_update(
        mut self,
        hook: impl FnMut(&mut KeyedEntity, TransitionSpec, f64) + 'a,
    ) -> Self {
        self.update = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn on_exit(
        mut self,
        hook: impl FnMut(&mut KeyedEntity, TransitionSpec, f64) + 'a,
    ) -> Self {
        self.exit = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for PhaseCallbacks<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseCallbacks")
            .field("enter", &self.enter.is_some())
            .field("update", &self.update.is_some())
            .field("exit", &self.exit.is_some())
            .finish()
    }
}

impl BindCallbacks for PhaseCallbacks<'_> {
    fn on_enter(
        &mut self,
        entity: &mut KeyedEntity,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        if let Some(hook) = &mut self.enter {
            hook(entity, spec, now_ms);
        }
        Ok(())
    }

    fn on_update(
        &mut self,
        entity: &mut KeyedEntity,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        if let Some(hook) = &mut self.update {
            hook(entity, spec, now_ms);
        }
        Ok(())
    }

    fn on_exit(
        &mut self,
        entity: &mut KeyedEntity,
        spec: TransitionSpec,
        now_ms: f64,
    ) -> VizResult<()> {
        match &mut self.exit {
            Some(hook) => hook(entity, spec, now_ms),
            None => entity.fade_out(spec, now_ms),
        }
        Ok(())
    }
}

/// Everything `bind` needs besides the data.
pub struct BindContext<'a> {
    pub kind: ChartKind,
    pub policy: &'a TransitionPolicy,
    pub overrides: TransitionOverrides,
    pub now_ms: f64,
    pub reporter: &'a mut dyn ErrorReporter,
}

impl BindContext<'_> {
    fn spec(&self, phase: Phase) -> TransitionSpec {
        self.policy
            .resolve(self.kind, phase, self.overrides.for_phase(phase))
    }
}

/// Keys per phase of one `bind` call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindResult {
    pub enter: Vec<EntityKey>,
    pub update: Vec<EntityKey>,
    pub exit: Vec<EntityKey>,
    /// `enter ∪ update` in new-data order.
    pub all: Vec<EntityKey>,
}

/// Reconciles `layer` against `new_data`.
///
/// Rows whose key cannot be computed, repeated keys after their first
/// occurrence and entities whose enter hook fails are skipped and reported.
/// `new_data == None` exits every existing entity and returns an empty result.
pub fn bind<D, F>(
    layer: &mut Layer,
    new_data: Option<&[D]>,
    mut key_fn: F,
    callbacks: &mut dyn BindCallbacks,
    ctx: &mut BindContext<'_>,
) -> BindResult
where
    D: Clone + Into<Datum>,
    F: FnMut(&D) -> VizResult<EntityKey>,
{
    let now_ms = ctx.now_ms;
    let exit_spec = ctx.spec(Phase::Exit);

    let Some(new_data) = new_data else {
        warn!(
            existing = layer.len(),
            "bind received no data; exiting every entity"
        );
        ctx.reporter.report(VizError::DataShape(
            "bind received no dataset".to_owned(),
        ));
        let existing: Vec<EntityKey> = layer.keys().cloned().collect();
        for key in &existing {
            run_exit(layer, key, callbacks, exit_spec, now_ms, ctx.reporter);
        }
        return BindResult::default();
    };

    let enter_spec = ctx.spec(Phase::Enter);
    let update_spec = ctx.spec(Phase::Update);

    let mut keyed: Vec<(EntityKey, D)> = Vec::with_capacity(new_data.len());
    let mut seen: HashSet<EntityKey> = HashSet::with_capacity(new_data.len());
    for (index, item) in new_data.iter().enumerate() {
        match key_fn(item) {
            Ok(key) => {
                if seen.insert(key.clone()) {
                    keyed.push((key, item.clone()));
                } else {
                    ctx.reporter.report(VizError::DataShape(format!(
                        "duplicate key `{key}` at index {index}; keeping first occurrence"
                    )));
                }
            }
            Err(err) => {
                ctx.reporter.report(VizError::DataShape(format!(
                    "skipping item {index}: key function failed: {err}"
                )));
            }
        }
    }

    let mut result = BindResult::default();
    for (key, _) in &keyed {
        if layer.contains(key) {
            result.update.push(key.clone());
        } else {
            result.enter.push(key.clone());
        }
        result.all.push(key.clone());
    }
    result.exit = layer
        .keys()
        .filter(|key| !seen.contains(*key))
        .cloned()
        .collect();

    let mut failed_enter: HashSet<EntityKey> = HashSet::new();
    let entering: HashSet<EntityKey> = result.enter.iter().cloned().collect();
    for (key, item) in keyed {
        let datum: Datum = item.into();
        if entering.contains(&key) {
            let mut entity = KeyedEntity::new(key.clone(), datum);
            match callbacks.on_enter(&mut entity, enter_spec, now_ms) {
                Ok(()) => layer.insert(entity),
                Err(err) => {
                    ctx.reporter.report(err);
                    failed_enter.insert(key);
                }
            }
        } else if let Some(entity) = layer.get_mut(&key) {
            entity.cancel_exit();
            entity.datum = datum;
        }
    }
    // An entity that could not enter never reaches the surface.
    if !failed_enter.is_empty() {
        result.enter.retain(|key| !failed_enter.contains(key));
        result.all.retain(|key| !failed_enter.contains(key));
    }

    for key in &result.all {
        let spec = if entering.contains(key) {
            enter_spec
        } else {
            update_spec
        };
        if let Some(entity) = layer.get_mut(key) {
            if let Err(err) = callbacks.on_update(entity, spec, now_ms) {
                ctx.reporter.report(err);
            }
        }
    }

    for key in &result.exit {
        run_exit(layer, key, callbacks, exit_spec, now_ms, ctx.reporter);
    }

    layer.reorder(result.all.iter().chain(result.exit.iter()));
    debug!(
        enter = result.enter.len(),
        update = result.update.len(),
        exit = result.exit.len(),
        "bound keyed entities"
    );
    result
}

/// `bind` over dataset rows, the shape data arrives in from the host.
pub fn bind_rows<F>(
    layer: &mut Layer,
    new_data: Option<&Dataset>,
    mut key_fn: F,
    callbacks: &mut dyn BindCallbacks,
    ctx: &mut BindContext<'_>,
) -> BindResult
where
    F: FnMut(&Row) -> VizResult<EntityKey>,
{
    bind(
        layer,
        new_data.map(Dataset::rows),
        |row: &Arc<Row>| key_fn(row.as_ref()),
        callbacks,
        ctx,
    )
}

fn run_exit(
    layer: &mut Layer,
    key: &str,
    callbacks: &mut dyn BindCallbacks,
    spec: TransitionSpec,
    now_ms: f64,
    reporter: &mut dyn ErrorReporter,
) {
    let Some(entity) = layer.get_mut(key) else {
        return;
    };
    if let Err(err) = callbacks.on_exit(entity, spec, now_ms) {
        reporter.report(err);
        // Keep the surface consistent: a failed exit still leaves.
        entity.fade_out(spec, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldValue, row};
    use crate::error::CollectingReporter;

    fn key_of(row: &Row) -> VizResult<EntityKey> {
        match row.get("id") {
            Some(FieldValue::Text(id)) => Ok(id.clone()),
            _ => Err(VizError::DataShape("row has no id".to_owned())),
        }
    }

    fn dataset(ids: &[&str]) -> Dataset {
        Dataset::new(ids.iter().map(|id| row([("id", (*id).into())])).collect())
    }

    #[test]
    fn failing_keys_skip_only_that_row() {
        let policy = TransitionPolicy::default();
        let mut reporter = CollectingReporter::default();
        let mut ctx = BindContext {
            kind: ChartKind::Bar,
            policy: &policy,
            overrides: TransitionOverrides::default(),
            now_ms: 0.0,
            reporter: &mut reporter,
        };
        let mut layer = Layer::new();
        let data = Dataset::new(vec![
            row([("id", "a".into())]),
            row([("other", 1.into())]),
            row([("id", "b".into())]),
        ]);

        let result = bind_rows(
            &mut layer,
            Some(&data),
            key_of,
            &mut PhaseCallbacks::new(),
            &mut ctx,
        );
        assert_eq!(result.enter, ["a", "b"]);
        assert_eq!(reporter.errors.len(), 1);
    }

    #[test]
    fn entering_entities_get_enter_spec_in_merged_update() {
        let policy = TransitionPolicy::default();
        let mut reporter = CollectingReporter::default();
        let mut layer = Layer::new();

        let mut ctx = BindContext {
            kind: ChartKind::Bar,
            policy: &policy,
            overrides: TransitionOverrides::default(),
            now_ms: 0.0,
            reporter: &mut reporter,
        };
        bind_rows(
            &mut layer,
            Some(&dataset(&["a"])),
            key_of,
            &mut PhaseCallbacks::new(),
            &mut ctx,
        );

        let mut seen = Vec::new();
        let mut callbacks = PhaseCallbacks::new()
            .on_update(|entity, spec, _| seen.push((entity.key.clone(), spec.duration_ms)));
        bind_rows(&mut layer, Some(&dataset(&["a", "b"])), key_of, &mut callbacks, &mut ctx);
        drop(callbacks);

        let enter = policy.resolve(ChartKind::Bar, Phase::Enter, None).duration_ms;
        let update = policy.resolve(ChartKind::Bar, Phase::Update, None).duration_ms;
        assert_eq!(seen, [("a".to_owned(), update), ("b".to_owned(), enter)]);
    }

    #[test]
    fn duplicate_keys_keep_first_occurrence() {
        let policy = TransitionPolicy::default();
        let mut reporter = CollectingReporter::default();
        let mut ctx = BindContext {
            kind: ChartKind::Line,
            policy: &policy,
            overrides: TransitionOverrides::default(),
            now_ms: 0.0,
            reporter: &mut reporter,
        };
        let mut layer = Layer::new();
        let data = Dataset::new(vec![
            row([("id", "a".into()), ("v", 1.into())]),
            row([("id", "a".into()), ("v", 2.into())]),
        ]);
        let result = bind_rows(
            &mut layer,
            Some(&data),
            key_of,
            &mut PhaseCallbacks::new(),
            &mut ctx,
        );
        assert_eq!(result.all, ["a"]);
        let Datum::Row(bound) = &layer.get("a").expect("a").datum else {
            panic!("expected row datum");
        };
        assert_eq!(bound.get("v"), Some(&FieldValue::Number(1.0)));
        assert_eq!(reporter.errors.len(), 1);
    }
}
