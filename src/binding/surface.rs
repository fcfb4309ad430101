use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{EntityKey, KeyedEntity};

/// Paint order of surface layers, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Background,
    Grid,
    Series,
    Markers,
    Axis,
    Labels,
    Legend,
    Overlay,
}

/// Identity of one layer: its paint slot plus a name (e.g. a series name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId {
    pub kind: LayerKind,
    pub name: String,
}

impl LayerId {
    #[must_use]
    pub fn new(kind: LayerKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Keyed entities of one layer in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layer {
    entities: IndexMap<EntityKey, KeyedEntity>,
}

impl Layer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KeyedEntity> {
        self.entities.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut KeyedEntity> {
        self.entities.get_mut(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entities.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.entities.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyedEntity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut KeyedEntity> {
        self.entities.values_mut()
    }

    /// Inserts or replaces the entity under its own key.
    pub fn insert(&mut self, entity: KeyedEntity) {
        self.entities.insert(entity.key.clone(), entity);
    }

    /// Removes an entity at once. Exit fades go through `KeyedEntity::fade_out`.
    pub fn remove(&mut self, key: &str) -> Option<KeyedEntity> {
        self.entities.shift_remove(key)
    }

    /// Entities that are not fading out.
    pub fn live(&self) -> impl Iterator<Item = &KeyedEntity> {
        self.entities.values().filter(|entity| !entity.is_exiting())
    }

    /// Advances every transition and drops entities whose exit fade ended.
    /// Returns the number of removed entities.
    pub fn advance(&mut self, now_ms: f64) -> usize {
        let before = self.entities.len();
        self.entities.retain(|_, entity| !entity.advance(now_ms));
        before - self.entities.len()
    }

    #[must_use]
    pub fn has_active_transitions(&self) -> bool {
        self.entities.values().any(|entity| entity.transition().is_some())
    }

    pub(crate) fn reorder<'a>(&mut self, keys: impl IntoIterator<Item = &'a EntityKey>) {
        let mut rank: IndexMap<&EntityKey, usize> = IndexMap::new();
        for (index, key) in keys.into_iter().enumerate() {
            rank.entry(key).or_insert(index);
        }
        let fallback = rank.len();
        self.entities.sort_by(|a, _, b, _| {
            let ra = rank.get(a).copied().unwrap_or(fallback);
            let rb = rank.get(b).copied().unwrap_or(fallback);
            ra.cmp(&rb)
        });
    }
}

/// Retained visual tree of one chart.
///
/// The surface exclusively owns entity state; the engine mutates it through
/// binder callbacks, adapters and scheduled steps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Surface {
    layers: IndexMap<LayerId, Layer>,
    now_ms: f64,
}

impl Surface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface clock, advanced by `tick`.
    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    #[must_use]
    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    pub fn layer_mut_existing(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(id)
    }

    /// Returns the layer, creating an empty one on first use.
    pub fn layer_mut(&mut self, id: &LayerId) -> &mut Layer {
        self.layers.entry(id.clone()).or_default()
    }

    /// Layers in paint order (kind first, then creation order).
    pub fn layers(&self) -> impl Iterator<Item = (&LayerId, &Layer)> {
        let mut ordered: Vec<_> = self.layers.iter().collect();
        ordered.sort_by_key(|(id, _)| id.kind);
        ordered.into_iter()
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = &LayerId> {
        self.layers.keys()
    }

    pub fn remove_layer(&mut self, id: &LayerId) -> Option<Layer> {
        self.layers.shift_remove(id)
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.layers.values().map(Layer::len).sum()
    }

    #[must_use]
    pub fn has_active_transitions(&self) -> bool {
        self.layers.values().any(Layer::has_active_transitions)
    }

    /// Moves the clock to `now_ms` and advances every entity transition.
    ///
    /// The clock never runs backwards. Empty layers are kept so callers can
    /// hold on to their ids.
    pub fn tick(&mut self, now_ms: f64) {
        if now_ms > self.now_ms {
            self.now_ms = now_ms;
        }
        let now = self.now_ms;
        let mut removed = 0;
        for layer in self.layers.values_mut() {
            removed += layer.advance(now);
        }
        if removed > 0 {
            trace!(removed, now_ms = now, "removed faded entities");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Datum, LabelDatum};
    use crate::core::Easing;
    use crate::render::TextHAlign;
    use crate::transition::TransitionSpec;

    fn entity(key: &str) -> KeyedEntity {
        KeyedEntity::new(
            key,
            Datum::Label(LabelDatum {
                text: key.to_owned(),
                x: 0.0,
                y: 0.0,
                font_size_px: 12.0,
                h_align: TextHAlign::Left,
            }),
        )
    }

    #[test]
    fn tick_removes_entities_after_fade() {
        let mut surface = Surface::new();
        let id = LayerId::new(LayerKind::Labels, "titles");
        let layer = surface.layer_mut(&id);
        layer.insert(entity("a"));
        layer.insert(entity("b"));
        layer
            .get_mut("a")
            .expect("a")
            .fade_out(TransitionSpec::new(200.0, Easing::Linear), 0.0);

        surface.tick(100.0);
        assert_eq!(surface.entity_count(), 2);
        surface.tick(200.0);
        assert_eq!(surface.entity_count(), 1);
        assert!(surface.layer(&id).expect("layer").contains("b"));
    }

    #[test]
    fn layers_iterate_in_paint_order() {
        let mut surface = Surface::new();
        surface.layer_mut(&LayerId::new(LayerKind::Axis, "x"));
        surface.layer_mut(&LayerId::new(LayerKind::Series, "s"));
        let kinds: Vec<_> = surface.layers().map(|(id, _)| id.kind).collect();
        assert_eq!(kinds, [LayerKind::Series, LayerKind::Axis]);
    }
}
