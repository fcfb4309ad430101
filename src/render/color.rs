use indexmap::IndexMap;

use crate::render::Color;

/// Supplies fill/stroke colors per series or category name.
///
/// Implementations must be deterministic: the same name yields the same
/// color across render steps, so persisting entities never flicker.
pub trait ColorSource: Send + Sync {
    fn color_for(&self, name: &str) -> Color;
}

/// Fixed palette with optional pinned colors.
///
/// Unpinned names pick a palette slot from a stable hash of the name.
#[derive(Debug, Clone, PartialEq)]
pub struct CyclePalette {
    colors: Vec<Color>,
    pinned: IndexMap<String, Color>,
}

impl Default for CyclePalette {
    fn default() -> Self {
        Self::new(vec![
            Color::rgb(0.122, 0.467, 0.706),
            Color::rgb(1.0, 0.498, 0.055),
            Color::rgb(0.173, 0.627, 0.173),
            Color::rgb(0.839, 0.153, 0.157),
            Color::rgb(0.580, 0.404, 0.741),
            Color::rgb(0.549, 0.337, 0.294),
            Color::rgb(0.890, 0.467, 0.761),
            Color::rgb(0.498, 0.498, 0.498),
            Color::rgb(0.737, 0.741, 0.133),
            Color::rgb(0.090, 0.745, 0.812),
        ])
    }
}

impl CyclePalette {
    /// An empty `colors` list falls back to black.
    #[must_use]
    pub fn new(colors: Vec<Color>) -> Self {
        Self {
            colors,
            pinned: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_pinned(mut self, name: impl Into<String>, color: Color) -> Self {
        self.pinned.insert(name.into(), color);
        self
    }

    fn slot(&self, name: &str) -> usize {
        // FNV-1a keeps slots stable across runs and platforms.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in name.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        let len = self.colors.len().max(1) as u64;
        (hash % len) as usize
    }
}

impl ColorSource for CyclePalette {
    fn color_for(&self, name: &str) -> Color {
        if let Some(color) = self.pinned.get(name) {
            return *color;
        }
        self.colors
            .get(self.slot(name))
            .copied()
            .unwrap_or_default()
    }
}

/// One color for everything; text and axis adapters default to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidColor(pub Color);

impl ColorSource for SolidColor {
    fn color_for(&self, _name: &str) -> Color {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_stable_and_respects_pins() {
        let palette = CyclePalette::default().with_pinned("GDP", Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(palette.color_for("GDP"), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(palette.color_for("inflation"), palette.color_for("inflation"));
    }

    #[test]
    fn empty_palette_falls_back_to_black() {
        let palette = CyclePalette::new(Vec::new());
        assert_eq!(palette.color_for("anything"), Color::default());
    }
}
