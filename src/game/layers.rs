//! Layer classification for colliders and query filters.

use serde::{Deserialize, Serialize};

use super::constants::layers as named;

/// A collision layer, stored as a bit index in `0..32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layer(pub u8);

impl Layer {
    pub const DEFAULT: Layer = Layer(named::DEFAULT);
    pub const IGNORE_RAYCAST: Layer = Layer(named::IGNORE_RAYCAST);
    pub const PLAYER: Layer = Layer(named::PLAYER);
    pub const PICKABLE: Layer = Layer(named::PICKABLE);
    pub const GRABBED_OBJECT: Layer = Layer(named::GRABBED_OBJECT);
    pub const TELEPORT_SURFACE: Layer = Layer(named::TELEPORT_SURFACE);
    pub const TELEPORT_PICKABLE: Layer = Layer(named::TELEPORT_PICKABLE);
    pub const TRIGGER: Layer = Layer(named::TRIGGER);

    /// Single-bit mask for this layer. Indices past 31 map to an empty mask.
    pub fn bit(self) -> u32 {
        1u32.checked_shl(self.0 as u32).unwrap_or(0)
    }
}

/// A set of layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    pub fn from_layers(layers: &[Layer]) -> Self {
        Self(layers.iter().fold(0, |bits, layer| bits | layer.bit()))
    }

    pub fn contains(self, layer: Layer) -> bool {
        self.0 & layer.bit() != 0
    }

    pub fn with(self, layer: Layer) -> Self {
        Self(self.0 | layer.bit())
    }

    pub fn without(self, layer: Layer) -> Self {
        Self(self.0 & !layer.bit())
    }

    /// Every layer not in this mask. Ignore lists are stored as masks and
    /// inverted when passed to a query.
    pub fn inverted(self) -> Self {
        Self(!self.0)
    }

    pub fn layers(self) -> impl Iterator<Item = Layer> {
        (0u8..32).map(Layer).filter(move |l| self.contains(*l))
    }
}

impl From<Vec<u8>> for LayerMask {
    fn from(layers: Vec<u8>) -> Self {
        Self(layers.into_iter().fold(0, |bits, l| bits | Layer(l).bit()))
    }
}

impl From<LayerMask> for Vec<u8> {
    fn from(mask: LayerMask) -> Self {
        mask.layers().map(|l| l.0).collect()
    }
}
