use serde::{Deserialize, Serialize};

/// Bit set of collision layers a world query is allowed to hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    pub const DEFAULT: LayerMask = LayerMask::layer(0);
    pub const GROUND: LayerMask = LayerMask::layer(3);
    pub const WALL: LayerMask = LayerMask::layer(4);
    pub const PROP: LayerMask = LayerMask::layer(5);
    /// Limb colliders of ragdolls. Excluded from environment probes so a body
    /// never lands on itself.
    pub const RAGDOLL: LayerMask = LayerMask::layer(8);

    /// Mask containing a single layer. Layers above 31 produce an empty mask.
    pub const fn layer(index: u8) -> LayerMask {
        if index < 32 {
            LayerMask(1 << index)
        } else {
            LayerMask(0)
        }
    }

    pub const fn union(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }

    pub const fn without(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 & !other.0)
    }

    pub const fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        self.union(rhs)
    }
}
