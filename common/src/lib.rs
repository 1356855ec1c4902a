//! Shared rig vocabulary.
//!
//! This crate names the pieces of a character rig that every other crate in the
//! workspace talks about: the controllable end-effectors, the semantic humanoid
//! bones, and the collision layer masks handed to world queries.
//!
//! Enum discriminant values are stable and may be used as compact identifiers.

mod bone;
mod layer;

pub use bone::HumanBone;
pub use layer::LayerMask;

use serde::{Deserialize, Serialize};

/// Side of the body a paired limb belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Sign applied to the character's right axis to point toward this side.
    pub fn sign(&self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    pub fn mirror(&self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A controllable extremity whose world pose can be overridden independently
/// of the baked animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Effector {
    LeftFoot = 0,
    RightFoot = 1,
    LeftHand = 2,
    RightHand = 3,
    /// The look-at goal. Position is the point being looked at.
    Head = 4,
}

impl Effector {
    pub const ALL: [Effector; 5] = [
        Effector::LeftFoot,
        Effector::RightFoot,
        Effector::LeftHand,
        Effector::RightHand,
        Effector::Head,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Effector::LeftFoot => "LeftFoot",
            Effector::RightFoot => "RightFoot",
            Effector::LeftHand => "LeftHand",
            Effector::RightHand => "RightHand",
            Effector::Head => "Head",
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Effector::LeftFoot),
            1 => Some(Effector::RightFoot),
            2 => Some(Effector::LeftHand),
            3 => Some(Effector::RightHand),
            4 => Some(Effector::Head),
            _ => None,
        }
    }

    pub fn foot(side: Side) -> Self {
        match side {
            Side::Left => Effector::LeftFoot,
            Side::Right => Effector::RightFoot,
        }
    }

    pub fn hand(side: Side) -> Self {
        match side {
            Side::Left => Effector::LeftHand,
            Side::Right => Effector::RightHand,
        }
    }

    /// Returns the body side for paired limbs, `None` for the head.
    pub fn side(&self) -> Option<Side> {
        match self {
            Effector::LeftFoot | Effector::LeftHand => Some(Side::Left),
            Effector::RightFoot | Effector::RightHand => Some(Side::Right),
            Effector::Head => None,
        }
    }

    pub fn is_foot(&self) -> bool {
        matches!(self, Effector::LeftFoot | Effector::RightFoot)
    }

    pub fn is_hand(&self) -> bool {
        matches!(self, Effector::LeftHand | Effector::RightHand)
    }

    /// The bone whose animated transform the effector overrides.
    pub fn bone(&self) -> HumanBone {
        match self {
            Effector::LeftFoot => HumanBone::LeftFoot,
            Effector::RightFoot => HumanBone::RightFoot,
            Effector::LeftHand => HumanBone::LeftHand,
            Effector::RightHand => HumanBone::RightHand,
            Effector::Head => HumanBone::Head,
        }
    }
}

impl std::fmt::Display for Effector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
