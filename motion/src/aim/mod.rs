//! Limb IK aimers: per-effector overrides blended in from world queries.

mod foot;
mod hand;
mod head;
mod humanoid;

pub use foot::FootAimer;
pub use hand::HandAimer;
pub use head::HeadAimer;
pub use humanoid::HumanoidIk;

use bevy::math::{Quat, Vec3};
use common::Effector;

use crate::settings::finite_or;

/// Snap slack so float accumulation still lands exactly on the target.
const RAMP_SNAP: f32 = 1e-5;

/// A weight in [0, 1] that moves toward a target by a fixed amount per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlendRamp {
    value: f32,
}

impl BlendRamp {
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value <= 0.0
    }

    /// A non-finite `target` or `rate` counts as zero.
    pub fn step_toward(&mut self, target: f32, rate: f32) -> f32 {
        let target = finite_or(target, 0.0).clamp(0.0, 1.0);
        let rate = finite_or(rate, 0.0).abs();
        let delta = target - self.value;
        self.value = if delta.abs() <= rate + RAMP_SNAP {
            target
        } else {
            self.value + rate.copysign(delta)
        }
        .clamp(0.0, 1.0);
        self.value
    }
}

/// Last pose an aimer computed for its effector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectorTarget {
    pub effector: Effector,
    pub position: Vec3,
    pub rotation: Quat,
    pub position_weight: f32,
    pub rotation_weight: f32,
}

impl EffectorTarget {
    pub fn new(effector: Effector) -> Self {
        Self {
            effector,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            position_weight: 0.0,
            rotation_weight: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_reaches_one_in_whole_ticks() {
        let mut ramp = BlendRamp::default();
        let mut ticks = 0;
        while ramp.value() < 1.0 {
            ramp.step_toward(1.0, 0.1);
            ticks += 1;
            assert!(ticks <= 10);
        }
        assert_eq!(ticks, 10);
        assert_eq!(ramp.step_toward(1.0, 0.1), 1.0);
    }

    #[test]
    fn ramp_clamps_wild_inputs() {
        let mut ramp = BlendRamp::default();
        assert_eq!(ramp.step_toward(50.0, 3.0), 1.0);
        assert_eq!(ramp.step_toward(-2.0, -0.5), 0.5);
        assert_eq!(ramp.step_toward(-2.0, 9.0), 0.0);
        assert!(ramp.is_zero());
    }

    #[test]
    fn ramp_treats_non_finite_inputs_as_zero() {
        let mut ramp = BlendRamp::default();
        ramp.step_toward(1.0, 0.5);

        assert_eq!(ramp.step_toward(1.0, f32::NAN), 0.5);
        assert_eq!(ramp.step_toward(1.0, f32::INFINITY), 0.5);
        assert_eq!(ramp.step_toward(f32::NAN, 0.25), 0.25);
        assert_eq!(ramp.step_toward(f32::NEG_INFINITY, 0.25), 0.0);
        assert!(!ramp.value().is_nan());
    }
}
