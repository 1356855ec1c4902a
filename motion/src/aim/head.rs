use std::cell::Cell;
use std::rc::{Rc, Weak};

use bevy::log::debug;
use bevy::math::Vec3;
use bevy::transform::components::Transform;
use common::Effector;

use super::BlendRamp;
use crate::error::RigError;
use crate::services::{PoseController, TransformHandle, WorldQuery};
use crate::settings::HeadAimConfig;
use crate::skeleton::{BoneId, RigDescriptor};

#[derive(Debug, Clone)]
struct LookTarget {
    transform: Weak<Cell<Transform>>,
    tag: String,
    last_position: Vec3,
}

/// Turns the head toward a look target registered by a trigger volume, as
/// long as the target stays in sight.
#[derive(Debug, Clone)]
pub struct HeadAimer {
    config: HeadAimConfig,
    origin_bone: BoneId,
    ramp: BlendRamp,
    target_weight: f32,
    look: Option<LookTarget>,
    enabled: bool,
    parked: bool,
}

impl HeadAimer {
    pub fn new(config: HeadAimConfig, rig: &RigDescriptor) -> Result<Self, RigError> {
        let origin_bone = rig.require(config.origin_bone)?;
        Ok(Self {
            config: config.sanitized(),
            origin_bone,
            ramp: BlendRamp::default(),
            target_weight: 0.0,
            look: None,
            enabled: true,
            parked: false,
        })
    }

    pub fn weight(&self) -> f32 {
        self.ramp.value()
    }

    pub fn target_weight(&self) -> f32 {
        self.target_weight
    }

    pub fn has_look_target(&self) -> bool {
        self.look.is_some()
    }

    pub fn look_tag(&self) -> Option<&str> {
        self.look.as_ref().map(|look| look.tag.as_str())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn register_look_target(&mut self, target: &TransformHandle, strength: f32, tag: &str) {
        debug!("Look target registered with tag '{}'", tag);
        self.look = Some(LookTarget {
            transform: Rc::downgrade(target),
            tag: tag.to_string(),
            last_position: target.get().translation,
        });
        self.target_weight = strength.clamp(0.0, 1.0);
    }

    /// Starts letting go of the current target if it was registered with `tag`.
    /// The target itself is kept until the weight has decayed.
    pub fn clear_look_target(&mut self, tag: &str) {
        if self.look_tag() == Some(tag) {
            self.target_weight = 0.0;
        }
    }

    fn in_sight(&self, look: &LookTarget, world: &dyn WorldQuery, pose: &dyn PoseController) -> bool {
        let Some(origin) = pose.bone_world_transform(self.origin_bone) else {
            return false;
        };
        let offset = look.last_position - origin.translation;
        let distance = offset.length();
        if !self.config.reach.contains(distance) {
            return false;
        }
        let Some(direction) = offset.try_normalize() else {
            return false;
        };
        world
            .raycast(
                origin.translation,
                direction,
                self.config.reach.max_reach,
                self.config.sight_mask,
            )
            .is_some_and(|hit| hit.is_surface(&look.tag))
    }

    pub fn tick(&mut self, world: &dyn WorldQuery, pose: &mut dyn PoseController) {
        if let Some(look) = self.look.as_mut() {
            match look.transform.upgrade() {
                Some(transform) => look.last_position = transform.get().translation,
                None => self.target_weight = 0.0,
            }
        }

        let goal = match &self.look {
            Some(look) if self.enabled && self.in_sight(look, world, &*pose) => self.target_weight,
            _ => 0.0,
        };
        let weight = self.ramp.step_toward(goal, self.config.reach.ramp_rate);

        if weight <= 0.0 {
            if self.target_weight <= 0.0 && self.look.take().is_some() {
                debug!("Look target released");
            }
            if !self.parked {
                pose.set_effector_weight(Effector::Head, 0.0, 0.0);
                self.parked = true;
            }
            return;
        }

        let Some(look) = self.look.as_ref() else {
            return;
        };
        self.parked = false;
        pose.set_effector_position(Effector::Head, look.last_position);
        pose.set_effector_weight(Effector::Head, weight, 0.0);
    }
}
