use bevy::math::Vec3;
use bevy::transform::components::Transform;
use common::{Effector, Side};

use super::{BlendRamp, EffectorTarget};
use crate::error::RigError;
use crate::math::{look_rotation, project_on_plane};
use crate::services::{PoseController, RayHit, WorldQuery};
use crate::settings::HandAimConfig;
use crate::skeleton::{BoneId, RigDescriptor};

/// Crouch-layer weight above which the hand reaches forward instead of up.
const CROUCH_THRESHOLD: f32 = 0.5;

/// Braces one hand against a nearby wall on its side of the body.
#[derive(Debug, Clone)]
pub struct HandAimer {
    side: Side,
    config: HandAimConfig,
    origin_bone: BoneId,
    ramp: BlendRamp,
    target: Option<EffectorTarget>,
    enabled: bool,
    parked: bool,
}

impl HandAimer {
    pub fn new(side: Side, config: HandAimConfig, rig: &RigDescriptor) -> Result<Self, RigError> {
        let origin_bone = rig.require(config.origin_bone)?;
        Ok(Self {
            side,
            config: config.sanitized(),
            origin_bone,
            ramp: BlendRamp::default(),
            target: None,
            enabled: true,
            parked: false,
        })
    }

    pub fn effector(&self) -> Effector {
        Effector::hand(self.side)
    }

    pub fn weight(&self) -> f32 {
        self.ramp.value()
    }

    pub fn target(&self) -> Option<&EffectorTarget> {
        self.target.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn probe(&self, root: &Transform, world: &dyn WorldQuery, pose: &dyn PoseController) -> Option<RayHit> {
        let origin = pose.bone_world_transform(self.origin_bone)?.translation
            + root.rotation * Vec3::from(self.config.origin_offset);
        let direction = *root.right() * self.side.sign();
        let reach = self.config.reach;
        world
            .raycast(origin, direction, reach.max_reach, self.config.wall_mask)
            .filter(|hit| hit.distance > reach.min_reach && hit.distance <= reach.max_reach)
    }

    pub fn tick(&mut self, root: &Transform, world: &dyn WorldQuery, pose: &mut dyn PoseController) {
        let effector = self.effector();
        let hit = if self.enabled {
            self.probe(root, world, &*pose)
        } else {
            None
        };

        let reach = self.config.reach;
        let weight = match &hit {
            Some(_) => self.ramp.step_toward(reach.target_weight, reach.ramp_rate),
            None => self
                .ramp
                .step_toward(0.0, reach.ramp_rate * self.config.release_factor),
        };

        if let Some(hit) = hit {
            let crouched = pose
                .layer_weight(&self.config.crouch_layer)
                .is_some_and(|weight| weight > CROUCH_THRESHOLD);
            let along = if crouched { root.forward() } else { root.up() };
            let forward = project_on_plane(*along, hit.normal);

            let target = self.target.get_or_insert_with(|| EffectorTarget::new(effector));
            target.position = hit.point + hit.normal * self.config.hand_offset;
            target.rotation = look_rotation(forward, hit.normal).unwrap_or(root.rotation);
        }

        if weight <= 0.0 {
            if !self.parked {
                pose.set_effector_weight(effector, 0.0, 0.0);
                self.parked = true;
            }
            if let Some(target) = self.target.as_mut() {
                target.position_weight = 0.0;
                target.rotation_weight = 0.0;
            }
            return;
        }

        let Some(target) = self.target.as_mut() else {
            return;
        };
        self.parked = false;
        target.position_weight = weight;
        target.rotation_weight = weight;
        pose.set_effector_weight(effector, weight, weight);
        pose.set_effector_position(effector, target.position);
        pose.set_effector_rotation(effector, target.rotation);
    }
}
