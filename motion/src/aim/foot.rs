use bevy::transform::components::Transform;
use common::{Effector, Side};

use super::{BlendRamp, EffectorTarget};
use crate::math::{look_rotation, project_on_plane};
use crate::services::{PoseController, WorldQuery};
use crate::settings::FootAimConfig;

/// Plants one foot on the ground below its animated position.
#[derive(Debug, Clone)]
pub struct FootAimer {
    side: Side,
    config: FootAimConfig,
    ramp: BlendRamp,
    target: Option<EffectorTarget>,
    enabled: bool,
    parked: bool,
}

impl FootAimer {
    pub fn new(side: Side, config: FootAimConfig) -> Self {
        Self {
            side,
            config: config.sanitized(),
            ramp: BlendRamp::default(),
            target: None,
            enabled: true,
            parked: false,
        }
    }

    pub fn effector(&self) -> Effector {
        Effector::foot(self.side)
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

    fn weight_parameter(&self) -> &str {
        match self.side {
            Side::Left => &self.config.left_weight_parameter,
            Side::Right => &self.config.right_weight_parameter,
        }
    }

    pub fn tick(&mut self, root: &Transform, world: &dyn WorldQuery, pose: &mut dyn PoseController) {
        let effector = self.effector();
        let up = *root.up();
        let goal = pose.effector_goal(effector);
        let probe = self.config.probe_height;

        let hit = if self.enabled {
            world.raycast(
                goal + up * probe,
                -up,
                probe + self.config.ground_offset + self.config.reach.max_reach,
                self.config.ground_mask,
            )
        } else {
            None
        };

        let target_weight = match &hit {
            Some(_) if pose.has_parameter(self.weight_parameter()) => {
                pose.float_parameter(self.weight_parameter())
            }
            Some(_) => self.config.reach.target_weight,
            None => 0.0,
        };
        let weight = self.ramp.step_toward(target_weight, self.config.reach.ramp_rate);

        if let Some(hit) = hit {
            let forward = project_on_plane(*root.forward(), hit.normal);
            let target = self.target.get_or_insert_with(|| EffectorTarget::new(effector));
            target.position = hit.point + up * self.config.ground_offset;
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
