//! Multi-leg gait solver.
//!
//! Every physics tick the solver estimates body velocity, lets at most one leg
//! start a step toward its (velocity-led) rest anchor, and re-derives the
//! body's up axis from the leg contact pattern.

mod step;

pub use step::{StepFrame, StepTask};

use bevy::log::{debug, info};
use bevy::math::{Quat, Vec3};
use bevy::transform::components::Transform;

use crate::error::RigError;
use crate::math::{inverse_transform_point, project_on_plane};
use crate::scheduler::{DependencyGate, FrameHandler, RigContext};
use crate::services::WorldQuery;
use crate::settings::GaitConfig;

/// Displacements shorter than this reuse the previous velocity estimate.
const REST_EPSILON: f32 = 0.000025;
/// Upper bound on the velocity term that scales the rest offset of a target.
const MAX_LEAD_SCALE: f32 = 1.5;

#[derive(Debug, Clone, PartialEq)]
pub struct LegState {
    /// Anchor in body-local space.
    pub rest: Vec3,
    /// Where the foot last landed, in world space.
    pub committed: Vec3,
    /// Current foot target in world space.
    pub position: Vec3,
    pub stepping: bool,
}

pub struct GaitSolver {
    config: GaitConfig,
    legs: Vec<LegState>,
    prior_root: Vec3,
    prior_up: Vec3,
    smoothed_velocity: Vec3,
    task: Option<StepTask>,
    despawned: bool,
    gate: DependencyGate,
}

impl GaitSolver {
    /// Captures rest anchors from the rig's current pose: `feet` are the
    /// world positions of each leg's end-effector.
    pub fn new(config: GaitConfig, root: &Transform, feet: &[Vec3]) -> Result<Self, RigError> {
        if feet.is_empty() {
            return Err(RigError::NoLegs);
        }

        let legs = feet
            .iter()
            .map(|foot| LegState {
                rest: inverse_transform_point(root, *foot),
                committed: *foot,
                position: *foot,
                stepping: false,
            })
            .collect();

        Ok(Self {
            config: config.sanitized(),
            legs,
            prior_root: root.translation,
            prior_up: *root.up(),
            smoothed_velocity: Vec3::ZERO,
            task: None,
            despawned: false,
            gate: DependencyGate::new("gait solver"),
        })
    }

    pub fn config(&self) -> &GaitConfig {
        &self.config
    }

    pub fn legs(&self) -> &[LegState] {
        &self.legs
    }

    pub fn leg_targets(&self) -> Vec<Vec3> {
        self.legs.iter().map(|leg| leg.position).collect()
    }

    pub fn stepping_leg(&self) -> Option<usize> {
        self.task.as_ref().map(StepTask::leg)
    }

    pub fn smoothed_velocity(&self) -> Vec3 {
        self.smoothed_velocity
    }

    pub fn toggle_orientation(&mut self) -> bool {
        self.config.adjust_orientation = !self.config.adjust_orientation;
        info!(
            "Gait body orientation adjustment {}",
            if self.config.adjust_orientation { "enabled" } else { "disabled" }
        );
        self.config.adjust_orientation
    }

    /// Abandons any in-flight step. Later ticks do nothing.
    pub fn despawn(&mut self) {
        self.despawned = true;
        self.task = None;
    }

    pub fn is_despawned(&self) -> bool {
        self.despawned
    }

    pub fn tick(&mut self, root: &mut Transform, world: &dyn WorldQuery) {
        if self.is_despawned() {
            return;
        }

        let lead = self.estimate_velocity(root.translation) * self.config.velocity_multiplier;
        let up = *root.up();

        let mut started = false;
        if let Some(leg) = self.step_candidate(root, lead, up)
            && self.task.is_none()
        {
            let target = self.step_target(root, leg, lead, up, world);
            let mut task = StepTask::new(leg, self.legs[leg].committed, target, &self.config);
            self.legs[leg].stepping = true;
            debug!("Leg {} stepping toward {:?}", leg, target);
            self.apply_frame(leg, task.advance(up));
            self.task = Some(task);
            started = true;
        }

        self.prior_root = root.translation;

        if self.config.adjust_orientation && self.legs.len() >= 4 {
            self.orient_body(root);
        }

        if !started {
            self.advance_task(*root.up());
        }
    }

    fn estimate_velocity(&mut self, position: Vec3) -> Vec3 {
        let displacement = position - self.prior_root;
        let smoothing = self.config.smoothing;
        let velocity = (displacement + smoothing * self.smoothed_velocity) / (smoothing + 1.0);
        if velocity.length() >= REST_EPSILON {
            self.smoothed_velocity = velocity;
        }
        self.smoothed_velocity
    }

    fn step_candidate(&mut self, root: &Transform, lead: Vec3, up: Vec3) -> Option<usize> {
        let mut candidate = None;
        let mut farthest = self.config.step_length;

        for (index, leg) in self.legs.iter_mut().enumerate() {
            if leg.stepping {
                continue;
            }
            leg.position = leg.committed;

            let rest = root.transform_point(leg.rest);
            let distance = project_on_plane(rest + lead - leg.committed, up).length();
            if distance > farthest {
                farthest = distance;
                candidate = Some(index);
            }
        }

        candidate
    }

    fn step_target(
        &self,
        root: &Transform,
        leg: usize,
        lead: Vec3,
        up: Vec3,
        world: &dyn WorldQuery,
    ) -> Vec3 {
        let state = &self.legs[leg];
        let rest = root.transform_point(state.rest);
        let lead_scale = lead.length().clamp(0.0, MAX_LEAD_SCALE);
        let target = rest + lead_scale * (rest - state.position) + lead;

        let range = self.config.probe_range;
        world
            .raycast(target + up * range, -up, 2.0 * range, self.config.ground_mask)
            .map(|hit| hit.point)
            .unwrap_or(target)
    }

    fn advance_task(&mut self, up: Vec3) {
        let Some(task) = self.task.as_mut() else {
            return;
        };
        let leg = task.leg();
        let frame = task.advance(up);
        self.apply_frame(leg, frame);
        if matches!(frame, StepFrame::Landed(_)) {
            self.task = None;
        }
    }

    fn apply_frame(&mut self, leg: usize, frame: StepFrame) {
        // The leg list is fixed for the solver's lifetime, but a despawned
        // body must never be written to.
        if self.despawned {
            return;
        }
        let Some(state) = self.legs.get_mut(leg) else {
            return;
        };
        match frame {
            StepFrame::Swing(position) => state.position = position,
            StepFrame::Landed(target) => {
                state.position = target;
                state.committed = target;
                state.stepping = false;
            }
        }
    }

    fn orient_body(&mut self, root: &mut Transform) {
        let legs = &self.legs;
        let across = legs[0].position - legs[1].position;
        let other = legs[2].position - legs[3].position;
        let normal = across.cross(other).normalize();
        if normal.is_nan() {
            return;
        }

        let factor = 1.0 / (self.config.smoothing + 1.0);
        let Some(up) = self.prior_up.lerp(normal, factor).try_normalize() else {
            return;
        };
        let current = *root.up();
        root.rotation = (Quat::from_rotation_arc(current, up) * root.rotation).normalize();
        self.prior_up = *root.up();
    }
}

impl FrameHandler<RigContext> for GaitSolver {
    fn on_physics_step(&mut self, ctx: &mut RigContext, _dt: f32) {
        let Some(world) = self.gate.require("world query", ctx.world.as_deref()) else {
            return;
        };
        self.tick(&mut ctx.root, world);
    }
}
