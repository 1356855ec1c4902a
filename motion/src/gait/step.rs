use std::f32::consts::PI;

use bevy::math::Vec3;

use crate::settings::GaitConfig;

/// Where a swinging foot is this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepFrame {
    Swing(Vec3),
    Landed(Vec3),
}

/// A single leg's swing from its last committed position to a target, spread
/// across several physics ticks. Advanced explicitly by the gait solver.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTask {
    leg: usize,
    start: Vec3,
    target: Vec3,
    sub_step: u32,
    sub_steps: u32,
    smoothing: f32,
    height: f32,
}

impl StepTask {
    pub fn new(leg: usize, start: Vec3, target: Vec3, config: &GaitConfig) -> Self {
        Self {
            leg,
            start,
            target,
            sub_step: 0,
            sub_steps: config.step_ticks(),
            smoothing: config.smoothing,
            height: config.step_height,
        }
    }

    pub fn leg(&self) -> usize {
        self.leg
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn progress(&self) -> f32 {
        self.sub_step as f32 / (self.smoothing + 1.0)
    }

    /// Moves the swing forward by one tick. `up` is the body's current up axis.
    pub fn advance(&mut self, up: Vec3) -> StepFrame {
        if self.sub_step >= self.sub_steps {
            return StepFrame::Landed(self.target);
        }
        self.sub_step += 1;
        let t = self.progress();
        let position = self.start.lerp(self.target, t) + up * (PI * t).sin() * self.height;
        StepFrame::Swing(position)
    }
}
