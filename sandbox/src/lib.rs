//! Headless sandbox that drives a crawler and a biped through the rig
//! components on a fixed physics step.

pub mod puppet;
pub mod settings;
pub mod stage;
pub mod world;

use bevy::prelude::*;
use motion::{RigDescriptor, RigError};
use thiserror::Error;

pub use settings::{RunSettings, SandboxSettings};
pub use stage::Stage;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to assemble rig: {0}")]
    Rig(#[from] RigError),
}

/// Rendered frames since startup.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct SandboxClock {
    pub frame: u32,
}

pub struct SandboxPlugin {
    settings: SandboxSettings,
    biped_rig: RigDescriptor,
}

impl SandboxPlugin {
    pub fn new(settings: SandboxSettings) -> Self {
        Self {
            settings,
            biped_rig: RigDescriptor::humanoid(),
        }
    }

    /// Replaces the stock humanoid skeleton the biped is assembled from.
    pub fn with_biped_rig(mut self, rig: RigDescriptor) -> Self {
        self.biped_rig = rig;
        self
    }
}

impl Plugin for SandboxPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings.clone())
            .insert_resource(Time::<Fixed>::from_hz(self.settings.run.fixed_hz))
            .init_resource::<SandboxClock>();

        app.insert_non_send_resource(Stage::with_biped_rig(&self.settings, &self.biped_rig))
            .add_systems(FixedUpdate, step_physics)
            .add_systems(Update, (sample_animation, run_script).chain())
            .add_systems(PostUpdate, resolve_poses);
    }
}

fn step_physics(time: Res<Time>, settings: Res<SandboxSettings>, mut stage: NonSendMut<Stage>) {
    stage.physics_step(&settings, time.delta_secs());
}

fn sample_animation(time: Res<Time>, mut stage: NonSendMut<Stage>) {
    stage.sample_animation(time.delta_secs());
}

fn resolve_poses(time: Res<Time>, mut stage: NonSendMut<Stage>) {
    stage.pose_resolve(time.delta_secs());
}

fn run_script(
    settings: Res<SandboxSettings>,
    mut clock: ResMut<SandboxClock>,
    mut stage: NonSendMut<Stage>,
    mut exit: MessageWriter<AppExit>,
) {
    clock.frame += 1;
    let frame = clock.frame;
    let run = &settings.run;

    if frame == run.look_from_frame {
        info!("Frame {}: biped starts watching the orb", frame);
        stage.start_looking();
    }
    if frame == run.look_until_frame {
        info!("Frame {}: biped looks away", frame);
        stage.stop_looking();
    }
    if frame == run.knock_down_frame {
        info!("Frame {}: knocking the biped over", frame);
        stage.knock_down(Vec3::from(run.push));
    }
    if frame == run.stand_up_frame {
        info!("Frame {}: asking the biped to stand up", frame);
        stage.request_stand_up();
    }

    if run.frames > 0 && frame >= run.frames {
        info!("Sandbox finished after {} frames: {}", frame, stage.summary());
        exit.write(AppExit::Success);
    }
}
