//! Procedural secondary motion for character rigs: a multi-leg gait solver,
//! limb IK aimers and a ragdoll recovery controller, driven by a two-phase
//! frame scheduler against externally owned world, pose and physics services.

pub mod aim;
pub mod error;
pub mod gait;
pub mod math;
pub mod ragdoll;
pub mod scheduler;
pub mod services;
pub mod settings;
pub mod skeleton;

pub use aim::{BlendRamp, EffectorTarget, FootAimer, HandAimer, HeadAimer, HumanoidIk};
pub use error::RigError;
pub use gait::{GaitSolver, LegState, StepFrame, StepTask};
pub use ragdoll::{Landmarks, RagdollController, RagdollPhase, RagdollServices};
pub use scheduler::{DependencyGate, FrameHandler, FrameScheduler, RigContext};
pub use services::{
    LocomotionControl, PhysicsBody, PoseController, RayHit, TransformHandle, WorldQuery,
};
pub use settings::{
    FootAimConfig, GaitConfig, HandAimConfig, HeadAimConfig, RagdollConfig, ReachProfile,
    RigSettings, SettingsIoError,
};
pub use skeleton::{BoneDef, BoneEntry, BoneId, RigDescriptor, StoredPose};
