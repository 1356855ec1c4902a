//! Interfaces to the collaborators the procedural layer drives but does not own.
//!
//! The world query service, skeleton pose controller, physics bodies and the
//! locomotion controller all live outside this crate. Components receive them
//! explicitly, either as arguments to their tick functions or through
//! [`crate::scheduler::RigContext`].

use std::cell::Cell;
use std::rc::Rc;

use bevy::math::{Quat, Vec3};
use bevy::transform::components::Transform;
use common::{Effector, LayerMask};

use crate::skeleton::BoneId;

/// A transform owned by something outside the rig (a trigger volume's target,
/// a prop) that the rig may read while it exists.
pub type TransformHandle = Rc<Cell<Transform>>;

/// Nearest contact returned by a world query.
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    /// Material or tag classification of the surface that was hit.
    pub surface: Option<String>,
}

impl RayHit {
    pub fn new(point: Vec3, normal: Vec3, distance: f32) -> Self {
        Self {
            point,
            normal,
            distance,
            surface: None,
        }
    }

    pub fn with_surface(mut self, surface: impl Into<String>) -> Self {
        self.surface = Some(surface.into());
        self
    }

    pub fn is_surface(&self, tag: &str) -> bool {
        self.surface.as_deref() == Some(tag)
    }
}

/// Synchronous, bounded ray queries against the physical world.
///
/// A query that cannot resolve reports `None`; callers treat that as "no hit"
/// and never retry within the same tick.
pub trait WorldQuery {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;
}

/// The skeleton pose controller: owner of the canonical bone transforms.
///
/// Procedural components never mutate bones directly; every write goes through
/// one of the override calls below.
pub trait PoseController {
    /// Animated goal of an end-effector before any override is applied.
    fn effector_goal(&self, effector: Effector) -> Vec3;
    fn set_effector_position(&mut self, effector: Effector, position: Vec3);
    fn set_effector_rotation(&mut self, effector: Effector, rotation: Quat);
    fn set_effector_weight(&mut self, effector: Effector, position_weight: f32, rotation_weight: f32);

    fn bone_world_transform(&self, bone: BoneId) -> Option<Transform>;
    fn override_bone(&mut self, bone: BoneId, transform: Transform);

    fn set_layer_weight(&mut self, layer: &str, weight: f32);
    /// Weight of a named animation layer, `None` when the layer does not exist.
    fn layer_weight(&self, layer: &str) -> Option<f32>;

    fn has_parameter(&self, name: &str) -> bool;
    /// Value of a float parameter; only meaningful when [`Self::has_parameter`]
    /// returns true.
    fn float_parameter(&self, name: &str) -> f32;

    fn play_clip(&mut self, name: &str, layer: usize, normalized_time: f32);
    fn set_trigger(&mut self, name: &str);
    fn set_animation_enabled(&mut self, enabled: bool);
}

/// Rigid bodies of a humanoid: one main capsule plus per-limb ragdoll bodies.
pub trait PhysicsBody {
    fn main_velocity(&self) -> Vec3;
    /// Enables or disables the main collider and rigid body together.
    fn set_main_body_enabled(&mut self, enabled: bool);
    fn limb_count(&self) -> usize;
    /// Switches every limb between kinematic/trigger (false) and simulated
    /// with solid colliders (true).
    fn set_limbs_simulated(&mut self, simulated: bool);
    fn apply_limb_impulse(&mut self, limb: usize, impulse: Vec3);
    fn limb_velocity(&self, limb: usize) -> Option<Vec3>;
}

/// The (external) locomotion controller's enable/disable surface.
pub trait LocomotionControl {
    fn disable_character_control(&mut self);
    fn enable_character_control(&mut self);
    fn is_movement_enabled(&self) -> bool;
    fn camera_offset(&self) -> f32;
    fn set_camera_offset(&mut self, offset: f32);
}
