#![allow(dead_code)]

use std::collections::HashMap;

use bevy::math::{Quat, Vec3};
use bevy::transform::components::Transform;
use common::{Effector, HumanBone, LayerMask};
use motion::{
    BoneId, LocomotionControl, PhysicsBody, PoseController, RayHit, RigDescriptor, WorldQuery,
};

pub const EPSILON: f32 = 1e-4;

pub fn approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

/// An infinite plane that only reflects rays travelling into its front face.
#[derive(Debug, Clone)]
pub struct Plane {
    pub point: Vec3,
    pub normal: Vec3,
    pub layer: LayerMask,
    pub surface: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PlaneWorld {
    pub planes: Vec<Plane>,
}

impl PlaneWorld {
    pub fn ground(height: f32) -> Self {
        Self::default().with_plane(Vec3::Y * height, Vec3::Y, LayerMask::GROUND, None)
    }

    pub fn with_plane(
        mut self,
        point: Vec3,
        normal: Vec3,
        layer: LayerMask,
        surface: Option<&str>,
    ) -> Self {
        self.planes.push(Plane {
            point,
            normal: normal.normalize(),
            layer,
            surface: surface.map(str::to_string),
        });
        self
    }
}

impl WorldQuery for PlaneWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        self.planes
            .iter()
            .filter(|plane| plane.layer.intersects(mask))
            .filter_map(|plane| {
                let facing = direction.dot(plane.normal);
                if facing >= 0.0 {
                    return None;
                }
                let distance = (plane.point - origin).dot(plane.normal) / facing;
                if distance < 0.0 || distance > max_distance {
                    return None;
                }
                let mut hit = RayHit::new(origin + direction * distance, plane.normal, distance);
                hit.surface = plane.surface.clone();
                Some(hit)
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Records every override call so tests can assert on what was written.
#[derive(Debug, Default)]
pub struct MockPose {
    pub goals: HashMap<Effector, Vec3>,
    pub bones: HashMap<BoneId, Transform>,
    pub positions: HashMap<Effector, Vec3>,
    pub rotations: HashMap<Effector, Quat>,
    pub weights: HashMap<Effector, (f32, f32)>,
    pub weight_writes: HashMap<Effector, usize>,
    pub overrides: HashMap<BoneId, Transform>,
    pub layers: HashMap<String, f32>,
    pub parameters: HashMap<String, f32>,
    pub clips: Vec<(String, usize, f32)>,
    pub triggers: Vec<String>,
    pub animation_enabled: bool,
}

impl MockPose {
    pub fn new() -> Self {
        Self {
            animation_enabled: true,
            ..Self::default()
        }
    }

    pub fn with_goal(mut self, effector: Effector, goal: Vec3) -> Self {
        self.goals.insert(effector, goal);
        self
    }

    pub fn with_bone(mut self, rig: &RigDescriptor, bone: HumanBone, transform: Transform) -> Self {
        let id = rig.semantic(bone).expect("bone in rig");
        self.bones.insert(id, transform);
        self
    }

    /// Places every bone of `rig` somewhere plausible for a standing biped
    /// at the origin facing -Z.
    pub fn standing(rig: &RigDescriptor) -> Self {
        let mut pose = Self::new();
        for id in rig.ids() {
            let semantic = rig.bone(id).and_then(|bone| bone.semantic);
            let height = match semantic {
                Some(HumanBone::Hips) => 1.0,
                Some(HumanBone::Head) => 1.7,
                Some(HumanBone::Neck) => 1.6,
                Some(HumanBone::UpperChest) => 1.4,
                Some(HumanBone::LeftToes) | Some(HumanBone::RightToes) => 0.0,
                Some(_) => 1.2,
                None => 0.0,
            };
            let x = match semantic {
                Some(HumanBone::LeftToes) => -0.1,
                Some(HumanBone::RightToes) => 0.1,
                _ => 0.0,
            };
            pose.bones.insert(id, Transform::from_xyz(x, height, 0.0));
        }
        pose
    }

    pub fn weight(&self, effector: Effector) -> (f32, f32) {
        self.weights.get(&effector).copied().unwrap_or((0.0, 0.0))
    }

    pub fn writes(&self, effector: Effector) -> usize {
        self.weight_writes.get(&effector).copied().unwrap_or(0)
    }
}

impl PoseController for MockPose {
    fn effector_goal(&self, effector: Effector) -> Vec3 {
        self.goals.get(&effector).copied().unwrap_or(Vec3::ZERO)
    }

    fn set_effector_position(&mut self, effector: Effector, position: Vec3) {
        self.positions.insert(effector, position);
    }

    fn set_effector_rotation(&mut self, effector: Effector, rotation: Quat) {
        self.rotations.insert(effector, rotation);
    }

    fn set_effector_weight(&mut self, effector: Effector, position_weight: f32, rotation_weight: f32) {
        self.weights.insert(effector, (position_weight, rotation_weight));
        *self.weight_writes.entry(effector).or_default() += 1;
    }

    fn bone_world_transform(&self, bone: BoneId) -> Option<Transform> {
        self.bones.get(&bone).copied()
    }

    fn override_bone(&mut self, bone: BoneId, transform: Transform) {
        self.overrides.insert(bone, transform);
    }

    fn set_layer_weight(&mut self, layer: &str, weight: f32) {
        self.layers.insert(layer.to_string(), weight);
    }

    fn layer_weight(&self, layer: &str) -> Option<f32> {
        self.layers.get(layer).copied()
    }

    fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    fn float_parameter(&self, name: &str) -> f32 {
        self.parameters.get(name).copied().unwrap_or(0.0)
    }

    fn play_clip(&mut self, name: &str, layer: usize, normalized_time: f32) {
        self.clips.push((name.to_string(), layer, normalized_time));
    }

    fn set_trigger(&mut self, name: &str) {
        self.triggers.push(name.to_string());
    }

    fn set_animation_enabled(&mut self, enabled: bool) {
        self.animation_enabled = enabled;
    }
}

#[derive(Debug)]
pub struct MockPhysics {
    pub velocity: Vec3,
    pub main_enabled: bool,
    pub limb_velocities: Vec<Vec3>,
    pub simulated: bool,
    pub impulses: Vec<(usize, Vec3)>,
}

impl MockPhysics {
    pub fn with_limbs(count: usize) -> Self {
        Self {
            velocity: Vec3::ZERO,
            main_enabled: true,
            limb_velocities: vec![Vec3::ZERO; count],
            simulated: false,
            impulses: Vec::new(),
        }
    }
}

impl PhysicsBody for MockPhysics {
    fn main_velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_main_body_enabled(&mut self, enabled: bool) {
        self.main_enabled = enabled;
    }

    fn limb_count(&self) -> usize {
        self.limb_velocities.len()
    }

    fn set_limbs_simulated(&mut self, simulated: bool) {
        self.simulated = simulated;
    }

    fn apply_limb_impulse(&mut self, limb: usize, impulse: Vec3) {
        self.impulses.push((limb, impulse));
    }

    fn limb_velocity(&self, limb: usize) -> Option<Vec3> {
        self.limb_velocities.get(limb).copied()
    }
}

#[derive(Debug)]
pub struct MockLocomotion {
    pub enabled: bool,
    pub camera_offset: f32,
}

impl Default for MockLocomotion {
    fn default() -> Self {
        Self {
            enabled: true,
            camera_offset: 1.5,
        }
    }
}

impl LocomotionControl for MockLocomotion {
    fn disable_character_control(&mut self) {
        self.enabled = false;
    }

    fn enable_character_control(&mut self) {
        self.enabled = true;
    }

    fn is_movement_enabled(&self) -> bool {
        self.enabled
    }

    fn camera_offset(&self) -> f32 {
        self.camera_offset
    }

    fn set_camera_offset(&mut self, offset: f32) {
        self.camera_offset = offset;
    }
}
