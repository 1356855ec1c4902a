//! A stand-in animated character: a rigid rest pose carried by the body
//! root, a single-velocity ragdoll and a toggleable character controller,
//! all behind the service traits the rig components talk to.

use std::cell::RefCell;
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use bevy::math::{Quat, Vec3};
use bevy::transform::components::Transform;
use common::{Effector, HumanBone, LayerMask};
use motion::{
    BoneId, LocomotionControl, PhysicsBody, PoseController, RigDescriptor, RigSettings, WorldQuery,
};

const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
/// Height of the hips above the floor once the ragdoll lies down.
const LYING_HIPS_HEIGHT: f32 = 0.15;
const GROUND_FRICTION: f32 = 0.8;
const CLIP_LENGTH_SECS: f32 = 1.5;
const DEFAULT_CAMERA_OFFSET: f32 = 1.6;
const LIMB_COUNT: usize = 11;

/// Standing rest pose relative to the body root, which sits between the
/// feet. Facing -Z.
fn rest_offset(bone: HumanBone) -> Vec3 {
    match bone {
        HumanBone::Hips => Vec3::new(0.0, 1.0, 0.0),
        HumanBone::Spine => Vec3::new(0.0, 1.1, 0.0),
        HumanBone::Chest => Vec3::new(0.0, 1.25, 0.0),
        HumanBone::UpperChest => Vec3::new(0.0, 1.4, 0.0),
        HumanBone::Neck => Vec3::new(0.0, 1.6, 0.0),
        HumanBone::Head => Vec3::new(0.0, 1.7, 0.0),
        HumanBone::LeftShoulder => Vec3::new(-0.1, 1.5, 0.0),
        HumanBone::LeftUpperArm => Vec3::new(-0.2, 1.45, 0.0),
        HumanBone::LeftLowerArm => Vec3::new(-0.25, 1.2, 0.0),
        HumanBone::LeftHand => Vec3::new(-0.27, 0.95, 0.0),
        HumanBone::RightShoulder => Vec3::new(0.1, 1.5, 0.0),
        HumanBone::RightUpperArm => Vec3::new(0.2, 1.45, 0.0),
        HumanBone::RightLowerArm => Vec3::new(0.25, 1.2, 0.0),
        HumanBone::RightHand => Vec3::new(0.27, 0.95, 0.0),
        HumanBone::LeftUpperLeg => Vec3::new(-0.1, 0.95, 0.0),
        HumanBone::LeftLowerLeg => Vec3::new(-0.1, 0.5, 0.0),
        HumanBone::LeftFoot => Vec3::new(-0.1, 0.08, 0.0),
        HumanBone::LeftToes => Vec3::new(-0.1, 0.0, -0.12),
        HumanBone::RightUpperLeg => Vec3::new(0.1, 0.95, 0.0),
        HumanBone::RightLowerLeg => Vec3::new(0.1, 0.5, 0.0),
        HumanBone::RightFoot => Vec3::new(0.1, 0.08, 0.0),
        HumanBone::RightToes => Vec3::new(0.1, 0.0, -0.12),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EffectorOverride {
    pub position: Vec3,
    pub rotation: Quat,
    pub position_weight: f32,
    pub rotation_weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayingClip {
    pub name: String,
    pub layer: usize,
    pub normalized_time: f32,
}

#[derive(Debug)]
pub struct PuppetState {
    rig: RigDescriptor,
    hips: Option<BoneId>,
    /// Mirrors the body root; refreshed before every dispatch.
    pub root: Transform,
    rest: Vec<Transform>,
    pub overrides: HashMap<BoneId, Transform>,
    pub effectors: HashMap<Effector, EffectorOverride>,
    layers: HashMap<String, f32>,
    parameters: HashMap<String, f32>,
    pub animation_enabled: bool,
    pub clip: Option<PlayingClip>,
    clip_finished: bool,
    pub triggers: Vec<String>,

    pub velocity: Vec3,
    pub main_body_enabled: bool,
    pub limbs_simulated: bool,
    pub limb_velocities: Vec<Vec3>,
    ragdoll_hips: Transform,
    grounded: bool,

    pub control_enabled: bool,
    pub camera_offset: f32,
}

impl PuppetState {
    pub fn new(rig: &RigDescriptor, settings: &RigSettings, root: Transform) -> Self {
        let rest = rig
            .ids()
            .map(|id| {
                rig.bone(id)
                    .and_then(|bone| bone.semantic)
                    .map(|semantic| Transform::from_translation(rest_offset(semantic)))
                    .unwrap_or_default()
            })
            .collect();

        let mut layers = HashMap::new();
        layers.insert(settings.hand.crouch_layer.clone(), 0.0);
        let mut parameters = HashMap::new();
        parameters.insert(settings.foot.left_weight_parameter.clone(), 1.0);
        parameters.insert(settings.foot.right_weight_parameter.clone(), 1.0);

        Self {
            rig: rig.clone(),
            hips: rig.semantic(HumanBone::Hips),
            root,
            rest,
            overrides: HashMap::new(),
            effectors: HashMap::new(),
            layers,
            parameters,
            animation_enabled: true,
            clip: None,
            clip_finished: false,
            triggers: Vec::new(),
            velocity: Vec3::ZERO,
            main_body_enabled: true,
            limbs_simulated: false,
            limb_velocities: vec![Vec3::ZERO; LIMB_COUNT],
            ragdoll_hips: Transform::IDENTITY,
            grounded: false,
            control_enabled: true,
            camera_offset: DEFAULT_CAMERA_OFFSET,
        }
    }

    pub fn rig(&self) -> &RigDescriptor {
        &self.rig
    }

    fn animated(&self, bone: BoneId) -> Option<Transform> {
        let local = self.rest.get(bone.index())?;
        Some(self.root.mul_transform(*local))
    }

    /// Bone carried rigidly by the simulated hips.
    fn ragdolled(&self, bone: BoneId) -> Option<Transform> {
        let local = self.rest.get(bone.index())?;
        let hips = self.rest.get(self.hips?.index())?;
        let inverse = hips.rotation.inverse();
        let relative = Transform {
            translation: inverse * (local.translation - hips.translation),
            rotation: inverse * local.rotation,
            scale: local.scale,
        };
        Some(self.ragdoll_hips.mul_transform(relative))
    }

    /// Starts a new animation frame: drops last frame's overrides and
    /// advances the playing clip. Returns true the frame the clip ends.
    pub fn sample_animation(&mut self, dt: f32) -> bool {
        self.overrides.clear();
        let Some(clip) = self.clip.as_mut() else {
            return false;
        };
        clip.normalized_time += dt / CLIP_LENGTH_SECS;
        if clip.normalized_time < 1.0 || self.clip_finished {
            return false;
        }
        self.clip_finished = true;
        self.clip = None;
        true
    }

    /// Advances the ragdoll, if simulated, by one physics step.
    pub fn integrate(&mut self, dt: f32, world: &dyn WorldQuery) {
        if !self.limbs_simulated {
            return;
        }
        for velocity in &mut self.limb_velocities {
            *velocity += GRAVITY * dt;
        }
        let Some(reference) = self.limb_velocities.first().copied() else {
            return;
        };

        let mut hips = self.ragdoll_hips.translation + reference * dt;
        let floor = world
            .raycast(hips + Vec3::Y, Vec3::NEG_Y, 10.0, LayerMask::ALL.without(LayerMask::RAGDOLL))
            .map_or(0.0, |hit| hit.point.y);
        if hips.y <= floor + LYING_HIPS_HEIGHT {
            hips.y = floor + LYING_HIPS_HEIGHT;
            if !self.grounded {
                self.ragdoll_hips.rotation = self.lying_rotation(reference);
                self.grounded = true;
            }
            for velocity in &mut self.limb_velocities {
                velocity.y = 0.0;
                velocity.x *= GROUND_FRICTION;
                velocity.z *= GROUND_FRICTION;
            }
        }
        self.ragdoll_hips.translation = hips;
    }

    /// Falls on the face when carried forward, on the back otherwise.
    fn lying_rotation(&self, velocity: Vec3) -> Quat {
        let forward = velocity.dot(*self.root.forward()) >= 0.0;
        let pitch = if forward { -FRAC_PI_2 } else { FRAC_PI_2 };
        self.ragdoll_hips.rotation * Quat::from_rotation_x(pitch)
    }
}

/// Shared handle to a puppet. The service adapters each hold a clone.
#[derive(Debug, Clone)]
pub struct Puppet(Rc<RefCell<PuppetState>>);

impl Puppet {
    pub fn new(rig: &RigDescriptor, settings: &RigSettings, root: Transform) -> Self {
        Self(Rc::new(RefCell::new(PuppetState::new(rig, settings, root))))
    }

    pub fn state(&self) -> std::cell::Ref<'_, PuppetState> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> std::cell::RefMut<'_, PuppetState> {
        self.0.borrow_mut()
    }

    pub fn pose(&self) -> PuppetPose {
        PuppetPose(self.clone())
    }

    pub fn physics(&self) -> PuppetPhysics {
        PuppetPhysics(self.clone())
    }

    pub fn locomotion(&self) -> PuppetLocomotion {
        PuppetLocomotion(self.clone())
    }
}

pub struct PuppetPose(Puppet);
pub struct PuppetPhysics(Puppet);
pub struct PuppetLocomotion(Puppet);

impl PoseController for PuppetPose {
    fn effector_goal(&self, effector: Effector) -> Vec3 {
        let state = self.0.state();
        state
            .rig
            .semantic(effector.bone())
            .and_then(|bone| state.animated(bone))
            .map_or(state.root.translation, |transform| transform.translation)
    }

    fn set_effector_position(&mut self, effector: Effector, position: Vec3) {
        self.0.state_mut().effectors.entry(effector).or_default().position = position;
    }

    fn set_effector_rotation(&mut self, effector: Effector, rotation: Quat) {
        self.0.state_mut().effectors.entry(effector).or_default().rotation = rotation;
    }

    fn set_effector_weight(&mut self, effector: Effector, position_weight: f32, rotation_weight: f32) {
        let mut state = self.0.state_mut();
        let target = state.effectors.entry(effector).or_default();
        target.position_weight = position_weight;
        target.rotation_weight = rotation_weight;
    }

    fn bone_world_transform(&self, bone: BoneId) -> Option<Transform> {
        let state = self.0.state();
        if state.animation_enabled {
            state.animated(bone)
        } else {
            state.ragdolled(bone)
        }
    }

    fn override_bone(&mut self, bone: BoneId, transform: Transform) {
        self.0.state_mut().overrides.insert(bone, transform);
    }

    fn set_layer_weight(&mut self, layer: &str, weight: f32) {
        self.0.state_mut().layers.insert(layer.to_string(), weight);
    }

    fn layer_weight(&self, layer: &str) -> Option<f32> {
        self.0.state().layers.get(layer).copied()
    }

    fn has_parameter(&self, name: &str) -> bool {
        self.0.state().parameters.contains_key(name)
    }

    fn float_parameter(&self, name: &str) -> f32 {
        self.0.state().parameters.get(name).copied().unwrap_or(0.0)
    }

    fn play_clip(&mut self, name: &str, layer: usize, normalized_time: f32) {
        let mut state = self.0.state_mut();
        state.clip = Some(PlayingClip {
            name: name.to_string(),
            layer,
            normalized_time,
        });
        state.clip_finished = false;
    }

    fn set_trigger(&mut self, name: &str) {
        self.0.state_mut().triggers.push(name.to_string());
    }

    fn set_animation_enabled(&mut self, enabled: bool) {
        self.0.state_mut().animation_enabled = enabled;
    }
}

impl PhysicsBody for PuppetPhysics {
    fn main_velocity(&self) -> Vec3 {
        self.0.state().velocity
    }

    fn set_main_body_enabled(&mut self, enabled: bool) {
        self.0.state_mut().main_body_enabled = enabled;
    }

    fn limb_count(&self) -> usize {
        self.0.state().limb_velocities.len()
    }

    fn set_limbs_simulated(&mut self, simulated: bool) {
        let mut state = self.0.state_mut();
        if simulated && !state.limbs_simulated {
            let hips = state.hips.and_then(|bone| state.animated(bone));
            state.ragdoll_hips = hips.unwrap_or(state.root);
            state.limb_velocities.fill(Vec3::ZERO);
            state.grounded = false;
        }
        state.limbs_simulated = simulated;
    }

    fn apply_limb_impulse(&mut self, limb: usize, impulse: Vec3) {
        if let Some(velocity) = self.0.state_mut().limb_velocities.get_mut(limb) {
            *velocity += impulse;
        }
    }

    fn limb_velocity(&self, limb: usize) -> Option<Vec3> {
        self.0.state().limb_velocities.get(limb).copied()
    }
}

impl LocomotionControl for PuppetLocomotion {
    fn disable_character_control(&mut self) {
        let mut state = self.0.state_mut();
        state.control_enabled = false;
        state.velocity = Vec3::ZERO;
    }

    fn enable_character_control(&mut self) {
        self.0.state_mut().control_enabled = true;
    }

    fn is_movement_enabled(&self) -> bool {
        self.0.state().control_enabled
    }

    fn camera_offset(&self) -> f32 {
        self.0.state().camera_offset
    }

    fn set_camera_offset(&mut self, offset: f32) {
        self.0.state_mut().camera_offset = offset;
    }
}
