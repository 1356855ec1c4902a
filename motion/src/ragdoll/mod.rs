//! Ragdoll recovery: hands the skeleton to physics on impact and blends it
//! back into animation once the body has settled.
//!
//! Phases only ever advance Animating -> Ragdolling -> Blending -> Animating.
//! Transition requests are queued and applied on the next physics step, where
//! the services they need are available.

use std::fmt;

use bevy::log::{debug, info};
use bevy::math::{Quat, Vec3};
use bevy::transform::components::Transform;
use common::HumanBone;

use crate::error::RigError;
use crate::math::yaw_between;
use crate::scheduler::{DependencyGate, FrameHandler, RigContext};
use crate::services::{LocomotionControl, PhysicsBody, PoseController, WorldQuery};
use crate::settings::RagdollConfig;
use crate::skeleton::{BoneId, RigDescriptor, StoredPose};

/// Limb whose vertical speed decides whether the body has come to rest.
const REFERENCE_LIMB: usize = 0;
/// Blend weights at or below this are treated as fully animated.
const BLEND_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RagdollPhase {
    #[default]
    Animating,
    Ragdolling,
    Blending,
}

impl RagdollPhase {
    pub fn name(&self) -> &'static str {
        match self {
            RagdollPhase::Animating => "animating",
            RagdollPhase::Ragdolling => "ragdolling",
            RagdollPhase::Blending => "blending",
        }
    }
}

impl fmt::Display for RagdollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Borrowed services for one controller tick.
pub struct RagdollServices<'a> {
    pub world: &'a dyn WorldQuery,
    pub pose: &'a mut dyn PoseController,
    pub physics: &'a mut dyn PhysicsBody,
    pub locomotion: &'a mut dyn LocomotionControl,
}

/// Landmarks of the settled ragdoll used to place the recovering character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmarks {
    pub hips: Vec3,
    pub head: Vec3,
    /// Midpoint of the toes.
    pub feet: Vec3,
    pub face_up: bool,
}

#[derive(Debug, Clone, Copy)]
struct KeyBones {
    root: BoneId,
    hips: BoneId,
    head: BoneId,
    left_toes: BoneId,
    right_toes: BoneId,
}

pub struct RagdollController {
    config: RagdollConfig,
    rig: RigDescriptor,
    bones: KeyBones,
    phase: RagdollPhase,
    requested: Option<bool>,
    rest_time: f32,
    blend_elapsed: f32,
    blend_weight: f32,
    stored: Option<StoredPose>,
    landmarks: Option<Landmarks>,
    clip_finished: bool,
    saved_camera_offset: Option<f32>,
    gate: DependencyGate,
}

impl RagdollController {
    pub fn new(config: RagdollConfig, rig: &RigDescriptor) -> Result<Self, RigError> {
        let bones = KeyBones {
            root: rig.root().ok_or(RigError::missing("ragdoll controller", "root bone"))?,
            hips: rig.require(HumanBone::Hips)?,
            head: rig.require(HumanBone::Head)?,
            left_toes: rig.require(HumanBone::LeftToes)?,
            right_toes: rig.require(HumanBone::RightToes)?,
        };

        Ok(Self {
            config: config.sanitized(),
            rig: rig.clone(),
            bones,
            phase: RagdollPhase::Animating,
            requested: None,
            rest_time: 0.0,
            blend_elapsed: 0.0,
            blend_weight: 0.0,
            stored: None,
            landmarks: None,
            clip_finished: false,
            saved_camera_offset: None,
            gate: DependencyGate::new("ragdoll controller"),
        })
    }

    pub fn phase(&self) -> RagdollPhase {
        self.phase
    }

    /// Weight of the stored ragdoll pose over the animated pose; 1 while
    /// ragdolling, decaying to 0 during the blend.
    pub fn blend_weight(&self) -> f32 {
        self.blend_weight
    }

    pub fn stored_pose(&self) -> Option<&StoredPose> {
        self.stored.as_ref()
    }

    pub fn landmarks(&self) -> Option<&Landmarks> {
        self.landmarks.as_ref()
    }

    pub fn config(&self) -> &RagdollConfig {
        &self.config
    }

    /// Queues a switch to (or away from) physics control. A request that
    /// matches the current phase is ignored.
    pub fn set_ragdoll(&mut self, on: bool) {
        self.requested = Some(on);
    }

    pub fn toggle(&mut self) {
        let ragdolled = self.requested.unwrap_or(self.phase == RagdollPhase::Ragdolling);
        self.set_ragdoll(!ragdolled);
    }

    pub fn request_stand_up(&mut self) {
        if self.phase == RagdollPhase::Ragdolling {
            self.set_ragdoll(false);
        }
    }

    /// Exit notification from the get-up clip.
    pub fn recovery_clip_finished(&mut self) {
        if self.phase == RagdollPhase::Blending {
            self.clip_finished = true;
        }
    }

    pub fn physics_tick(&mut self, root: &mut Transform, dt: f32, services: &mut RagdollServices<'_>) {
        let request = self.requested.take();
        match self.phase {
            RagdollPhase::Animating => {
                if request == Some(true) {
                    self.knock_down(services);
                }
            }
            RagdollPhase::Ragdolling => {
                if let Some(hips) = services.pose.bone_world_transform(self.bones.hips) {
                    root.translation = hips.translation;
                }

                let settled = self.is_settled(&*services.physics);
                self.rest_time = if settled { self.rest_time + dt } else { 0.0 };

                let wants_up = match request {
                    Some(false) => true,
                    _ => !self.config.press_to_stand && self.rest_time >= self.config.min_time_to_stand,
                };
                if wants_up {
                    if settled {
                        self.begin_recovery(services);
                    } else {
                        debug!("Stand-up refused: body still moving");
                    }
                }
            }
            RagdollPhase::Blending => {
                if request.is_some() {
                    debug!("Ragdoll request ignored while blending");
                }
            }
        }
    }

    pub fn resolve_pose(&mut self, root: &mut Transform, dt: f32, services: &mut RagdollServices<'_>) {
        if self.phase != RagdollPhase::Blending {
            return;
        }

        self.blend_elapsed += dt;
        if self.blend_elapsed <= self.config.get_up_window {
            self.correct_root(root, services);
        }

        let progress = (self.blend_elapsed - self.config.get_up_window) / self.config.blend_duration;
        let mut weight = (1.0 - progress).clamp(0.0, 1.0);
        if weight <= BLEND_EPSILON {
            weight = 0.0;
        }
        self.blend_weight = weight;

        if weight > 0.0 {
            self.blend_bones(weight, &mut *services.pose);
            return;
        }

        if self.config.wait_for_recovery_clip && !self.clip_finished {
            return;
        }
        self.finish_recovery(&mut *services.locomotion);
    }

    fn is_settled(&self, physics: &dyn PhysicsBody) -> bool {
        physics
            .limb_velocity(REFERENCE_LIMB)
            .is_some_and(|velocity| velocity.y.abs() < self.config.rest_velocity_threshold)
    }

    fn knock_down(&mut self, services: &mut RagdollServices<'_>) {
        if !services.locomotion.is_movement_enabled() {
            debug!("Ragdoll request ignored: movement already disabled");
            return;
        }

        let mut velocity = services.physics.main_velocity();
        if velocity.y.abs() < self.config.vertical_deadzone {
            velocity.y = 0.0;
        }

        services.locomotion.disable_character_control();
        services.pose.set_animation_enabled(false);
        services.physics.set_main_body_enabled(false);
        services.physics.set_limbs_simulated(true);

        let impulse = velocity * self.config.impulse_multiplier;
        for limb in 0..services.physics.limb_count() {
            services.physics.apply_limb_impulse(limb, impulse);
        }

        if let Some(offset) = self.config.ragdoll_camera_offset {
            self.saved_camera_offset = Some(services.locomotion.camera_offset());
            services.locomotion.set_camera_offset(offset);
        }

        self.rest_time = 0.0;
        self.blend_weight = 1.0;
        self.phase = RagdollPhase::Ragdolling;
        info!("Ragdoll on, impulse {:?}", impulse);
    }

    fn begin_recovery(&mut self, services: &mut RagdollServices<'_>) {
        let pose = &*services.pose;
        let stored = StoredPose::capture(&self.rig, |bone| pose.bone_world_transform(bone));
        let landmarks = self.landmarks_of(&stored);

        services.physics.set_limbs_simulated(false);
        services.physics.set_main_body_enabled(true);
        services.pose.set_animation_enabled(true);

        let clip = match landmarks {
            Some(landmarks) if !landmarks.face_up => &self.config.get_up_from_front,
            _ => &self.config.get_up_from_back,
        };
        services.pose.play_clip(clip, self.config.recovery_layer, 0.0);
        info!("Ragdoll settled, recovering with '{}'", clip);

        self.stored = Some(stored);
        self.landmarks = landmarks;
        self.blend_elapsed = 0.0;
        self.blend_weight = 1.0;
        self.clip_finished = false;
        self.phase = RagdollPhase::Blending;
    }

    fn landmarks_of(&self, stored: &StoredPose) -> Option<Landmarks> {
        let hips = stored.get(self.bones.hips)?;
        let head = stored.get(self.bones.head)?;
        let left = stored.get(self.bones.left_toes)?;
        let right = stored.get(self.bones.right_toes)?;
        Some(Landmarks {
            hips: hips.translation,
            head: head.translation,
            feet: (left.translation + right.translation) * 0.5,
            face_up: hips.forward().y > 0.0,
        })
    }

    /// Drags the animated hips onto the ragdoll's hips and turns the root
    /// about +Y so the animated body lies along the ragdoll.
    fn correct_root(&self, root: &mut Transform, services: &mut RagdollServices<'_>) {
        let (Some(landmarks), Some(animated_hips)) = (
            self.landmarks,
            services.pose.bone_world_transform(self.bones.hips),
        ) else {
            return;
        };

        let mut position = root.translation + (landmarks.hips - animated_hips.translation);
        let probe = self.config.ground_probe_height;
        if let Some(hit) = services.world.raycast(
            position + Vec3::Y * probe,
            Vec3::NEG_Y,
            probe * 2.0,
            self.config.environment_mask,
        ) {
            position.y = hit.point.y;
        }
        root.translation = position;

        let pose = &*services.pose;
        let (Some(head), Some(left), Some(right)) = (
            pose.bone_world_transform(self.bones.head),
            pose.bone_world_transform(self.bones.left_toes),
            pose.bone_world_transform(self.bones.right_toes),
        ) else {
            return;
        };
        let animated = head.translation - (left.translation + right.translation) * 0.5;
        let ragdolled = landmarks.head - landmarks.feet;
        let yaw = yaw_between(animated, ragdolled);
        root.rotation = Quat::from_rotation_y(yaw) * root.rotation;
    }

    fn blend_bones(&self, weight: f32, pose: &mut dyn PoseController) {
        let Some(stored) = self.stored.as_ref() else {
            return;
        };
        for bone in self.rig.ids() {
            if bone == self.bones.root {
                continue;
            }
            let (Some(target), Some(animated)) = (stored.get(bone), pose.bone_world_transform(bone))
            else {
                continue;
            };
            let blended = Transform {
                translation: animated.translation.lerp(target.translation, weight),
                rotation: animated.rotation.slerp(target.rotation, weight),
                scale: animated.scale,
            };
            pose.override_bone(bone, blended);
        }
    }

    fn finish_recovery(&mut self, locomotion: &mut dyn LocomotionControl) {
        locomotion.enable_character_control();
        if let Some(offset) = self.saved_camera_offset.take() {
            locomotion.set_camera_offset(offset);
        }
        self.stored = None;
        self.landmarks = None;
        self.clip_finished = false;
        self.phase = RagdollPhase::Animating;
        info!("Ragdoll recovery complete");
    }
}

impl FrameHandler<RigContext> for RagdollController {
    fn on_physics_step(&mut self, ctx: &mut RigContext, dt: f32) {
        let RigContext {
            root,
            world,
            pose,
            physics,
            locomotion,
        } = ctx;
        let Some(mut services) = self.services(world, pose, physics, locomotion) else {
            return;
        };
        self.physics_tick(root, dt, &mut services);
    }

    fn on_pose_resolve(&mut self, ctx: &mut RigContext, dt: f32) {
        let RigContext {
            root,
            world,
            pose,
            physics,
            locomotion,
        } = ctx;
        let Some(mut services) = self.services(world, pose, physics, locomotion) else {
            return;
        };
        self.resolve_pose(root, dt, &mut services);
    }
}

impl RagdollController {
    fn services<'a>(
        &mut self,
        world: &'a Option<Box<dyn WorldQuery>>,
        pose: &'a mut Option<Box<dyn PoseController>>,
        physics: &'a mut Option<Box<dyn PhysicsBody>>,
        locomotion: &'a mut Option<Box<dyn LocomotionControl>>,
    ) -> Option<RagdollServices<'a>> {
        let world = self.gate.require("world query", world.as_deref())?;
        let pose = self.gate.require("pose controller", pose.as_deref_mut())?;
        let physics = self.gate.require("physics body", physics.as_deref_mut())?;
        let locomotion = self
            .gate
            .require("locomotion controller", locomotion.as_deref_mut())?;
        Some(RagdollServices {
            world,
            pose,
            physics,
            locomotion,
        })
    }
}
