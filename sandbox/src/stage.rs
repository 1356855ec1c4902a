//! The bodies living in the sandbox and the per-frame work done on them.

use std::cell::RefCell;
use std::rc::Rc;

use bevy::log::{error, info};
use bevy::math::Vec3;
use bevy::transform::components::Transform;
use common::{Effector, LayerMask};
use motion::{
    FrameScheduler, GaitSolver, HumanoidIk, RagdollController, RagdollPhase, RigContext,
    RigDescriptor, TransformHandle,
};

use crate::SandboxError;
use crate::puppet::Puppet;
use crate::settings::SandboxSettings;
use crate::world::SandboxWorld;

pub const LOOK_TAG: &str = "orb";
const ORB_RADIUS: f32 = 0.2;
const CRAWLER_HEIGHT: f32 = 0.5;
const CRAWLER_REACH: f32 = 0.6;

/// Four-legged body moved by a scripted driver; the gait solver places its feet.
pub struct CrawlerBody {
    pub ctx: RigContext,
    pub scheduler: FrameScheduler<RigContext>,
    pub gait: Rc<RefCell<GaitSolver>>,
}

impl CrawlerBody {
    fn new(settings: &SandboxSettings, world: &SandboxWorld) -> Result<Self, SandboxError> {
        let root = Transform::from_xyz(3.5, CRAWLER_HEIGHT, 0.0);
        let feet: Vec<Vec3> = [(-1.0, 1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, -1.0)]
            .into_iter()
            .map(|(x, z)| {
                root.translation + Vec3::new(x * CRAWLER_REACH, -CRAWLER_HEIGHT, z * CRAWLER_REACH)
            })
            .collect();
        let gait = Rc::new(RefCell::new(GaitSolver::new(
            settings.rig.gait,
            &root,
            &feet,
        )?));

        let mut scheduler = FrameScheduler::new();
        scheduler.register("crawler gait", &gait);
        Ok(Self {
            ctx: RigContext::new(root).with_world(world.clone()),
            scheduler,
            gait,
        })
    }

    fn drive(&mut self, settings: &SandboxSettings, world: &SandboxWorld, dt: f32) {
        let root = &mut self.ctx.root;
        root.rotate_y(settings.run.crawler_turn_rate * dt);
        let heading = *root.forward();
        root.translation += heading * settings.run.walk_speed * dt;
        if let Some(ground) = world.ground_height(root.translation, LayerMask::ALL) {
            root.translation.y = ground + CRAWLER_HEIGHT;
        }
    }
}

/// Humanoid with limb aimers and a ragdoll, animated by a [`Puppet`].
pub struct BipedBody {
    pub ctx: RigContext,
    pub scheduler: FrameScheduler<RigContext>,
    pub puppet: Puppet,
    pub ik: Rc<RefCell<HumanoidIk>>,
    pub ragdoll: Rc<RefCell<RagdollController>>,
    pending_push: Option<Vec3>,
    last_phase: RagdollPhase,
}

impl BipedBody {
    fn new(
        settings: &SandboxSettings,
        world: &SandboxWorld,
        rig: &RigDescriptor,
    ) -> Result<Self, SandboxError> {
        let root = Transform::IDENTITY;
        let ragdoll = Rc::new(RefCell::new(RagdollController::new(
            settings.rig.ragdoll.clone(),
            rig,
        )?));
        let puppet = Puppet::new(rig, &settings.rig, root);
        let ik = Rc::new(RefCell::new(HumanoidIk::new(&settings.rig, rig)));

        let mut scheduler = FrameScheduler::new();
        scheduler.register("biped ragdoll", &ragdoll);
        scheduler.register("biped ik", &ik);
        let ctx = RigContext::new(root)
            .with_world(world.clone())
            .with_pose(puppet.pose())
            .with_physics(puppet.physics())
            .with_locomotion(puppet.locomotion());

        Ok(Self {
            ctx,
            scheduler,
            puppet,
            ik,
            ragdoll,
            pending_push: None,
            last_phase: RagdollPhase::Animating,
        })
    }

    pub fn knock_down(&mut self, push: Vec3) {
        self.pending_push = Some(push);
        self.ragdoll.borrow_mut().set_ragdoll(true);
    }

    fn drive(&mut self, settings: &SandboxSettings, dt: f32) {
        let mut state = self.puppet.state_mut();
        let mut velocity = if state.control_enabled {
            *self.ctx.root.forward() * settings.run.walk_speed
        } else {
            Vec3::ZERO
        };
        if let Some(push) = self.pending_push.take() {
            velocity += push;
        }
        if state.control_enabled {
            self.ctx.root.translation += velocity * dt;
        }
        state.velocity = velocity;
        state.root = self.ctx.root;
        if let Some(world) = self.ctx.world.as_deref() {
            state.integrate(dt, world);
        }
    }

    fn sync_root(&self) {
        self.puppet.state_mut().root = self.ctx.root;
    }

    fn report_phase(&mut self) {
        let phase = self.ragdoll.borrow().phase();
        if phase != self.last_phase {
            info!("Biped {} -> {}", self.last_phase, phase);
            match phase {
                RagdollPhase::Ragdolling => self.ik.borrow_mut().disable_all(),
                RagdollPhase::Animating => self.ik.borrow_mut().enable_all(),
                RagdollPhase::Blending => {}
            }
            self.last_phase = phase;
        }
    }
}

/// Bodies that failed to assemble are logged and left out; the rest run.
pub struct Stage {
    pub crawler: Option<CrawlerBody>,
    pub biped: Option<BipedBody>,
    pub world: SandboxWorld,
    pub look_target: TransformHandle,
    clock: f32,
}

fn built_or_logged<T>(name: &str, built: Result<T, SandboxError>) -> Option<T> {
    match built {
        Ok(body) => Some(body),
        Err(failure) => {
            error!("Sandbox {} left out: {}", name, failure);
            None
        }
    }
}

impl Stage {
    pub fn with_biped_rig(settings: &SandboxSettings, rig: &RigDescriptor) -> Self {
        let look_target = TransformHandle::default();
        let world = SandboxWorld::demo().with_marker(
            &look_target,
            ORB_RADIUS,
            LayerMask::PROP,
            LOOK_TAG,
        );
        let stage = Self {
            crawler: built_or_logged("crawler", CrawlerBody::new(settings, &world)),
            biped: built_or_logged("biped", BipedBody::new(settings, &world, rig)),
            world,
            look_target,
            clock: 0.0,
        };
        stage.move_look_target();
        stage
    }

    /// Scripted movement followed by the physics phase of every body.
    pub fn physics_step(&mut self, settings: &SandboxSettings, dt: f32) {
        self.clock += dt;
        self.move_look_target();

        if let Some(crawler) = self.crawler.as_mut() {
            crawler.drive(settings, &self.world, dt);
            crawler.scheduler.physics_step(&mut crawler.ctx, dt);
        }

        if let Some(biped) = self.biped.as_mut() {
            biped.drive(settings, dt);
            biped.scheduler.physics_step(&mut biped.ctx, dt);
            biped.sync_root();
            biped.report_phase();
        }
    }

    /// Starts a new animation frame on the puppet.
    pub fn sample_animation(&mut self, dt: f32) {
        let Some(biped) = self.biped.as_mut() else {
            return;
        };
        let clip_ended = biped.puppet.state_mut().sample_animation(dt);
        if clip_ended {
            biped.ragdoll.borrow_mut().recovery_clip_finished();
        }
    }

    pub fn pose_resolve(&mut self, dt: f32) {
        if let Some(crawler) = self.crawler.as_mut() {
            crawler.scheduler.pose_resolve(&mut crawler.ctx, dt);
        }

        if let Some(biped) = self.biped.as_mut() {
            biped.sync_root();
            biped.scheduler.pose_resolve(&mut biped.ctx, dt);
            biped.sync_root();
            biped.report_phase();
        }
    }

    pub fn start_looking(&mut self) {
        let Some(biped) = self.biped.as_ref() else {
            return;
        };
        if let Some(head) = biped.ik.borrow_mut().head.as_mut() {
            head.register_look_target(&self.look_target, 1.0, LOOK_TAG);
        }
    }

    pub fn stop_looking(&mut self) {
        let Some(biped) = self.biped.as_ref() else {
            return;
        };
        if let Some(head) = biped.ik.borrow_mut().head.as_mut() {
            head.clear_look_target(LOOK_TAG);
        }
    }

    pub fn knock_down(&mut self, push: Vec3) {
        if let Some(biped) = self.biped.as_mut() {
            biped.knock_down(push);
        }
    }

    pub fn request_stand_up(&mut self) {
        if let Some(biped) = self.biped.as_ref() {
            biped.ragdoll.borrow_mut().request_stand_up();
        }
    }

    /// Keeps the orb hovering ahead and to the left of the biped, away
    /// from the wall on its right.
    fn move_look_target(&self) {
        let sway = (self.clock * 0.8).sin() * 0.5;
        let anchor = self
            .biped
            .as_ref()
            .map_or(Vec3::ZERO, |biped| biped.ctx.root.translation);
        self.look_target.set(Transform::from_translation(Vec3::new(
            anchor.x - 1.5 + sway,
            1.6,
            anchor.z - 3.0,
        )));
    }

    pub fn summary(&self) -> String {
        let crawler = match &self.crawler {
            Some(crawler) => {
                let gait = crawler.gait.borrow();
                format!(
                    "crawler at {:.2?} (stepping {:?}, feet {:.2?})",
                    crawler.ctx.root.translation,
                    gait.stepping_leg(),
                    gait.leg_targets(),
                )
            }
            None => "no crawler".to_string(),
        };
        let biped = match &self.biped {
            Some(biped) => {
                let ik = biped.ik.borrow();
                format!(
                    "biped at {:.2?} ({}), hand weights {:.2}/{:.2}, head {:.2}",
                    biped.ctx.root.translation,
                    biped.ragdoll.borrow().phase(),
                    ik.weight(Effector::LeftHand),
                    ik.weight(Effector::RightHand),
                    ik.weight(Effector::Head),
                )
            }
            None => "no biped".to_string(),
        };
        format!("{crawler}, {biped}")
    }
}
