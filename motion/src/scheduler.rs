//! Two-phase frame dispatch.
//!
//! An external driver calls [`FrameScheduler::physics_step`] once per fixed
//! physics tick and [`FrameScheduler::pose_resolve`] once per rendered frame,
//! after animation has been evaluated. Components register with the scheduler
//! instead of being called by the engine directly.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use bevy::log::{debug, warn};
use bevy::transform::components::Transform;

use crate::error::RigError;
use crate::services::{LocomotionControl, PhysicsBody, PoseController, WorldQuery};

/// A component driven by the frame scheduler. Both phases default to no-ops.
pub trait FrameHandler<C> {
    fn on_physics_step(&mut self, _ctx: &mut C, _dt: f32) {}
    fn on_pose_resolve(&mut self, _ctx: &mut C, _dt: f32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Physics,
    PoseResolve,
}

struct Registration<C> {
    name: String,
    handler: Weak<RefCell<dyn FrameHandler<C>>>,
}

/// Holds weak registrations; dropping the last strong handle of a component
/// unregisters it on the next dispatch.
pub struct FrameScheduler<C> {
    registrations: Vec<Registration<C>>,
}

impl<C> Default for FrameScheduler<C> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }
}

impl<C> FrameScheduler<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, name: impl Into<String>, handler: &Rc<RefCell<H>>)
    where
        H: FrameHandler<C> + 'static,
    {
        let handler: Rc<RefCell<dyn FrameHandler<C>>> = handler.clone();
        self.registrations.push(Registration {
            name: name.into(),
            handler: Rc::downgrade(&handler),
        });
    }

    /// Number of registrations whose component is still alive.
    pub fn live_handlers(&self) -> usize {
        self.registrations
            .iter()
            .filter(|registration| registration.handler.strong_count() > 0)
            .count()
    }

    pub fn physics_step(&mut self, ctx: &mut C, dt: f32) {
        self.dispatch(ctx, dt, Phase::Physics);
    }

    pub fn pose_resolve(&mut self, ctx: &mut C, dt: f32) {
        self.dispatch(ctx, dt, Phase::PoseResolve);
    }

    fn dispatch(&mut self, ctx: &mut C, dt: f32, phase: Phase) {
        self.registrations.retain(|registration| {
            let alive = registration.handler.strong_count() > 0;
            if !alive {
                debug!("Dropping frame handler '{}'", registration.name);
            }
            alive
        });

        for registration in &self.registrations {
            let Some(handler) = registration.handler.upgrade() else {
                continue;
            };
            let Ok(mut handler) = handler.try_borrow_mut() else {
                warn!(
                    "Frame handler '{}' is borrowed elsewhere; skipping {:?}",
                    registration.name, phase
                );
                continue;
            };
            match phase {
                Phase::Physics => handler.on_physics_step(ctx, dt),
                Phase::PoseResolve => handler.on_pose_resolve(ctx, dt),
            }
        }
    }
}

/// Per-body context handed to every handler: the body root plus whichever
/// services the host wired up.
pub struct RigContext {
    pub root: Transform,
    pub world: Option<Box<dyn WorldQuery>>,
    pub pose: Option<Box<dyn PoseController>>,
    pub physics: Option<Box<dyn PhysicsBody>>,
    pub locomotion: Option<Box<dyn LocomotionControl>>,
}

impl RigContext {
    pub fn new(root: Transform) -> Self {
        Self {
            root,
            world: None,
            pose: None,
            physics: None,
            locomotion: None,
        }
    }

    pub fn with_world(mut self, world: impl WorldQuery + 'static) -> Self {
        self.world = Some(Box::new(world));
        self
    }

    pub fn with_pose(mut self, pose: impl PoseController + 'static) -> Self {
        self.pose = Some(Box::new(pose));
        self
    }

    pub fn with_physics(mut self, physics: impl PhysicsBody + 'static) -> Self {
        self.physics = Some(Box::new(physics));
        self
    }

    pub fn with_locomotion(mut self, locomotion: impl LocomotionControl + 'static) -> Self {
        self.locomotion = Some(Box::new(locomotion));
        self
    }
}

/// Tracks whether a component found its required services. The first miss
/// is logged and the component stays disabled afterwards.
#[derive(Debug, Clone)]
pub struct DependencyGate {
    component: &'static str,
    disabled: bool,
}

impl DependencyGate {
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            disabled: false,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn require<T>(&mut self, dependency: &'static str, service: Option<T>) -> Option<T> {
        if self.disabled {
            return None;
        }
        if service.is_none() {
            self.disabled = true;
            warn!(
                "{}; procedural layer disabled",
                RigError::missing(self.component, dependency)
            );
        }
        service
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        physics: u32,
        pose: u32,
    }

    impl FrameHandler<Vec<&'static str>> for Counter {
        fn on_physics_step(&mut self, ctx: &mut Vec<&'static str>, _dt: f32) {
            self.physics += 1;
            ctx.push("physics");
        }

        fn on_pose_resolve(&mut self, ctx: &mut Vec<&'static str>, _dt: f32) {
            self.pose += 1;
            ctx.push("pose");
        }
    }

    #[test]
    fn phases_reach_only_their_callback() {
        let counter = Rc::new(RefCell::new(Counter::default()));
        let mut scheduler = FrameScheduler::new();
        scheduler.register("counter", &counter);

        let mut log = Vec::new();
        scheduler.physics_step(&mut log, 0.02);
        scheduler.physics_step(&mut log, 0.02);
        scheduler.pose_resolve(&mut log, 0.016);

        assert_eq!(counter.borrow().physics, 2);
        assert_eq!(counter.borrow().pose, 1);
        assert_eq!(log, vec!["physics", "physics", "pose"]);
    }

    #[test]
    fn dropped_handlers_are_pruned() {
        let counter = Rc::new(RefCell::new(Counter::default()));
        let mut scheduler = FrameScheduler::new();
        scheduler.register("counter", &counter);
        assert_eq!(scheduler.live_handlers(), 1);

        drop(counter);
        let mut log = Vec::new();
        scheduler.physics_step(&mut log, 0.02);
        assert!(log.is_empty());
        assert_eq!(scheduler.live_handlers(), 0);
    }

    #[test]
    fn borrowed_handler_is_skipped() {
        let counter = Rc::new(RefCell::new(Counter::default()));
        let mut scheduler = FrameScheduler::new();
        scheduler.register("counter", &counter);

        let mut log = Vec::new();
        {
            let _held = counter.borrow();
            scheduler.physics_step(&mut log, 0.02);
        }
        assert!(log.is_empty());
        scheduler.physics_step(&mut log, 0.02);
        assert_eq!(counter.borrow().physics, 1);
    }

    #[test]
    fn gate_disables_after_first_miss() {
        let mut gate = DependencyGate::new("probe");
        assert_eq!(gate.require("world", Some(1)), Some(1));
        assert_eq!(gate.require::<i32>("world", None), None);
        assert!(gate.is_disabled());
        assert_eq!(gate.require("world", Some(1)), None);
    }
}
