use bevy::log::{info, warn};
use bevy::transform::components::Transform;
use common::{Effector, Side};

use super::{FootAimer, HandAimer, HeadAimer};
use crate::error::RigError;
use crate::scheduler::{DependencyGate, FrameHandler, RigContext};
use crate::services::{PoseController, WorldQuery};
use crate::settings::RigSettings;
use crate::skeleton::RigDescriptor;

/// The five limb aimers of one humanoid, resolved together after animation.
///
/// Hand and head aimers start from a mapped bone. When the rig lacks it that
/// aimer is left out and reports zero weight; the others keep working.
pub struct HumanoidIk {
    pub left_foot: FootAimer,
    pub right_foot: FootAimer,
    pub left_hand: Option<HandAimer>,
    pub right_hand: Option<HandAimer>,
    pub head: Option<HeadAimer>,
    gate: DependencyGate,
}

fn built_or_disabled<T>(effector: Effector, built: Result<T, RigError>) -> Option<T> {
    match built {
        Ok(aimer) => Some(aimer),
        Err(error) => {
            warn!("{} aimer disabled: {}", effector, error);
            None
        }
    }
}

impl HumanoidIk {
    pub fn new(settings: &RigSettings, rig: &RigDescriptor) -> Self {
        Self {
            left_foot: FootAimer::new(Side::Left, settings.foot.clone()),
            right_foot: FootAimer::new(Side::Right, settings.foot.clone()),
            left_hand: built_or_disabled(
                Effector::LeftHand,
                HandAimer::new(Side::Left, settings.hand.clone(), rig),
            ),
            right_hand: built_or_disabled(
                Effector::RightHand,
                HandAimer::new(Side::Right, settings.hand.clone(), rig),
            ),
            head: built_or_disabled(Effector::Head, HeadAimer::new(settings.head.clone(), rig)),
            gate: DependencyGate::new("humanoid IK"),
        }
    }

    /// Whether the aimer for `effector` could be built for this rig.
    pub fn has_aimer(&self, effector: Effector) -> bool {
        match effector {
            Effector::LeftFoot | Effector::RightFoot => true,
            Effector::LeftHand => self.left_hand.is_some(),
            Effector::RightHand => self.right_hand.is_some(),
            Effector::Head => self.head.is_some(),
        }
    }

    pub fn enable_all(&mut self) {
        for effector in Effector::ALL {
            self.set_enabled(effector, true);
        }
        info!("Humanoid IK enabled");
    }

    /// Disabled aimers keep ticking so their weights ramp down to zero.
    pub fn disable_all(&mut self) {
        for effector in Effector::ALL {
            self.set_enabled(effector, false);
        }
        info!("Humanoid IK disabled");
    }

    pub fn set_enabled(&mut self, effector: Effector, enabled: bool) {
        match effector {
            Effector::LeftFoot => self.left_foot.set_enabled(enabled),
            Effector::RightFoot => self.right_foot.set_enabled(enabled),
            Effector::LeftHand => {
                if let Some(hand) = self.left_hand.as_mut() {
                    hand.set_enabled(enabled);
                }
            }
            Effector::RightHand => {
                if let Some(hand) = self.right_hand.as_mut() {
                    hand.set_enabled(enabled);
                }
            }
            Effector::Head => {
                if let Some(head) = self.head.as_mut() {
                    head.set_enabled(enabled);
                }
            }
        }
    }

    pub fn is_enabled(&self, effector: Effector) -> bool {
        match effector {
            Effector::LeftFoot => self.left_foot.is_enabled(),
            Effector::RightFoot => self.right_foot.is_enabled(),
            Effector::LeftHand => self.left_hand.as_ref().is_some_and(HandAimer::is_enabled),
            Effector::RightHand => self.right_hand.as_ref().is_some_and(HandAimer::is_enabled),
            Effector::Head => self.head.as_ref().is_some_and(HeadAimer::is_enabled),
        }
    }

    pub fn weight(&self, effector: Effector) -> f32 {
        match effector {
            Effector::LeftFoot => self.left_foot.weight(),
            Effector::RightFoot => self.right_foot.weight(),
            Effector::LeftHand => self.left_hand.as_ref().map_or(0.0, HandAimer::weight),
            Effector::RightHand => self.right_hand.as_ref().map_or(0.0, HandAimer::weight),
            Effector::Head => self.head.as_ref().map_or(0.0, HeadAimer::weight),
        }
    }

    pub fn tick(&mut self, root: &Transform, world: &dyn WorldQuery, pose: &mut dyn PoseController) {
        self.left_foot.tick(root, world, pose);
        self.right_foot.tick(root, world, pose);
        for hand in [&mut self.left_hand, &mut self.right_hand].into_iter().flatten() {
            hand.tick(root, world, pose);
        }
        if let Some(head) = self.head.as_mut() {
            head.tick(world, pose);
        }
    }
}

impl FrameHandler<RigContext> for HumanoidIk {
    fn on_pose_resolve(&mut self, ctx: &mut RigContext, _dt: f32) {
        let Some(world) = self.gate.require("world query", ctx.world.as_deref()) else {
            return;
        };
        let Some(pose) = self.gate.require("pose controller", ctx.pose.as_deref_mut()) else {
            return;
        };
        self.tick(&ctx.root, world, pose);
    }
}
