mod support;

use std::cell::RefCell;
use std::rc::Rc;

use bevy::math::Vec3;
use bevy::transform::components::Transform;
use common::Effector;
use motion::{
    FrameScheduler, GaitConfig, GaitSolver, HumanoidIk, RagdollConfig, RagdollController,
    RagdollPhase, RigContext, RigDescriptor, RigSettings,
};
use support::{MockLocomotion, MockPose, PlaneWorld};

const DT: f32 = 0.02;

fn crawler(root: &Transform) -> Rc<RefCell<GaitSolver>> {
    let feet = [
        Vec3::new(-1.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(-1.0, 0.0, -1.0),
    ];
    Rc::new(RefCell::new(
        GaitSolver::new(GaitConfig::default(), root, &feet).unwrap(),
    ))
}

#[test]
fn gait_runs_in_the_physics_phase_only() {
    let mut ctx = RigContext::new(Transform::from_xyz(0.0, 0.5, 0.0)).with_world(PlaneWorld::ground(0.0));
    let gait = crawler(&ctx.root);
    let mut scheduler = FrameScheduler::new();
    scheduler.register("crawler gait", &gait);

    ctx.root.translation.x += 0.5;
    scheduler.pose_resolve(&mut ctx, DT);
    assert_eq!(gait.borrow().stepping_leg(), None);

    scheduler.physics_step(&mut ctx, DT);
    assert!(gait.borrow().stepping_leg().is_some());
}

#[test]
fn gait_without_world_stays_inactive() {
    let mut ctx = RigContext::new(Transform::from_xyz(0.0, 0.5, 0.0));
    let gait = crawler(&ctx.root);
    let before = gait.borrow().legs().to_vec();
    let mut scheduler = FrameScheduler::new();
    scheduler.register("crawler gait", &gait);

    for _ in 0..20 {
        ctx.root.translation.x += 0.1;
        scheduler.physics_step(&mut ctx, DT);
    }
    assert_eq!(gait.borrow().legs(), before.as_slice());
    assert_eq!(gait.borrow().smoothed_velocity(), Vec3::ZERO);
}

#[test]
fn dropping_a_body_mid_step_unregisters_it() {
    let mut ctx = RigContext::new(Transform::from_xyz(0.0, 0.5, 0.0)).with_world(PlaneWorld::ground(0.0));
    let gait = crawler(&ctx.root);
    let mut scheduler = FrameScheduler::new();
    scheduler.register("crawler gait", &gait);

    ctx.root.translation.x += 0.5;
    scheduler.physics_step(&mut ctx, DT);
    assert!(gait.borrow().stepping_leg().is_some());

    drop(gait);
    for _ in 0..10 {
        scheduler.physics_step(&mut ctx, DT);
    }
    assert_eq!(scheduler.live_handlers(), 0);
}

#[test]
fn humanoid_ik_runs_in_the_pose_phase() {
    let rig = RigDescriptor::humanoid();
    let mut settings = RigSettings::default();
    settings.foot.ground_offset = 0.0;
    let pose = MockPose::standing(&rig)
        .with_goal(Effector::LeftFoot, Vec3::new(-0.1, 0.05, 0.0))
        .with_goal(Effector::RightFoot, Vec3::new(0.1, 0.05, 0.0));
    let mut ctx = RigContext::new(Transform::IDENTITY)
        .with_world(PlaneWorld::ground(0.0))
        .with_pose(pose);
    let ik = Rc::new(RefCell::new(HumanoidIk::new(&settings, &rig)));
    let mut scheduler = FrameScheduler::new();
    scheduler.register("humanoid ik", &ik);

    scheduler.physics_step(&mut ctx, DT);
    assert_eq!(ik.borrow().weight(Effector::LeftFoot), 0.0);

    for _ in 0..10 {
        scheduler.pose_resolve(&mut ctx, DT);
    }
    assert_eq!(ik.borrow().weight(Effector::LeftFoot), 1.0);
    assert_eq!(ik.borrow().weight(Effector::RightFoot), 1.0);
}

#[test]
fn ragdoll_without_physics_body_never_leaves_animation() {
    let rig = RigDescriptor::humanoid();
    let mut ctx = RigContext::new(Transform::IDENTITY)
        .with_world(PlaneWorld::ground(0.0))
        .with_pose(MockPose::standing(&rig))
        .with_locomotion(MockLocomotion::default());
    let ragdoll = Rc::new(RefCell::new(
        RagdollController::new(RagdollConfig::default(), &rig).unwrap(),
    ));
    let mut scheduler = FrameScheduler::new();
    scheduler.register("ragdoll", &ragdoll);

    ragdoll.borrow_mut().set_ragdoll(true);
    for _ in 0..5 {
        scheduler.physics_step(&mut ctx, DT);
        scheduler.pose_resolve(&mut ctx, DT);
    }
    assert_eq!(ragdoll.borrow().phase(), RagdollPhase::Animating);
}

#[test]
fn one_scheduler_drives_several_components_in_order() {
    let rig = RigDescriptor::humanoid();
    let mut ctx = RigContext::new(Transform::from_xyz(0.0, 0.5, 0.0))
        .with_world(PlaneWorld::ground(0.0))
        .with_pose(MockPose::standing(&rig));
    let gait = crawler(&ctx.root);
    let ik = Rc::new(RefCell::new(HumanoidIk::new(&RigSettings::default(), &rig)));
    let mut scheduler = FrameScheduler::new();
    scheduler.register("gait", &gait);
    scheduler.register("ik", &ik);
    assert_eq!(scheduler.live_handlers(), 2);

    for _ in 0..50 {
        ctx.root.translation.z -= 0.01;
        scheduler.physics_step(&mut ctx, DT);
        scheduler.pose_resolve(&mut ctx, DT);
    }
    let start = Transform::from_xyz(0.0, 0.5, 0.0);
    assert!(
        gait.borrow()
            .legs()
            .iter()
            .any(|leg| leg.committed.z < start.transform_point(leg.rest).z - 0.1)
    );
    drop(ik);
    scheduler.physics_step(&mut ctx, DT);
    assert_eq!(scheduler.live_handlers(), 1);
}
