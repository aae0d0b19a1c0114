//! Stability, contact, support, and robot-collision queries on the
//! simulated scene.

mod common;

use approx::assert_relative_eq;
use common::{BASE_HEIGHT, context_for, cube, live_world, recording_context, scene};
use prospect_geometry::{Pose, Vector3};
use prospect_reasoning::{ProspectConfig, ReasoningContext};
use prospect_types::ProspectError;

// ── stability ───────────────────────────────────────────────────────────────

#[test]
fn cup_resting_on_table_is_stable() {
    let (mut ctx, scene) = scene();
    assert!(ctx.stable(scene.cup).unwrap());
}

#[test]
fn suspended_body_is_not_stable() {
    let (mut live, _) = live_world();
    let balloon = live
        .spawn("balloon", cube("balloon", [0.2; 3]), &Pose::from_xyz(5.0, 5.0, 1.5))
        .unwrap();
    let mut ctx = context_for(live);
    assert!(!ctx.stable(balloon).unwrap());
    // The drop happened in the shadow world only.
    assert_relative_eq!(ctx.live().object_pose(balloon).unwrap().position.z, 1.5);
}

#[test]
fn shadow_is_reset_between_stability_queries() {
    let (mut live, _) = live_world();
    let balloon = live
        .spawn("balloon", cube("balloon", [0.2; 3]), &Pose::from_xyz(5.0, 5.0, 1.5))
        .unwrap();
    let mut ctx = context_for(live);
    assert!(!ctx.stable(balloon).unwrap());
    assert!(!ctx.stable(balloon).unwrap());
    let shadow = ctx.prospection().correspondence().shadow_of(balloon).unwrap();
    assert_relative_eq!(
        ctx.prospection().shadow().object_pose(shadow).unwrap().position.z,
        1.5
    );
}

#[test]
fn stability_duration_follows_config() {
    let (live, scene) = live_world();
    let config = ProspectConfig::from_toml_str("[reasoning]\nstability_duration = 0.0\n").unwrap();
    let mut ctx = ReasoningContext::new(live, common::shadow()).with_config(config.reasoning);
    // Without simulated time nothing moves, so even a floating body passes.
    let mut floating = ctx.live().object_pose(scene.cup).unwrap();
    floating.position.z += 3.0;
    ctx.live_mut().set_object_pose(scene.cup, &floating, false).unwrap();
    assert!(ctx.stable(scene.cup).unwrap());
}

#[test]
fn failed_simulation_still_clears_gravity() {
    let (live, scene) = live_world();
    let (mut ctx, log) = recording_context(live);
    log.lock().unwrap().fail_simulate = true;
    let err = ctx.stable(scene.cup).unwrap_err();
    assert!(matches!(err, ProspectError::Backend(_)));
    assert_eq!(log.lock().unwrap().gravity, Vector3::zeros());
    assert!(!ctx.prospection().is_active());

    // The next query runs normally.
    assert!(ctx.stable(scene.cup).unwrap());
}

// ── contact and support ─────────────────────────────────────────────────────

#[test]
fn cup_touches_table_through_named_links() {
    let (mut ctx, scene) = scene();
    assert!(ctx.contact(scene.cup, scene.table).unwrap());
    let (touching, links) = ctx.contact_with_links(scene.cup, scene.table).unwrap();
    assert!(touching);
    assert_eq!(links, vec![("cup_main".to_string(), "table_main".to_string())]);
}

#[test]
fn distant_bodies_are_not_in_contact() {
    let (mut ctx, scene) = scene();
    let (touching, links) = ctx.contact_with_links(scene.cup, scene.robot).unwrap();
    assert!(!touching);
    assert!(links.is_empty());
}

#[test]
fn support_requires_the_upper_body_second() {
    let (mut ctx, scene) = scene();
    assert!(ctx.supporting(scene.table, scene.cup).unwrap());
    assert!(!ctx.supporting(scene.cup, scene.table).unwrap());
}

#[test]
fn no_support_without_contact() {
    let (mut ctx, scene) = scene();
    let mut lifted = ctx.live().object_pose(scene.cup).unwrap();
    lifted.position.z += 0.5;
    ctx.live_mut().set_object_pose(scene.cup, &lifted, false).unwrap();
    assert!(!ctx.supporting(scene.table, scene.cup).unwrap());
}

// ── robot collision ─────────────────────────────────────────────────────────

#[test]
fn robot_at_home_collides_with_nothing() {
    let (mut ctx, scene) = scene();
    let home = Pose::from_xyz(0.0, 0.0, BASE_HEIGHT);
    assert!(!ctx.prospect_robot_contact(scene.robot, &home, &[]).unwrap());
}

#[test]
fn robot_inside_table_collides() {
    let (mut ctx, scene) = scene();
    let at_table = Pose::from_xyz(1.5, 0.0, BASE_HEIGHT);
    assert!(ctx.prospect_robot_contact(scene.robot, &at_table, &[]).unwrap());
    assert!(!ctx.prospect_robot_contact(scene.robot, &at_table, &[scene.table]).unwrap());
    // The live robot never moved.
    assert_relative_eq!(ctx.live().object_pose(scene.robot).unwrap().position.x, 0.0);
}

#[test]
fn held_object_is_not_a_collision() {
    let (mut live, scene) = live_world();
    let mug = live
        .spawn("mug", cube("mug", [0.05; 3]), &Pose::from_xyz(0.375, 0.0, BASE_HEIGHT))
        .unwrap();
    live.attach(scene.robot, Some("gripper"), mug, None).unwrap();
    let mut ctx = context_for(live);
    let elsewhere = Pose::from_xyz(-3.0, 0.0, BASE_HEIGHT);
    assert!(!ctx.prospect_robot_contact(scene.robot, &elsewhere, &[]).unwrap());
}

#[test]
fn object_attached_outside_the_gripper_collides() {
    let (mut live, scene) = live_world();
    let mug = live
        .spawn("mug", cube("mug", [0.05; 3]), &Pose::from_xyz(0.375, 0.0, BASE_HEIGHT))
        .unwrap();
    live.attach(scene.robot, Some("base"), mug, None).unwrap();
    let mut ctx = context_for(live);
    let home = Pose::from_xyz(0.0, 0.0, BASE_HEIGHT);
    assert!(ctx.prospect_robot_contact(scene.robot, &home, &[]).unwrap());
}

#[test]
fn regrasp_between_queries_is_seen_by_the_shadow() {
    let (mut live, scene) = live_world();
    let mug = live
        .spawn("mug", cube("mug", [0.05; 3]), &Pose::from_xyz(0.375, 0.0, BASE_HEIGHT))
        .unwrap();
    live.attach(scene.robot, Some("base"), mug, None).unwrap();
    let mut ctx = context_for(live);
    let elsewhere = Pose::from_xyz(-3.0, 0.0, BASE_HEIGHT);
    assert!(ctx.prospect_robot_contact(scene.robot, &elsewhere, &[]).unwrap());

    ctx.live_mut().detach(scene.robot, mug).unwrap();
    ctx.live_mut().attach(scene.robot, Some("gripper"), mug, None).unwrap();
    assert!(!ctx.prospect_robot_contact(scene.robot, &elsewhere, &[]).unwrap());
}

#[test]
fn without_description_every_contact_counts() {
    let (mut live, scene) = live_world();
    let mug = live
        .spawn("mug", cube("mug", [0.05; 3]), &Pose::from_xyz(0.375, 0.0, BASE_HEIGHT))
        .unwrap();
    live.attach(scene.robot, Some("gripper"), mug, None).unwrap();
    let mut ctx = ReasoningContext::new(live, common::shadow());
    let home = Pose::from_xyz(0.0, 0.0, BASE_HEIGHT);
    assert!(ctx.prospect_robot_contact(scene.robot, &home, &[]).unwrap());
}

#[test]
fn queries_run_under_the_installed_subscriber() {
    let (mut ctx, scene) = scene();
    assert!(tracing::dispatcher::has_been_set());
    assert!(ctx.contact(scene.cup, scene.table).unwrap());
}

#[test]
fn unknown_body_is_an_error_and_scope_closes() {
    let (mut ctx, scene) = scene();
    let missing = prospect_types::BodyId(999);
    let err = ctx.contact(scene.cup, missing).unwrap_err();
    assert!(matches!(err, ProspectError::UnknownObject(_)));
    assert!(!ctx.prospection().is_active());
}
