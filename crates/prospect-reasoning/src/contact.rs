//! Physical queries: stability, contact, support, and robot collision.

use prospect_geometry::{Pose, Vector3};
use prospect_types::{BodyId, ProspectError};
use prospect_world::World;
use tracing::{debug, instrument};

use crate::context::ReasoningContext;
use crate::robot::RobotDescription;

/// Link name pairs `(link on a, link on b)` for every contact point.
pub type ContactLinks = Vec<(String, String)>;

impl ReasoningContext {
    /// True when `object` stays put after the shadow world is simulated
    /// under gravity.  Positions are compared after rounding, so solver
    /// jitter does not count as motion.
    #[instrument(skip(self), level = "debug")]
    pub fn stable(&mut self, object: BodyId) -> Result<bool, ProspectError> {
        self.with_scope(|scope, env| {
            let shadow = scope.shadow_body(object)?;
            let decimals = env.config.stability_decimals;
            let before = scope.shadow().object_pose(shadow)?.rounded_position(decimals);

            let world = scope.shadow_mut();
            world.set_gravity(Vector3::from(env.config.gravity))?;
            let simulated = world.simulate(env.config.stability_duration);
            // Gravity is not part of a saved state.
            world.set_gravity(Vector3::zeros())?;
            simulated?;

            let after = scope.shadow().object_pose(shadow)?.rounded_position(decimals);
            debug!(?before, ?after, "stability test");
            Ok(before == after)
        })
    }

    /// True when `a` and `b` touch.
    #[instrument(skip(self), level = "debug")]
    pub fn contact(&mut self, a: BodyId, b: BodyId) -> Result<bool, ProspectError> {
        Ok(self.contact_with_links(a, b)?.0)
    }

    /// Like [`contact`](Self::contact), also naming the touching links.
    #[instrument(skip(self), level = "debug")]
    pub fn contact_with_links(&mut self, a: BodyId, b: BodyId) -> Result<(bool, ContactLinks), ProspectError> {
        self.with_scope(|scope, _| {
            let a = scope.shadow_body(a)?;
            let b = scope.shadow_body(b)?;
            scope.shadow_mut().perform_collision_detection()?;
            let links = contact_links(scope.shadow(), a, b)?;
            Ok((!links.is_empty(), links))
        })
    }

    /// True when `b` rests on `a`: they touch and `b` is strictly higher.
    #[instrument(skip(self), level = "debug")]
    pub fn supporting(&mut self, a: BodyId, b: BodyId) -> Result<bool, ProspectError> {
        self.with_scope(|scope, _| {
            let a = scope.shadow_body(a)?;
            let b = scope.shadow_body(b)?;
            scope.shadow_mut().perform_collision_detection()?;
            if contact_links(scope.shadow(), a, b)?.is_empty() {
                return Ok(false);
            }
            let world = scope.shadow();
            Ok(world.object_pose(b)?.position.z > world.object_pose(a)?.position.z)
        })
    }

    /// Would `robot` collide with anything if it stood at `pose`?
    ///
    /// The floor, the robot itself, and the bodies in `ignore` are skipped.
    /// Touching an object the robot holds, through gripper links only, is
    /// not a collision.
    #[instrument(skip(self, ignore), level = "debug")]
    pub fn prospect_robot_contact(
        &mut self,
        robot: BodyId,
        pose: &Pose,
        ignore: &[BodyId],
    ) -> Result<bool, ProspectError> {
        self.with_scope(|scope, env| {
            let shadow_robot = scope.shadow_body(robot)?;
            let mut skipped = vec![shadow_robot];
            for body in ignore {
                skipped.push(scope.shadow_body(*body)?);
            }
            if let Some(floor) = scope.shadow().object_by_name(&env.config.floor_name) {
                skipped.push(floor.id());
            }

            scope.shadow_mut().set_object_pose(shadow_robot, pose, true)?;
            scope.shadow_mut().perform_collision_detection()?;

            let world = scope.shadow();
            for body in world.object_ids() {
                if skipped.contains(&body) {
                    continue;
                }
                let links = contact_links(world, shadow_robot, body)?;
                if links.is_empty() {
                    continue;
                }
                let robot_links: Vec<String> = links.into_iter().map(|(r, _)| r).collect();
                let held = match env.robot_description {
                    Some(description) => is_held_object(world, description, shadow_robot, body, &robot_links)?,
                    None => false,
                };
                if !held {
                    debug!(object = %body, ?robot_links, "robot would collide");
                    return Ok(true);
                }
            }
            Ok(false)
        })
    }
}

/// Contacts found by the last collision detection in `world`, as link
/// names.
pub(crate) fn contact_links(world: &World, a: BodyId, b: BodyId) -> Result<ContactLinks, ProspectError> {
    let object_a = world.object(a)?;
    let object_b = world.object(b)?;
    world
        .get_contact_points_between(a, b)?
        .iter()
        .map(|point| {
            let link_a = world.link(object_a.link_key(point.link_a))?.name().to_string();
            let link_b = world.link(object_b.link_key(point.link_b))?.name().to_string();
            Ok((link_a, link_b))
        })
        .collect()
}

/// True when `robot` holds `object` in one of its grippers and every robot
/// link in `contact_links` belongs to that gripper.
///
/// An object counts as held when it is attached to the robot at a link of a
/// manipulator's end effector.
pub fn is_held_object(
    world: &World,
    description: &RobotDescription,
    robot: BodyId,
    object: BodyId,
    contact_links: &[String],
) -> Result<bool, ProspectError> {
    let Some(attachment) = world.object(robot)?.attachments().get(&object) else {
        return Ok(false);
    };
    let parent_link = world.link(attachment.parent_link)?.name();
    Ok(description
        .manipulator_chains()
        .filter_map(|chain| chain.end_effector.as_ref())
        .any(|gripper| {
            gripper.contains(parent_link) && contact_links.iter().all(|l| gripper.contains(l))
        }))
}
