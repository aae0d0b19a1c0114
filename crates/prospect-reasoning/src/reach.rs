//! Manipulation queries: reachability, blocking objects, and kinematic
//! projection of joint configurations.

use prospect_geometry::Pose;
use prospect_shadow::ProspectionScope;
use prospect_types::{BodyId, Grasp, ProspectError};
use tracing::{debug, instrument};

use crate::context::ReasoningContext;
use crate::contact::contact_links;
use crate::ik::ReachTarget;

impl ReasoningContext {
    /// True when the inverse-kinematics solver brings `end_effector` of
    /// `robot` within `threshold` of `target`.
    ///
    /// `end_effector` is an end-effector name from the robot description or
    /// a link name.  `threshold` defaults to the configured reachability
    /// threshold.
    ///
    /// # Errors
    ///
    /// [`ProspectError::NoInverseKinematics`] without a solver.
    #[instrument(skip(self), level = "debug")]
    pub fn reachable(
        &mut self,
        target: ReachTarget,
        robot: BodyId,
        end_effector: &str,
        threshold: Option<f64>,
    ) -> Result<bool, ProspectError> {
        self.with_scope(|scope, env| {
            let ik = env.ik()?;
            let threshold = threshold.unwrap_or(env.config.reachability_threshold);
            let tool = env.tool_frame(end_effector);
            let shadow_robot = scope.shadow_body(robot)?;
            let target_pose = target_pose(scope, &target)?;

            let Some(solution) = ik.try_to_reach(scope.shadow(), &target_pose, shadow_robot, tool)? else {
                debug!(solver = ik.name(), "no ik solution");
                return Ok(false);
            };
            solution.apply(scope.shadow_mut(), shadow_robot)?;
            let gripper = scope.shadow().link_by_name(shadow_robot, tool)?.pose()?;
            let distance = solution.target_pose.distance(&gripper);
            debug!(distance, threshold, "reach distance");
            Ok(distance < threshold)
        })
    }

    /// Live bodies the robot touches once it reaches for `target`.
    ///
    /// Returns `None` when the solver finds no solution, so an unreachable
    /// target is distinguishable from one nothing blocks.  With a `grasp`,
    /// the gripper approaches in that orientation.
    ///
    /// # Errors
    ///
    /// [`ProspectError::NoInverseKinematics`] without a solver, and
    /// [`ProspectError::MissingRobotDescription`] when a grasp is given but
    /// no description defines its orientation.
    #[instrument(skip(self), level = "debug")]
    pub fn blocking(
        &mut self,
        target: ReachTarget,
        robot: BodyId,
        end_effector: &str,
        grasp: Option<Grasp>,
    ) -> Result<Option<Vec<BodyId>>, ProspectError> {
        self.with_scope(|scope, env| {
            let ik = env.ik()?;
            let tool = env.tool_frame(end_effector);
            let shadow_robot = scope.shadow_body(robot)?;
            let target_pose = target_pose(scope, &target)?;

            let solution = match grasp {
                Some(grasp) => {
                    let orientation = env
                        .robot_description()?
                        .grasp_orientation(grasp)
                        .ok_or(ProspectError::MissingRobotDescription)?;
                    ik.try_to_reach_with_grasp(scope.shadow(), &target_pose, shadow_robot, tool, &orientation)?
                }
                None => ik.try_to_reach(scope.shadow(), &target_pose, shadow_robot, tool)?,
            };
            let Some(solution) = solution else {
                debug!(solver = ik.name(), "no ik solution");
                return Ok(None);
            };
            solution.apply(scope.shadow_mut(), shadow_robot)?;
            scope.shadow_mut().perform_collision_detection()?;

            let world = scope.shadow();
            let mut blocking = Vec::new();
            for body in world.object_ids() {
                if body == shadow_robot || contact_links(world, shadow_robot, body)?.is_empty() {
                    continue;
                }
                if let Some(live) = scope.live_body(body) {
                    blocking.push(live);
                }
            }
            debug!(blocking = blocking.len(), "blocking objects");
            Ok(Some(blocking))
        })
    }

    /// Pose `link_name` of `object` would have with the given joint
    /// positions.  Joints are set kinematically; nothing is simulated.
    #[instrument(skip(self, joint_positions), level = "debug")]
    pub fn link_pose_for_joint_config<'a>(
        &mut self,
        object: BodyId,
        joint_positions: impl IntoIterator<Item = (&'a str, f64)>,
        link_name: &str,
    ) -> Result<Pose, ProspectError> {
        self.with_scope(|scope, _| {
            let shadow = scope.shadow_body(object)?;
            scope.shadow_mut().set_joint_positions(shadow, joint_positions)?;
            scope.shadow().link_by_name(shadow, link_name)?.pose()
        })
    }
}

/// The world pose a reach query aims at, read from the shadow world.
fn target_pose(scope: &mut ProspectionScope<'_>, target: &ReachTarget) -> Result<Pose, ProspectError> {
    match target {
        ReachTarget::Pose(pose) => Ok(pose.clone()),
        ReachTarget::Object(body) => {
            let shadow = scope.shadow_body(*body)?;
            scope.shadow().object_pose(shadow)
        }
    }
}
