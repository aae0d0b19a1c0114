//! The inverse-kinematics collaborator seam.
//!
//! The engine does not solve IK itself.  It asks an [`InverseKinematics`]
//! implementation for a joint configuration (and optionally a new base
//! pose) that brings an end effector to a target, applies the answer to the
//! shadow robot, and judges the result.

use std::collections::BTreeMap;

use nalgebra::UnitQuaternion;
use prospect_geometry::Pose;
use prospect_types::{BodyId, ProspectError};
use prospect_world::World;

/// What a reach query aims at.
#[derive(Debug, Clone, PartialEq)]
pub enum ReachTarget {
    Pose(Pose),
    /// A body of the live world; its current pose is the target.
    Object(BodyId),
}

impl From<Pose> for ReachTarget {
    fn from(pose: Pose) -> Self {
        Self::Pose(pose)
    }
}

impl From<BodyId> for ReachTarget {
    fn from(body: BodyId) -> Self {
        Self::Object(body)
    }
}

/// A configuration that should bring the end effector to `target_pose`.
#[derive(Debug, Clone, PartialEq)]
pub struct IkSolution {
    /// The pose the solver aimed for, after any grasp adjustment.
    pub target_pose: Pose,
    /// New pose of the robot base, when the solver moves it.
    pub base_pose: Option<Pose>,
    /// Joint positions by joint name.
    pub joint_positions: BTreeMap<String, f64>,
}

impl IkSolution {
    pub fn new(target_pose: Pose) -> Self {
        Self {
            target_pose,
            base_pose: None,
            joint_positions: BTreeMap::new(),
        }
    }

    pub fn with_base_pose(mut self, pose: Pose) -> Self {
        self.base_pose = Some(pose);
        self
    }

    pub fn with_joint(mut self, name: impl Into<String>, position: f64) -> Self {
        self.joint_positions.insert(name.into(), position);
        self
    }

    /// Write the solution into `world` for `robot`.
    pub fn apply(&self, world: &mut World, robot: BodyId) -> Result<(), ProspectError> {
        if let Some(base) = &self.base_pose {
            world.set_object_pose(robot, base, true)?;
        }
        world.set_joint_positions(
            robot,
            self.joint_positions.iter().map(|(name, p)| (name.as_str(), *p)),
        )
    }
}

/// An inverse-kinematics solver.
///
/// Implementations read the shadow world but never mutate it; a `None`
/// answer means the target cannot be reached.
pub trait InverseKinematics: Send + Sync {
    fn name(&self) -> &str;

    /// Solve for `end_effector` (a tool-frame link name) of `robot` reaching
    /// `target`.
    fn try_to_reach(
        &self,
        world: &World,
        target: &Pose,
        robot: BodyId,
        end_effector: &str,
    ) -> Result<Option<IkSolution>, ProspectError>;

    /// Solve with the gripper turned by `grasp_orientation` relative to the
    /// target.
    ///
    /// The default rotates the target orientation and defers to
    /// [`try_to_reach`](Self::try_to_reach).
    fn try_to_reach_with_grasp(
        &self,
        world: &World,
        target: &Pose,
        robot: BodyId,
        end_effector: &str,
        grasp_orientation: &UnitQuaternion<f64>,
    ) -> Result<Option<IkSolution>, ProspectError> {
        let mut adjusted = target.clone();
        adjusted.orientation = target.orientation * grasp_orientation;
        self.try_to_reach(world, &adjusted, robot, end_effector)
    }
}
