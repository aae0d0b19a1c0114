//! The physics/render backend seam.
//!
//! A [`World`][crate::World] owns the kinematic model (descriptions,
//! constraints bookkeeping, attachments) and delegates everything physical to
//! a [`PhysicsBackend`]: body poses, joint positions, collision detection,
//! rendering, stepping, and physics-state snapshots.  Backends can be swapped
//! without touching the reasoning code.
//!
//! Optional capabilities (native bounding boxes, convex hulls, force-torque
//! sensing) have default implementations returning
//! [`Support::Unsupported`]; callers then take their geometric fallback.

use std::sync::Arc;

use nalgebra::{Isometry3, Point3, Vector3};
use prospect_description::ObjectDescription;
use prospect_geometry::{AxisAlignedBoundingBox, Mesh, Pose, RotatedBoundingBox};
use prospect_types::{BodyId, ConstraintId, JointId, LinkId, ProspectError, Support};

use crate::camera::CameraImages;

/// One contact reported by collision detection.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactPoint {
    pub body_a: BodyId,
    pub link_a: LinkId,
    pub body_b: BodyId,
    pub link_b: LinkId,
    /// Contact location on body A, in the world frame.
    pub position_on_a: Point3<f64>,
    /// Contact normal pointing from B towards A.
    pub normal_on_b: Vector3<f64>,
    /// Signed separation; negative values are penetration.
    pub distance: f64,
}

/// A rigid link-to-link constraint as the backend sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedConstraint {
    pub parent: (BodyId, LinkId),
    pub child: (BodyId, LinkId),
    /// Pose of the child link in the parent link frame.
    pub child_to_parent: Isometry3<f64>,
}

/// A physics and rendering engine driving one world.
///
/// All calls are synchronous.  `save_state` captures body poses and joint
/// positions only; constraints are re-created by the world on restore.
pub trait PhysicsBackend: Send {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// Spawn a body and return its id.  Ids are never reused.
    fn load_object(
        &mut self,
        description: Arc<ObjectDescription>,
        pose: &Pose,
    ) -> Result<BodyId, ProspectError>;

    fn remove_object(&mut self, body: BodyId) -> Result<(), ProspectError>;

    fn get_object_pose(&self, body: BodyId) -> Result<Pose, ProspectError>;

    fn set_object_pose(&mut self, body: BodyId, pose: &Pose) -> Result<(), ProspectError>;

    fn get_link_pose(&self, body: BodyId, link: LinkId) -> Result<Pose, ProspectError>;

    fn get_joint_position(&self, body: BodyId, joint: JointId) -> Result<f64, ProspectError>;

    fn set_joint_position(
        &mut self,
        body: BodyId,
        joint: JointId,
        position: f64,
    ) -> Result<(), ProspectError>;

    fn add_fixed_constraint(
        &mut self,
        constraint: &FixedConstraint,
    ) -> Result<ConstraintId, ProspectError>;

    fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), ProspectError>;

    /// Refresh contact information after poses changed.
    fn perform_collision_detection(&mut self) -> Result<(), ProspectError>;

    /// Contacts between two bodies found by the last collision detection.
    fn get_contact_points_between(
        &self,
        a: BodyId,
        b: BodyId,
    ) -> Result<Vec<ContactPoint>, ProspectError>;

    /// Render the scene from `camera` looking at `target`.
    fn get_images_for_target(
        &mut self,
        target: &Pose,
        camera: &Pose,
    ) -> Result<CameraImages, ProspectError>;

    /// Snapshot body poses and joint positions; returns a backend state id.
    fn save_state(&mut self) -> Result<u64, ProspectError>;

    fn restore_state(&mut self, id: u64) -> Result<(), ProspectError>;

    fn remove_state(&mut self, id: u64) -> Result<(), ProspectError>;

    fn set_gravity(&mut self, gravity: Vector3<f64>) -> Result<(), ProspectError>;

    /// Advance the simulation by `seconds` of simulated time.
    fn simulate(&mut self, seconds: f64) -> Result<(), ProspectError>;

    // ── optional capabilities ───────────────────────────────────────────────

    /// World-frame axis-aligned box of a link.
    fn get_link_axis_aligned_bounding_box(
        &self,
        _body: BodyId,
        _link: LinkId,
    ) -> Support<AxisAlignedBoundingBox> {
        Support::Unsupported
    }

    fn get_link_rotated_bounding_box(
        &self,
        _body: BodyId,
        _link: LinkId,
    ) -> Support<RotatedBoundingBox> {
        Support::Unsupported
    }

    /// World-frame convex hull of a link's geometry.
    fn get_body_convex_hull(&self, _body: BodyId, _link: LinkId) -> Support<Mesh> {
        Support::Unsupported
    }

    fn enable_joint_force_torque_sensor(&mut self, _body: BodyId, _joint: JointId) -> Support<()> {
        Support::Unsupported
    }

    fn disable_joint_force_torque_sensor(&mut self, _body: BodyId, _joint: JointId) -> Support<()> {
        Support::Unsupported
    }

    /// `[fx, fy, fz, mx, my, mz]` measured at the joint.
    fn get_joint_reaction_force_torque(&self, _body: BodyId, _joint: JointId) -> Support<[f64; 6]> {
        Support::Unsupported
    }

    fn get_applied_joint_motor_torque(&self, _body: BodyId, _joint: JointId) -> Support<f64> {
        Support::Unsupported
    }
}
