//! Parsed description of a single joint.

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use prospect_geometry::Pose;
use prospect_types::{JointType, Support};
use serde::{Deserialize, Serialize};

fn default_axis() -> Vector3<f64> {
    Vector3::z()
}

/// One joint connecting `parent` to `child`.
///
/// `origin` is the pose of the child link frame in the parent link frame at
/// joint position zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDescription {
    pub name: String,
    #[serde(rename = "type", default)]
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    #[serde(default = "default_axis")]
    pub axis: Vector3<f64>,
    #[serde(default)]
    pub origin: Pose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_limit: Option<f64>,
    /// Modelling-only joint with no physical actuator (e.g. a mobile base's
    /// odometry joint).
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damping: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction: Option<f64>,
}

impl JointDescription {
    pub fn new(
        name: impl Into<String>,
        joint_type: JointType,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type,
            parent: parent.into(),
            child: child.into(),
            axis: default_axis(),
            origin: Pose::identity(),
            lower_limit: None,
            upper_limit: None,
            is_virtual: false,
            damping: None,
            friction: None,
        }
    }

    pub fn with_axis(mut self, axis: Vector3<f64>) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_origin(mut self, origin: Pose) -> Self {
        self.origin = origin;
        self
    }

    /// Limits in file order; [`limits`](Self::limits) normalises them.
    pub fn with_limits(mut self, lower: f64, upper: f64) -> Self {
        self.lower_limit = Some(lower);
        self.upper_limit = Some(upper);
        self
    }

    pub fn virtual_joint(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn has_limits(&self) -> bool {
        self.lower_limit.is_some() && self.upper_limit.is_some()
    }

    /// `(lower, upper)` with `lower <= upper`, or `None` for an unlimited joint.
    pub fn limits(&self) -> Option<(f64, f64)> {
        let (lower, upper) = (self.lower_limit?, self.upper_limit?);
        Some((lower.min(upper), lower.max(upper)))
    }

    /// True when `position` lies outside the declared limits.
    pub fn exceeds_limits(&self, position: f64) -> bool {
        self.limits()
            .is_some_and(|(lower, upper)| position < lower || position > upper)
    }

    pub fn damping(&self) -> Support<f64> {
        self.damping.map_or(Support::Unsupported, Support::Supported)
    }

    pub fn friction(&self) -> Support<f64> {
        self.friction.map_or(Support::Unsupported, Support::Supported)
    }

    /// Motion contributed by the joint at `position`, in the joint frame.
    ///
    /// Only single-DOF joints move; every other type contributes identity.
    pub fn motion(&self, position: f64) -> Isometry3<f64> {
        let axis = Unit::try_new(self.axis, 1e-12).unwrap_or(Vector3::z_axis());
        if self.joint_type.is_rotational() {
            Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&axis, position),
            )
        } else if self.joint_type == JointType::Prismatic {
            Isometry3::translation(axis.x * position, axis.y * position, axis.z * position)
        } else {
            Isometry3::identity()
        }
    }

    /// Pose of the child link frame in the parent link frame at `position`.
    pub fn child_transform(&self, position: f64) -> Isometry3<f64> {
        self.origin.isometry() * self.motion(position)
    }
}
