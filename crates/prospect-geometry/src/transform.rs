//! Frames and rigid transforms.
//!
//! A [`Pose`] places a frame inside a reference frame; a [`Transform`] relates
//! two *named* frames.  Both are backed by an `nalgebra` isometry (translation
//! in metres, unit-quaternion rotation).  [`FrameTree`] keeps a graph of named
//! frames and composes a chain of transforms via BFS.
//!
//! # Example
//!
//! ```rust
//! use prospect_geometry::transform::{FrameTree, Transform};
//! use prospect_geometry::{UnitQuaternion, Vector3};
//!
//! let mut tree = FrameTree::new();
//!
//! // robot_base is 1 m forward of the map origin.
//! tree.set_transform(Transform::new(
//!     Vector3::new(1.0, 0.0, 0.0), UnitQuaternion::identity(), "map", "robot_base"));
//!
//! // camera is 0.5 m forward of robot_base.
//! tree.set_transform(Transform::new(
//!     Vector3::new(0.5, 0.0, 0.0), UnitQuaternion::identity(), "robot_base", "camera"));
//!
//! let t = tree.lookup("map", "camera").unwrap();
//! assert!((t.translation().x - 1.5).abs() < 1e-9);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use nalgebra::{Isometry3, Matrix4, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name of the fixed world frame.
pub const MAP_FRAME: &str = "map";

fn map_frame() -> String {
    MAP_FRAME.to_string()
}

fn renormalized(rotation: UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::new_normalize(rotation.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// Position and orientation of a frame, expressed in `frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default = "map_frame")]
    pub frame: String,
    #[serde(default = "Vector3::zeros")]
    pub position: Vector3<f64>,
    #[serde(default = "UnitQuaternion::identity")]
    pub orientation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// A pose in the map frame.
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            frame: MAP_FRAME.to_string(),
            position,
            orientation,
        }
    }

    /// Origin of the map frame, no rotation.
    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }

    /// Position only, identity orientation, map frame.
    pub fn from_xyz(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vector3::new(x, y, z), UnitQuaternion::identity())
    }

    /// Build from a position list and an `[x, y, z, w]` quaternion list.
    pub fn from_lists(position: [f64; 3], orientation: [f64; 4]) -> Self {
        let [x, y, z, w] = orientation;
        Self::new(
            Vector3::from(position),
            UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)),
        )
    }

    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = frame.into();
        self
    }

    pub fn from_isometry(frame: impl Into<String>, iso: Isometry3<f64>) -> Self {
        Self {
            frame: frame.into(),
            position: iso.translation.vector,
            orientation: iso.rotation,
        }
    }

    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }

    /// Interpret this pose as the transform from `self.frame` to `child_frame`.
    pub fn to_transform(&self, child_frame: impl Into<String>) -> Transform {
        Transform {
            frame: self.frame.clone(),
            child_frame: child_frame.into(),
            isometry: self.isometry(),
        }
    }

    /// Euclidean distance between the two positions (orientation ignored).
    pub fn distance(&self, other: &Pose) -> f64 {
        (self.position - other.position).norm()
    }

    /// Position rounded to `decimals` places, for jitter-tolerant comparison.
    pub fn rounded_position(&self, decimals: u32) -> [f64; 3] {
        let scale = 10f64.powi(decimals as i32);
        let round = |v: f64| (v * scale).round() / scale;
        [
            round(self.position.x),
            round(self.position.y),
            round(self.position.z),
        ]
    }

    /// True when both poses agree within `eps` in position and rotation angle.
    pub fn approx_eq(&self, other: &Pose, eps: f64) -> bool {
        self.frame == other.frame
            && (self.position - other.position).norm() <= eps
            && self.orientation.angle_to(&other.orientation) <= eps
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform
// ────────────────────────────────────────────────────────────────────────────

/// The rigid transform from `frame` to `child_frame`.
///
/// It is also the pose of `child_frame` expressed in `frame`: to convert a
/// point given in `child_frame` into `frame`, apply [`Transform::apply_to_point`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub frame: String,
    pub child_frame: String,
    pub isometry: Isometry3<f64>,
}

impl Transform {
    pub fn new(
        translation: Vector3<f64>,
        rotation: UnitQuaternion<f64>,
        frame: impl Into<String>,
        child_frame: impl Into<String>,
    ) -> Self {
        Self {
            frame: frame.into(),
            child_frame: child_frame.into(),
            isometry: Isometry3::from_parts(Translation3::from(translation), rotation),
        }
    }

    /// The identity transform of a frame onto itself.
    pub fn identity(frame: impl Into<String>) -> Self {
        let frame = frame.into();
        Self {
            child_frame: frame.clone(),
            frame,
            isometry: Isometry3::identity(),
        }
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.isometry.translation.vector
    }

    pub fn rotation(&self) -> UnitQuaternion<f64> {
        self.isometry.rotation
    }

    /// Compose `self` (A→B) with `other` (B→C) into A→C.
    ///
    /// The rotation is renormalised to counter floating-point drift.  A frame
    /// mismatch is logged and the composition still proceeds.
    pub fn compose(&self, other: &Transform) -> Transform {
        if self.child_frame != other.frame {
            warn!(
                left = %self.child_frame,
                right = %other.frame,
                "composing transforms with mismatched frames"
            );
        }
        let mut isometry = self.isometry * other.isometry;
        isometry.rotation = renormalized(isometry.rotation);
        Transform {
            frame: self.frame.clone(),
            child_frame: other.child_frame.clone(),
            isometry,
        }
    }

    /// B→A from A→B.
    pub fn inverse(&self) -> Transform {
        Transform {
            frame: self.child_frame.clone(),
            child_frame: self.frame.clone(),
            isometry: self.isometry.inverse(),
        }
    }

    /// The pose of `child_frame` in `frame`.
    pub fn to_pose(&self) -> Pose {
        Pose::from_isometry(self.frame.clone(), self.isometry)
    }

    /// Map a point expressed in `child_frame` into `frame`.
    pub fn apply_to_point(&self, point: &Point3<f64>) -> Point3<f64> {
        self.isometry.transform_point(point)
    }

    pub fn homogeneous_matrix(&self) -> Matrix4<f64> {
        self.isometry.to_homogeneous()
    }

    /// True when translation and rotation are within `eps` of identity.
    pub fn is_identity(&self, eps: f64) -> bool {
        self.translation().norm() <= eps && self.rotation().angle() <= eps
    }

    pub fn approx_eq(&self, other: &Transform, eps: f64) -> bool {
        self.frame == other.frame
            && self.child_frame == other.child_frame
            && (self.translation() - other.translation()).norm() <= eps
            && self.rotation().angle_to(&other.rotation()) <= eps
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FrameTree
// ────────────────────────────────────────────────────────────────────────────

/// A graph of named reference frames and the [`Transform`]s that relate them.
///
/// Registering `A → B` also registers the inverse edge, so lookups work in
/// both directions.  [`FrameTree::lookup`] performs BFS from source to target
/// and returns the composed transform.
#[derive(Debug, Default, Clone)]
pub struct FrameTree {
    /// `edges[from][to] = isometry of `to` in `from``
    edges: HashMap<String, HashMap<String, Isometry3<f64>>>,
}

impl FrameTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update the transform between `transform.frame` and
    /// `transform.child_frame`.
    pub fn set_transform(&mut self, transform: Transform) {
        self.edges
            .entry(transform.frame.clone())
            .or_default()
            .insert(transform.child_frame.clone(), transform.isometry);
        self.edges
            .entry(transform.child_frame)
            .or_default()
            .insert(transform.frame, transform.isometry.inverse());
    }

    pub fn contains_frame(&self, frame: &str) -> bool {
        self.edges.contains_key(frame)
    }

    /// The transform from `frame` to `child_frame`, or `None` when the two
    /// frames are not connected.
    pub fn lookup(&self, frame: &str, child_frame: &str) -> Option<Transform> {
        if frame == child_frame {
            return Some(Transform::identity(frame));
        }

        let mut queue: VecDeque<(&str, Isometry3<f64>)> = VecDeque::new();
        let mut visited: HashSet<&str> = HashSet::new();
        queue.push_back((frame, Isometry3::identity()));
        visited.insert(frame);

        while let Some((current, accumulated)) = queue.pop_front() {
            let Some(neighbours) = self.edges.get(current) else {
                continue;
            };
            for (next, edge) in neighbours {
                if !visited.insert(next.as_str()) {
                    continue;
                }
                let composed = accumulated * edge;
                if next == child_frame {
                    let mut isometry = composed;
                    isometry.rotation = renormalized(isometry.rotation);
                    return Some(Transform {
                        frame: frame.to_string(),
                        child_frame: child_frame.to_string(),
                        isometry,
                    });
                }
                queue.push_back((next.as_str(), composed));
            }
        }

        None
    }

    /// Re-express `pose` in `target_frame`.
    pub fn transform_pose(&self, pose: &Pose, target_frame: &str) -> Option<Pose> {
        let target_to_source = self.lookup(target_frame, &pose.frame)?;
        Some(Pose::from_isometry(
            target_frame,
            target_to_source.isometry * pose.isometry(),
        ))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
