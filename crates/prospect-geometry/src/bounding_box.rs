//! Axis-aligned and rotated bounding boxes.
//!
//! # Key types
//!
//! | Type | Role |
//! |------|------|
//! | [`AxisAlignedBoundingBox`] | min/max corners in some frame; union, transform, ray test. |
//! | [`RotatedBoundingBox`]     | eight world corners of a box carried by a pose.         |

use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::transform::Transform;

// ────────────────────────────────────────────────────────────────────────────
// AxisAlignedBoundingBox
// ────────────────────────────────────────────────────────────────────────────

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAlignedBoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl AxisAlignedBoundingBox {
    /// Create a bounding box from two opposite corners.
    ///
    /// The corners are normalised so that `min ≤ max` per axis.
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// A box of the given full size centred on the origin.
    pub fn centred(size: Vector3<f64>) -> Self {
        let half = size * 0.5;
        Self::new(Point3::from(-half), Point3::from(half))
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bb = Self::new(first, first);
        for p in iter {
            bb.min = bb.min.inf(p);
            bb.max = bb.max.sup(p);
        }
        Some(bb)
    }

    /// Union of every box, or `None` when `boxes` is empty.
    pub fn from_multiple(boxes: &[AxisAlignedBoundingBox]) -> Option<Self> {
        let (first, rest) = boxes.split_first()?;
        Some(rest.iter().fold(*first, |acc, b| acc.union(b)))
    }

    pub fn union(&self, other: &AxisAlignedBoundingBox) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn centre(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// The eight corners, `min` first and `max` last.
    pub fn corners(&self) -> [Point3<f64>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// True when the point lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// True when `other` overlaps (intersects or touches) this box, with an
    /// extra `margin` of slack on every side.
    pub fn overlaps(&self, other: &AxisAlignedBoundingBox, margin: f64) -> bool {
        self.min.x <= other.max.x + margin
            && self.max.x + margin >= other.min.x
            && self.min.y <= other.max.y + margin
            && self.max.y + margin >= other.min.y
            && self.min.z <= other.max.z + margin
            && self.max.z + margin >= other.min.z
    }

    /// Box enclosing this box after mapping it through `isometry`.
    pub fn transformed_by(&self, isometry: &Isometry3<f64>) -> Self {
        let corners = self.corners().map(|c| isometry.transform_point(&c));
        // Eight corners, never empty.
        Self::from_points(corners.iter()).unwrap_or(*self)
    }

    /// Box enclosing this box after mapping it from `transform.child_frame`
    /// into `transform.frame`.
    pub fn transformed(&self, transform: &Transform) -> Self {
        self.transformed_by(&transform.isometry)
    }

    /// Distance along the ray to the first hit, using the slab method.
    ///
    /// `direction` need not be normalised; the result is in units of it.
    pub fn ray_intersection(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        let mut t_min = 0.0_f64;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < 1e-12 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let mut t0 = (lo - o) / d;
            let mut t1 = (hi - o) / d;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RotatedBoundingBox
// ────────────────────────────────────────────────────────────────────────────

/// An oriented box: a local axis-aligned box carried by a rigid transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatedBoundingBox {
    /// The box in its own (local) frame.
    pub local: AxisAlignedBoundingBox,
    /// Pose of the local frame in the world.
    pub isometry: Isometry3<f64>,
}

impl RotatedBoundingBox {
    pub fn from_axis_aligned(local: AxisAlignedBoundingBox, transform: &Transform) -> Self {
        Self {
            local,
            isometry: transform.isometry,
        }
    }

    /// The eight corners in the world frame.
    pub fn corners(&self) -> [Point3<f64>; 8] {
        self.local
            .corners()
            .map(|c| self.isometry.transform_point(&c))
    }

    /// The tightest world-aligned box around the rotated box.
    pub fn enclosing_box(&self) -> AxisAlignedBoundingBox {
        self.local.transformed_by(&self.isometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::FRAC_PI_4;

    fn unit_box() -> AxisAlignedBoundingBox {
        AxisAlignedBoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn new_normalises_corners() {
        let bb = AxisAlignedBoundingBox::new(Point3::new(1.0, -1.0, 2.0), Point3::new(-1.0, 1.0, 0.0));
        assert_eq!(bb.min, Point3::new(-1.0, -1.0, 0.0));
        assert_eq!(bb.max, Point3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn from_multiple_is_union() {
        let a = unit_box();
        let b = AxisAlignedBoundingBox::new(Point3::new(2.0, -1.0, 0.5), Point3::new(3.0, 0.5, 4.0));
        let merged = AxisAlignedBoundingBox::from_multiple(&[a, b]).unwrap();
        assert_eq!(merged.min, Point3::new(0.0, -1.0, 0.0));
        assert_eq!(merged.max, Point3::new(3.0, 1.0, 4.0));
        assert!(AxisAlignedBoundingBox::from_multiple(&[]).is_none());
    }

    #[test]
    fn overlaps_counts_touching_faces() {
        let a = unit_box();
        let touching = AxisAlignedBoundingBox::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let apart = AxisAlignedBoundingBox::new(Point3::new(1.5, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&touching, 0.0));
        assert!(!a.overlaps(&apart, 0.0));
        assert!(a.overlaps(&apart, 0.6));
    }

    #[test]
    fn transformed_box_encloses_rotated_corners() {
        let bb = AxisAlignedBoundingBox::centred(Vector3::new(2.0, 2.0, 2.0));
        let t = Transform::new(
            Vector3::new(5.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, FRAC_PI_4),
            "map",
            "box",
        );
        let out = bb.transformed(&t);
        let half_diag = 2f64.sqrt();
        assert_relative_eq!(out.min.x, 5.0 - half_diag, epsilon = 1e-12);
        assert_relative_eq!(out.max.y, half_diag, epsilon = 1e-12);
        assert_relative_eq!(out.max.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn ray_hits_front_face() {
        let bb = unit_box();
        let t = bb
            .ray_intersection(&Point3::new(-2.0, 0.5, 0.5), &Vector3::new(1.0, 0.0, 0.0))
            .unwrap();
        assert_relative_eq!(t, 2.0, epsilon = 1e-12);
        assert!(bb
            .ray_intersection(&Point3::new(-2.0, 3.0, 0.5), &Vector3::new(1.0, 0.0, 0.0))
            .is_none());
        assert!(bb
            .ray_intersection(&Point3::new(-2.0, 0.5, 0.5), &Vector3::new(-1.0, 0.0, 0.0))
            .is_none());
    }

    #[test]
    fn rotated_box_corners_follow_pose() {
        let local = AxisAlignedBoundingBox::centred(Vector3::new(2.0, 1.0, 1.0));
        let t = Transform::new(
            Vector3::new(0.0, 0.0, 1.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
            "map",
            "link",
        );
        let rotated = RotatedBoundingBox::from_axis_aligned(local, &t);
        let enclosing = rotated.enclosing_box();
        // The 2 m side now lies along Y.
        assert_relative_eq!(enclosing.extents().y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(enclosing.extents().x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(enclosing.centre().z, 1.0, epsilon = 1e-12);
        assert_eq!(rotated.corners().len(), 8);
    }
}
