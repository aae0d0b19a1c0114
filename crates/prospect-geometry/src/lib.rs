//! `prospect-geometry` – frames, transforms, and shapes.
//!
//! Pure math: nothing in this crate touches a world or a backend.
//!
//! # Modules
//!
//! - [`transform`] – [`Pose`][transform::Pose], [`Transform`][transform::Transform]
//!   and the [`FrameTree`][transform::FrameTree] graph that composes transforms
//!   between named reference frames.
//! - [`bounding_box`] – axis-aligned and rotated bounding boxes.
//! - [`shape`] – primitive and mesh-referenced link geometry.
//! - [`mesh`] – triangle meshes, convex hulls, and the
//!   [`MeshLoader`][mesh::MeshLoader] seam for reading mesh files.

pub mod bounding_box;
pub mod mesh;
pub mod shape;
pub mod transform;

pub use bounding_box::{AxisAlignedBoundingBox, RotatedBoundingBox};
pub use mesh::{Mesh, MeshLoader, ObjMeshLoader};
pub use shape::Shape;
pub use transform::{FrameTree, Pose, Transform};

pub use nalgebra::{Isometry3, Matrix4, Point3, UnitQuaternion, Vector3};
