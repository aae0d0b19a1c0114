//! Link geometry: primitives and mesh references.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::bounding_box::AxisAlignedBoundingBox;
use crate::mesh::Mesh;

fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

/// One visual/collision shape of a link, expressed in the link's geometry frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// Full edge lengths along X, Y, Z.
    Box { size: [f64; 3] },
    Sphere { radius: f64 },
    /// Axis along Z.
    Cylinder { radius: f64, length: f64 },
    /// Axis along Z; `length` excludes the hemispherical caps.
    Capsule { radius: f64, length: f64 },
    /// A finite patch of the XY plane.
    Plane { size: [f64; 2] },
    Mesh {
        file_name: String,
        #[serde(default = "unit_scale")]
        scale: [f64; 3],
    },
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Box { .. } => "box",
            Self::Sphere { .. } => "sphere",
            Self::Cylinder { .. } => "cylinder",
            Self::Capsule { .. } => "capsule",
            Self::Plane { .. } => "plane",
            Self::Mesh { .. } => "mesh",
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self, Self::Mesh { .. })
    }

    /// The mesh file this shape references, if any.
    pub fn mesh_file(&self) -> Option<&str> {
        match self {
            Self::Mesh { file_name, .. } => Some(file_name),
            _ => None,
        }
    }

    /// Local bounding box of a primitive.  `None` for meshes, whose extent
    /// depends on the loaded file (see [`Shape::mesh_bounding_box`]).
    pub fn primitive_bounding_box(&self) -> Option<AxisAlignedBoundingBox> {
        let size = match *self {
            Self::Box { size } => Vector3::from(size),
            Self::Sphere { radius } => Vector3::repeat(2.0 * radius),
            Self::Cylinder { radius, length } => Vector3::new(2.0 * radius, 2.0 * radius, length),
            Self::Capsule { radius, length } => {
                Vector3::new(2.0 * radius, 2.0 * radius, length + 2.0 * radius)
            }
            Self::Plane { size } => Vector3::new(size[0], size[1], 0.0),
            Self::Mesh { .. } => return None,
        };
        Some(AxisAlignedBoundingBox::centred(size))
    }

    /// Local bounding box of a mesh shape once its file has been loaded.
    pub fn mesh_bounding_box(&self, mesh: &Mesh) -> Option<AxisAlignedBoundingBox> {
        match self {
            Self::Mesh { scale, .. } => mesh.scaled(*scale).bounding_box(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn box_bounding_box_is_centred() {
        let bb = Shape::Box { size: [2.0, 4.0, 6.0] }
            .primitive_bounding_box()
            .unwrap();
        assert_eq!(bb.min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(bb.max, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn capsule_includes_caps() {
        let bb = Shape::Capsule {
            radius: 0.5,
            length: 1.0,
        }
        .primitive_bounding_box()
        .unwrap();
        assert!((bb.extents().z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn mesh_has_no_primitive_box() {
        let shape = Shape::Mesh {
            file_name: "cup.obj".into(),
            scale: [1.0; 3],
        };
        assert!(shape.primitive_bounding_box().is_none());
        assert_eq!(shape.mesh_file(), Some("cup.obj"));
    }

    #[test]
    fn mesh_bounding_box_applies_scale() {
        let mesh = Mesh::new(
            vec![Point3::new(-1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 2.0)],
            Vec::new(),
        );
        let shape = Shape::Mesh {
            file_name: "m.obj".into(),
            scale: [0.5, 0.5, 0.5],
        };
        let bb = shape.mesh_bounding_box(&mesh).unwrap();
        assert_eq!(bb.max, Point3::new(0.5, 0.5, 1.0));
    }
}
