//! Parsed description of a single rigid link.

use std::path::{Path, PathBuf};

use prospect_geometry::{AxisAlignedBoundingBox, Mesh, MeshLoader, Pose, Shape};
use prospect_types::ProspectError;
use serde::{Deserialize, Serialize};

/// Geometry and origin of one link, as read from a description file.
///
/// Immutable once the owning object is instantiated in a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescription {
    pub name: String,
    /// Offset of the geometric origin from the link frame.
    #[serde(default)]
    pub origin: Pose,
    #[serde(default)]
    pub geometry: Vec<Shape>,
    /// Directory relative mesh file names are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_dir: Option<PathBuf>,
}

impl LinkDescription {
    /// A link without geometry (e.g. a virtual frame).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: Pose::identity(),
            geometry: Vec::new(),
            mesh_dir: None,
        }
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.geometry.push(shape);
        self
    }

    pub fn with_origin(mut self, origin: Pose) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_mesh_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mesh_dir = Some(dir.into());
        self
    }

    pub fn has_geometry(&self) -> bool {
        !self.geometry.is_empty()
    }

    /// Resolve the file of a mesh shape to an existing path.
    ///
    /// # Errors
    ///
    /// [`ProspectError::LinkGeometryHasNoMesh`] when `shape` is not a mesh
    /// or its file cannot be found.
    pub fn mesh_path(&self, shape: &Shape) -> Result<PathBuf, ProspectError> {
        let file = shape
            .mesh_file()
            .ok_or_else(|| self.no_mesh(shape.kind().to_string()))?;
        let path = Path::new(file);
        let resolved = match &self.mesh_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };
        if resolved.is_file() {
            Ok(resolved)
        } else {
            Err(self.no_mesh(format!("unresolved mesh {}", resolved.display())))
        }
    }

    /// Union of every shape's bounding box, in the link frame.
    ///
    /// # Errors
    ///
    /// - [`ProspectError::LinkHasNoGeometry`] for a link without shapes.
    /// - [`ProspectError::LinkGeometryHasNoMesh`] when a mesh file cannot be
    ///   resolved, or the loader's error when it cannot be read.
    pub fn local_bounding_box(
        &self,
        loader: &dyn MeshLoader,
    ) -> Result<AxisAlignedBoundingBox, ProspectError> {
        let mut boxes = Vec::with_capacity(self.geometry.len());
        for shape in &self.geometry {
            let bb = match shape.primitive_bounding_box() {
                Some(bb) => Some(bb),
                None => {
                    let mesh = loader.load(&self.mesh_path(shape)?)?;
                    shape.mesh_bounding_box(&mesh)
                }
            };
            if let Some(bb) = bb {
                boxes.push(bb.transformed_by(&self.origin.isometry()));
            }
        }
        AxisAlignedBoundingBox::from_multiple(&boxes)
            .ok_or_else(|| ProspectError::LinkHasNoGeometry(self.name.clone()))
    }

    /// The convex hull of the link's single mesh shape, in the link frame.
    ///
    /// # Errors
    ///
    /// - [`ProspectError::LinkHasNoGeometry`] for a link without shapes.
    /// - [`ProspectError::LinkGeometryHasNoMesh`] unless the geometry is
    ///   exactly one resolvable mesh with a non-degenerate hull.
    pub fn local_convex_hull(&self, loader: &dyn MeshLoader) -> Result<Mesh, ProspectError> {
        let shape = match self.geometry.as_slice() {
            [] => return Err(ProspectError::LinkHasNoGeometry(self.name.clone())),
            [shape] => shape,
            shapes => {
                let kinds: Vec<_> = shapes.iter().map(Shape::kind).collect();
                return Err(self.no_mesh(kinds.join(", ")));
            }
        };
        let Shape::Mesh { scale, .. } = shape else {
            return Err(self.no_mesh(shape.kind().to_string()));
        };
        let mut hull = loader
            .load(&self.mesh_path(shape)?)?
            .scaled(*scale)
            .convex_hull()
            .ok_or_else(|| self.no_mesh("degenerate mesh".to_string()))?;
        hull.apply_isometry(&self.origin.isometry());
        Ok(hull)
    }

    fn no_mesh(&self, geometry: String) -> ProspectError {
        ProspectError::LinkGeometryHasNoMesh {
            link: self.name.clone(),
            geometry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use prospect_geometry::{ObjMeshLoader, Point3};

    const CUBE_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
v 0 0 1
v 1 0 1
v 0 1 1
v 1 1 1
f 1 2 4 3
";

    #[test]
    fn bounding_box_unions_shapes_and_applies_origin() {
        let link = LinkDescription::new("table_top")
            .with_shape(Shape::Box { size: [2.0, 1.0, 0.1] })
            .with_shape(Shape::Sphere { radius: 0.25 })
            .with_origin(Pose::from_xyz(0.0, 0.0, 0.5));
        let bb = link.local_bounding_box(&ObjMeshLoader).unwrap();
        assert_relative_eq!(bb.min.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(bb.max.z, 0.75, epsilon = 1e-12);
        assert_relative_eq!(bb.min.z, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn link_without_geometry_is_an_error() {
        let link = LinkDescription::new("virtual");
        assert_eq!(
            link.local_bounding_box(&ObjMeshLoader),
            Err(ProspectError::LinkHasNoGeometry("virtual".into()))
        );
        assert!(matches!(
            link.local_convex_hull(&ObjMeshLoader),
            Err(ProspectError::LinkHasNoGeometry(_))
        ));
    }

    #[test]
    fn unresolved_mesh_path_is_reported() {
        let link = LinkDescription::new("cup").with_shape(Shape::Mesh {
            file_name: "/definitely/not/here.obj".into(),
            scale: [1.0; 3],
        });
        let err = link.local_bounding_box(&ObjMeshLoader).unwrap_err();
        assert!(matches!(err, ProspectError::LinkGeometryHasNoMesh { .. }));
    }

    #[test]
    fn primitive_geometry_has_no_hull() {
        let link = LinkDescription::new("box").with_shape(Shape::Box { size: [1.0; 3] });
        let err = link.local_convex_hull(&ObjMeshLoader).unwrap_err();
        assert_eq!(
            err,
            ProspectError::LinkGeometryHasNoMesh {
                link: "box".into(),
                geometry: "box".into()
            }
        );
    }

    #[test]
    fn relative_mesh_resolves_against_mesh_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cube.obj"), CUBE_OBJ).unwrap();
        let link = LinkDescription::new("cube")
            .with_mesh_dir(dir.path())
            .with_shape(Shape::Mesh {
                file_name: "cube.obj".into(),
                scale: [2.0, 2.0, 2.0],
            });

        let bb = link.local_bounding_box(&ObjMeshLoader).unwrap();
        assert_eq!(bb.max, Point3::new(2.0, 2.0, 2.0));

        let hull = link.local_convex_hull(&ObjMeshLoader).unwrap();
        assert_eq!(hull.vertices.len(), 8);
    }
}
