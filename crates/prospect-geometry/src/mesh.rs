//! Triangle meshes, convex hulls, and the mesh-file seam.
//!
//! Mesh files are read through the [`MeshLoader`] trait so that a deployment
//! can plug in whatever format support it has.  [`ObjMeshLoader`] covers
//! Wavefront OBJ, which is also the format [`Mesh::write_obj`] produces.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use nalgebra::{Isometry3, Point3, Vector3};
use prospect_types::ProspectError;
use serde::{Deserialize, Serialize};

use crate::bounding_box::AxisAlignedBoundingBox;

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    pub fn bounding_box(&self) -> Option<AxisAlignedBoundingBox> {
        AxisAlignedBoundingBox::from_points(self.vertices.iter())
    }

    /// Per-axis scaling about the origin.
    pub fn scaled(&self, scale: [f64; 3]) -> Self {
        let s = Vector3::from(scale);
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|v| Point3::from(v.coords.component_mul(&s)))
                .collect(),
            faces: self.faces.clone(),
        }
    }

    pub fn apply_isometry(&mut self, isometry: &Isometry3<f64>) {
        for v in &mut self.vertices {
            *v = isometry.transform_point(v);
        }
    }

    /// The convex hull as a closed, outward-facing triangle mesh.
    ///
    /// Returns `None` when the points are degenerate (fewer than four, or all
    /// coplanar).
    pub fn convex_hull(&self) -> Option<Mesh> {
        convex_hull(&self.vertices)
    }

    /// Parse the vertex and face records of a Wavefront OBJ document.
    /// Polygonal faces are fan-triangulated; other records are ignored.
    pub fn parse_obj(text: &str) -> Result<Self, String> {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => {
                    let coords: Result<Vec<f64>, _> = parts.take(3).map(str::parse).collect();
                    match coords {
                        Ok(c) if c.len() == 3 => vertices.push(Point3::new(c[0], c[1], c[2])),
                        _ => return Err(format!("line {}: malformed vertex", line_no + 1)),
                    }
                }
                Some("f") => {
                    let mut idx = Vec::new();
                    for token in parts {
                        let head = token.split('/').next().unwrap_or(token);
                        let i: i64 = head
                            .parse()
                            .map_err(|_| format!("line {}: malformed face", line_no + 1))?;
                        // OBJ indices are 1-based; negative values count from the end.
                        let resolved = if i < 0 { vertices.len() as i64 + i } else { i - 1 };
                        if resolved < 0 || resolved as usize >= vertices.len() {
                            return Err(format!("line {}: face index out of range", line_no + 1));
                        }
                        idx.push(resolved as usize);
                    }
                    for k in 1..idx.len().saturating_sub(1) {
                        faces.push([idx[0], idx[k], idx[k + 1]]);
                    }
                }
                _ => {}
            }
        }
        Ok(Self { vertices, faces })
    }

    pub fn to_obj_string(&self) -> String {
        let mut out = String::new();
        for v in &self.vertices {
            let _ = writeln!(out, "v {} {} {}", v.x, v.y, v.z);
        }
        for f in &self.faces {
            let _ = writeln!(out, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1);
        }
        out
    }

    pub fn write_obj(&self, path: &Path) -> Result<(), ProspectError> {
        fs::write(path, self.to_obj_string())?;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loader seam
// ────────────────────────────────────────────────────────────────────────────

/// Reads mesh files into [`Mesh`] values.
pub trait MeshLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ProspectError::MeshLoad`] when the file cannot be read or
    /// its format is not understood.
    fn load(&self, path: &Path) -> Result<Mesh, ProspectError>;
}

/// Loads Wavefront OBJ files.  Any other extension is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjMeshLoader;

impl MeshLoader for ObjMeshLoader {
    fn load(&self, path: &Path) -> Result<Mesh, ProspectError> {
        let mesh_err = |reason: String| ProspectError::MeshLoad {
            path: path.display().to_string(),
            reason,
        };
        let is_obj = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("obj"));
        if !is_obj {
            return Err(mesh_err("unsupported mesh format".to_string()));
        }
        let text = fs::read_to_string(path).map_err(|e| mesh_err(e.to_string()))?;
        Mesh::parse_obj(&text).map_err(mesh_err)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Incremental convex hull
// ────────────────────────────────────────────────────────────────────────────

fn face_normal(points: &[Point3<f64>], f: &[usize; 3]) -> Vector3<f64> {
    (points[f[1]] - points[f[0]]).cross(&(points[f[2]] - points[f[0]]))
}

fn convex_hull(points: &[Point3<f64>]) -> Option<Mesh> {
    if points.len() < 4 {
        return None;
    }
    let extent = AxisAlignedBoundingBox::from_points(points.iter())?
        .extents()
        .norm();
    let eps = 1e-9 * extent.max(1.0);

    // Initial tetrahedron from extreme points.
    let p0 = 0;
    let p1 = (0..points.len()).max_by(|&a, &b| {
        let da = (points[a] - points[p0]).norm_squared();
        let db = (points[b] - points[p0]).norm_squared();
        da.total_cmp(&db)
    })?;
    let line = points[p1] - points[p0];
    if line.norm() <= eps {
        return None;
    }
    let p2 = (0..points.len()).max_by(|&a, &b| {
        let da = line.cross(&(points[a] - points[p0])).norm_squared();
        let db = line.cross(&(points[b] - points[p0])).norm_squared();
        da.total_cmp(&db)
    })?;
    let plane_n = line.cross(&(points[p2] - points[p0]));
    if plane_n.norm() <= eps * line.norm() {
        return None;
    }
    let p3 = (0..points.len()).max_by(|&a, &b| {
        let da = plane_n.dot(&(points[a] - points[p0])).abs();
        let db = plane_n.dot(&(points[b] - points[p0])).abs();
        da.total_cmp(&db)
    })?;
    if plane_n.dot(&(points[p3] - points[p0])).abs() <= eps * plane_n.norm() {
        return None;
    }

    let centroid = Point3::from(
        (points[p0].coords + points[p1].coords + points[p2].coords + points[p3].coords) / 4.0,
    );
    let mut faces: Vec<[usize; 3]> = Vec::new();
    for f in [[p0, p1, p2], [p0, p1, p3], [p0, p2, p3], [p1, p2, p3]] {
        let n = face_normal(points, &f);
        if n.dot(&(points[f[0]] - centroid)) < 0.0 {
            faces.push([f[0], f[2], f[1]]);
        } else {
            faces.push(f);
        }
    }

    let seed: HashSet<usize> = [p0, p1, p2, p3].into_iter().collect();
    for (i, p) in points.iter().enumerate() {
        if seed.contains(&i) {
            continue;
        }
        let visible: Vec<bool> = faces
            .iter()
            .map(|f| {
                let n = face_normal(points, f);
                let len = n.norm();
                len > 0.0 && n.dot(&(p - points[f[0]])) / len > eps
            })
            .collect();
        if !visible.iter().any(|&v| v) {
            continue;
        }

        let visible_edges: HashSet<(usize, usize)> = faces
            .iter()
            .zip(&visible)
            .filter(|(_, v)| **v)
            .flat_map(|(f, _)| [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])])
            .collect();
        let horizon: Vec<(usize, usize)> = visible_edges
            .iter()
            .filter(|(a, b)| !visible_edges.contains(&(*b, *a)))
            .copied()
            .collect();

        let mut kept: Vec<[usize; 3]> = faces
            .iter()
            .zip(&visible)
            .filter(|(_, v)| !**v)
            .map(|(f, _)| *f)
            .collect();
        kept.extend(horizon.into_iter().map(|(a, b)| [a, b, i]));
        faces = kept;
    }

    // Compact to the vertices the hull actually uses.
    let mut remap = vec![usize::MAX; points.len()];
    let mut vertices = Vec::new();
    for f in &faces {
        for &v in f {
            if remap[v] == usize::MAX {
                remap[v] = vertices.len();
                vertices.push(points[v]);
            }
        }
    }
    let faces = faces
        .into_iter()
        .map(|f| [remap[f[0]], remap[f[1]], remap[f[2]]])
        .collect();
    Some(Mesh { vertices, faces })
}
