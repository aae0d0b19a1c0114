//! Turning arbitrary source files into native description files.

use std::fs;
use std::path::{Path, PathBuf};

use prospect_geometry::{MeshLoader, Transform};
use prospect_types::ProspectError;
use tracing::{debug, warn};

use crate::format::{DescriptionFormat, ParameterStore};

/// Extensions treated as raw meshes rather than descriptions.
pub const MESH_EXTENSIONS: [&str; 4] = [".obj", ".stl", ".dae", ".ply"];

/// Optional mesh preprocessing applied before generating from a mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshPreprocessing {
    /// Uniform scale factor.
    pub scale: Option<f64>,
    /// Rigid transform applied to every vertex after scaling.
    pub transform: Option<Transform>,
}

impl MeshPreprocessing {
    fn is_identity(&self) -> bool {
        self.scale.is_none() && self.transform.is_none()
    }
}

/// Generates native description files with a chosen format.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use prospect_description::{DescriptionGenerator, MeshPreprocessing, TomlDescriptionFormat};
/// use prospect_geometry::ObjMeshLoader;
///
/// let generator = DescriptionGenerator::new(&TomlDescriptionFormat, &ObjMeshLoader);
/// generator
///     .generate_description_from_file(
///         Path::new("meshes/milk.obj"),
///         "milk",
///         ".obj",
///         Path::new("/tmp/cache/milk.toml"),
///         &MeshPreprocessing::default(),
///     )
///     .unwrap();
/// ```
pub struct DescriptionGenerator<'a> {
    format: &'a dyn DescriptionFormat,
    mesh_loader: &'a dyn MeshLoader,
    parameter_store: Option<&'a dyn ParameterStore>,
}

impl<'a> DescriptionGenerator<'a> {
    pub fn new(format: &'a dyn DescriptionFormat, mesh_loader: &'a dyn MeshLoader) -> Self {
        Self {
            format,
            mesh_loader,
            parameter_store: None,
        }
    }

    pub fn with_parameter_store(mut self, store: &'a dyn ParameterStore) -> Self {
        self.parameter_store = Some(store);
        self
    }

    /// Generate the description of `name` from `path` and write it to
    /// `save_path`, dispatching on `extension`:
    ///
    /// - a mesh extension preprocesses the mesh (`.ply` files and any
    ///   requested scale or transform are re-exported as OBJ next to
    ///   `save_path`) and wraps it in a single-link description;
    /// - the native extension copies the description with absolute mesh paths;
    /// - anything else is looked up in the parameter store under `name`,
    ///   logging a warning when that fails.
    ///
    /// # Errors
    ///
    /// [`ProspectError::ObjectDescriptionNotFound`] when no non-empty file
    /// exists at `save_path` afterwards, and mesh loading or I/O errors from
    /// the mesh and native branches.
    pub fn generate_description_from_file(
        &self,
        path: &Path,
        name: &str,
        extension: &str,
        save_path: &Path,
        preprocessing: &MeshPreprocessing,
    ) -> Result<(), ProspectError> {
        if let Some(dir) = save_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        if MESH_EXTENSIONS.contains(&extension) {
            let mesh_path = if extension == ".ply" || !preprocessing.is_identity() {
                self.preprocess_mesh(path, save_path, preprocessing)?
            } else {
                path.to_path_buf()
            };
            self.format.generate_from_mesh_file(&mesh_path, name, save_path)?;
        } else if extension == self.format.file_extension() {
            self.format.generate_from_description_file(path, save_path, true)?;
        } else {
            match self.parameter_store {
                Some(store) => {
                    if let Err(e) =
                        self.format.generate_from_parameter_server(store, name, save_path)
                    {
                        warn!(name, error = %e, "could not read description from parameter store");
                    }
                }
                None => warn!(name, "no parameter store registered for description lookup"),
            }
        }

        if !description_file_is_readable(save_path) {
            return Err(ProspectError::ObjectDescriptionNotFound {
                name: name.to_string(),
                path: path.display().to_string(),
                extension: extension.to_string(),
            });
        }
        debug!(name, path = %save_path.display(), "description generated");
        Ok(())
    }

    fn preprocess_mesh(
        &self,
        path: &Path,
        save_path: &Path,
        preprocessing: &MeshPreprocessing,
    ) -> Result<PathBuf, ProspectError> {
        let mut mesh = self.mesh_loader.load(path)?;
        if let Some(scale) = preprocessing.scale {
            mesh = mesh.scaled([scale; 3]);
        }
        if let Some(transform) = &preprocessing.transform {
            mesh.apply_isometry(&transform.isometry);
        }
        let out = save_path.with_extension("obj");
        mesh.write_obj(&out)?;
        debug!(source = %path.display(), out = %out.display(), "mesh preprocessed");
        Ok(out)
    }
}

fn description_file_is_readable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{InMemoryParameterStore, TomlDescriptionFormat};
    use crate::object::ObjectDescription;
    use prospect_geometry::{MeshLoader, ObjMeshLoader, UnitQuaternion, Vector3};

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\nf 1 2 3\nf 1 2 4\n";

    #[test]
    fn mesh_source_generates_description() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = dir.path().join("box.obj");
        fs::write(&mesh, TRIANGLE).unwrap();
        let save = dir.path().join("cache").join("box.toml");

        DescriptionGenerator::new(&TomlDescriptionFormat, &ObjMeshLoader)
            .generate_description_from_file(&mesh, "box", ".obj", &save, &MeshPreprocessing::default())
            .unwrap();

        let d = ObjectDescription::from_toml_str(&fs::read_to_string(&save).unwrap()).unwrap();
        assert_eq!(d.root(), "box_main");
    }

    #[test]
    fn scaled_mesh_is_reexported() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = dir.path().join("box.obj");
        fs::write(&mesh, TRIANGLE).unwrap();
        let save = dir.path().join("out").join("box.toml");
        let preprocessing = MeshPreprocessing {
            scale: Some(2.0),
            transform: Some(Transform::new(
                Vector3::new(0.0, 0.0, 1.0),
                UnitQuaternion::identity(),
                "map",
                "box",
            )),
        };

        DescriptionGenerator::new(&TomlDescriptionFormat, &ObjMeshLoader)
            .generate_description_from_file(&mesh, "box", ".obj", &save, &preprocessing)
            .unwrap();

        let exported = ObjMeshLoader.load(&save.with_extension("obj")).unwrap();
        let bb = exported.bounding_box().unwrap();
        assert!((bb.max.x - 2.0).abs() < 1e-9);
        assert!((bb.min.z - 1.0).abs() < 1e-9);
        assert!((bb.max.z - 3.0).abs() < 1e-9);
    }

    #[test]
    fn native_description_is_copied_with_absolute_meshes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("cup.toml");
        fs::write(
            &src,
            r#"
name = "cup"

[[link]]
name = "cup_main"
geometry = [{ type = "mesh", file_name = "cup.obj" }]
"#,
        )
        .unwrap();
        let save = dir.path().join("cache").join("cup.toml");

        DescriptionGenerator::new(&TomlDescriptionFormat, &ObjMeshLoader)
            .generate_description_from_file(&src, "cup", ".toml", &save, &MeshPreprocessing::default())
            .unwrap();

        let d = ObjectDescription::from_toml_str(&fs::read_to_string(&save).unwrap()).unwrap();
        let file = d.links()[0].geometry[0].mesh_file().unwrap();
        assert!(Path::new(file).is_absolute());
        assert!(file.ends_with("cup.obj"));
    }

    #[test]
    fn parameter_store_is_used_for_foreign_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryParameterStore::new();
        store.set(
            "pr2",
            "name = \"pr2\"\n\n[[link]]\nname = \"base_link\"\n",
        );
        let save = dir.path().join("pr2.toml");

        DescriptionGenerator::new(&TomlDescriptionFormat, &ObjMeshLoader)
            .with_parameter_store(&store)
            .generate_description_from_file(
                Path::new("pr2.urdf"),
                "pr2",
                ".urdf",
                &save,
                &MeshPreprocessing::default(),
            )
            .unwrap();
        assert!(save.is_file());
    }

    #[test]
    fn missing_description_reports_name_path_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let err = DescriptionGenerator::new(&TomlDescriptionFormat, &ObjMeshLoader)
            .generate_description_from_file(
                Path::new("/robots/ghost.urdf"),
                "ghost",
                ".urdf",
                &dir.path().join("ghost.toml"),
                &MeshPreprocessing::default(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ProspectError::ObjectDescriptionNotFound {
                name: "ghost".into(),
                path: "/robots/ghost.urdf".into(),
                extension: ".urdf".into(),
            }
        );
    }
}
