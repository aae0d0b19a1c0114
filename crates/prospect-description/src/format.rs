//! Description file formats and the external parameter store.
//!
//! A [`DescriptionFormat`] turns a mesh, a description file, or a
//! parameter-store entry into a native description file on disk.  The
//! bundled [`TomlDescriptionFormat`] writes the TOML layout understood by
//! [`ObjectDescription::from_toml_str`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use prospect_geometry::Shape;
use prospect_types::ProspectError;
use tracing::debug;

use crate::link::LinkDescription;
use crate::object::ObjectDescription;

// ────────────────────────────────────────────────────────────────────────────
// Parameter store
// ────────────────────────────────────────────────────────────────────────────

/// A key/value store descriptions can be published to and read from
/// (e.g. a robot's parameter server).
pub trait ParameterStore: Send + Sync {
    /// The raw description text stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

/// Process-local [`ParameterStore`].
#[derive(Debug, Default)]
pub struct InMemoryParameterStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), value.into());
        }
    }
}

impl ParameterStore for InMemoryParameterStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Format trait
// ────────────────────────────────────────────────────────────────────────────

/// A concrete description file format.
pub trait DescriptionFormat: Send + Sync {
    /// Extension of native files, including the leading dot.
    fn file_extension(&self) -> &str;

    /// Parse description text in this format.
    fn parse_str(&self, text: &str) -> Result<ObjectDescription, ProspectError>;

    /// Serialise a description in this format.
    fn render(&self, description: &ObjectDescription) -> Result<String, ProspectError>;

    /// Read and parse a description file.
    fn parse_file(&self, path: &Path) -> Result<ObjectDescription, ProspectError> {
        let text = fs::read_to_string(path)?;
        self.parse_str(&text)
    }

    /// Write a single-link description around the mesh at `mesh_path`.
    fn generate_from_mesh_file(
        &self,
        mesh_path: &Path,
        name: &str,
        save_path: &Path,
    ) -> Result<(), ProspectError> {
        let absolute = fs::canonicalize(mesh_path)?;
        let link = LinkDescription::new(format!("{name}_main")).with_shape(Shape::Mesh {
            file_name: absolute.display().to_string(),
            scale: [1.0; 3],
        });
        let description = ObjectDescription::single_link(name, link);
        fs::write(save_path, self.render(&description)?)?;
        Ok(())
    }

    /// Copy a native description to `save_path`, optionally anchoring its
    /// relative mesh paths at the source file's directory.
    fn generate_from_description_file(
        &self,
        path: &Path,
        save_path: &Path,
        make_mesh_paths_absolute: bool,
    ) -> Result<(), ProspectError> {
        let mut description = self.parse_file(path)?;
        if make_mesh_paths_absolute {
            let source = fs::canonicalize(path)?;
            if let Some(dir) = source.parent() {
                description.make_mesh_paths_absolute(dir);
            }
        }
        fs::write(save_path, self.render(&description)?)?;
        Ok(())
    }

    /// Fetch the description stored under `name` and write it to `save_path`.
    fn generate_from_parameter_server(
        &self,
        store: &dyn ParameterStore,
        name: &str,
        save_path: &Path,
    ) -> Result<(), ProspectError> {
        let text = store
            .get(name)
            .ok_or_else(|| ProspectError::UnknownObject(name.to_string()))?;
        let description = self.parse_str(&text)?;
        debug!(name, links = description.links().len(), "description read from parameter store");
        fs::write(save_path, self.render(&description)?)?;
        Ok(())
    }
}

/// The native TOML layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlDescriptionFormat;

impl DescriptionFormat for TomlDescriptionFormat {
    fn file_extension(&self) -> &str {
        ".toml"
    }

    fn parse_str(&self, text: &str) -> Result<ObjectDescription, ProspectError> {
        ObjectDescription::from_toml_str(text)
    }

    fn render(&self, description: &ObjectDescription) -> Result<String, ProspectError> {
        description.to_toml_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_store_roundtrip() {
        let store = InMemoryParameterStore::new();
        assert!(store.get("robot_description").is_none());
        store.set("robot_description", "name = \"r\"");
        assert_eq!(store.get("robot_description").as_deref(), Some("name = \"r\""));
    }

    #[test]
    fn mesh_file_becomes_single_link_description() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = dir.path().join("bowl.obj");
        fs::write(&mesh, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let save = dir.path().join("bowl.toml");

        TomlDescriptionFormat
            .generate_from_mesh_file(&mesh, "bowl", &save)
            .unwrap();

        let d = TomlDescriptionFormat.parse_file(&save).unwrap();
        assert_eq!(d.name(), "bowl");
        assert_eq!(d.root(), "bowl_main");
        let file = d.links()[0].geometry[0].mesh_file().unwrap();
        assert!(Path::new(file).is_absolute());
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryParameterStore::new();
        let err = TomlDescriptionFormat
            .generate_from_parameter_server(&store, "pr2", &dir.path().join("pr2.toml"))
            .unwrap_err();
        assert_eq!(err, ProspectError::UnknownObject("pr2".into()));
    }
}
