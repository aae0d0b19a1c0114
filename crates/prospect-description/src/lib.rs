//! `prospect-description` – kinematic descriptions of bodies.
//!
//! A body is described by an [`ObjectDescription`]: its links
//! ([`LinkDescription`]) and the joints ([`JointDescription`]) that connect
//! them into a single rooted tree.  Descriptions are frozen once a body is
//! spawned into a world; only [`ObjectDescription::add_joint`] may extend one
//! beforehand.
//!
//! Parsing foreign robot formats is left to [`DescriptionFormat`]
//! implementations; the crate ships [`TomlDescriptionFormat`] for its own
//! layout and [`DescriptionGenerator`] to turn meshes, native files, or
//! parameter-store entries into description files.

pub mod format;
pub mod generate;
pub mod joint;
pub mod link;
pub mod object;

pub use format::{DescriptionFormat, InMemoryParameterStore, ParameterStore, TomlDescriptionFormat};
pub use generate::{DescriptionGenerator, MESH_EXTENSIONS, MeshPreprocessing};
pub use joint::JointDescription;
pub use link::LinkDescription;
pub use object::{ObjectDescription, file_name_for};
