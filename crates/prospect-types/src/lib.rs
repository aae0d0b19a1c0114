use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────────────────────────────────────

/// Identity of a world instance (live or prospection).
///
/// Constraint ids and body ids are only meaningful inside the world that
/// issued them, so every cross-entity key carries the owning `WorldId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(Uuid);

impl WorldId {
    /// Allocate a fresh, process-unique world id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let full = self.0.simple().to_string();
        write!(f, "{}", &full[..8])
    }
}

/// Backend-issued body id.  Segmentation masks report these values per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub i32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Index of a link inside its body (position in the description's link list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub i32);

/// Index of a joint inside its body (position in the description's joint list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointId(pub i32);

/// Backend-issued id of a rigid constraint between two links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub u32);

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constraint#{}", self.0)
    }
}

/// Opaque, monotonically issued handle to a saved world state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateToken(u64);

impl StateToken {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state#{}", self.0)
    }
}

/// Fully qualified reference to a link: world, owning body, and link index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkKey {
    pub world: WorldId,
    pub body: BodyId,
    pub link: LinkId,
}

impl LinkKey {
    pub fn new(world: WorldId, body: BodyId, link: LinkId) -> Self {
        Self { world, body, link }
    }

    /// The same link index on a structurally identical body in another world.
    pub fn rebased(self, world: WorldId, body: BodyId) -> Self {
        Self::new(world, body, self.link)
    }
}

/// Fully qualified reference to a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointKey {
    pub world: WorldId,
    pub body: BodyId,
    pub joint: JointId,
}

impl JointKey {
    pub fn new(world: WorldId, body: BodyId, joint: JointId) -> Self {
        Self { world, body, joint }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Enumerations
// ────────────────────────────────────────────────────────────────────────────

/// Kinematic joint categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    Revolute,
    Prismatic,
    Spherical,
    Planar,
    #[default]
    Fixed,
    Unknown,
    Continuous,
    Floating,
}

impl JointType {
    /// Revolute and continuous joints rotate about their axis.
    pub fn is_rotational(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous)
    }

    /// True for joints whose state is a single scalar position.
    pub fn is_single_dof(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous | Self::Prismatic)
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Revolute => "revolute",
            Self::Prismatic => "prismatic",
            Self::Spherical => "spherical",
            Self::Planar => "planar",
            Self::Fixed => "fixed",
            Self::Unknown => "unknown",
            Self::Continuous => "continuous",
            Self::Floating => "floating",
        };
        f.write_str(s)
    }
}

/// Approach direction hint for grasp-aware reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grasp {
    Front,
    Left,
    Right,
    Top,
    Back,
    Bottom,
}

// ────────────────────────────────────────────────────────────────────────────
// Backend capability result
// ────────────────────────────────────────────────────────────────────────────

/// Result of asking a backend for an optional capability.
///
/// `Unsupported` is an expected answer and always selects a documented
/// fallback; it is never surfaced to callers as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Support<T> {
    Supported(T),
    Unsupported,
}

impl<T> Support<T> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Support<U> {
        match self {
            Self::Supported(v) => Support::Supported(f(v)),
            Self::Unsupported => Support::Unsupported,
        }
    }

    /// Take the supported value, or compute it with `fallback`.
    pub fn or_fallback<E>(self, fallback: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        match self {
            Self::Supported(v) => Ok(v),
            Self::Unsupported => fallback(),
        }
    }

    pub fn supported(self) -> Option<T> {
        match self {
            Self::Supported(v) => Some(v),
            Self::Unsupported => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared by every prospect crate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProspectError {
    #[error("Malformed kinematic tree: {0}")]
    MalformedKinematicTree(String),

    #[error("Unknown object: {0}")]
    UnknownObject(String),

    #[error("Unknown link '{link}' on {object}")]
    UnknownLink { object: String, link: String },

    #[error("Unknown joint '{joint}' on {object}")]
    UnknownJoint { object: String, joint: String },

    #[error("Link {0} has no geometry")]
    LinkHasNoGeometry(String),

    #[error("Geometry of link {link} is not a resolvable mesh (found {geometry})")]
    LinkGeometryHasNoMesh { link: String, geometry: String },

    #[error("Object description for {name} not found (path {path}, extension {extension})")]
    ObjectDescriptionNotFound {
        name: String,
        path: String,
        extension: String,
    },

    #[error("Failed to load mesh {path}: {reason}")]
    MeshLoad { path: String, reason: String },

    #[error("Description format error: {0}")]
    DescriptionFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Constraint partner {link} belongs to a different world than {partner}")]
    CrossWorldConstraint { link: String, partner: String },

    #[error("Unknown constraint {0}")]
    UnknownConstraint(String),

    #[error("Unknown state token {0}")]
    UnknownStateToken(u64),

    #[error("Pose of link {0} is derived from its object and joints and cannot be set")]
    LinkPoseIsDerived(String),

    #[error("No robot description registered")]
    MissingRobotDescription,

    #[error("No robot in world")]
    NoRobot,

    #[error("No inverse kinematics solver configured")]
    NoInverseKinematics,

    #[error("Backend failure: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProspectError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
