//! `prospect-reasoning` – spatial reasoning over a shadow world.
//!
//! Every query runs in one prospection scope on the shadow world, so the
//! live world is never touched, and answers come back as live-world body
//! ids.  "No" is an ordinary answer (`false`, `None`, an empty list), not an
//! error.
//!
//! # Modules
//!
//! - [`context`] – [`ReasoningContext`]: the live world, its shadow, the
//!   robot description, and the IK solver for one session.
//! - [`contact`] – `stable`, `contact`, `supporting`,
//!   `prospect_robot_contact`, and [`is_held_object`].
//! - [`visibility`] – `get_visible_objects`, `visible`, `occluding`.
//! - [`reach`] – `reachable`, `blocking`, `link_pose_for_joint_config`.
//! - [`ik`] – the [`InverseKinematics`] collaborator seam.
//! - [`robot`] – [`RobotDescription`]: chains, grippers, cameras, grasps.
//! - [`config`] – [`ProspectConfig`], read from TOML with `PROSPECT_*`
//!   overrides.
//! - [`telemetry`] – `tracing` subscriber and OTLP span export.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use prospect_description::{LinkDescription, ObjectDescription};
//! use prospect_geometry::{Pose, Shape};
//! use prospect_reasoning::ReasoningContext;
//! use prospect_shadow::ProspectionWorld;
//! use prospect_world::{SimBackend, World, WorldConfig};
//!
//! let floor = Arc::new(ObjectDescription::single_link(
//!     "floor",
//!     LinkDescription::new("floor_main").with_shape(Shape::Plane { size: [10.0, 10.0] }),
//! ));
//! let cup = Arc::new(ObjectDescription::single_link(
//!     "cup",
//!     LinkDescription::new("cup_main").with_shape(Shape::Box { size: [0.1, 0.1, 0.1] }),
//! ));
//!
//! let mut live = World::new(Box::new(SimBackend::new()), WorldConfig::default());
//! let floor = live.spawn("floor", floor, &Pose::identity()).unwrap();
//! let cup = live.spawn("cup", cup, &Pose::from_xyz(0.0, 0.0, 0.05)).unwrap();
//!
//! let shadow = ProspectionWorld::new(
//!     Box::new(SimBackend::new().with_static("floor")),
//!     WorldConfig::default(),
//! );
//! let mut ctx = ReasoningContext::new(live, shadow);
//! assert!(ctx.stable(cup).unwrap());
//! assert!(ctx.supporting(cup, floor).is_ok());
//! ```

pub mod config;
pub mod contact;
pub mod context;
pub mod ik;
pub mod reach;
pub mod robot;
pub mod telemetry;
pub mod visibility;

pub use config::{ProspectConfig, ReasoningConfig, TelemetryConfig};
pub use contact::{ContactLinks, is_held_object};
pub use context::ReasoningContext;
pub use ik::{IkSolution, InverseKinematics, ReachTarget};
pub use robot::{CameraDescription, EndEffectorDescription, KinematicChainDescription, RobotDescription};
pub use visibility::VisibilityOptions;
