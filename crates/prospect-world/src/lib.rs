//! `prospect-world` – the kinematic entity model.
//!
//! A [`World`] instantiates frozen [`ObjectDescription`][prospect_description::ObjectDescription]s
//! as [`Object`]s with per-world [`Link`] and [`Joint`] state, and delegates
//! everything physical to a [`PhysicsBackend`].
//!
//! # Modules
//!
//! - [`world`] – [`World`]: objects, poses, joints, constraints, attachments,
//!   and the saved-state stack.
//! - [`object`] / [`link`] / [`joint`] – entity state and the borrowed
//!   [`LinkView`] / [`JointView`] read APIs.
//! - [`backend`] – the [`PhysicsBackend`] seam.
//! - [`sim`] – [`SimBackend`], an in-process backend for tests and CI.
//! - [`camera`] – rendered images and [`SegmentationMask`].
//! - [`state`] – [`WorldState`] snapshots.
//! - [`config`] – [`WorldConfig`] tunables.

pub mod backend;
pub mod camera;
pub mod config;
pub mod joint;
pub mod link;
pub mod object;
pub mod sim;
pub mod state;
pub mod world;

pub use backend::{ContactPoint, FixedConstraint, PhysicsBackend};
pub use camera::{BACKGROUND_ID, CameraImages, SegmentationMask};
pub use config::WorldConfig;
pub use joint::{Joint, JointState, JointView};
pub use link::{Link, LinkState, LinkView};
pub use object::{Attachment, Object};
pub use sim::{ImageSettings, SimBackend};
pub use state::{ConstraintRecord, ObjectState, WorldState};
pub use world::World;
