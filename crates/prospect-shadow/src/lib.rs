//! `prospect-shadow` – the shadow (prospection) world manager.
//!
//! Speculative queries never touch the live world.  They run against a
//! structurally identical shadow world inside a [`ProspectionScope`], which
//! reverts every shadow mutation when it ends.
//!
//! # Modules
//!
//! - [`prospection`] – [`ProspectionWorld`]: the shadow world, live-world
//!   mirroring, and the Detached/Active state machine.
//! - [`scope`] – [`ProspectionScope`]: the guard that restores the shadow
//!   world on every exit path.
//! - [`correspondence`] – [`Correspondence`]: the live ↔ shadow body map.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use prospect_description::{LinkDescription, ObjectDescription};
//! use prospect_geometry::{Pose, Shape};
//! use prospect_shadow::ProspectionWorld;
//! use prospect_world::{SimBackend, World, WorldConfig};
//!
//! let mut live = World::new(Box::new(SimBackend::new()), WorldConfig::default());
//! let milk = live
//!     .spawn(
//!         "milk",
//!         Arc::new(ObjectDescription::single_link(
//!             "milk",
//!             LinkDescription::new("milk_main").with_shape(Shape::Box { size: [0.1, 0.1, 0.2] }),
//!         )),
//!         &Pose::from_xyz(1.0, 0.0, 0.1),
//!     )
//!     .unwrap();
//!
//! let mut prospection = ProspectionWorld::new(Box::new(SimBackend::new()), WorldConfig::default());
//! {
//!     let mut scope = prospection.enter(&live).unwrap();
//!     let shadow = scope.shadow_body(milk).unwrap();
//!     scope
//!         .shadow_mut()
//!         .set_object_pose(shadow, &Pose::from_xyz(5.0, 0.0, 0.1), true)
//!         .unwrap();
//! } // restored here
//!
//! let shadow = prospection.correspondence().shadow_of(milk).unwrap();
//! assert_eq!(prospection.shadow().object_pose(shadow).unwrap().position.x, 1.0);
//! ```

pub mod correspondence;
pub mod prospection;
pub mod scope;

pub use correspondence::Correspondence;
pub use prospection::{ProspectionState, ProspectionWorld};
pub use scope::ProspectionScope;
