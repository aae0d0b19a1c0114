//! Snapshots of a world's mutable state.

use std::collections::BTreeMap;

use nalgebra::Isometry3;
use prospect_geometry::Pose;
use prospect_types::{BodyId, ConstraintId, LinkKey};

use crate::backend::FixedConstraint;
use crate::link::LinkState;
use crate::object::Attachment;

/// A constraint as recorded by the world.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRecord {
    pub parent: LinkKey,
    pub child: LinkKey,
    pub child_to_parent: Isometry3<f64>,
}

impl ConstraintRecord {
    pub(crate) fn to_backend(&self) -> FixedConstraint {
        FixedConstraint {
            parent: (self.parent.body, self.parent.link),
            child: (self.child.body, self.child.link),
            child_to_parent: self.child_to_parent,
        }
    }

    /// True when `key` is one of the two constrained links.
    pub fn involves(&self, key: &LinkKey) -> bool {
        self.parent == *key || self.child == *key
    }

    pub fn involves_body(&self, body: BodyId) -> bool {
        self.parent.body == body || self.child.body == body
    }
}

/// Mutable state of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectState {
    pub pose: Pose,
    /// Indexed like the description's joints.
    pub joint_positions: Vec<f64>,
    /// Indexed like the description's links.
    pub link_states: Vec<LinkState>,
    pub attachments: BTreeMap<BodyId, Attachment>,
}

/// Everything [`World::restore_state`][crate::World::restore_state] needs to
/// reproduce a moment in time.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    pub(crate) backend_state: u64,
    pub objects: BTreeMap<BodyId, ObjectState>,
    pub constraints: BTreeMap<ConstraintId, ConstraintRecord>,
}

impl WorldState {
    pub fn object(&self, body: BodyId) -> Option<&ObjectState> {
        self.objects.get(&body)
    }
}
