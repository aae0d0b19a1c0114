//! Joints: owned per-world state and the [`JointView`] read API.

use prospect_description::JointDescription;
use prospect_geometry::Pose;
use prospect_types::{JointId, JointKey, JointType, ProspectError, Support};
use tracing::warn;

use crate::link::LinkView;
use crate::object::Object;
use crate::world::World;

/// Position of a joint plus the tolerance used to compare it.
#[derive(Debug, Clone, Copy)]
pub struct JointState {
    pub position: f64,
    pub acceptable_error: f64,
}

impl PartialEq for JointState {
    /// Equal when the positions differ by no more than `self`'s tolerance.
    fn eq(&self, other: &Self) -> bool {
        (self.position - other.position).abs() <= self.acceptable_error
    }
}

/// A joint instantiated in a world.
#[derive(Debug, Clone)]
pub struct Joint {
    key: JointKey,
    name: String,
    joint_type: JointType,
    acceptable_error: f64,
    /// Last position written or read back.
    position: f64,
}

impl Joint {
    pub(crate) fn new(
        key: JointKey,
        name: impl Into<String>,
        joint_type: JointType,
        acceptable_error: f64,
        position: f64,
    ) -> Self {
        Self {
            key,
            name: name.into(),
            joint_type,
            acceptable_error,
            position,
        }
    }

    pub fn key(&self) -> JointKey {
        self.key
    }

    pub fn id(&self) -> JointId {
        self.key.joint
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    pub fn acceptable_error(&self) -> f64 {
        self.acceptable_error
    }

    /// Last cached position, without asking the backend.
    pub fn cached_position(&self) -> f64 {
        self.position
    }

    pub(crate) fn set_cached_position(&mut self, position: f64) {
        self.position = position;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JointView
// ────────────────────────────────────────────────────────────────────────────

/// Read access to a joint together with its world and owning object.
#[derive(Clone, Copy)]
pub struct JointView<'w> {
    pub(crate) world: &'w World,
    pub(crate) object: &'w Object,
    pub(crate) joint: &'w Joint,
}

impl<'w> JointView<'w> {
    pub fn key(&self) -> JointKey {
        self.joint.key
    }

    pub fn name(&self) -> &'w str {
        &self.joint.name
    }

    pub fn joint_type(&self) -> JointType {
        self.joint.joint_type
    }

    pub fn object(&self) -> &'w Object {
        self.object
    }

    pub fn description(&self) -> &'w JointDescription {
        &self.object.description().joints()[self.joint.id().0 as usize]
    }

    pub fn is_virtual(&self) -> bool {
        self.object.description().is_joint_virtual(&self.joint.name)
    }

    pub fn has_limits(&self) -> bool {
        self.description().has_limits()
    }

    /// `(lower, upper)`, normalised so that `lower <= upper`.
    pub fn limits(&self) -> Option<(f64, f64)> {
        self.description().limits()
    }

    pub fn axis(&self) -> prospect_geometry::Vector3<f64> {
        self.description().axis
    }

    pub fn damping(&self) -> Support<f64> {
        self.description().damping()
    }

    pub fn friction(&self) -> Support<f64> {
        self.description().friction()
    }

    pub fn parent_link(&self) -> Result<LinkView<'w>, ProspectError> {
        self.world
            .link_by_name(self.object.id(), &self.description().parent)
    }

    pub fn child_link(&self) -> Result<LinkView<'w>, ProspectError> {
        self.world.link_by_name(self.object.id(), &self.description().child)
    }

    /// A joint's frame is its child link's frame.
    pub fn tf_frame(&self) -> Result<String, ProspectError> {
        Ok(self.child_link()?.tf_frame())
    }

    pub fn pose(&self) -> Result<Pose, ProspectError> {
        self.child_link()?.pose()
    }

    /// Current position.
    ///
    /// Read from the backend when the world refreshes on read, otherwise the
    /// last written value.
    pub fn position(&self) -> Result<f64, ProspectError> {
        if self.world.config().update_positions_from_sim_on_get {
            self.world
                .backend()
                .get_joint_position(self.object.id(), self.joint.id())
        } else {
            Ok(self.joint.position)
        }
    }

    pub fn current_state(&self) -> Result<JointState, ProspectError> {
        Ok(JointState {
            position: self.position()?,
            acceptable_error: self.joint.acceptable_error,
        })
    }

    pub fn reaction_force_torque(&self) -> Support<[f64; 6]> {
        self.world
            .backend()
            .get_joint_reaction_force_torque(self.object.id(), self.joint.id())
    }

    pub fn applied_motor_torque(&self) -> Support<f64> {
        self.world
            .backend()
            .get_applied_joint_motor_torque(self.object.id(), self.joint.id())
    }
}

impl std::fmt::Debug for JointView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JointView")
            .field("object", &self.object.name())
            .field("joint", &self.joint.name)
            .finish()
    }
}

/// Log a warning when `position` lies outside the joint's limits.
///
/// The write is still applied by the caller; some solvers transiently step
/// past limits.
pub(crate) fn warn_if_out_of_limits(object: &str, description: &JointDescription, position: f64) {
    if let Some((lower, upper)) = description.limits()
        && description.exceeds_limits(position)
    {
        warn!(
            object,
            joint = %description.name,
            position,
            lower,
            upper,
            "joint position outside limits, applying anyway"
        );
    }
}
