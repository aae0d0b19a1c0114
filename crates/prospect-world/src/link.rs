//! Links: owned per-world state and the [`LinkView`] read API.

use std::collections::BTreeMap;

use prospect_description::LinkDescription;
use prospect_geometry::{AxisAlignedBoundingBox, FrameTree, Mesh, Pose, RotatedBoundingBox, Transform};
use prospect_types::{ConstraintId, LinkId, LinkKey, ProspectError};

use crate::object::Object;
use crate::world::World;

/// Mutable state of a link: the constraints it takes part in.
///
/// Poses are never stored; they are always read from the world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    /// Partner link → constraint id.
    pub constraint_ids: BTreeMap<LinkKey, ConstraintId>,
}

/// A link instantiated in a world.
#[derive(Debug, Clone)]
pub struct Link {
    key: LinkKey,
    name: String,
    constraint_ids: BTreeMap<LinkKey, ConstraintId>,
}

impl Link {
    pub(crate) fn new(key: LinkKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            constraint_ids: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> LinkKey {
        self.key
    }

    pub fn id(&self) -> LinkId {
        self.key.link
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraint_ids(&self) -> &BTreeMap<LinkKey, ConstraintId> {
        &self.constraint_ids
    }

    pub fn current_state(&self) -> LinkState {
        LinkState {
            constraint_ids: self.constraint_ids.clone(),
        }
    }

    /// Replace the link's state.
    ///
    /// Unchanged state is a no-op.  Otherwise every recorded constraint
    /// partner must live in the same world as the partner at the same position
    /// of the incoming state.
    ///
    /// # Errors
    ///
    /// [`ProspectError::CrossWorldConstraint`] on a world mismatch; the link
    /// is left unchanged.
    pub fn set_current_state(&mut self, state: LinkState) -> Result<(), ProspectError> {
        if state.constraint_ids == self.constraint_ids {
            return Ok(());
        }
        for (current, incoming) in self.constraint_ids.keys().zip(state.constraint_ids.keys()) {
            if current.world != incoming.world {
                return Err(ProspectError::CrossWorldConstraint {
                    link: format!("{}@{}", self.name, current.world),
                    partner: format!("{:?}@{}", incoming.link, incoming.world),
                });
            }
        }
        self.constraint_ids = state.constraint_ids;
        Ok(())
    }

    pub(crate) fn add_constraint(&mut self, partner: LinkKey, id: ConstraintId) {
        self.constraint_ids.insert(partner, id);
    }

    pub(crate) fn remove_constraint(&mut self, partner: &LinkKey) -> Option<ConstraintId> {
        self.constraint_ids.remove(partner)
    }

    pub(crate) fn remap_constraints(&mut self, remap: &BTreeMap<ConstraintId, ConstraintId>) {
        for id in self.constraint_ids.values_mut() {
            if let Some(new_id) = remap.get(id) {
                *id = *new_id;
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LinkView
// ────────────────────────────────────────────────────────────────────────────

/// Read access to a link together with its world and owning object.
#[derive(Clone, Copy)]
pub struct LinkView<'w> {
    pub(crate) world: &'w World,
    pub(crate) object: &'w Object,
    pub(crate) link: &'w Link,
}

impl<'w> LinkView<'w> {
    pub fn key(&self) -> LinkKey {
        self.link.key
    }

    pub fn id(&self) -> LinkId {
        self.link.key.link
    }

    pub fn name(&self) -> &'w str {
        &self.link.name
    }

    pub fn object(&self) -> &'w Object {
        self.object
    }

    pub fn description(&self) -> &'w LinkDescription {
        &self.object.description().links()[self.id().0 as usize]
    }

    pub fn state(&self) -> &'w Link {
        self.link
    }

    /// True when this link is the object's root; its pose and frame alias the
    /// object's.
    pub fn is_root(&self) -> bool {
        self.id() == self.object.root_link_id()
    }

    pub fn is_only_link(&self) -> bool {
        self.object.links().len() == 1
    }

    pub fn tf_frame(&self) -> String {
        if self.is_root() {
            self.object.tf_frame()
        } else {
            format!("{}/{}", self.object.tf_frame(), self.link.name)
        }
    }

    /// Current pose in the world frame.
    pub fn pose(&self) -> Result<Pose, ProspectError> {
        if self.is_root() {
            self.world.object_pose(self.object.id())
        } else {
            self.world.backend().get_link_pose(self.object.id(), self.id())
        }
    }

    /// The transform from the world frame to this link's frame.
    pub fn transform(&self) -> Result<Transform, ProspectError> {
        Ok(self.pose()?.to_transform(self.tf_frame()))
    }

    /// Offset between the link frame and its geometric origin.
    pub fn get_origin_transform(&self) -> Transform {
        let frame = self.tf_frame();
        Transform {
            child_frame: format!("{frame}/origin"),
            frame,
            isometry: self.description().origin.isometry(),
        }
    }

    /// This link's pose expressed in `other`'s frame.
    pub fn get_pose_wrt_link(&self, other: &LinkView<'_>) -> Result<Pose, ProspectError> {
        Ok(self.get_transform_from_link(other)?.to_pose())
    }

    /// `other` frame → this frame, looked up through a [`FrameTree`] holding
    /// both link frames under the frame their poses are expressed in.
    pub fn get_transform_from_link(&self, other: &LinkView<'_>) -> Result<Transform, ProspectError> {
        let source = other.tf_frame();
        let target = self.tf_frame();
        let mut frames = FrameTree::new();
        for (frame, pose) in [(&source, other.pose()?), (&target, self.pose()?)] {
            if *frame != pose.frame {
                frames.set_transform(pose.to_transform(frame.as_str()));
            }
        }
        frames.lookup(&source, &target).ok_or_else(|| {
            ProspectError::MalformedKinematicTree(format!("frames {source} and {target} are not connected"))
        })
    }

    /// This frame → `other` frame; the inverse of
    /// [`get_transform_from_link`](Self::get_transform_from_link).
    pub fn get_transform_to_link(&self, other: &LinkView<'_>) -> Result<Transform, ProspectError> {
        other.get_transform_from_link(self)
    }

    pub fn get_transform_to_root_link(&self) -> Result<Transform, ProspectError> {
        self.get_transform_to_link(&self.root_link()?)
    }

    pub fn get_transform_from_root_link(&self) -> Result<Transform, ProspectError> {
        self.get_transform_from_link(&self.root_link()?)
    }

    fn root_link(&self) -> Result<LinkView<'w>, ProspectError> {
        self.world.root_link(self.object.id())
    }

    /// Object pose that puts this link at `link_pose`.
    pub fn get_object_pose_given_link_pose(&self, link_pose: &Pose) -> Result<Pose, ProspectError> {
        let to_root = self.get_transform_to_root_link()?;
        Ok(link_pose
            .to_transform(self.tf_frame())
            .compose(&to_root)
            .to_pose())
    }

    /// Pose this link would have if the object were at `object_pose`.
    pub fn get_pose_given_object_pose(&self, object_pose: &Pose) -> Result<Pose, ProspectError> {
        let from_root = self.get_transform_from_root_link()?;
        Ok(object_pose
            .to_transform(self.object.tf_frame())
            .compose(&from_root)
            .to_pose())
    }

    /// World-frame bounding box (or the local one when
    /// `transform_to_link_pose` is false and the backend cannot answer).
    ///
    /// # Errors
    ///
    /// [`ProspectError::LinkHasNoGeometry`] or
    /// [`ProspectError::LinkGeometryHasNoMesh`] from the geometric fallback.
    pub fn get_axis_aligned_bounding_box(
        &self,
        transform_to_link_pose: bool,
    ) -> Result<AxisAlignedBoundingBox, ProspectError> {
        self.world
            .backend()
            .get_link_axis_aligned_bounding_box(self.object.id(), self.id())
            .or_fallback(|| {
                let local = self.description().local_bounding_box(self.world.mesh_loader())?;
                if transform_to_link_pose {
                    Ok(local.transformed_by(&self.pose()?.isometry()))
                } else {
                    Ok(local)
                }
            })
    }

    pub fn get_rotated_bounding_box(&self) -> Result<RotatedBoundingBox, ProspectError> {
        self.world
            .backend()
            .get_link_rotated_bounding_box(self.object.id(), self.id())
            .or_fallback(|| {
                let local = self.description().local_bounding_box(self.world.mesh_loader())?;
                Ok(RotatedBoundingBox::from_axis_aligned(local, &self.transform()?))
            })
    }

    /// World-frame convex hull of the link's mesh.
    pub fn get_convex_hull(&self) -> Result<Mesh, ProspectError> {
        self.world
            .backend()
            .get_body_convex_hull(self.object.id(), self.id())
            .or_fallback(|| {
                let mut hull = self.description().local_convex_hull(self.world.mesh_loader())?;
                hull.apply_isometry(&self.pose()?.isometry());
                Ok(hull)
            })
    }

    pub fn current_state(&self) -> LinkState {
        self.link.current_state()
    }
}

impl std::fmt::Debug for LinkView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkView")
            .field("object", &self.object.name())
            .field("link", &self.link.name)
            .finish()
    }
}
