//! Bodies spawned in a world.

use std::collections::BTreeMap;
use std::sync::Arc;

use nalgebra::Isometry3;
use prospect_description::ObjectDescription;
use prospect_types::{BodyId, ConstraintId, JointId, LinkId, LinkKey, WorldId};

use crate::joint::Joint;
use crate::link::Link;

/// A rigid attachment of `child` to a link of the owning object.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub parent_link: LinkKey,
    pub child_link: LinkKey,
    /// Pose of the child link in the parent link frame at attach time.
    pub child_to_parent: Isometry3<f64>,
    pub constraint: ConstraintId,
}

/// A body in a world: its frozen description plus per-world link and joint
/// state.
#[derive(Debug, Clone)]
pub struct Object {
    id: BodyId,
    world: WorldId,
    name: String,
    description: Arc<ObjectDescription>,
    root_link: LinkId,
    links: Vec<Link>,
    joints: Vec<Joint>,
    /// Child body → attachment, for bodies attached to this one.
    attachments: BTreeMap<BodyId, Attachment>,
}

impl Object {
    pub(crate) fn new(
        world: WorldId,
        id: BodyId,
        name: impl Into<String>,
        description: Arc<ObjectDescription>,
        joints: Vec<Joint>,
    ) -> Self {
        let links = description
            .links()
            .iter()
            .enumerate()
            .map(|(i, l)| Link::new(LinkKey::new(world, id, LinkId(i as i32)), l.name.clone()))
            .collect();
        let root_link = LinkId(description.link_index(description.root()).unwrap_or(0) as i32);
        Self {
            id,
            world,
            name: name.into(),
            description,
            root_link,
            links,
            joints,
            attachments: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame name of the object; the root link shares it.
    pub fn tf_frame(&self) -> String {
        format!("{}_{}", self.name, self.id.0)
    }

    pub fn description(&self) -> &Arc<ObjectDescription> {
        &self.description
    }

    pub fn root_link_id(&self) -> LinkId {
        self.root_link
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.description.link_index(name).map(|i| LinkId(i as i32))
    }

    pub fn joint_id(&self, name: &str) -> Option<JointId> {
        self.description.joint_index(name).map(|i| JointId(i as i32))
    }

    pub fn link_key(&self, link: LinkId) -> LinkKey {
        LinkKey::new(self.world, self.id, link)
    }

    pub fn attachments(&self) -> &BTreeMap<BodyId, Attachment> {
        &self.attachments
    }

    pub fn is_attached(&self, child: BodyId) -> bool {
        self.attachments.contains_key(&child)
    }

    pub(crate) fn link_mut(&mut self, link: LinkId) -> Option<&mut Link> {
        self.links.get_mut(link.0 as usize)
    }

    pub(crate) fn links_mut(&mut self) -> &mut [Link] {
        &mut self.links
    }

    pub(crate) fn joint(&self, joint: JointId) -> Option<&Joint> {
        self.joints.get(joint.0 as usize)
    }

    pub(crate) fn joint_mut(&mut self, joint: JointId) -> Option<&mut Joint> {
        self.joints.get_mut(joint.0 as usize)
    }

    pub(crate) fn link(&self, link: LinkId) -> Option<&Link> {
        self.links.get(link.0 as usize)
    }

    pub(crate) fn attachments_mut(&mut self) -> &mut BTreeMap<BodyId, Attachment> {
        &mut self.attachments
    }
}
