//! [`World`] – the kinematic entity model over one physics backend.
//!
//! The world owns every spawned [`Object`], the constraint table, and the
//! stack of saved states.  Physical state (poses, joint positions, contacts,
//! images) lives in the [`PhysicsBackend`]; the world keeps its own
//! bookkeeping consistent with it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use prospect_description::{LinkDescription, ObjectDescription};
//! use prospect_geometry::{Pose, Shape};
//! use prospect_world::{SimBackend, World, WorldConfig};
//!
//! let mut world = World::new(Box::new(SimBackend::new()), WorldConfig::default());
//! let milk = Arc::new(ObjectDescription::single_link(
//!     "milk",
//!     LinkDescription::new("milk_main").with_shape(Shape::Box { size: [0.1, 0.1, 0.2] }),
//! ));
//! let id = world.spawn("milk", milk, &Pose::from_xyz(1.0, 0.0, 0.1)).unwrap();
//!
//! let token = world.save_state().unwrap();
//! world.set_object_pose(id, &Pose::from_xyz(3.0, 0.0, 0.1), true).unwrap();
//! world.restore_state(token).unwrap();
//! assert!((world.object_pose(id).unwrap().position.x - 1.0).abs() < 1e-9);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Arc;

use nalgebra::Vector3;
use prospect_description::ObjectDescription;
use prospect_geometry::{MeshLoader, ObjMeshLoader, Pose, Transform};
use prospect_types::{
    BodyId, ConstraintId, JointId, JointKey, LinkKey, ProspectError, StateToken, Support, WorldId,
};
use tracing::{debug, warn};

use crate::backend::{ContactPoint, PhysicsBackend};
use crate::camera::CameraImages;
use crate::config::WorldConfig;
use crate::joint::{Joint, JointView, warn_if_out_of_limits};
use crate::link::{LinkState, LinkView};
use crate::object::{Attachment, Object};
use crate::state::{ConstraintRecord, ObjectState, WorldState};

/// A simulated world: objects, constraints, and saved states over a backend.
pub struct World {
    id: WorldId,
    config: WorldConfig,
    is_prospection: bool,
    backend: Box<dyn PhysicsBackend>,
    mesh_loader: Arc<dyn MeshLoader>,
    objects: BTreeMap<BodyId, Object>,
    robot: Option<BodyId>,
    constraints: BTreeMap<ConstraintId, ConstraintRecord>,
    saved_states: BTreeMap<StateToken, WorldState>,
    next_token: u64,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("backend", &self.backend.name())
            .field("is_prospection", &self.is_prospection)
            .field("objects", &self.objects.len())
            .field("saved_states", &self.saved_states.len())
            .finish()
    }
}

impl World {
    pub fn new(backend: Box<dyn PhysicsBackend>, config: WorldConfig) -> Self {
        Self {
            id: WorldId::new(),
            config,
            is_prospection: false,
            backend,
            mesh_loader: Arc::new(ObjMeshLoader),
            objects: BTreeMap::new(),
            robot: None,
            constraints: BTreeMap::new(),
            saved_states: BTreeMap::new(),
            next_token: 0,
        }
    }

    /// Replace the loader used by geometric fallbacks.
    pub fn with_mesh_loader(mut self, loader: Arc<dyn MeshLoader>) -> Self {
        self.mesh_loader = loader;
        self
    }

    /// Mark this world as a prospection (shadow) world.
    pub fn into_prospection(mut self) -> Self {
        self.is_prospection = true;
        self
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn is_prospection(&self) -> bool {
        self.is_prospection
    }

    pub fn backend(&self) -> &dyn PhysicsBackend {
        self.backend.as_ref()
    }

    pub fn mesh_loader(&self) -> &dyn MeshLoader {
        self.mesh_loader.as_ref()
    }

    // ── objects ─────────────────────────────────────────────────────────────

    /// Spawn a body from a frozen description.
    ///
    /// # Errors
    ///
    /// Propagates backend load failures.
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        description: Arc<ObjectDescription>,
        pose: &Pose,
    ) -> Result<BodyId, ProspectError> {
        let name = name.into();
        let body = self.backend.load_object(Arc::clone(&description), pose)?;
        let mut joints = Vec::with_capacity(description.joints().len());
        for (i, jd) in description.joints().iter().enumerate() {
            let id = JointId(i as i32);
            let position = self.backend.get_joint_position(body, id)?;
            joints.push(Joint::new(
                JointKey::new(self.id, body, id),
                jd.name.clone(),
                jd.joint_type,
                self.config.joint_tolerance(jd.joint_type),
                position,
            ));
        }
        debug!(world = %self.id, %body, name = %name, "object spawned");
        self.objects
            .insert(body, Object::new(self.id, body, name, description, joints));
        Ok(body)
    }

    /// Spawn a body and register it as this world's robot.
    pub fn spawn_robot(
        &mut self,
        name: impl Into<String>,
        description: Arc<ObjectDescription>,
        pose: &Pose,
    ) -> Result<BodyId, ProspectError> {
        let body = self.spawn(name, description, pose)?;
        self.robot = Some(body);
        Ok(body)
    }

    pub fn set_robot(&mut self, body: BodyId) -> Result<(), ProspectError> {
        self.object(body)?;
        self.robot = Some(body);
        Ok(())
    }

    pub fn robot(&self) -> Option<BodyId> {
        self.robot
    }

    /// Remove a body, its attachments, and every constraint touching it.
    pub fn remove_object(&mut self, body: BodyId) -> Result<(), ProspectError> {
        self.object(body)?;
        let touching: Vec<_> = self
            .constraints
            .iter()
            .filter(|(_, c)| c.involves_body(body))
            .map(|(id, _)| *id)
            .collect();
        for id in touching {
            self.remove_constraint_by_id(id)?;
        }
        for object in self.objects.values_mut() {
            object.attachments_mut().remove(&body);
        }
        self.backend.remove_object(body)?;
        self.objects.remove(&body);
        if self.robot == Some(body) {
            self.robot = None;
        }
        debug!(world = %self.id, %body, "object removed");
        Ok(())
    }

    /// Every object, in spawn (id) order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub fn object_ids(&self) -> Vec<BodyId> {
        self.objects.keys().copied().collect()
    }

    pub fn object(&self, body: BodyId) -> Result<&Object, ProspectError> {
        self.objects
            .get(&body)
            .ok_or_else(|| ProspectError::UnknownObject(format!("{body} in world {}", self.id)))
    }

    fn object_mut(&mut self, body: BodyId) -> Result<&mut Object, ProspectError> {
        let world = self.id;
        self.objects
            .get_mut(&body)
            .ok_or_else(|| ProspectError::UnknownObject(format!("{body} in world {world}")))
    }

    pub fn object_by_name(&self, name: &str) -> Option<&Object> {
        self.objects.values().find(|o| o.name() == name)
    }

    /// Resolve a segmentation-mask value to an object.
    pub fn get_object_by_id(&self, id: i32) -> Option<&Object> {
        self.objects.get(&BodyId(id))
    }

    // ── links and joints ────────────────────────────────────────────────────

    fn check_world(&self, world: WorldId, what: &str) -> Result<(), ProspectError> {
        if world == self.id {
            Ok(())
        } else {
            Err(ProspectError::UnknownObject(format!(
                "{what} belongs to world {world}, not {}",
                self.id
            )))
        }
    }

    pub fn link(&self, key: LinkKey) -> Result<LinkView<'_>, ProspectError> {
        self.check_world(key.world, "link")?;
        let object = self.object(key.body)?;
        let link = object.link(key.link).ok_or_else(|| ProspectError::UnknownLink {
            object: object.name().to_string(),
            link: format!("#{}", key.link.0),
        })?;
        Ok(LinkView {
            world: self,
            object,
            link,
        })
    }

    pub fn link_by_name(&self, body: BodyId, name: &str) -> Result<LinkView<'_>, ProspectError> {
        let object = self.object(body)?;
        let id = object.link_id(name).ok_or_else(|| ProspectError::UnknownLink {
            object: object.name().to_string(),
            link: name.to_string(),
        })?;
        self.link(object.link_key(id))
    }

    pub fn root_link(&self, body: BodyId) -> Result<LinkView<'_>, ProspectError> {
        let object = self.object(body)?;
        self.link(object.link_key(object.root_link_id()))
    }

    pub fn joint(&self, key: JointKey) -> Result<JointView<'_>, ProspectError> {
        self.check_world(key.world, "joint")?;
        let object = self.object(key.body)?;
        let joint = object.joint(key.joint).ok_or_else(|| ProspectError::UnknownJoint {
            object: object.name().to_string(),
            joint: format!("#{}", key.joint.0),
        })?;
        Ok(JointView {
            world: self,
            object,
            joint,
        })
    }

    pub fn joint_by_name(&self, body: BodyId, name: &str) -> Result<JointView<'_>, ProspectError> {
        let object = self.object(body)?;
        let id = object.joint_id(name).ok_or_else(|| ProspectError::UnknownJoint {
            object: object.name().to_string(),
            joint: name.to_string(),
        })?;
        self.joint(JointKey::new(self.id, body, id))
    }

    /// Replace a link's constraint state (see [`crate::Link::set_current_state`]).
    pub fn set_link_state(&mut self, key: LinkKey, state: LinkState) -> Result<(), ProspectError> {
        self.check_world(key.world, "link")?;
        let object = self.object_mut(key.body)?;
        let name = object.name().to_string();
        object
            .link_mut(key.link)
            .ok_or_else(|| ProspectError::UnknownLink {
                object: name,
                link: format!("#{}", key.link.0),
            })?
            .set_current_state(state)
    }

    // ── poses ───────────────────────────────────────────────────────────────

    pub fn object_pose(&self, body: BodyId) -> Result<Pose, ProspectError> {
        self.object(body)?;
        self.backend.get_object_pose(body)
    }

    /// Move a body.  With `move_attachments`, attached bodies follow,
    /// keeping their pose relative to the parent link.
    pub fn set_object_pose(
        &mut self,
        body: BodyId,
        pose: &Pose,
        move_attachments: bool,
    ) -> Result<(), ProspectError> {
        let mut visited = BTreeSet::new();
        self.set_pose_recursive(body, pose, move_attachments, &mut visited)
    }

    fn set_pose_recursive(
        &mut self,
        body: BodyId,
        pose: &Pose,
        move_attachments: bool,
        visited: &mut BTreeSet<BodyId>,
    ) -> Result<(), ProspectError> {
        if !visited.insert(body) {
            return Ok(());
        }
        self.object(body)?;
        self.backend.set_object_pose(body, pose)?;
        if !move_attachments {
            return Ok(());
        }
        let attachments: Vec<Attachment> = self.object(body)?.attachments().values().cloned().collect();
        for attachment in attachments {
            let parent_pose = self.link(attachment.parent_link)?.pose()?;
            let child_link_pose = Pose::from_isometry(
                parent_pose.frame.clone(),
                parent_pose.isometry() * attachment.child_to_parent,
            );
            let child_pose = self
                .link(attachment.child_link)?
                .get_object_pose_given_link_pose(&child_link_pose)?;
            self.set_pose_recursive(attachment.child_link.body, &child_pose, true, visited)?;
        }
        Ok(())
    }

    /// Set the pose of a link.  Only the root link may be placed directly;
    /// every other link's pose follows from the object pose and its joints.
    ///
    /// # Errors
    ///
    /// [`ProspectError::LinkPoseIsDerived`] for a non-root link.
    pub fn set_link_pose(&mut self, key: LinkKey, pose: &Pose) -> Result<(), ProspectError> {
        let link = self.link(key)?;
        if !link.is_root() {
            let frame = link.tf_frame();
            warn!(link = %frame, "rejected pose write on a non-root link");
            return Err(ProspectError::LinkPoseIsDerived(frame));
        }
        self.set_object_pose(key.body, pose, true)
    }

    /// Move the owning object so that the link ends up at `link_pose`.
    pub fn set_object_pose_given_link_pose(
        &mut self,
        key: LinkKey,
        link_pose: &Pose,
    ) -> Result<(), ProspectError> {
        let object_pose = self.link(key)?.get_object_pose_given_link_pose(link_pose)?;
        self.set_object_pose(key.body, &object_pose, true)
    }

    // ── joints ──────────────────────────────────────────────────────────────

    /// Write a joint position and re-read it from the backend.
    ///
    /// Values outside the joint limits are logged and still applied.
    pub fn set_joint_position(&mut self, key: JointKey, position: f64) -> Result<(), ProspectError> {
        {
            let joint = self.joint(key)?;
            warn_if_out_of_limits(joint.object().name(), joint.description(), position);
        }
        self.write_joint(key, position)
    }

    /// Write a joint position without the limit check.
    pub fn reset_joint_position(&mut self, key: JointKey, position: f64) -> Result<(), ProspectError> {
        self.joint(key)?;
        self.write_joint(key, position)
    }

    fn write_joint(&mut self, key: JointKey, position: f64) -> Result<(), ProspectError> {
        self.backend.set_joint_position(key.body, key.joint, position)?;
        let actual = self.backend.get_joint_position(key.body, key.joint)?;
        if let Some(joint) = self.object_mut(key.body)?.joint_mut(key.joint) {
            joint.set_cached_position(actual);
        }
        Ok(())
    }

    pub fn set_joint_position_by_name(
        &mut self,
        body: BodyId,
        name: &str,
        position: f64,
    ) -> Result<(), ProspectError> {
        let key = self.joint_by_name(body, name)?.key();
        self.set_joint_position(key, position)
    }

    /// Apply several named joint positions, in iteration order.
    pub fn set_joint_positions<'a>(
        &mut self,
        body: BodyId,
        positions: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<(), ProspectError> {
        for (name, position) in positions {
            self.set_joint_position_by_name(body, name, position)?;
        }
        Ok(())
    }

    /// Current position of every joint, in description order.
    pub fn joint_positions(&self, body: BodyId) -> Result<Vec<f64>, ProspectError> {
        let object = self.object(body)?;
        object
            .joints()
            .iter()
            .map(|j| self.backend.get_joint_position(body, j.id()))
            .collect()
    }

    pub fn enable_joint_force_torque_sensor(&mut self, key: JointKey) -> Result<Support<()>, ProspectError> {
        self.joint(key)?;
        Ok(self.backend.enable_joint_force_torque_sensor(key.body, key.joint))
    }

    pub fn disable_joint_force_torque_sensor(&mut self, key: JointKey) -> Result<Support<()>, ProspectError> {
        self.joint(key)?;
        Ok(self.backend.disable_joint_force_torque_sensor(key.body, key.joint))
    }

    // ── constraints and attachments ─────────────────────────────────────────

    /// Rigidly constrain `child` to `parent` and record the id on both links.
    ///
    /// Without an explicit `transform`, the current pose of `child` in the
    /// `parent` frame is kept.
    ///
    /// # Errors
    ///
    /// [`ProspectError::CrossWorldConstraint`] when either link belongs to
    /// another world.
    pub fn add_fixed_constraint_with_link(
        &mut self,
        parent: LinkKey,
        child: LinkKey,
        transform: Option<Transform>,
    ) -> Result<ConstraintId, ProspectError> {
        if parent.world != self.id || child.world != self.id {
            return Err(ProspectError::CrossWorldConstraint {
                link: format!("{:?}@{}", parent.link, parent.world),
                partner: format!("{:?}@{}", child.link, child.world),
            });
        }
        let child_to_parent = match transform {
            Some(t) => t.isometry,
            None => {
                let parent_view = self.link(parent)?;
                self.link(child)?.get_pose_wrt_link(&parent_view)?.isometry()
            }
        };
        let record = ConstraintRecord {
            parent,
            child,
            child_to_parent,
        };
        let id = self.backend.add_fixed_constraint(&record.to_backend())?;
        self.constraints.insert(id, record);
        if let Some(link) = self.object_mut(parent.body)?.link_mut(parent.link) {
            link.add_constraint(child, id);
        }
        if let Some(link) = self.object_mut(child.body)?.link_mut(child.link) {
            link.add_constraint(parent, id);
        }
        debug!(world = %self.id, constraint = %id, "fixed constraint added");
        Ok(id)
    }

    /// Remove the constraint between `parent` and `child`.
    ///
    /// A missing reciprocal entry on `child` is tolerated.
    ///
    /// # Errors
    ///
    /// [`ProspectError::UnknownConstraint`] when `parent` has no constraint
    /// with `child`.
    pub fn remove_constraint_with_link(
        &mut self,
        parent: LinkKey,
        child: LinkKey,
    ) -> Result<(), ProspectError> {
        let id = self
            .link(parent)?
            .state()
            .constraint_ids()
            .get(&child)
            .copied()
            .ok_or_else(|| {
                ProspectError::UnknownConstraint(format!("{parent:?} -> {child:?}"))
            })?;
        self.backend.remove_constraint(id)?;
        self.constraints.remove(&id);
        if let Some(link) = self.object_mut(parent.body)?.link_mut(parent.link) {
            link.remove_constraint(&child);
        }
        if let Ok(object) = self.object_mut(child.body) {
            if let Some(link) = object.link_mut(child.link) {
                link.remove_constraint(&parent);
            }
        }
        Ok(())
    }

    fn remove_constraint_by_id(&mut self, id: ConstraintId) -> Result<(), ProspectError> {
        let record = self
            .constraints
            .get(&id)
            .cloned()
            .ok_or_else(|| ProspectError::UnknownConstraint(id.to_string()))?;
        self.backend.remove_constraint(id)?;
        self.constraints.remove(&id);
        for (own, partner) in [(record.parent, record.child), (record.child, record.parent)] {
            if let Some(link) = self
                .objects
                .get_mut(&own.body)
                .and_then(|o| o.link_mut(own.link))
            {
                link.remove_constraint(&partner);
            }
        }
        Ok(())
    }

    pub fn constraints(&self) -> &BTreeMap<ConstraintId, ConstraintRecord> {
        &self.constraints
    }

    /// Attach `child` to `parent` with a fixed constraint between the named
    /// links (root links when `None`).  Attaching twice is a no-op.
    pub fn attach(
        &mut self,
        parent: BodyId,
        parent_link: Option<&str>,
        child: BodyId,
        child_link: Option<&str>,
    ) -> Result<ConstraintId, ProspectError> {
        if let Some(existing) = self.object(parent)?.attachments().get(&child) {
            return Ok(existing.constraint);
        }
        let parent_key = match parent_link {
            Some(name) => self.link_by_name(parent, name)?.key(),
            None => self.root_link(parent)?.key(),
        };
        let child_key = match child_link {
            Some(name) => self.link_by_name(child, name)?.key(),
            None => self.root_link(child)?.key(),
        };
        let constraint = self.add_fixed_constraint_with_link(parent_key, child_key, None)?;
        let child_to_parent = self.constraints[&constraint].child_to_parent;
        self.object_mut(parent)?.attachments_mut().insert(
            child,
            Attachment {
                parent_link: parent_key,
                child_link: child_key,
                child_to_parent,
                constraint,
            },
        );
        debug!(world = %self.id, %parent, %child, "attached");
        Ok(constraint)
    }

    pub fn detach(&mut self, parent: BodyId, child: BodyId) -> Result<(), ProspectError> {
        let Some(attachment) = self.object_mut(parent)?.attachments_mut().remove(&child) else {
            return Ok(());
        };
        self.remove_constraint_with_link(attachment.parent_link, attachment.child_link)?;
        debug!(world = %self.id, %parent, %child, "detached");
        Ok(())
    }

    /// The body `child` is attached to, if any.
    pub fn attached_parent(&self, child: BodyId) -> Option<BodyId> {
        self.objects
            .values()
            .find(|o| o.is_attached(child))
            .map(Object::id)
    }

    // ── physics ─────────────────────────────────────────────────────────────

    pub fn perform_collision_detection(&mut self) -> Result<(), ProspectError> {
        self.backend.perform_collision_detection()
    }

    pub fn get_contact_points_between(
        &self,
        a: BodyId,
        b: BodyId,
    ) -> Result<Vec<ContactPoint>, ProspectError> {
        self.object(a)?;
        self.object(b)?;
        self.backend.get_contact_points_between(a, b)
    }

    pub fn get_images_for_target(
        &mut self,
        target: &Pose,
        camera: &Pose,
    ) -> Result<CameraImages, ProspectError> {
        self.backend.get_images_for_target(target, camera)
    }

    pub fn set_gravity(&mut self, gravity: Vector3<f64>) -> Result<(), ProspectError> {
        self.backend.set_gravity(gravity)
    }

    pub fn simulate(&mut self, seconds: f64) -> Result<(), ProspectError> {
        self.backend.simulate(seconds)
    }

    // ── state ───────────────────────────────────────────────────────────────

    fn capture(&self, backend_state: u64) -> Result<WorldState, ProspectError> {
        let mut objects = BTreeMap::new();
        for object in self.objects.values() {
            let body = object.id();
            objects.insert(
                body,
                ObjectState {
                    pose: self.backend.get_object_pose(body)?,
                    joint_positions: self.joint_positions(body)?,
                    link_states: object.links().iter().map(|l| l.current_state()).collect(),
                    attachments: object.attachments().clone(),
                },
            );
        }
        Ok(WorldState {
            backend_state,
            objects,
            constraints: self.constraints.clone(),
        })
    }

    /// Snapshot poses, joint positions, link states, attachments, and
    /// constraints.  Tokens are issued in increasing order.
    pub fn save_state(&mut self) -> Result<StateToken, ProspectError> {
        let backend_state = self.backend.save_state()?;
        let state = self.capture(backend_state)?;
        let token = StateToken::from_raw(self.next_token);
        self.next_token += 1;
        self.saved_states.insert(token, state);
        debug!(world = %self.id, %token, "state saved");
        Ok(token)
    }

    pub fn saved_state(&self, token: StateToken) -> Option<&WorldState> {
        self.saved_states.get(&token)
    }

    /// Return to the state captured under `token`.
    ///
    /// Constraints created since are removed and removed ones re-created
    /// (with fresh ids, rewritten in every link state).  Tokens issued after
    /// `token` are discarded; `token` itself stays valid.
    ///
    /// Object membership is not part of a state. Bodies spawned after
    /// `token` stay where they are, and bodies removed since are not
    /// brought back (a `warn!` names each one). The prospection world
    /// relies on this: it mirrors bodies lazily and keeps them across
    /// scopes.
    ///
    /// # Errors
    ///
    /// [`ProspectError::UnknownStateToken`] for a discarded or foreign token.
    pub fn restore_state(&mut self, token: StateToken) -> Result<(), ProspectError> {
        let state = self
            .saved_states
            .get(&token)
            .cloned()
            .ok_or(ProspectError::UnknownStateToken(token.raw()))?;
        self.backend.restore_state(state.backend_state)?;

        let stale: Vec<ConstraintId> = self
            .constraints
            .iter()
            .filter(|&(id, record)| state.constraints.get(id) != Some(record))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.backend.remove_constraint(id)?;
            self.constraints.remove(&id);
        }
        let mut remap = BTreeMap::new();
        for (old_id, record) in &state.constraints {
            if self.constraints.contains_key(old_id) {
                continue;
            }
            let new_id = self.backend.add_fixed_constraint(&record.to_backend())?;
            self.constraints.insert(new_id, record.clone());
            if new_id != *old_id {
                remap.insert(*old_id, new_id);
            }
        }

        for (body, saved) in &state.objects {
            if !self.objects.contains_key(body) {
                warn!(world = %self.id, %body, "object from saved state no longer exists");
                continue;
            }
            self.backend.set_object_pose(*body, &saved.pose)?;
            for (i, position) in saved.joint_positions.iter().enumerate() {
                self.backend.set_joint_position(*body, JointId(i as i32), *position)?;
            }
            let object = self.object_mut(*body)?;
            for (i, position) in saved.joint_positions.iter().enumerate() {
                if let Some(joint) = object.joint_mut(JointId(i as i32)) {
                    joint.set_cached_position(*position);
                }
            }
            for (link, link_state) in object.links_mut().iter_mut().zip(&saved.link_states) {
                link.set_current_state(link_state.clone())?;
                link.remap_constraints(&remap);
            }
            let mut attachments = saved.attachments.clone();
            for attachment in attachments.values_mut() {
                if let Some(new_id) = remap.get(&attachment.constraint) {
                    attachment.constraint = *new_id;
                }
            }
            *object.attachments_mut() = attachments;
        }

        let newer: Vec<StateToken> = self
            .saved_states
            .range((Bound::Excluded(token), Bound::Unbounded))
            .map(|(t, _)| *t)
            .collect();
        for t in newer {
            if let Some(dropped) = self.saved_states.remove(&t) {
                self.backend.remove_state(dropped.backend_state)?;
            }
        }
        // Re-created constraints live under new ids from here on.
        if let Some(saved) = self.saved_states.get_mut(&token) {
            saved.constraints = self.constraints.clone();
            for (body, object_state) in saved.objects.iter_mut() {
                if let Some(object) = self.objects.get(body) {
                    object_state.link_states = object.links().iter().map(|l| l.current_state()).collect();
                    object_state.attachments = object.attachments().clone();
                }
            }
        }
        debug!(world = %self.id, %token, recreated = remap.len(), "state restored");
        Ok(())
    }

    /// Release a saved state.
    pub fn discard_state(&mut self, token: StateToken) -> Result<(), ProspectError> {
        let state = self
            .saved_states
            .remove(&token)
            .ok_or(ProspectError::UnknownStateToken(token.raw()))?;
        self.backend.remove_state(state.backend_state)
    }
}
