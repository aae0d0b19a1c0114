//! [`ProspectionWorld`] – the shadow world and its mirroring state machine.
//!
//! The prospection world is either **Detached** or **Active**.  Entering
//! mirrors the live world (spawning missing bodies, dropping orphans, and
//! copying poses, joint positions, and attachments) and saves a state
//! token; leaving restores that token.  Bodies are mirrored once and reused
//! for the lifetime of the shadow world; only mutable state is re-synced.

use std::collections::BTreeMap;
use std::sync::Arc;

use prospect_types::{BodyId, JointId, JointKey, ProspectError, StateToken, WorldId};
use prospect_world::{PhysicsBackend, World, WorldConfig};
use tracing::{debug, warn};

use crate::correspondence::Correspondence;
use crate::scope::ProspectionScope;

/// Lifecycle of a [`ProspectionWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProspectionState {
    /// No query is using the shadow world.
    Detached,
    /// A scope is open; its mutations are reverted to this token on exit.
    Active(StateToken),
}

/// A shadow world that mirrors one live world for speculative queries.
///
/// The live world is only ever read.
#[derive(Debug)]
pub struct ProspectionWorld {
    shadow: World,
    live_world: Option<WorldId>,
    correspondence: Correspondence,
    state: ProspectionState,
}

impl ProspectionWorld {
    pub fn new(backend: Box<dyn PhysicsBackend>, config: WorldConfig) -> Self {
        Self::from_world(World::new(backend, config))
    }

    /// Use an existing (empty) world as the shadow.
    pub fn from_world(shadow: World) -> Self {
        Self {
            shadow: shadow.into_prospection(),
            live_world: None,
            correspondence: Correspondence::new(),
            state: ProspectionState::Detached,
        }
    }

    pub fn shadow(&self) -> &World {
        &self.shadow
    }

    pub(crate) fn shadow_mut(&mut self) -> &mut World {
        &mut self.shadow
    }

    pub fn correspondence(&self) -> &Correspondence {
        &self.correspondence
    }

    pub fn state(&self) -> ProspectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ProspectionState::Active(_))
    }

    /// Open a scope over `live`.
    ///
    /// The returned guard borrows the prospection world mutably, so scopes
    /// cannot overlap.  A scope leaked with `mem::forget` is restored here
    /// before the new one opens.
    ///
    /// # Errors
    ///
    /// Propagates shadow-world errors raised while mirroring.
    pub fn enter<'a>(&'a mut self, live: &'a World) -> Result<ProspectionScope<'a>, ProspectError> {
        if let ProspectionState::Active(stale) = self.state {
            warn!(token = %stale, "prospection scope was never closed, restoring it first");
            self.finish(stale)?;
        }
        self.sync(live)?;
        let token = self.shadow.save_state()?;
        self.state = ProspectionState::Active(token);
        debug!(shadow = %self.shadow.id(), live = %live.id(), %token, "prospection entered");
        Ok(ProspectionScope::new(self, live, token))
    }

    /// Restore `token`, release it, and detach.
    pub(crate) fn finish(&mut self, token: StateToken) -> Result<(), ProspectError> {
        let result = self
            .shadow
            .restore_state(token)
            .and_then(|()| self.shadow.discard_state(token));
        self.state = ProspectionState::Detached;
        debug!(shadow = %self.shadow.id(), %token, "prospection exited");
        result
    }

    /// The shadow counterpart of `body`, mirroring it on first request.
    pub fn mirror(&mut self, live: &World, body: BodyId) -> Result<BodyId, ProspectError> {
        self.bind(live)?;
        if let Some(shadow) = self.correspondence.shadow_of(body) {
            return Ok(shadow);
        }
        let object = live.object(body)?;
        let pose = live.object_pose(body)?;
        let shadow = self
            .shadow
            .spawn(object.name(), Arc::clone(object.description()), &pose)?;
        self.copy_joints(live, body, shadow)?;
        if live.robot() == Some(body) {
            self.shadow.set_robot(shadow)?;
        }
        self.correspondence.insert(body, shadow);
        debug!(live = %body, %shadow, name = %object.name(), "body mirrored");
        Ok(shadow)
    }

    /// Bring the shadow world in line with `live`.
    pub fn sync(&mut self, live: &World) -> Result<(), ProspectError> {
        self.bind(live)?;

        let orphans: Vec<BodyId> = self
            .correspondence
            .iter()
            .filter(|(l, _)| live.object(*l).is_err())
            .map(|(l, _)| l)
            .collect();
        for body in orphans {
            if let Some(shadow) = self.correspondence.remove_live(body) {
                self.shadow.remove_object(shadow)?;
                debug!(live = %body, %shadow, "orphaned shadow body removed");
            }
        }

        for body in live.object_ids() {
            let shadow = self.mirror(live, body)?;
            self.shadow
                .set_object_pose(shadow, &live.object_pose(body)?, false)?;
            self.copy_joints(live, body, shadow)?;
        }
        if let Some(robot) = live.robot().and_then(|r| self.correspondence.shadow_of(r)) {
            self.shadow.set_robot(robot)?;
        }
        self.sync_attachments(live)
    }

    /// Tie this shadow to one live world.  Switching live worlds drops every
    /// mirrored body.
    fn bind(&mut self, live: &World) -> Result<(), ProspectError> {
        match self.live_world {
            Some(id) if id == live.id() => Ok(()),
            Some(previous) => {
                warn!(%previous, next = %live.id(), "prospection world rebound to another live world");
                let mirrored: Vec<BodyId> = self.correspondence.iter().map(|(_, s)| s).collect();
                for shadow in mirrored {
                    self.shadow.remove_object(shadow)?;
                }
                self.correspondence.clear();
                self.live_world = Some(live.id());
                Ok(())
            }
            None => {
                self.live_world = Some(live.id());
                Ok(())
            }
        }
    }

    fn copy_joints(&mut self, live: &World, body: BodyId, shadow: BodyId) -> Result<(), ProspectError> {
        let world = self.shadow.id();
        for (i, position) in live.joint_positions(body)?.into_iter().enumerate() {
            self.shadow
                .reset_joint_position(JointKey::new(world, shadow, JointId(i as i32)), position)?;
        }
        Ok(())
    }

    fn sync_attachments(&mut self, live: &World) -> Result<(), ProspectError> {
        for object in live.objects() {
            let Some(parent) = self.correspondence.shadow_of(object.id()) else {
                continue;
            };
            let mut wanted = BTreeMap::new();
            for (child, attachment) in object.attachments() {
                let Some(shadow_child) = self.correspondence.shadow_of(*child) else {
                    continue;
                };
                let parent_link = live.link(attachment.parent_link)?.name().to_string();
                let child_link = live.link(attachment.child_link)?.name().to_string();
                wanted.insert(shadow_child, (parent_link, child_link));
            }

            // Drop attachments that are gone, or that now join different links.
            let mut stale = Vec::new();
            for (child, attachment) in self.shadow.object(parent)?.attachments() {
                let links = (
                    self.shadow.link(attachment.parent_link)?.name(),
                    self.shadow.link(attachment.child_link)?.name(),
                );
                let current = wanted
                    .get(child)
                    .is_some_and(|(p, c): &(String, String)| (p.as_str(), c.as_str()) == links);
                if !current {
                    stale.push(*child);
                }
            }
            for child in stale {
                debug!(%parent, %child, "stale shadow attachment dropped");
                self.shadow.detach(parent, child)?;
            }

            for (child, (parent_link, child_link)) in wanted {
                self.shadow
                    .attach(parent, Some(&parent_link), child, Some(&child_link))?;
            }
        }
        Ok(())
    }
}
