//! [`ProspectionScope`] – the guard for one speculative query.

use prospect_types::{BodyId, JointKey, LinkKey, ProspectError, StateToken};
use prospect_world::{Object, World};
use tracing::warn;

use crate::correspondence::Correspondence;
use crate::prospection::ProspectionWorld;

/// An open prospection scope.
///
/// Every shadow-world mutation made through the scope is reverted when it
/// ends, whether by [`exit`](Self::exit) or by being dropped on an early
/// return.  Saving and restoring further tokens inside the scope nests as a
/// stack.
pub struct ProspectionScope<'a> {
    prospection: &'a mut ProspectionWorld,
    live: &'a World,
    token: StateToken,
    closed: bool,
}

impl<'a> ProspectionScope<'a> {
    pub(crate) fn new(prospection: &'a mut ProspectionWorld, live: &'a World, token: StateToken) -> Self {
        Self {
            prospection,
            live,
            token,
            closed: false,
        }
    }

    /// The live world; read-only.
    pub fn live(&self) -> &'a World {
        self.live
    }

    pub fn shadow(&self) -> &World {
        self.prospection.shadow()
    }

    pub fn shadow_mut(&mut self) -> &mut World {
        self.prospection.shadow_mut()
    }

    /// Token the scope restores on exit.
    pub fn token(&self) -> StateToken {
        self.token
    }

    pub fn correspondence(&self) -> &Correspondence {
        self.prospection.correspondence()
    }

    /// The shadow counterpart of a live body, mirroring it if needed.
    pub fn shadow_body(&mut self, live: BodyId) -> Result<BodyId, ProspectError> {
        self.prospection.mirror(self.live, live)
    }

    /// The shadow counterpart of a live body, if already mirrored.
    pub fn try_shadow_body(&self, live: BodyId) -> Option<BodyId> {
        self.correspondence().shadow_of(live)
    }

    pub fn live_body(&self, shadow: BodyId) -> Option<BodyId> {
        self.correspondence().live_of(shadow)
    }

    /// The live object a shadow body mirrors.
    pub fn live_object(&self, shadow: BodyId) -> Option<&'a Object> {
        let live = self.live_body(shadow)?;
        self.live.object(live).ok()
    }

    /// The shadow counterpart of a live link.
    ///
    /// # Errors
    ///
    /// [`ProspectError::UnknownObject`] when `live` does not belong to the
    /// live world.
    pub fn shadow_link(&mut self, live: LinkKey) -> Result<LinkKey, ProspectError> {
        self.check_live(live.world == self.live.id(), "link")?;
        let body = self.shadow_body(live.body)?;
        Ok(live.rebased(self.shadow().id(), body))
    }

    pub fn live_link(&self, shadow: LinkKey) -> Option<LinkKey> {
        self.correspondence().live_link(shadow, self.live.id())
    }

    pub fn shadow_joint(&mut self, live: JointKey) -> Result<JointKey, ProspectError> {
        self.check_live(live.world == self.live.id(), "joint")?;
        let body = self.shadow_body(live.body)?;
        Ok(JointKey::new(self.shadow().id(), body, live.joint))
    }

    fn check_live(&self, ok: bool, what: &str) -> Result<(), ProspectError> {
        if ok {
            Ok(())
        } else {
            Err(ProspectError::UnknownObject(format!(
                "{what} is not part of live world {}",
                self.live.id()
            )))
        }
    }

    /// Save a nested shadow state.
    pub fn save_state(&mut self) -> Result<StateToken, ProspectError> {
        self.shadow_mut().save_state()
    }

    /// Restore a nested shadow state saved in this scope.
    pub fn restore_state(&mut self, token: StateToken) -> Result<(), ProspectError> {
        self.shadow_mut().restore_state(token)
    }

    /// Close the scope, reverting every shadow mutation.
    ///
    /// # Errors
    ///
    /// Propagates restore failures; the prospection world is detached
    /// either way.
    pub fn exit(mut self) -> Result<(), ProspectError> {
        self.closed = true;
        self.prospection.finish(self.token)
    }
}

impl Drop for ProspectionScope<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.prospection.finish(self.token) {
            warn!(token = %self.token, error = %e, "failed to restore shadow world");
        }
    }
}

impl std::fmt::Debug for ProspectionScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProspectionScope")
            .field("live", &self.live.id())
            .field("shadow", &self.shadow().id())
            .field("token", &self.token)
            .finish()
    }
}
