//! [`Correspondence`] – the live ↔ shadow body mapping.
//!
//! Links and joints need no table of their own: a shadow body is spawned
//! from the same description as its live body, so link and joint ids match
//! and only the `(world, body)` part of a key changes.

use std::collections::HashMap;

use prospect_types::{BodyId, JointKey, LinkKey, WorldId};

/// Bidirectional body mapping between a live world and its shadow.
#[derive(Debug, Default, Clone)]
pub struct Correspondence {
    live_to_shadow: HashMap<BodyId, BodyId>,
    shadow_to_live: HashMap<BodyId, BodyId>,
}

impl Correspondence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `shadow` mirrors `live`, replacing any earlier pairing of
    /// either side.
    pub fn insert(&mut self, live: BodyId, shadow: BodyId) {
        if let Some(old) = self.live_to_shadow.insert(live, shadow) {
            self.shadow_to_live.remove(&old);
        }
        if let Some(old) = self.shadow_to_live.insert(shadow, live) {
            if old != live {
                self.live_to_shadow.remove(&old);
            }
        }
    }

    pub fn shadow_of(&self, live: BodyId) -> Option<BodyId> {
        self.live_to_shadow.get(&live).copied()
    }

    pub fn live_of(&self, shadow: BodyId) -> Option<BodyId> {
        self.shadow_to_live.get(&shadow).copied()
    }

    /// Forget a pairing by its live side; returns the shadow body.
    pub fn remove_live(&mut self, live: BodyId) -> Option<BodyId> {
        let shadow = self.live_to_shadow.remove(&live)?;
        self.shadow_to_live.remove(&shadow);
        Some(shadow)
    }

    pub fn clear(&mut self) {
        self.live_to_shadow.clear();
        self.shadow_to_live.clear();
    }

    pub fn len(&self) -> usize {
        self.live_to_shadow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_to_shadow.is_empty()
    }

    /// `(live, shadow)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, BodyId)> + '_ {
        self.live_to_shadow.iter().map(|(l, s)| (*l, *s))
    }

    /// The shadow counterpart of a live link, in `shadow_world`.
    pub fn shadow_link(&self, live: LinkKey, shadow_world: WorldId) -> Option<LinkKey> {
        self.shadow_of(live.body)
            .map(|body| live.rebased(shadow_world, body))
    }

    /// The live counterpart of a shadow link, in `live_world`.
    pub fn live_link(&self, shadow: LinkKey, live_world: WorldId) -> Option<LinkKey> {
        self.live_of(shadow.body)
            .map(|body| shadow.rebased(live_world, body))
    }

    pub fn shadow_joint(&self, live: JointKey, shadow_world: WorldId) -> Option<JointKey> {
        self.shadow_of(live.body)
            .map(|body| JointKey::new(shadow_world, body, live.joint))
    }
}
