use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use habitat_common::EntityId;
use habitat_kernel::World;

use crate::capability::Capability;
use crate::entity::Interactable;

/// Injection handle for the registry. Single-threaded by construction.
pub type SharedRegistry = Rc<RefCell<InteractableRegistry>>;

/// Directory of live interactables, indexed both by owner and by capability.
///
/// Both indexes are kept in lockstep; BTreeMap/BTreeSet give deterministic
/// iteration order.
#[derive(Debug, Clone, Default)]
pub struct InteractableRegistry {
    by_owner: BTreeMap<EntityId, BTreeSet<Capability>>,
    by_capability: BTreeMap<Capability, BTreeSet<EntityId>>,
}

impl InteractableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry behind a shared handle.
    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Register `owner` under `capability`. Idempotent; returns true only when
    /// the entry is new.
    pub fn register(&mut self, owner: EntityId, capability: Capability) -> bool {
        let added = self
            .by_owner
            .entry(owner)
            .or_default()
            .insert(capability.clone());
        if added {
            tracing::debug!(%owner, %capability, "registered");
            self.by_capability
                .entry(capability)
                .or_default()
                .insert(owner);
        }
        added
    }

    /// Remove one association. No-op if absent.
    pub fn unregister(&mut self, owner: EntityId, capability: &Capability) -> bool {
        let Some(caps) = self.by_owner.get_mut(&owner) else {
            return false;
        };
        if !caps.remove(capability) {
            return false;
        }
        if caps.is_empty() {
            self.by_owner.remove(&owner);
        }
        if let Some(owners) = self.by_capability.get_mut(capability) {
            owners.remove(&owner);
            if owners.is_empty() {
                self.by_capability.remove(capability);
            }
        }
        tracing::debug!(%owner, %capability, "unregistered");
        true
    }

    /// Remove every capability of `owner`. Returns how many entries went away.
    pub fn unregister_all(&mut self, owner: EntityId) -> usize {
        let Some(caps) = self.by_owner.remove(&owner) else {
            return 0;
        };
        for capability in &caps {
            if let Some(owners) = self.by_capability.get_mut(capability) {
                owners.remove(&owner);
                if owners.is_empty() {
                    self.by_capability.remove(capability);
                }
            }
        }
        tracing::debug!(%owner, count = caps.len(), "unregistered all capabilities");
        caps.len()
    }

    /// Whether `entity` is live and registered under `capability`.
    ///
    /// Returns false for destroyed entities even if a stale entry remains.
    pub fn is_registered<I: Interactable + ?Sized>(&self, entity: &I, capability: &Capability) -> bool {
        !entity.is_destroyed() && self.has_entry(entity.id(), capability)
    }

    /// Raw entry lookup, without a liveness check.
    pub fn has_entry(&self, owner: EntityId, capability: &Capability) -> bool {
        self.by_owner
            .get(&owner)
            .is_some_and(|caps| caps.contains(capability))
    }

    /// Whether `owner` has any entry.
    pub fn contains(&self, owner: EntityId) -> bool {
        self.by_owner.contains_key(&owner)
    }

    pub fn capabilities_of(&self, owner: EntityId) -> impl Iterator<Item = &Capability> + '_ {
        self.by_owner.get(&owner).into_iter().flatten()
    }

    /// Owners registered under `capability`, in ascending id order.
    pub fn owners_with(&self, capability: &Capability) -> impl Iterator<Item = EntityId> + '_ {
        self.by_capability
            .get(capability)
            .into_iter()
            .flatten()
            .copied()
    }

    /// Number of (owner, capability) entries.
    pub fn len(&self) -> usize {
        self.by_owner.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }

    /// Drop entries whose owner no longer exists in `world`. Returns the number
    /// of owners dropped.
    pub fn prune(&mut self, world: &World) -> usize {
        let stale: Vec<EntityId> = self
            .by_owner
            .keys()
            .copied()
            .filter(|owner| !world.contains(*owner))
            .collect();
        for owner in &stale {
            tracing::warn!(%owner, "pruning registry entries of despawned owner");
            self.unregister_all(*owner);
        }
        stale.len()
    }
}
