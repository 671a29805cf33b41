use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use habitat_common::{EntityId, Transform};
use serde::{Deserialize, Serialize};

/// Handle through which entities reach the world that hosts them.
///
/// The simulation is single-threaded; `Rc<RefCell<_>>` keeps it that way.
pub type SharedWorld = Rc<RefCell<World>>;

/// An event record produced by every mutation to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Object was spawned with the given transform.
    Spawned { id: EntityId, transform: Transform },
    /// Object was despawned. Carries the transform it had.
    Despawned { id: EntityId, transform: Transform },
    /// Object transform was updated.
    TransformUpdated {
        id: EntityId,
        old: Transform,
        new: Transform,
    },
    /// Simulation advanced one tick with the given seed.
    Stepped { tick: u64, seed: u64 },
}

/// Per-object data stored in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub transform: Transform,
    pub name: Option<String>,
}

/// The authoritative world state.
///
/// Owns the truth about which world objects exist. Interactables, zones and
/// the registry derive their liveness from it.
///
/// Uses BTreeMap for deterministic iteration order across all platforms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    entities: BTreeMap<EntityId, EntityData>,
    next_id: u64,
    tick: u64,
    /// Seed for deterministic RNG. Advanced each step.
    seed: u64,
    /// Append-only event log of all mutations.
    #[serde(skip)]
    event_log: Vec<WorldEvent>,
}

impl World {
    /// Create an empty world at tick 0 with seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world with a specific seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Wrap this world in a shared handle.
    pub fn into_shared(self) -> SharedWorld {
        Rc::new(RefCell::new(self))
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current RNG seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of live objects in the world.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Read-only access to all live objects.
    pub fn entities(&self) -> &BTreeMap<EntityId, EntityData> {
        &self.entities
    }

    /// Spawn a new object with the given transform. Returns its id.
    pub fn spawn(&mut self, transform: Transform) -> EntityId {
        self.spawn_entity(transform, None)
    }

    /// Spawn a new object carrying a display name.
    pub fn spawn_named(&mut self, name: impl Into<String>, transform: Transform) -> EntityId {
        self.spawn_entity(transform, Some(name.into()))
    }

    fn spawn_entity(&mut self, transform: Transform, name: Option<String>) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.entities.insert(id, EntityData { transform, name });
        self.event_log.push(WorldEvent::Spawned { id, transform });
        tracing::trace!(%id, "spawned world object");
        id
    }

    /// Remove an object. Returns the data if it existed; despawning an absent
    /// object is a no-op.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityData> {
        let data = self.entities.remove(&id);
        if let Some(ref d) = data {
            self.event_log.push(WorldEvent::Despawned {
                id,
                transform: d.transform,
            });
            tracing::trace!(%id, "despawned world object");
        }
        data
    }

    /// Whether the object still exists.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityData> {
        self.entities.get(&id)
    }

    /// Transform of a live object.
    pub fn transform(&self, id: EntityId) -> Option<Transform> {
        self.entities.get(&id).map(|d| d.transform)
    }

    /// Update an object's transform and log the change.
    pub fn set_transform(&mut self, id: EntityId, new: Transform) -> bool {
        if let Some(data) = self.entities.get_mut(&id) {
            let old = data.transform;
            data.transform = new;
            self.event_log
                .push(WorldEvent::TransformUpdated { id, old, new });
            true
        } else {
            false
        }
    }

    /// Advance the simulation by one frame.
    pub fn step(&mut self) {
        self.tick += 1;
        self.seed = splitmix64(self.seed);
        self.event_log.push(WorldEvent::Stepped {
            tick: self.tick,
            seed: self.seed,
        });
    }
}

/// Splitmix64 step: advances the world seed reproducibly across platforms.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
