use std::collections::BTreeSet;

use glam::{Quat, Vec3};
use habitat_common::{EntityId, Extents, Transform};
use habitat_kernel::SharedWorld;

use crate::capability::{Capability, PropertyTag};
use crate::registry::SharedRegistry;
use crate::tracking::Tracking;

/// Whether an interactable may be claimed by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Possession {
    Possessable,
    /// Claims are always rejected; handler notifications never fire.
    Unpossessable,
}

/// Notification payload fired whenever the handler of an entity changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerChange {
    pub entity: EntityId,
    pub previous: Option<EntityId>,
    pub current: Option<EntityId>,
}

/// Who destroyed an entity, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestructionRecord {
    /// `None` when destroyed by the environment rather than an agent.
    pub by: Option<EntityId>,
    pub tick: u64,
}

/// Construction parameters for an [`InteractableCore`].
#[derive(Debug, Clone)]
pub struct InteractableDesc {
    pub name: Option<String>,
    pub transform: Transform,
    pub extents: Extents,
    /// Offset of the geometric center from the root, in local space.
    pub center_offset: Vec3,
    /// Offset of the point others aim at, in local space.
    pub salient_offset: Vec3,
    pub properties: Vec<PropertyTag>,
    pub possession: Possession,
}

impl Default for InteractableDesc {
    fn default() -> Self {
        Self {
            name: None,
            transform: Transform::default(),
            extents: Extents::default(),
            center_offset: Vec3::ZERO,
            salient_offset: Vec3::ZERO,
            properties: Vec::new(),
            possession: Possession::Possessable,
        }
    }
}

type HandlerListener = Box<dyn FnMut(&HandlerChange)>;

/// Shared state and behaviour of every interactable.
///
/// Owns a world object for its whole life: it is spawned on construction and
/// despawned by [`InteractableCore::destroy`]. Liveness is always read back
/// from the world so external teardown is observed too.
pub struct InteractableCore {
    id: EntityId,
    world: SharedWorld,
    registry: SharedRegistry,
    extents: Extents,
    center_offset: Vec3,
    salient_offset: Vec3,
    properties: BTreeSet<PropertyTag>,
    possession: Possession,
    handler: Option<EntityId>,
    destruction: Option<DestructionRecord>,
    tracking: Tracking,
    handler_listeners: Vec<HandlerListener>,
}

impl std::fmt::Debug for InteractableCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractableCore")
            .field("id", &self.id)
            .field("extents", &self.extents)
            .field("properties", &self.properties)
            .field("possession", &self.possession)
            .field("handler", &self.handler)
            .field("destruction", &self.destruction)
            .finish_non_exhaustive()
    }
}

impl InteractableCore {
    /// Spawn the backing world object and build the interactable around it.
    /// Nothing is registered yet; that happens on activation.
    pub fn spawn(world: SharedWorld, registry: SharedRegistry, desc: InteractableDesc) -> Self {
        let id = {
            let mut w = world.borrow_mut();
            match desc.name {
                Some(name) => w.spawn_named(name, desc.transform),
                None => w.spawn(desc.transform),
            }
        };
        let tracking = Tracking::starting_at(desc.transform.position);
        Self {
            id,
            world,
            registry,
            extents: desc.extents,
            center_offset: desc.center_offset,
            salient_offset: desc.salient_offset,
            properties: desc.properties.into_iter().collect(),
            possession: desc.possession,
            handler: None,
            destruction: None,
            tracking,
            handler_listeners: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// True iff the backing world object is gone.
    pub fn is_destroyed(&self) -> bool {
        !self.world.borrow().contains(self.id)
    }

    /// Root transform; the default transform once destroyed.
    pub fn transform(&self) -> Transform {
        self.world.borrow().transform(self.id).unwrap_or_default()
    }

    pub fn root_position(&self) -> Vec3 {
        self.transform().position
    }

    pub fn rotation(&self) -> Quat {
        self.transform().rotation
    }

    pub fn center(&self) -> Vec3 {
        self.offset_point(self.center_offset)
    }

    pub fn salient_point(&self) -> Vec3 {
        self.offset_point(self.salient_offset)
    }

    fn offset_point(&self, offset: Vec3) -> Vec3 {
        match self.world.borrow().transform(self.id) {
            Some(t) => t.position + t.rotation * offset,
            None => Vec3::ZERO,
        }
    }

    /// Move the root. Returns false once destroyed.
    pub fn set_transform(&mut self, transform: Transform) -> bool {
        self.world.borrow_mut().set_transform(self.id, transform)
    }

    pub fn extents(&self) -> Extents {
        if self.is_destroyed() {
            Extents::default()
        } else {
            self.extents
        }
    }

    pub fn has_property(&self, tag: PropertyTag) -> bool {
        !self.is_destroyed() && self.properties.contains(&tag)
    }

    /// Declared properties in ascending order; empty once destroyed.
    pub fn properties(&self) -> impl Iterator<Item = PropertyTag> + '_ {
        let live = !self.is_destroyed();
        self.properties.iter().copied().filter(move |_| live)
    }

    /// Publish this entity under `capability`. Refused once destroyed.
    pub fn register(&self, capability: Capability) -> bool {
        if self.is_destroyed() {
            return false;
        }
        self.registry.borrow_mut().register(self.id, capability)
    }

    pub fn unregister(&self, capability: &Capability) -> bool {
        self.registry.borrow_mut().unregister(self.id, capability)
    }

    pub fn is_registered(&self, capability: &Capability) -> bool {
        !self.is_destroyed() && self.registry.borrow().has_entry(self.id, capability)
    }

    pub fn possession(&self) -> Possession {
        self.possession
    }

    pub fn handler(&self) -> Option<EntityId> {
        if self.is_destroyed() { None } else { self.handler }
    }

    /// Claim this entity for `by`. Returns whether the claim holds.
    pub fn set_handler(&mut self, by: EntityId) -> bool {
        if self.possession == Possession::Unpossessable || by.is_none() || self.is_destroyed() {
            tracing::trace!(entity = %self.id, %by, "handler claim rejected");
            return false;
        }
        if self.handler != Some(by) {
            self.change_handler(Some(by));
        }
        true
    }

    /// Drop the current handler. Returns false if there was none.
    pub fn release_handler(&mut self) -> bool {
        if self.handler.is_none() {
            return false;
        }
        self.change_handler(None);
        true
    }

    fn change_handler(&mut self, current: Option<EntityId>) {
        let change = HandlerChange {
            entity: self.id,
            previous: self.handler,
            current,
        };
        self.handler = current;
        tracing::debug!(entity = %self.id, previous = ?change.previous, current = ?change.current, "handler changed");
        for listener in &mut self.handler_listeners {
            listener(&change);
        }
    }

    /// Subscribe to handler changes.
    pub fn on_handler_changed(&mut self, listener: impl FnMut(&HandlerChange) + 'static) {
        self.handler_listeners.push(Box::new(listener));
    }

    pub fn destruction(&self) -> Option<DestructionRecord> {
        self.destruction
    }

    pub fn destroyed_by(&self) -> Option<EntityId> {
        self.destruction.and_then(|d| d.by)
    }

    /// Destroy the entity: drop its registry entries, release its handler,
    /// record the destroyer and despawn the world object.
    ///
    /// Returns false (and changes nothing else) if it was already destroyed,
    /// whether by an earlier call or by external teardown.
    pub fn destroy(&mut self, by: Option<EntityId>) -> bool {
        self.registry.borrow_mut().unregister_all(self.id);
        if self.destruction.is_some() || self.is_destroyed() {
            return false;
        }
        if self.handler.is_some() {
            self.change_handler(None);
        }
        let tick = {
            let mut world = self.world.borrow_mut();
            world.despawn(self.id);
            world.tick()
        };
        self.destruction = Some(DestructionRecord { by, tick });
        tracing::debug!(entity = %self.id, ?by, tick, "destroyed");
        true
    }

    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    pub fn tracking_mut(&mut self) -> &mut Tracking {
        &mut self.tracking
    }

    /// Velocity as last computed by the tracker; zero once destroyed.
    pub fn velocity(&self) -> Vec3 {
        if self.is_destroyed() {
            Vec3::ZERO
        } else {
            self.tracking.velocity()
        }
    }
}

/// Contract shared by every world entity other systems can interact with.
///
/// Implementors expose their [`InteractableCore`]; the provided methods route
/// through it. Override a method to specialise it, as zones do for `destroy`.
pub trait Interactable {
    fn core(&self) -> &InteractableCore;

    fn core_mut(&mut self) -> &mut InteractableCore;

    fn id(&self) -> EntityId {
        self.core().id()
    }

    fn is_destroyed(&self) -> bool {
        self.core().is_destroyed()
    }

    fn transform(&self) -> Transform {
        self.core().transform()
    }

    fn center(&self) -> Vec3 {
        self.core().center()
    }

    fn salient_point(&self) -> Vec3 {
        self.core().salient_point()
    }

    fn extents(&self) -> Extents {
        self.core().extents()
    }

    fn has_property(&self, tag: PropertyTag) -> bool {
        self.core().has_property(tag)
    }

    fn handler(&self) -> Option<EntityId> {
        self.core().handler()
    }

    fn set_handler(&mut self, by: EntityId) -> bool {
        self.core_mut().set_handler(by)
    }

    fn release_handler(&mut self) -> bool {
        self.core_mut().release_handler()
    }

    fn destroyed_by(&self) -> Option<EntityId> {
        self.core().destroyed_by()
    }

    fn destroy(&mut self, by: Option<EntityId>) -> bool {
        self.core_mut().destroy(by)
    }
}

impl Interactable for InteractableCore {
    fn core(&self) -> &InteractableCore {
        self
    }

    fn core_mut(&mut self) -> &mut InteractableCore {
        self
    }
}
