use glam::Vec3;
use habitat_common::{EntityId, Extents, RandomSource, Transform};
use habitat_interact::{
    Capability, Interactable, InteractableCore, InteractableDesc, Possession, PropertyTag,
    SharedRegistry,
};
use habitat_kernel::SharedWorld;
use habitat_physics::{ColliderId, CollisionQuery};
use serde::{Deserialize, Serialize};

use crate::being::BeingProfile;
use crate::config::{FinderConfig, PositionQuery};
use crate::finder::{FreePositionFinder, Placement, ZoneGeometry};

/// Errors from zone construction.
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("zone radius must be finite and non-negative, got {0}")]
    InvalidRadius(f32),
    #[error("zone position must be finite, got {0:?}")]
    NonFinitePosition(Vec3),
}

/// A named world-space point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub position: Vec3,
}

/// Discrete landing and takeoff points of a bird zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BirdPoints {
    pub landing: Vec<NamedPoint>,
    pub takeoff: Vec<NamedPoint>,
}

impl BirdPoints {
    fn pick<'a, R: RandomSource + ?Sized>(points: &'a [NamedPoint], rng: &mut R) -> Option<&'a NamedPoint> {
        if points.is_empty() {
            return None;
        }
        points.get(rng.index(points.len()))
    }
}

/// Capability-specific behaviour attached to a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneVariant {
    Bird(BirdPoints),
}

impl ZoneVariant {
    fn capability(&self) -> Capability {
        match self {
            Self::Bird(_) => Capability::BirdZone,
        }
    }
}

/// Construction parameters for a [`Zone`].
#[derive(Debug, Clone)]
pub struct ZoneDesc {
    pub name: Option<String>,
    pub transform: Transform,
    pub max_radius: f32,
    pub ground: ColliderId,
    pub properties: Vec<PropertyTag>,
    pub variant: Option<ZoneVariant>,
    /// Registered on open in addition to the built-in capabilities.
    pub extra_capabilities: Vec<Capability>,
    pub finder: FinderConfig,
}

impl ZoneDesc {
    pub fn new(transform: Transform, max_radius: f32, ground: ColliderId) -> Self {
        Self {
            name: None,
            transform,
            max_radius,
            ground,
            properties: Vec::new(),
            variant: None,
            extra_capabilities: Vec::new(),
            finder: FinderConfig::default(),
        }
    }
}

/// A bounded circular region with its own ground surface.
///
/// Built closed; [`Zone::open`] publishes it in the registry and
/// [`Zone::close`] withdraws it. Zones can never be possessed.
///
/// Dropping an open zone unregisters it, unless the registry is borrowed at
/// that moment. The entries then stay behind until
/// `InteractableRegistry::unregister_all(id)` removes them, or
/// `InteractableRegistry::prune` once the world object has been despawned.
#[derive(Debug)]
pub struct Zone {
    core: InteractableCore,
    max_radius: f32,
    ground: ColliderId,
    variant: Option<ZoneVariant>,
    extra_capabilities: Vec<Capability>,
    finder: FreePositionFinder,
    open: bool,
}

impl Zone {
    /// Validate `desc` and spawn the zone's world object.
    pub fn new(world: SharedWorld, registry: SharedRegistry, desc: ZoneDesc) -> Result<Self, ZoneError> {
        if !(desc.max_radius.is_finite() && desc.max_radius >= 0.0) {
            return Err(ZoneError::InvalidRadius(desc.max_radius));
        }
        if !desc.transform.position.is_finite() {
            return Err(ZoneError::NonFinitePosition(desc.transform.position));
        }
        let diameter = desc.max_radius * 2.0;
        let core = InteractableCore::spawn(
            world,
            registry,
            InteractableDesc {
                name: desc.name,
                transform: desc.transform,
                extents: Extents::new(diameter, diameter, 0.0),
                center_offset: Vec3::ZERO,
                salient_offset: Vec3::ZERO,
                properties: desc.properties,
                possession: Possession::Unpossessable,
            },
        );
        tracing::debug!(zone = %core.id(), radius = desc.max_radius, "zone created");
        Ok(Self {
            core,
            max_radius: desc.max_radius,
            ground: desc.ground,
            variant: desc.variant,
            extra_capabilities: desc.extra_capabilities,
            finder: FreePositionFinder::new(desc.finder),
            open: false,
        })
    }

    /// Capabilities this zone publishes while open.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps = vec![Capability::Interactable, Capability::WalkableZone];
        caps.extend(self.variant.as_ref().map(ZoneVariant::capability));
        caps.extend(self.extra_capabilities.iter().cloned());
        caps
    }

    /// Register under every declared capability. Returns false if the zone
    /// is already open or destroyed.
    pub fn open(&mut self) -> bool {
        if self.open || self.core.is_destroyed() {
            return false;
        }
        for capability in self.capabilities() {
            self.core.register(capability);
        }
        self.open = true;
        tracing::debug!(zone = %self.core.id(), "zone opened");
        true
    }

    /// Withdraw every declared capability. Returns false if not open.
    pub fn close(&mut self) -> bool {
        if !self.open {
            return false;
        }
        for capability in self.capabilities() {
            self.core.unregister(&capability);
        }
        self.open = false;
        tracing::debug!(zone = %self.core.id(), "zone closed");
        true
    }

    pub fn is_open(&self) -> bool {
        self.open && !self.core.is_destroyed()
    }

    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    pub fn ground(&self) -> ColliderId {
        self.ground
    }

    pub fn variant(&self) -> Option<&ZoneVariant> {
        self.variant.as_ref()
    }

    pub fn bird_points(&self) -> Option<&BirdPoints> {
        match &self.variant {
            Some(ZoneVariant::Bird(points)) => Some(points),
            None => None,
        }
    }

    pub fn finder(&self) -> &FreePositionFinder {
        &self.finder
    }

    /// Query using this zone's configured attempt budget.
    pub fn query(&self, clearance_radius: f32) -> PositionQuery {
        self.finder.config().query(clearance_radius)
    }

    pub fn geometry(&self) -> ZoneGeometry {
        ZoneGeometry {
            zone: self.core.id(),
            transform: self.core.transform(),
            max_radius: self.max_radius,
            ground: self.ground,
        }
    }

    /// Search for an unobstructed point for `requester`.
    ///
    /// A destroyed zone reports failure without probing.
    pub fn random_free_position<Q, R>(
        &self,
        requester: &BeingProfile,
        query: &PositionQuery,
        collision: &Q,
        rng: &mut R,
    ) -> Placement
    where
        Q: CollisionQuery + ?Sized,
        R: RandomSource + ?Sized,
    {
        if self.core.is_destroyed() {
            return Placement::failure(0);
        }
        tracing::trace!(zone = %self.core.id(), being = %requester.id, "position requested");
        self.finder
            .find(&self.geometry(), requester.combined_mask(), query, collision, rng)
    }

    /// A landing point picked uniformly, or the zone position when none are
    /// configured.
    pub fn free_land_position<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Vec3 {
        self.bird_points()
            .and_then(|points| BirdPoints::pick(&points.landing, rng))
            .map_or_else(|| self.core.root_position(), |p| p.position)
    }

    /// A takeoff point picked uniformly from the takeoff list, or the zone
    /// position when none are configured.
    pub fn free_takeoff_position<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Vec3 {
        self.bird_points()
            .and_then(|points| BirdPoints::pick(&points.takeoff, rng))
            .map_or_else(|| self.core.root_position(), |p| p.position)
    }
}

impl Interactable for Zone {
    fn core(&self) -> &InteractableCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut InteractableCore {
        &mut self.core
    }

    fn destroy(&mut self, by: Option<EntityId>) -> bool {
        self.close();
        self.core.destroy(by)
    }
}

impl Drop for Zone {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        // Never panic in drop. A borrowed registry keeps the entries; see the type docs.
        match self.core.registry().try_borrow_mut() {
            Ok(mut registry) => {
                registry.unregister_all(self.core.id());
            }
            Err(_) => tracing::warn!(zone = %self.core.id(), "registry busy; zone entries left behind"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use habitat_common::LayerMask;
    use habitat_interact::InteractableRegistry;
    use habitat_kernel::World;
    use habitat_physics::{ColliderSet, Shape};

    /// Scripted random source: pops queued indices, mid-range floats.
    struct Scripted(Vec<usize>);

    impl RandomSource for Scripted {
        fn uniform(&mut self, min: f32, max: f32) -> f32 {
            (min + max) * 0.5
        }

        fn uniform_inclusive(&mut self, min: f32, max: f32) -> f32 {
            (min + max) * 0.5
        }

        fn index(&mut self, len: usize) -> usize {
            self.0.pop().unwrap_or(0).min(len.saturating_sub(1))
        }
    }

    fn point(name: &str, x: f32) -> NamedPoint {
        NamedPoint {
            name: name.into(),
            position: Vec3::new(x, 1.0, 0.0),
        }
    }

    fn setup() -> (SharedWorld, SharedRegistry) {
        (World::new().into_shared(), InteractableRegistry::shared())
    }

    fn desc() -> ZoneDesc {
        let mut desc = ZoneDesc::new(Transform::from_position(Vec3::new(3.0, 0.0, 3.0)), 5.0, ColliderId(1));
        desc.properties = vec![PropertyTag(4)];
        desc
    }

    fn being() -> BeingProfile {
        BeingProfile {
            id: EntityId(100),
            clearance_radius: 0.5,
            obstacle_layers: LayerMask::layer(0),
            agent_layers: LayerMask::layer(1),
        }
    }

    #[test]
    fn invalid_radius_rejected() {
        let (world, registry) = setup();
        let mut bad = desc();
        bad.max_radius = -1.0;
        assert!(matches!(
            Zone::new(world.clone(), registry.clone(), bad),
            Err(ZoneError::InvalidRadius(_))
        ));
        let mut bad = desc();
        bad.transform.position.x = f32::NAN;
        assert!(matches!(
            Zone::new(world.clone(), registry, bad),
            Err(ZoneError::NonFinitePosition(_))
        ));
        assert_eq!(world.borrow().entity_count(), 0);
    }

    #[test]
    fn open_and_close_manage_registry() {
        let (world, registry) = setup();
        let mut zone = Zone::new(world, registry.clone(), desc()).unwrap();
        assert!(registry.borrow().is_empty());

        assert!(zone.open());
        assert!(!zone.open());
        assert!(zone.is_open());
        {
            let reg = registry.borrow();
            assert!(reg.is_registered(&zone, &Capability::Interactable));
            assert!(reg.is_registered(&zone, &Capability::WalkableZone));
            assert!(!reg.is_registered(&zone, &Capability::BirdZone));
            assert_eq!(reg.len(), 2);
        }

        assert!(zone.close());
        assert!(!zone.close());
        assert!(registry.borrow().is_empty());
    }

    #[test]
    fn bird_zone_registers_extra_capabilities() {
        let (world, registry) = setup();
        let mut d = desc();
        d.variant = Some(ZoneVariant::Bird(BirdPoints::default()));
        d.extra_capabilities = vec![Capability::Custom("roost".into())];
        let mut zone = Zone::new(world, registry.clone(), d).unwrap();
        zone.open();
        let reg = registry.borrow();
        assert!(reg.has_entry(zone.id(), &Capability::BirdZone));
        assert!(reg.has_entry(zone.id(), &Capability::Custom("roost".into())));
        assert_eq!(reg.len(), 4);
    }

    #[test]
    fn extents_and_properties() {
        let (world, registry) = setup();
        let zone = Zone::new(world, registry, desc()).unwrap();
        assert_eq!(zone.extents(), Extents::new(10.0, 10.0, 0.0));
        assert!(zone.has_property(PropertyTag(4)));
        assert!(!zone.has_property(PropertyTag(5)));
        assert_eq!(zone.center(), Vec3::new(3.0, 0.0, 3.0));
        assert_eq!(zone.salient_point(), zone.center());
    }

    #[test]
    fn zone_rejects_handlers_and_never_notifies() {
        let (world, registry) = setup();
        let mut zone = Zone::new(world, registry, desc()).unwrap();
        let fired = Rc::new(RefCell::new(0u32));
        let counter = fired.clone();
        zone.core_mut()
            .on_handler_changed(move |_| *counter.borrow_mut() += 1);

        assert!(!zone.set_handler(EntityId(7)));
        assert!(!zone.release_handler());
        assert_eq!(zone.handler(), None);
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn destroy_closes_and_is_idempotent() {
        let (world, registry) = setup();
        let mut zone = Zone::new(world.clone(), registry.clone(), desc()).unwrap();
        zone.open();

        assert!(zone.destroy(Some(EntityId(66))));
        assert!(!zone.destroy(Some(EntityId(67))));
        assert!(zone.is_destroyed());
        assert!(!zone.is_open());
        assert_eq!(zone.destroyed_by(), Some(EntityId(66)));
        assert!(registry.borrow().is_empty());
        assert!(!world.borrow().contains(zone.id()));

        assert!(!zone.has_property(PropertyTag(4)));
        assert!(!registry.borrow().is_registered(&zone, &Capability::WalkableZone));
        assert_eq!(zone.transform(), Transform::default());
        assert!(!zone.open());

        let placement = zone.random_free_position(
            &being(),
            &PositionQuery::new(0.5),
            &ColliderSet::new(),
            &mut Scripted(vec![]),
        );
        assert!(!placement.found);
        assert_eq!(placement.attempts, 0);
    }

    #[test]
    fn external_teardown_reads_as_destroyed() {
        let (world, registry) = setup();
        let mut zone = Zone::new(world.clone(), registry.clone(), desc()).unwrap();
        zone.open();
        world.borrow_mut().despawn(zone.id());

        assert!(zone.is_destroyed());
        assert!(!registry.borrow().is_registered(&zone, &Capability::Interactable));
        assert_eq!(registry.borrow_mut().prune(&world.borrow()), 1);
        assert!(!zone.destroy(None));
    }

    #[test]
    fn drop_unregisters() {
        let (world, registry) = setup();
        {
            let mut zone = Zone::new(world, registry.clone(), desc()).unwrap();
            zone.open();
            assert_eq!(registry.borrow().len(), 2);
        }
        assert!(registry.borrow().is_empty());
    }

    #[test]
    fn drop_while_registry_borrowed_leaves_entries() {
        let (world, registry) = setup();
        let mut zone = Zone::new(world, registry.clone(), desc()).unwrap();
        zone.open();
        let id = zone.id();
        {
            let held = registry.borrow();
            drop(zone);
            assert_eq!(held.len(), 2);
        }
        assert_eq!(registry.borrow_mut().unregister_all(id), 2);
        assert!(registry.borrow().is_empty());
    }

    #[test]
    fn position_query_on_real_colliders() {
        let (world, registry) = setup();
        let mut colliders = ColliderSet::new();
        let ground = colliders.insert(
            LayerMask::layer(0),
            Shape::Ground {
                center: Vec3::new(3.0, 0.0, 3.0),
                radius: 5.0,
            },
            None,
        );
        let mut d = desc();
        d.ground = ground;
        let zone = Zone::new(world, registry, d).unwrap();

        let placement = zone.random_free_position(
            &being(),
            &zone.query(0.5),
            &colliders,
            &mut Scripted(vec![]),
        );
        assert!(placement.found);
        assert_eq!(placement.attempts, 1);
        assert!(placement.position.y.abs() < 1e-5);
        let planar = (placement.position - Vec3::new(3.0, 0.0, 3.0)).with_y(0.0).length();
        assert!(planar <= 5.0);
    }

    #[test]
    fn land_and_takeoff_points() {
        let (world, registry) = setup();
        let mut d = desc();
        d.variant = Some(ZoneVariant::Bird(BirdPoints {
            landing: vec![point("branch", 1.0), point("rock", 2.0)],
            takeoff: vec![point("cliff", 9.0)],
        }));
        let zone = Zone::new(world, registry, d).unwrap();

        assert_eq!(zone.free_land_position(&mut Scripted(vec![0])), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(zone.free_land_position(&mut Scripted(vec![1])), Vec3::new(2.0, 1.0, 0.0));
        // Takeoff selection is bounded by the takeoff list itself.
        assert_eq!(zone.free_takeoff_position(&mut Scripted(vec![1])), Vec3::new(9.0, 1.0, 0.0));
    }

    #[test]
    fn land_falls_back_to_zone_position() {
        let (world, registry) = setup();
        let mut d = desc();
        d.variant = Some(ZoneVariant::Bird(BirdPoints::default()));
        let bird = Zone::new(world.clone(), registry.clone(), d).unwrap();
        let plain = Zone::new(world, registry, desc()).unwrap();

        let expected = Vec3::new(3.0, 0.0, 3.0);
        assert_eq!(bird.free_land_position(&mut Scripted(vec![])), expected);
        assert_eq!(bird.free_takeoff_position(&mut Scripted(vec![])), expected);
        assert_eq!(plain.free_land_position(&mut Scripted(vec![])), expected);
    }
}
