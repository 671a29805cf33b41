//! YAML scene description and its expansion into a live world.

use std::path::Path;

use glam::Vec3;
use habitat_common::{EntityId, LayerMask, Transform};
use habitat_interact::{InteractableRegistry, PropertyTag, SharedRegistry};
use habitat_kernel::{SharedWorld, World};
use habitat_physics::{ColliderSet, Shape};
use habitat_zone::{BeingProfile, BirdPoints, FinderConfig, Zone, ZoneDesc, ZoneError, ZoneVariant};
use serde::Deserialize;

/// Errors from loading or building a scene.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("zone '{name}': {source}")]
    Zone { name: String, source: ZoneError },
    #[error("duplicate zone name '{0}'")]
    DuplicateZone(String),
    #[error("no zone named '{0}'")]
    UnknownZone(String),
    #[error("ground layer {0} is out of range (0..32)")]
    BadLayer(u32),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneFile {
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub finder: FinderConfig,
    #[serde(default)]
    pub obstacles: Vec<ObstacleSpec>,
    #[serde(default)]
    pub zones: Vec<ZoneSpec>,
    #[serde(default)]
    pub beings: Vec<BeingSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObstacleSpec {
    pub layer: u32,
    pub shape: Shape,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneSpec {
    pub name: String,
    pub position: Vec3,
    pub radius: f32,
    pub ground_layer: u32,
    #[serde(default)]
    pub properties: Vec<PropertyTag>,
    pub bird: Option<BirdPoints>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BeingSpec {
    pub name: String,
    pub clearance: f32,
    pub obstacle_layers: LayerMask,
    pub agent_layers: LayerMask,
}

impl SceneFile {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, SceneError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// A named being spawned into the world.
pub struct Being {
    pub name: String,
    pub profile: BeingProfile,
}

/// A scene expanded into world objects, colliders and open zones.
pub struct Scene {
    pub world: SharedWorld,
    pub registry: SharedRegistry,
    pub colliders: ColliderSet,
    pub zones: Vec<(String, Zone)>,
    pub beings: Vec<Being>,
}

impl Scene {
    pub fn build(file: &SceneFile) -> Result<Self, SceneError> {
        let world = World::with_seed(file.seed).into_shared();
        let registry = InteractableRegistry::shared();
        let mut colliders = ColliderSet::new();

        for obstacle in &file.obstacles {
            colliders.insert(layer(obstacle.layer)?, obstacle.shape, None);
        }

        let mut zones: Vec<(String, Zone)> = Vec::with_capacity(file.zones.len());
        for spec in &file.zones {
            if zones.iter().any(|(name, _)| *name == spec.name) {
                return Err(SceneError::DuplicateZone(spec.name.clone()));
            }
            let ground = colliders.insert(
                layer(spec.ground_layer)?,
                Shape::Ground {
                    center: spec.position,
                    radius: spec.radius,
                },
                None,
            );
            let mut desc = ZoneDesc::new(Transform::from_position(spec.position), spec.radius, ground);
            desc.name = Some(spec.name.clone());
            desc.properties = spec.properties.clone();
            desc.variant = spec.bird.clone().map(ZoneVariant::Bird);
            desc.finder = file.finder;
            let mut zone = Zone::new(world.clone(), registry.clone(), desc).map_err(|source| SceneError::Zone {
                name: spec.name.clone(),
                source,
            })?;
            zone.open();
            zones.push((spec.name.clone(), zone));
        }

        let beings = file
            .beings
            .iter()
            .map(|spec| {
                let id = world
                    .borrow_mut()
                    .spawn_named(spec.name.clone(), Transform::default());
                Being {
                    name: spec.name.clone(),
                    profile: BeingProfile {
                        id,
                        clearance_radius: spec.clearance,
                        obstacle_layers: spec.obstacle_layers,
                        agent_layers: spec.agent_layers,
                    },
                }
            })
            .collect();

        tracing::info!(
            zones = zones.len(),
            colliders = colliders.len(),
            registered = registry.borrow().len(),
            "scene built"
        );
        Ok(Self {
            world,
            registry,
            colliders,
            zones,
            beings,
        })
    }

    pub fn zone(&self, name: &str) -> Result<&Zone, SceneError> {
        self.zones
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, z)| z)
            .ok_or_else(|| SceneError::UnknownZone(name.to_string()))
    }

    /// Record a placed being as an obstacle for everyone else.
    pub fn occupy(&mut self, being: &BeingProfile, position: Vec3) {
        let agent_layer = LayerMask(being.agent_layers.0 & being.agent_layers.0.wrapping_neg());
        self.colliders.remove_owned_by(being.id);
        self.colliders.insert(
            agent_layer,
            Shape::Sphere {
                center: position + Vec3::Y * being.clearance_radius,
                radius: being.clearance_radius,
            },
            Some(being.id),
        );
        self.world
            .borrow_mut()
            .set_transform(being.id, Transform::from_position(position));
    }

    pub fn being_name(&self, id: EntityId) -> Option<&str> {
        self.beings
            .iter()
            .find(|b| b.profile.id == id)
            .map(|b| b.name.as_str())
    }
}

fn layer(index: u32) -> Result<LayerMask, SceneError> {
    let mask = LayerMask::layer(index);
    if mask.is_empty() {
        Err(SceneError::BadLayer(index))
    } else {
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitat_interact::Capability;

    const SCENE: &str = include_str!("../scenes/meadow.yaml");

    #[test]
    fn sample_scene_builds() {
        let file = SceneFile::parse(SCENE).unwrap();
        assert_eq!(file.finder.default_max_attempts, 8);
        let scene = Scene::build(&file).unwrap();
        assert_eq!(scene.zones.len(), 2);
        assert_eq!(scene.beings.len(), 2);
        // 2 obstacles + 2 zone grounds
        assert_eq!(scene.colliders.len(), 4);

        let reg = scene.registry.borrow();
        assert_eq!(reg.owners_with(&Capability::WalkableZone).count(), 2);
        assert_eq!(reg.owners_with(&Capability::BirdZone).count(), 1);
        assert!(scene.zone("old-oak").unwrap().bird_points().is_some());
        assert!(matches!(scene.zone("swamp"), Err(SceneError::UnknownZone(_))));
    }

    #[test]
    fn bad_radius_names_the_zone() {
        let file = SceneFile::parse(
            "zones:\n  - { name: pit, position: [0, 0, 0], radius: -2.0, ground_layer: 0 }\n",
        )
        .unwrap();
        let err = Scene::build(&file).err().unwrap();
        assert!(err.to_string().contains("pit"));
    }

    #[test]
    fn duplicate_zone_rejected() {
        let file = SceneFile::parse(
            "zones:\n  - { name: a, position: [0, 0, 0], radius: 1.0, ground_layer: 0 }\n  - { name: a, position: [5, 0, 0], radius: 1.0, ground_layer: 0 }\n",
        )
        .unwrap();
        assert!(matches!(Scene::build(&file), Err(SceneError::DuplicateZone(_))));
    }

    #[test]
    fn occupy_adds_agent_collider() {
        let file = SceneFile::parse(SCENE).unwrap();
        let mut scene = Scene::build(&file).unwrap();
        let deer = scene.beings[0].profile;
        let before = scene.colliders.len();
        scene.occupy(&deer, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(scene.colliders.len(), before + 1);
        assert_eq!(scene.being_name(deer.id), Some("deer"));
        assert_eq!(
            scene.world.borrow().transform(deer.id).unwrap().position,
            Vec3::new(1.0, 0.0, 1.0)
        );
    }

    #[test]
    fn occupy_twice_moves_the_agent_collider() {
        let file = SceneFile::parse(SCENE).unwrap();
        let mut scene = Scene::build(&file).unwrap();
        let deer = scene.beings[0].profile;
        let before = scene.colliders.len();
        scene.occupy(&deer, Vec3::new(1.0, 0.0, 1.0));
        scene.occupy(&deer, Vec3::new(-2.0, 0.0, 3.0));
        assert_eq!(scene.colliders.len(), before + 1);
        let owned: Vec<_> = scene
            .colliders
            .iter()
            .filter(|c| c.owner == Some(deer.id))
            .collect();
        assert_eq!(owned.len(), 1);
        assert_eq!(
            scene.world.borrow().transform(deer.id).unwrap().position,
            Vec3::new(-2.0, 0.0, 3.0)
        );
    }
}
