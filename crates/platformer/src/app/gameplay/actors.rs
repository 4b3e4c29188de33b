use engine::{Entity, EntityDesc, EntityId, Transform, Vec3, World};
use serde::{Deserialize, Serialize};

use crate::app::config::{EnemyArchetypeConfig, PlayerConfig};

pub const PLAYER_ARCHETYPE: &str = "player";
const ENEMY_WITH_SHIP_ARCHETYPE: &str = "enemy.with_ship";
const ENEMY_WITHOUT_SHIP_ARCHETYPE: &str = "enemy.without_ship";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    WithShip,
    WithoutShip,
}

impl EnemyKind {
    pub fn archetype_name(self) -> &'static str {
        match self {
            Self::WithShip => ENEMY_WITH_SHIP_ARCHETYPE,
            Self::WithoutShip => ENEMY_WITHOUT_SHIP_ARCHETYPE,
        }
    }

    pub fn from_archetype_name(name: &str) -> Option<Self> {
        match name {
            ENEMY_WITH_SHIP_ARCHETYPE => Some(Self::WithShip),
            ENEMY_WITHOUT_SHIP_ARCHETYPE => Some(Self::WithoutShip),
            _ => None,
        }
    }

    /// Accepts the config spelling: `with_ship` / `without_ship`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "with_ship" => Some(Self::WithShip),
            "without_ship" => Some(Self::WithoutShip),
            _ => None,
        }
    }
}

/// Ids of live enemies in registration order. The world owns the entities;
/// an id whose entity has since been despawned is simply skipped by readers.
#[derive(Debug, Default, Clone)]
pub struct EnemyRegistry {
    ids: Vec<EntityId>,
}

impl EnemyRegistry {
    pub fn register(&mut self, id: EntityId) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn unregister(&mut self, id: EntityId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|registered| *registered != id);
        before != self.ids.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    current: u32,
}

impl Score {
    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn set(&mut self, value: u32) {
        self.current = value;
    }

    pub fn add(&mut self, points: u32) {
        self.current = self.current.saturating_add(points);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerControl {
    pub id: EntityId,
    pub facing_right: bool,
}

pub(crate) fn spawn_player(world: &mut World, config: &PlayerConfig) -> EntityId {
    world.spawn(EntityDesc {
        archetype: PLAYER_ARCHETYPE.to_string(),
        transform: Transform {
            position: vec3(config.spawn),
            scale: Vec3::ONE,
        },
        velocity: Vec3::ZERO,
        health: config.max_health,
    })
}

pub(crate) fn enemy_desc(
    kind: EnemyKind,
    archetype: &EnemyArchetypeConfig,
    position: Vec3,
) -> EntityDesc {
    EntityDesc {
        archetype: kind.archetype_name().to_string(),
        transform: Transform {
            position,
            scale: vec3(archetype.scale),
        },
        velocity: Vec3::ZERO,
        health: archetype.max_health,
    }
}

/// Points the entity right or left by the sign of `scale.x`, keeping its size.
pub(crate) fn apply_facing(entity: &mut Entity, facing_right: bool) {
    let magnitude = entity.transform.scale.x.abs();
    entity.transform.scale.x = if facing_right { magnitude } else { -magnitude };
}

pub(crate) fn vec3(raw: [f32; 3]) -> Vec3 {
    Vec3::new(raw[0], raw[1], raw[2])
}
