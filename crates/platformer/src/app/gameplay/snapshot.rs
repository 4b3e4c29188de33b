use std::fmt::Display;

use engine::{EntityId, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::actors::{apply_facing, enemy_desc, EnemyKind};
use super::context::GameContext;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedVec2 {
    pub x: f32,
    pub y: f32,
}

impl SavedVec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn from_vec2(value: Vec2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }

    fn to_vec2(self) -> Vec2 {
        Vec2 {
            x: self.x,
            y: self.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SavedVec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn from_vec3(value: Vec3) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
        }
    }

    fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub health: u32,
    pub facing_right: bool,
    pub position: SavedVec3,
    pub velocity: SavedVec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub health: u32,
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    /// Sign carries facing, magnitude carries size.
    pub x_scale: f32,
    pub position: SavedVec3,
    pub velocity: SavedVec3,
}

/// The persisted record. No field is optional: a save missing any of them
/// does not decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub player: PlayerSnapshot,
    pub enemies: Vec<EnemySnapshot>,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("no player entity to snapshot or restore")]
    MissingPlayer,
    #[error("level is not ready to host restored entities")]
    LevelNotReady,
    #[error("registered enemy {id:?} has non-enemy archetype {archetype}")]
    UnknownArchetype { id: EntityId, archetype: String },
    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

/// Captures player, registered enemies and score. Read-only; registry ids
/// whose entity no longer exists are skipped.
pub fn build_snapshot(context: &GameContext) -> Result<WorldSnapshot, SnapshotError> {
    let player_control = context.player().ok_or(SnapshotError::MissingPlayer)?;
    let player_entity = context
        .player_entity()
        .ok_or(SnapshotError::MissingPlayer)?;
    let player = PlayerSnapshot {
        health: player_entity.health,
        facing_right: player_control.facing_right,
        position: SavedVec3::from_vec3(player_entity.transform.position),
        velocity: SavedVec2::from_vec2(player_entity.velocity.xy()),
    };

    let mut enemies = Vec::with_capacity(context.enemies().len());
    for id in context.enemies().ids() {
        let Some(entity) = context.world().find_entity(*id) else {
            debug!(enemy = id.0, "snapshot_skipped_stale_enemy");
            continue;
        };
        let kind = EnemyKind::from_archetype_name(&entity.archetype).ok_or_else(|| {
            SnapshotError::UnknownArchetype {
                id: *id,
                archetype: entity.archetype.clone(),
            }
        })?;
        enemies.push(EnemySnapshot {
            health: entity.health,
            kind,
            x_scale: entity.transform.scale.x,
            position: SavedVec3::from_vec3(entity.transform.position),
            velocity: SavedVec3::from_vec3(entity.velocity),
        });
    }

    Ok(WorldSnapshot {
        player,
        enemies,
        score: context.score(),
    })
}

/// Hard overwrite of the live level from `snapshot`. Enemies currently
/// registered are replaced by freshly spawned ones; identities are not kept.
/// Nothing is touched unless the snapshot is valid, the level is ready and a
/// player exists. Returns the number of enemies created.
pub fn apply_snapshot(
    snapshot: &WorldSnapshot,
    context: &mut GameContext,
) -> Result<usize, SnapshotError> {
    validate_snapshot(snapshot).map_err(SnapshotError::Invalid)?;
    if !context.level_ready() {
        return Err(SnapshotError::LevelNotReady);
    }
    if context.player_entity().is_none() {
        return Err(SnapshotError::MissingPlayer);
    }

    let saved_player = &snapshot.player;
    if let Some(player) = context.player.as_mut() {
        player.facing_right = saved_player.facing_right;
    }
    if let Some(entity) = context.player_entity_mut() {
        entity.health = saved_player.health;
        entity.transform.position = saved_player.position.to_vec3();
        entity.velocity = Vec3::from_xy(saved_player.velocity.to_vec2());
        apply_facing(entity, saved_player.facing_right);
    }

    for id in context.enemies.ids().to_vec() {
        context.world.despawn(id);
    }
    context.enemies.clear();

    for saved in &snapshot.enemies {
        let mut desc = enemy_desc(
            saved.kind,
            context.config.archetype(saved.kind),
            saved.position.to_vec3(),
        );
        desc.health = saved.health;
        desc.velocity = saved.velocity.to_vec3();
        desc.transform.scale.x = saved.x_scale;
        let id = context.world.spawn(desc);
        context.enemies.register(id);
    }
    context.world.apply_pending();
    context.set_score(snapshot.score);

    info!(
        enemy_count = snapshot.enemies.len(),
        score = snapshot.score,
        "snapshot_applied"
    );
    Ok(snapshot.enemies.len())
}

fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

pub(crate) fn expected_actual(
    path: &str,
    expected: impl Display,
    actual: impl Display,
) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

pub(crate) fn check_finite(path: &str, values: &[(&str, f32)]) -> Result<(), String> {
    for (axis, value) in values {
        if !value.is_finite() {
            return Err(expected_actual(
                &format!("{path}.{axis}"),
                "finite number",
                value,
            ));
        }
    }
    Ok(())
}

/// Checks what the type system cannot: finite floats and a usable scale.
pub fn validate_snapshot(snapshot: &WorldSnapshot) -> Result<(), String> {
    let player = &snapshot.player;
    check_finite(
        "player.position",
        &[
            ("x", player.position.x),
            ("y", player.position.y),
            ("z", player.position.z),
        ],
    )?;
    check_finite(
        "player.velocity",
        &[("x", player.velocity.x), ("y", player.velocity.y)],
    )?;

    for (index, enemy) in snapshot.enemies.iter().enumerate() {
        let scale_path = format!("enemies[{index}].x_scale");
        if !enemy.x_scale.is_finite() {
            return Err(expected_actual(&scale_path, "finite number", enemy.x_scale));
        }
        if enemy.x_scale == 0.0 {
            return Err(expected_actual(&scale_path, "non-zero scale", enemy.x_scale));
        }
        check_finite(
            &format!("enemies[{index}].position"),
            &[
                ("x", enemy.position.x),
                ("y", enemy.position.y),
                ("z", enemy.position.z),
            ],
        )?;
        check_finite(
            &format!("enemies[{index}].velocity"),
            &[
                ("x", enemy.velocity.x),
                ("y", enemy.velocity.y),
                ("z", enemy.velocity.z),
            ],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            player: PlayerSnapshot {
                health: 7,
                facing_right: false,
                position: SavedVec3::new(1.0, 2.0, 0.0),
                velocity: SavedVec2::new(0.0, 0.0),
            },
            enemies: vec![EnemySnapshot {
                health: 3,
                kind: EnemyKind::WithoutShip,
                x_scale: -1.0,
                position: SavedVec3::new(5.0, 0.0, 0.0),
                velocity: SavedVec3::new(0.0, 0.0, 0.0),
            }],
            score: 40,
        }
    }

    #[test]
    fn valid_snapshot_passes_validation() {
        assert_eq!(validate_snapshot(&snapshot()), Ok(()));
    }

    #[test]
    fn non_finite_player_position_is_rejected_with_path() {
        let mut bad = snapshot();
        bad.player.position.y = f32::NAN;
        let err = validate_snapshot(&bad).expect_err("nan");
        assert!(err.contains("player.position.y"), "{err}");
    }

    #[test]
    fn zero_enemy_scale_is_rejected() {
        let mut bad = snapshot();
        bad.enemies[0].x_scale = 0.0;
        let err = validate_snapshot(&bad).expect_err("zero scale");
        assert!(err.contains("enemies[0].x_scale"), "{err}");
    }

    #[test]
    fn enemy_type_is_serialized_under_type_key() {
        let json = serde_json::to_value(&snapshot()).expect("json");
        assert_eq!(json["enemies"][0]["type"], "without_ship");
        assert_eq!(json["player"]["facing_right"], false);
    }

    #[test]
    fn missing_field_does_not_decode() {
        let err = serde_json::from_str::<WorldSnapshot>(
            r#"{ "player": { "health": 1, "facing_right": true,
                 "position": { "x": 0.0, "y": 0.0, "z": 0.0 },
                 "velocity": { "x": 0.0, "y": 0.0 } },
                 "enemies": [] }"#,
        )
        .expect_err("score missing");
        assert!(err.to_string().contains("score"), "{err}");
    }

    #[test]
    fn negative_health_does_not_decode() {
        let mut json = serde_json::to_value(&snapshot()).expect("json");
        json["player"]["health"] = serde_json::json!(-1);
        assert!(serde_json::from_value::<WorldSnapshot>(json).is_err());
    }
}
