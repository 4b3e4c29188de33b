use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::gameplay::{check_finite, expected_actual, EnemyKind};

pub const DEFAULT_SAVE_FILE_NAME: &str = "save.dat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub save_file_name: String,
    pub player: PlayerConfig,
    pub enemy_with_ship: EnemyArchetypeConfig,
    pub enemy_without_ship: EnemyArchetypeConfig,
    pub level_enemies: Vec<EnemyPlacement>,
    pub score_per_kill: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub spawn: [f32; 3],
    pub max_health: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyArchetypeConfig {
    pub max_health: u32,
    pub scale: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyPlacement {
    pub kind: EnemyKind,
    pub position: [f32; 3],
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            save_file_name: DEFAULT_SAVE_FILE_NAME.to_string(),
            player: PlayerConfig::default(),
            enemy_with_ship: EnemyArchetypeConfig {
                max_health: 3,
                scale: [1.0, 1.0, 1.0],
            },
            enemy_without_ship: EnemyArchetypeConfig {
                max_health: 2,
                scale: [1.0, 1.0, 1.0],
            },
            level_enemies: vec![
                EnemyPlacement {
                    kind: EnemyKind::WithShip,
                    position: [8.0, 4.0, 0.0],
                },
                EnemyPlacement {
                    kind: EnemyKind::WithoutShip,
                    position: [12.0, 0.0, 0.0],
                },
            ],
            score_per_kill: 10,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn: [0.0, 0.0, 0.0],
            max_health: 10,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("rejected config file {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

impl GameConfig {
    pub fn archetype(&self, kind: EnemyKind) -> &EnemyArchetypeConfig {
        match kind {
            EnemyKind::WithShip => &self.enemy_with_ship,
            EnemyKind::WithoutShip => &self.enemy_without_ship,
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse_json(&raw).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        config.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// Same rules as saved snapshots: finite coordinates and a non-zero
    /// horizontal scale per archetype.
    pub fn validate(&self) -> Result<(), String> {
        check_finite("player.spawn", &axes(self.player.spawn))?;
        for (name, archetype) in [
            ("enemy_with_ship", &self.enemy_with_ship),
            ("enemy_without_ship", &self.enemy_without_ship),
        ] {
            let scale_path = format!("{name}.scale");
            check_finite(&scale_path, &axes(archetype.scale))?;
            if archetype.scale[0] == 0.0 {
                return Err(expected_actual(
                    &format!("{scale_path}.x"),
                    "non-zero scale",
                    archetype.scale[0],
                ));
            }
        }
        for (index, placement) in self.level_enemies.iter().enumerate() {
            check_finite(
                &format!("level_enemies[{index}].position"),
                &axes(placement.position),
            )?;
        }
        Ok(())
    }

    fn parse_json(raw: &str) -> Result<Self, String> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        match serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer) {
            Ok(config) => Ok(config),
            Err(error) => {
                let path = error.path().to_string();
                let source = error.into_inner();
                if path.is_empty() || path == "." {
                    Err(format!("parse config json: {source}"))
                } else {
                    Err(format!("parse config json at {path}: {source}"))
                }
            }
        }
    }
}

fn axes(raw: [f32; 3]) -> [(&'static str, f32); 3] {
    [("x", raw[0]), ("y", raw[1]), ("z", raw[2])]
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = GameConfig::parse_json("{}").expect("config");
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.save_file_name, "save.dat");
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config = GameConfig::parse_json(
            r#"{
                "score_per_kill": 25,
                "player": { "max_health": 3 },
                "level_enemies": [ { "kind": "without_ship", "position": [1.0, 2.0, 0.0] } ]
            }"#,
        )
        .expect("config");

        assert_eq!(config.score_per_kill, 25);
        assert_eq!(config.player.max_health, 3);
        assert_eq!(config.player.spawn, [0.0, 0.0, 0.0]);
        assert_eq!(config.level_enemies.len(), 1);
        assert_eq!(config.level_enemies[0].kind, EnemyKind::WithoutShip);
    }

    #[test]
    fn bad_field_reports_json_path() {
        let err = GameConfig::parse_json(r#"{ "player": { "max_health": -1 } }"#)
            .expect_err("negative health");
        assert!(err.contains("player.max_health"), "{err}");
    }

    #[test]
    fn default_config_passes_validation() {
        assert_eq!(GameConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_archetype_scale_is_rejected_on_load() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("config.json");
        fs::write(
            &path,
            r#"{ "enemy_without_ship": { "max_health": 2, "scale": [0.0, 1.0, 1.0] } }"#,
        )
        .expect("write config");

        let err = GameConfig::load_from_file(&path).expect_err("zero scale");

        match err {
            ConfigError::Invalid { message, .. } => {
                assert!(message.contains("enemy_without_ship.scale.x"), "{message}");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn non_finite_positions_are_rejected_with_path() {
        let mut config = GameConfig::default();
        config.player.spawn[1] = f32::INFINITY;
        let err = config.validate().expect_err("infinite spawn");
        assert!(err.contains("player.spawn.y"), "{err}");

        let mut config = GameConfig::default();
        config.level_enemies[1].position[0] = f32::NAN;
        let err = config.validate().expect_err("nan placement");
        assert!(err.contains("level_enemies[1].position.x"), "{err}");
    }

    #[test]
    fn load_from_file_wraps_errors_with_path() {
        let temp = TempDir::new().expect("temp");
        let missing = temp.path().join("missing.json");
        let err = GameConfig::load_from_file(&missing).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));

        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "score_per_kill": 5 }"#).expect("write config");
        let config = GameConfig::load_from_file(&path).expect("load");
        assert_eq!(config.score_per_kill, 5);
    }
}
