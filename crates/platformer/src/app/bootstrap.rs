use std::path::PathBuf;

use engine::{resolve_app_paths, AppPaths, SaveStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::config::{EnemyPlacement, GameConfig};
use super::gameplay::{EnemyKind, GameError, GameRoot};

const CONFIG_ENV_VAR: &str = "PLATFORMER_CONFIG";
const LEVEL_ENEMIES_ENV_VAR: &str = "PLATFORMER_LEVEL_ENEMIES";
const ROSTER_START_X: f32 = 8.0;
const ROSTER_SPACING_X: f32 = 4.0;

pub struct AppWiring {
    pub config: GameConfig,
    pub paths: AppPaths,
}

impl AppWiring {
    pub fn into_game_root(self) -> Result<GameRoot, GameError> {
        let saves = SaveStore::new(&self.paths.saves_dir, &self.config.save_file_name);
        GameRoot::new(self.config, saves)
    }
}

pub fn build_app() -> Result<AppWiring, GameError> {
    init_tracing();
    info!("=== Platformer Startup ===");

    let mut config = match config_path_from_env() {
        Some(path) => {
            info!(path = %path.display(), "config_file_loading");
            GameConfig::load_from_file(&path)?
        }
        None => GameConfig::default(),
    };
    if let Some(roster) = level_enemies_from_env() {
        info!(enemy_count = roster.len(), "level_roster_override");
        config.level_enemies = roster;
    }
    let paths = resolve_app_paths()?;
    info!(
        data_dir = %paths.data_dir.display(),
        saves_dir = %paths.saves_dir.display(),
        "app_paths_resolved"
    );

    Ok(AppWiring { config, paths })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn level_enemies_from_env() -> Option<Vec<EnemyPlacement>> {
    std::env::var(LEVEL_ENEMIES_ENV_VAR)
        .ok()
        .map(|raw| parse_level_enemies(&raw))
}

/// Lays out `with_ship,without_ship,...` left to right along the ground.
/// Unknown entries are skipped.
fn parse_level_enemies(raw: &str) -> Vec<EnemyPlacement> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let kind = EnemyKind::parse(entry);
            if kind.is_none() {
                warn!(entry, "unknown_enemy_kind_skipped");
            }
            kind
        })
        .enumerate()
        .map(|(index, kind)| EnemyPlacement {
            kind,
            position: [ROSTER_START_X + ROSTER_SPACING_X * index as f32, 0.0, 0.0],
        })
        .collect()
}
