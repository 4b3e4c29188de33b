use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod save;

pub use app::{
    Entity, EntityDesc, EntityId, State, StateMachine, StateMachineError, Subscription,
    SubscriptionId, Transform, Vec2, Vec3, World,
};
pub use save::{SaveError, SaveStore, SAVE_FORMAT_VERSION};

pub const DATA_DIR_ENV_VAR: &str = "PLATFORMER_DATA_DIR";
const DEFAULT_DATA_DIR_NAME: &str = "userdata";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub saves_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("{var} is set but empty")]
    EmptyEnvDir { var: &'static str },
    #[error("data path exists but is not a directory: {path}")]
    NotADirectory { path: PathBuf },
    #[error("failed to create data directory at {path}: {source}")]
    CreateDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves the process-private data directory and creates the saves folder.
///
/// `PLATFORMER_DATA_DIR` wins when set; otherwise a `userdata` folder next to
/// the executable is used.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let data_dir = resolve_data_dir()?;
    app_paths_in(&data_dir)
}

pub fn app_paths_in(data_dir: &Path) -> Result<AppPaths, StartupError> {
    if data_dir.exists() && !data_dir.is_dir() {
        return Err(StartupError::NotADirectory {
            path: data_dir.to_path_buf(),
        });
    }
    let data_dir = normalize_path(data_dir);
    let saves_dir = data_dir.join("saves");

    fs::create_dir_all(&saves_dir).map_err(|source| StartupError::CreateDataDir {
        path: saves_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        data_dir,
        saves_dir,
    })
}

fn resolve_data_dir() -> Result<PathBuf, StartupError> {
    match env::var(DATA_DIR_ENV_VAR) {
        Ok(value) => {
            if value.trim().is_empty() {
                return Err(StartupError::EmptyEnvDir {
                    var: DATA_DIR_ENV_VAR,
                });
            }
            Ok(PathBuf::from(value))
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            Ok(exe_dir.join(DEFAULT_DATA_DIR_NAME))
        }
        Err(source) => Err(StartupError::EnvVar {
            var: DATA_DIR_ENV_VAR,
            source,
        }),
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
