use engine::{EntityId, SaveError, StartupError, StateMachineError};
use thiserror::Error;

use super::flow::GameStateKind;
use super::snapshot::SnapshotError;
use crate::app::config::ConfigError;

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    StateMachine(#[from] StateMachineError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("saving requires the Game state, current state is {state:?}")]
    SaveOutsideGame { state: Option<GameStateKind> },
    #[error("entity {0:?} does not exist")]
    UnknownEntity(EntityId),
    #[error("entity {id:?} is not an enemy (archetype {archetype})")]
    NotAnEnemy { id: EntityId, archetype: String },
    #[error("no player entity in the current level")]
    MissingPlayer,
    #[error("restore handler did not run after entering the Game state")]
    RestoreNotRun,
}
