//! Platformer game flow: menu/game/game-over states, enemy bookkeeping and
//! save/restore of the running level on top of the `engine` crate.

pub mod app;

pub use app::config::{ConfigError, GameConfig};
pub use app::gameplay::{
    DialogChoice, EnemyKind, GameContext, GameError, GameRoot, GameStateKind, LoadOutcome,
    TransitionKind, WorldSnapshot,
};
