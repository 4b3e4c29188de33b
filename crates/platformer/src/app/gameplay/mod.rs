mod actors;
mod context;
mod coordinator;
mod dialog;
mod error;
mod flow;
mod snapshot;

pub use actors::{EnemyKind, EnemyRegistry, PlayerControl, Score, PLAYER_ARCHETYPE};
pub use context::GameContext;
pub use coordinator::{GameRoot, LoadOutcome};
pub use dialog::{ConfirmDialog, DialogChoice};
pub use error::GameError;
pub use flow::{GameStateKind, GameStateMachine, TransitionKind, TRANSITION_TABLE};
pub use snapshot::{
    apply_snapshot, build_snapshot, validate_snapshot, EnemySnapshot, PlayerSnapshot, SavedVec2,
    SavedVec3, SnapshotError, WorldSnapshot,
};
pub(crate) use snapshot::{check_finite, expected_actual};
