use std::path::PathBuf;

use engine::{EntityId, SaveStore, Subscription, SubscriptionId};
use tracing::{error, info, warn};

use super::context::GameContext;
use super::dialog::{ConfirmDialog, DialogChoice};
use super::error::GameError;
use super::flow::{build_state_machine, GameStateKind, GameStateMachine, TransitionKind};
use super::snapshot::{build_snapshot, validate_snapshot, SnapshotError};
use crate::app::config::GameConfig;

const QUIT_DIALOG_HEADLINE: &str = "Quit game";
const QUIT_DIALOG_TEXT: &str = "Are you sure you want to quit game?";

/// Result of [`GameRoot::load_saved_game`]. Anything but `Restored` leaves a
/// freshly built level in the Game state, as if a new game had started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored { enemy_count: usize },
    NoSaveData,
    CorruptSaveDiscarded { reason: String },
    Failed { reason: String },
}

impl LoadOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored { .. })
    }
}

/// Owns the flow state machine and the game context. Construct one per
/// process and hand it to the UI/input layers by reference. Not thread-safe;
/// a multi-threaded host keeps it behind a single mutex.
pub struct GameRoot {
    machine: GameStateMachine,
    context: GameContext,
    dialog: Option<ConfirmDialog>,
}

impl GameRoot {
    /// Registers the flow states and transitions, then enters Menu.
    pub fn new(config: GameConfig, saves: SaveStore) -> Result<Self, GameError> {
        let mut machine = build_state_machine()?;
        let mut context = GameContext::new(config, saves);
        machine.enter_initial(GameStateKind::Menu, &mut context)?;
        info!(save_path = %context.saves().path().display(), "game_root_ready");
        Ok(Self {
            machine,
            context,
            dialog: None,
        })
    }

    pub fn current_state(&self) -> Option<GameStateKind> {
        self.machine.current_state()
    }

    pub fn context(&self) -> &GameContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut GameContext {
        &mut self.context
    }

    pub fn has_saved_game(&self) -> bool {
        self.context.saves().exists()
    }

    pub fn start_new_game(&mut self) -> Result<(), GameError> {
        self.transition(TransitionKind::MainMenuToGame)
    }

    /// Enters the Game state, then applies the saved snapshot from a one-shot
    /// `StateLoaded` handler once Game is current. The handler is gone after
    /// this call whether or not the transition succeeded.
    pub fn load_saved_game(&mut self) -> Result<LoadOutcome, GameError> {
        self.context.pending_restore = None;
        let subscription = self
            .machine
            .subscribe(|kind, context: &mut GameContext| {
                if kind != GameStateKind::Game {
                    return Subscription::Keep;
                }
                let outcome = context.restore_from_save();
                context.pending_restore = Some(outcome);
                Subscription::Unsubscribe
            });

        if let Err(error) = self
            .machine
            .perform_transition(TransitionKind::MainMenuToGame, &mut self.context)
        {
            self.machine.unsubscribe(subscription);
            warn!(error = %error, "load_transition_failed");
            return Err(error.into());
        }

        let outcome = self
            .context
            .pending_restore
            .take()
            .ok_or(GameError::RestoreNotRun)?;
        match &outcome {
            LoadOutcome::Restored { enemy_count } => {
                info!(enemy_count = *enemy_count, "save_loaded")
            }
            LoadOutcome::NoSaveData => info!("load_fell_back_to_new_game"),
            LoadOutcome::CorruptSaveDiscarded { reason } => {
                error!(reason = %reason, "load_fell_back_to_new_game")
            }
            LoadOutcome::Failed { reason } => {
                warn!(reason = %reason, "load_fell_back_to_new_game")
            }
        }
        Ok(outcome)
    }

    /// Snapshots the running level into the save slot. Only valid in Game.
    pub fn save(&mut self) -> Result<PathBuf, GameError> {
        let state = self.current_state();
        if state != Some(GameStateKind::Game) {
            return Err(GameError::SaveOutsideGame { state });
        }
        let snapshot = build_snapshot(&self.context)?;
        validate_snapshot(&snapshot).map_err(SnapshotError::Invalid)?;
        self.context.saves().persist(&snapshot)?;
        Ok(self.context.saves().path().to_path_buf())
    }

    pub fn end_game(&mut self) -> Result<(), GameError> {
        self.transition(TransitionKind::GameToGameOver)
    }

    pub fn return_to_menu(&mut self) -> Result<(), GameError> {
        self.transition(TransitionKind::GameOverToMenu)
    }

    pub fn retry(&mut self) -> Result<(), GameError> {
        self.transition(TransitionKind::GameOverToGame)
    }

    /// Rebuilds the current state's content in place.
    pub fn reload_level(&mut self) -> Result<(), GameError> {
        self.machine.reload_current(&mut self.context)?;
        Ok(())
    }

    /// Posts a quit confirmation for the UI. A newer request replaces an
    /// unresolved one.
    pub fn quit_with_confirmation<F>(&mut self, on_confirm: F)
    where
        F: FnOnce() + 'static,
    {
        if self.dialog.is_some() {
            warn!("quit_dialog_replaced");
        }
        self.dialog = Some(ConfirmDialog::new(
            QUIT_DIALOG_HEADLINE,
            QUIT_DIALOG_TEXT,
            Box::new(on_confirm),
        ));
    }

    pub fn pending_dialog(&self) -> Option<&ConfirmDialog> {
        self.dialog.as_ref()
    }

    /// Returns whether a confirm callback ran.
    pub fn resolve_dialog(&mut self, choice: DialogChoice) -> bool {
        match self.dialog.take() {
            Some(dialog) => {
                info!(choice = ?choice, headline = dialog.headline(), "dialog_resolved");
                dialog.resolve(choice)
            }
            None => false,
        }
    }

    pub fn register_enemy(&mut self, id: EntityId) -> Result<bool, GameError> {
        self.context.register_enemy(id)
    }

    pub fn unregister_enemy(&mut self, id: EntityId) -> bool {
        self.context.unregister_enemy(id)
    }

    pub fn subscribe_state_loaded<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(GameStateKind, &mut GameContext) -> Subscription + 'static,
    {
        self.machine.subscribe(handler)
    }

    pub fn unsubscribe_state_loaded(&mut self, id: SubscriptionId) -> bool {
        self.machine.unsubscribe(id)
    }

    pub fn damage_enemy(&mut self, id: EntityId, amount: u32) -> Result<bool, GameError> {
        self.context.damage_enemy(id, amount)
    }

    /// Applies damage to the player; reaching zero health ends the game.
    /// Returns the remaining health.
    pub fn damage_player(&mut self, amount: u32) -> Result<u32, GameError> {
        let entity = self
            .context
            .player_entity_mut()
            .ok_or(GameError::MissingPlayer)?;
        entity.health = entity.health.saturating_sub(amount);
        let remaining = entity.health;
        if remaining == 0 && self.current_state() == Some(GameStateKind::Game) {
            info!("player_died");
            self.end_game()?;
        }
        Ok(remaining)
    }

    pub fn set_player_facing(&mut self, facing_right: bool) -> Result<(), GameError> {
        self.context.set_player_facing(facing_right)
    }

    fn transition(&mut self, transition: TransitionKind) -> Result<(), GameError> {
        self.machine
            .perform_transition(transition, &mut self.context)?;
        Ok(())
    }
}
