use engine::{State, StateMachine, StateMachineError};
use tracing::info;

use super::context::GameContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStateKind {
    Menu,
    Game,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    MainMenuToGame,
    GameToGameOver,
    GameOverToMenu,
    GameOverToGame,
}

pub const TRANSITION_TABLE: [(TransitionKind, GameStateKind, GameStateKind); 4] = [
    (
        TransitionKind::MainMenuToGame,
        GameStateKind::Menu,
        GameStateKind::Game,
    ),
    (
        TransitionKind::GameToGameOver,
        GameStateKind::Game,
        GameStateKind::GameOver,
    ),
    (
        TransitionKind::GameOverToMenu,
        GameStateKind::GameOver,
        GameStateKind::Menu,
    ),
    (
        TransitionKind::GameOverToGame,
        GameStateKind::GameOver,
        GameStateKind::Game,
    ),
];

pub type GameStateMachine = StateMachine<GameStateKind, TransitionKind, GameContext>;

struct MenuState;

impl State<GameStateKind, GameContext> for MenuState {
    fn kind(&self) -> GameStateKind {
        GameStateKind::Menu
    }

    fn enter(&mut self, context: &mut GameContext) {
        context.reset_world();
        info!(has_save = context.saves().exists(), "menu_entered");
    }
}

struct GameState;

impl State<GameStateKind, GameContext> for GameState {
    fn kind(&self) -> GameStateKind {
        GameStateKind::Game
    }

    fn enter(&mut self, context: &mut GameContext) {
        context.build_level();
    }

    fn exit(&mut self, context: &mut GameContext) {
        context.level_ready = false;
    }
}

struct GameOverState;

impl State<GameStateKind, GameContext> for GameOverState {
    fn kind(&self) -> GameStateKind {
        GameStateKind::GameOver
    }

    fn enter(&mut self, context: &mut GameContext) {
        context.freeze();
        info!(final_score = context.score(), "game_over");
    }
}

pub(crate) fn build_state_machine() -> Result<GameStateMachine, StateMachineError> {
    let mut machine = GameStateMachine::new();
    machine.register_state(Box::new(MenuState))?;
    machine.register_state(Box::new(GameState))?;
    machine.register_state(Box::new(GameOverState))?;
    for (transition, from, to) in TRANSITION_TABLE {
        machine.register_transition(transition, from, to)?;
    }
    Ok(machine)
}
