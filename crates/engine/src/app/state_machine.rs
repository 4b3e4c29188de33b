use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;
use tracing::{debug, info};

/// A unit of flow behaviour. Hooks only ever see the world, never the
/// machine, so a hook cannot start a nested transition.
pub trait State<S, W> {
    fn kind(&self) -> S;
    fn enter(&mut self, _world: &mut W) {}
    fn exit(&mut self, _world: &mut W) {}
}

/// Returned by a `StateLoaded` handler to decide whether it stays registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Keep,
    Unsubscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("state {state} is already registered")]
    DuplicateState { state: String },
    #[error("transition {transition} is already registered")]
    DuplicateTransition { transition: String },
    #[error("transition {transition} is not registered")]
    UnknownTransition { transition: String },
    #[error("transition {transition} expects current state {expected}, found {actual}")]
    InvalidSourceState {
        transition: String,
        expected: String,
        actual: String,
    },
    #[error("state {state} is not registered")]
    UnregisteredState { state: String },
    #[error("state machine already entered state {current}")]
    AlreadyInitialized { current: String },
    #[error("state machine has not entered any state yet")]
    Uninitialized,
    #[error("{request} requested while another transition is in progress")]
    ReentrantTransition { request: String },
}

type StateLoadedHandler<S, W> = Box<dyn FnMut(S, &mut W) -> Subscription>;

struct Subscriber<S, W> {
    id: SubscriptionId,
    handler: StateLoadedHandler<S, W>,
}

#[derive(Debug, Clone, Copy)]
struct TransitionEdge<S> {
    from: S,
    to: S,
}

/// Finite state container keyed by `S`, driven by named transitions `T`,
/// with hooks operating on a world of type `W`.
pub struct StateMachine<S, T, W> {
    states: HashMap<S, Box<dyn State<S, W>>>,
    transitions: HashMap<T, TransitionEdge<S>>,
    current: Option<S>,
    subscribers: Vec<Subscriber<S, W>>,
    next_subscription_id: u64,
    in_transition: bool,
}

impl<S, T, W> Default for StateMachine<S, T, W>
where
    S: Copy + Eq + Hash + Debug,
    T: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, T, W> StateMachine<S, T, W>
where
    S: Copy + Eq + Hash + Debug,
    T: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            transitions: HashMap::new(),
            current: None,
            subscribers: Vec::new(),
            next_subscription_id: 0,
            in_transition: false,
        }
    }

    pub fn register_state(
        &mut self,
        state: Box<dyn State<S, W>>,
    ) -> Result<(), StateMachineError> {
        let kind = state.kind();
        if self.states.contains_key(&kind) {
            return Err(StateMachineError::DuplicateState {
                state: label(kind),
            });
        }
        self.states.insert(kind, state);
        Ok(())
    }

    pub fn register_transition(
        &mut self,
        transition: T,
        from: S,
        to: S,
    ) -> Result<(), StateMachineError> {
        if self.transitions.contains_key(&transition) {
            return Err(StateMachineError::DuplicateTransition {
                transition: label(transition),
            });
        }
        self.transitions
            .insert(transition, TransitionEdge { from, to });
        Ok(())
    }

    pub fn current_state(&self) -> Option<S> {
        self.current
    }

    pub fn is_transitioning(&self) -> bool {
        self.in_transition
    }

    pub fn has_state(&self, kind: S) -> bool {
        self.states.contains_key(&kind)
    }

    pub fn transition_edge(&self, transition: T) -> Option<(S, S)> {
        self.transitions
            .get(&transition)
            .map(|edge| (edge.from, edge.to))
    }

    /// Bootstrap entry into `kind`. Only valid before any state is current.
    pub fn enter_initial(&mut self, kind: S, world: &mut W) -> Result<(), StateMachineError> {
        if self.in_transition {
            return Err(StateMachineError::ReentrantTransition {
                request: format!("initial entry into {kind:?}"),
            });
        }
        if let Some(current) = self.current {
            return Err(StateMachineError::AlreadyInitialized {
                current: label(current),
            });
        }
        self.ensure_registered(kind)?;
        info!(to = ?kind, "state_initial_enter");
        self.change_state(kind, world);
        Ok(())
    }

    /// Runs `transition`: exit hook of the current state, switch, enter hook
    /// of the destination, then `StateLoaded` to every subscriber. On error
    /// nothing runs and the current state is untouched.
    pub fn perform_transition(
        &mut self,
        transition: T,
        world: &mut W,
    ) -> Result<S, StateMachineError> {
        if self.in_transition {
            return Err(StateMachineError::ReentrantTransition {
                request: format!("transition {transition:?}"),
            });
        }
        let edge = self.transitions.get(&transition).copied().ok_or_else(|| {
            StateMachineError::UnknownTransition {
                transition: label(transition),
            }
        })?;
        if let Some(current) = self.current {
            if current != edge.from {
                return Err(StateMachineError::InvalidSourceState {
                    transition: label(transition),
                    expected: label(edge.from),
                    actual: label(current),
                });
            }
        }
        self.ensure_registered(edge.to)?;

        info!(
            transition = ?transition,
            from = ?self.current,
            to = ?edge.to,
            "state_transition"
        );
        self.change_state(edge.to, world);
        Ok(edge.to)
    }

    /// Exits and re-enters the current state in place, raising `StateLoaded`
    /// again once it is back.
    pub fn reload_current(&mut self, world: &mut W) -> Result<S, StateMachineError> {
        if self.in_transition {
            return Err(StateMachineError::ReentrantTransition {
                request: "reload of current state".to_string(),
            });
        }
        let current = self.current.ok_or(StateMachineError::Uninitialized)?;
        info!(state = ?current, "state_reload");
        self.change_state(current, world);
        Ok(current)
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(S, &mut W) -> Subscription + 'static,
    {
        let id = SubscriptionId(self.next_subscription_id);
        self.next_subscription_id = self.next_subscription_id.saturating_add(1);
        self.subscribers.push(Subscriber {
            id,
            handler: Box::new(handler),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|subscriber| subscriber.id != id);
        before != self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn ensure_registered(&self, kind: S) -> Result<(), StateMachineError> {
        if self.states.contains_key(&kind) {
            Ok(())
        } else {
            Err(StateMachineError::UnregisteredState { state: label(kind) })
        }
    }

    fn change_state(&mut self, next: S, world: &mut W) {
        self.in_transition = true;

        if let Some(previous) = self.current {
            if let Some(state) = self.states.get_mut(&previous) {
                state.exit(world);
            }
        }
        self.current = Some(next);
        if let Some(state) = self.states.get_mut(&next) {
            state.enter(world);
        }

        self.notify_state_loaded(next, world);
        self.in_transition = false;
    }

    fn notify_state_loaded(&mut self, kind: S, world: &mut W) {
        let before = self.subscribers.len();
        self.subscribers
            .retain_mut(|subscriber| (subscriber.handler)(kind, world) == Subscription::Keep);
        debug!(
            state = ?kind,
            notified = before,
            remaining = self.subscribers.len(),
            "state_loaded"
        );
    }
}

fn label(value: impl Debug) -> String {
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Menu,
        Game,
        GameOver,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Edge {
        MainMenuToGame,
        GameToGameOver,
        GameOverToMenu,
    }

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
        panic_on_enter: Option<Kind>,
    }

    struct Recording(Kind);

    impl State<Kind, Log> for Recording {
        fn kind(&self) -> Kind {
            self.0
        }

        fn enter(&mut self, world: &mut Log) {
            if world.panic_on_enter == Some(self.0) {
                panic!("enter hook failed");
            }
            world.events.push(format!("enter:{:?}", self.0));
        }

        fn exit(&mut self, world: &mut Log) {
            world.events.push(format!("exit:{:?}", self.0));
        }
    }

    fn machine() -> StateMachine<Kind, Edge, Log> {
        let mut machine = StateMachine::new();
        for kind in [Kind::Menu, Kind::Game, Kind::GameOver] {
            machine
                .register_state(Box::new(Recording(kind)))
                .expect("register state");
        }
        machine
            .register_transition(Edge::MainMenuToGame, Kind::Menu, Kind::Game)
            .expect("menu->game");
        machine
            .register_transition(Edge::GameToGameOver, Kind::Game, Kind::GameOver)
            .expect("game->over");
        machine
    }

    #[test]
    fn menu_to_game_enters_game_and_notifies_once() {
        let mut machine = machine();
        let mut log = Log::default();
        machine.enter_initial(Kind::Menu, &mut log).expect("initial");

        machine.subscribe(|kind, log: &mut Log| {
            log.events.push(format!("loaded:{kind:?}"));
            Subscription::Keep
        });
        log.events.clear();

        let entered = machine
            .perform_transition(Edge::MainMenuToGame, &mut log)
            .expect("transition");

        assert_eq!(entered, Kind::Game);
        assert_eq!(machine.current_state(), Some(Kind::Game));
        assert_eq!(
            log.events,
            vec!["exit:Menu", "enter:Game", "loaded:Game"]
        );
    }

    #[test]
    fn every_registered_edge_lands_on_its_destination() {
        let mut machine = machine();
        machine
            .register_transition(Edge::GameOverToMenu, Kind::GameOver, Kind::Menu)
            .expect("over->menu");
        let mut log = Log::default();
        machine.enter_initial(Kind::Menu, &mut log).expect("initial");
        machine.subscribe(|kind, log: &mut Log| {
            log.events.push(format!("loaded:{kind:?}"));
            Subscription::Keep
        });

        for edge in [Edge::MainMenuToGame, Edge::GameToGameOver, Edge::GameOverToMenu] {
            let (from, to) = machine.transition_edge(edge).expect("edge");
            assert_eq!(machine.current_state(), Some(from));
            log.events.clear();
            machine.perform_transition(edge, &mut log).expect("transition");
            assert_eq!(machine.current_state(), Some(to));
            assert_eq!(
                log.events,
                vec![
                    format!("exit:{from:?}"),
                    format!("enter:{to:?}"),
                    format!("loaded:{to:?}"),
                ]
            );
        }
    }

    #[test]
    fn wrong_source_state_is_rejected_and_state_unchanged() {
        let mut machine = machine();
        let mut log = Log::default();
        machine.enter_initial(Kind::Menu, &mut log).expect("initial");
        log.events.clear();

        let err = machine
            .perform_transition(Edge::GameToGameOver, &mut log)
            .expect_err("menu is not the source");

        assert_eq!(
            err,
            StateMachineError::InvalidSourceState {
                transition: "GameToGameOver".to_string(),
                expected: "Game".to_string(),
                actual: "Menu".to_string(),
            }
        );
        assert_eq!(machine.current_state(), Some(Kind::Menu));
        assert!(log.events.is_empty());
    }

    #[test]
    fn unknown_transition_is_rejected_and_state_unchanged() {
        let mut machine = machine();
        let mut log = Log::default();
        machine.enter_initial(Kind::Menu, &mut log).expect("initial");

        let err = machine
            .perform_transition(Edge::GameOverToMenu, &mut log)
            .expect_err("not registered");

        assert!(matches!(err, StateMachineError::UnknownTransition { .. }));
        assert_eq!(machine.current_state(), Some(Kind::Menu));
    }

    #[test]
    fn first_transition_is_exempt_from_source_check() {
        let mut machine = machine();
        let mut log = Log::default();
        assert_eq!(machine.current_state(), None);

        machine
            .perform_transition(Edge::GameToGameOver, &mut log)
            .expect("bootstrap transition");

        assert_eq!(machine.current_state(), Some(Kind::GameOver));
        assert_eq!(log.events, vec!["enter:GameOver"]);
    }

    #[test]
    fn duplicate_state_and_transition_registration_fail() {
        let mut machine = machine();
        let err = machine
            .register_state(Box::new(Recording(Kind::Game)))
            .expect_err("duplicate state");
        assert_eq!(
            err,
            StateMachineError::DuplicateState {
                state: "Game".to_string()
            }
        );

        let err = machine
            .register_transition(Edge::MainMenuToGame, Kind::Menu, Kind::Game)
            .expect_err("duplicate transition");
        assert!(matches!(err, StateMachineError::DuplicateTransition { .. }));
    }

    #[test]
    fn transition_into_unregistered_state_is_rejected() {
        let mut machine: StateMachine<Kind, Edge, Log> = StateMachine::new();
        machine
            .register_state(Box::new(Recording(Kind::Menu)))
            .expect("menu");
        machine
            .register_transition(Edge::MainMenuToGame, Kind::Menu, Kind::Game)
            .expect("edge");
        let mut log = Log::default();
        machine.enter_initial(Kind::Menu, &mut log).expect("initial");

        let err = machine
            .perform_transition(Edge::MainMenuToGame, &mut log)
            .expect_err("game missing");
        assert!(matches!(err, StateMachineError::UnregisteredState { .. }));
        assert_eq!(machine.current_state(), Some(Kind::Menu));
    }

    #[test]
    fn enter_initial_twice_fails() {
        let mut machine = machine();
        let mut log = Log::default();
        machine.enter_initial(Kind::Menu, &mut log).expect("initial");
        let err = machine
            .enter_initial(Kind::Game, &mut log)
            .expect_err("already initialized");
        assert!(matches!(err, StateMachineError::AlreadyInitialized { .. }));
        assert_eq!(machine.current_state(), Some(Kind::Menu));
    }

    #[test]
    fn one_shot_subscriber_fires_exactly_once() {
        let mut machine = machine();
        machine
            .register_transition(Edge::GameOverToMenu, Kind::GameOver, Kind::Menu)
            .expect("over->menu");
        let mut log = Log::default();
        machine.enter_initial(Kind::Menu, &mut log).expect("initial");

        machine.subscribe(|kind, log: &mut Log| {
            if kind != Kind::Game {
                return Subscription::Keep;
            }
            log.events.push("restore".to_string());
            Subscription::Unsubscribe
        });

        machine
            .perform_transition(Edge::MainMenuToGame, &mut log)
            .expect("first game");
        assert_eq!(machine.subscriber_count(), 0);
        machine
            .perform_transition(Edge::GameToGameOver, &mut log)
            .expect("over");
        machine
            .perform_transition(Edge::GameOverToMenu, &mut log)
            .expect("menu");
        machine
            .perform_transition(Edge::MainMenuToGame, &mut log)
            .expect("second game");

        let restores = log
            .events
            .iter()
            .filter(|event| event.as_str() == "restore")
            .count();
        assert_eq!(restores, 1);
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let mut machine = machine();
        let id = machine.subscribe(|_, _: &mut Log| Subscription::Keep);
        assert_eq!(machine.subscriber_count(), 1);
        assert!(machine.unsubscribe(id));
        assert!(!machine.unsubscribe(id));
        assert_eq!(machine.subscriber_count(), 0);
    }

    #[test]
    fn reload_current_exits_and_reenters() {
        let mut machine = machine();
        let mut log = Log::default();
        machine.enter_initial(Kind::Menu, &mut log).expect("initial");
        log.events.clear();

        let reloaded = machine.reload_current(&mut log).expect("reload");

        assert_eq!(reloaded, Kind::Menu);
        assert_eq!(log.events, vec!["exit:Menu", "enter:Menu"]);
    }

    #[test]
    fn reload_before_initial_entry_fails() {
        let mut machine = machine();
        let mut log = Log::default();
        let err = machine.reload_current(&mut log).expect_err("uninitialized");
        assert_eq!(err, StateMachineError::Uninitialized);
    }

    #[test]
    fn interrupted_transition_blocks_further_transitions() {
        let mut machine = machine();
        let mut log = Log::default();
        machine.enter_initial(Kind::Menu, &mut log).expect("initial");
        log.panic_on_enter = Some(Kind::Game);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            machine.perform_transition(Edge::MainMenuToGame, &mut log)
        }));
        assert!(outcome.is_err());
        assert!(machine.is_transitioning());

        let err = machine
            .perform_transition(Edge::GameToGameOver, &mut log)
            .expect_err("still mid-transition");
        assert!(matches!(err, StateMachineError::ReentrantTransition { .. }));
    }
}
