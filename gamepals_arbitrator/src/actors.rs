//! Concrete actors: humans at a controller, software agents, and helpers that
//! reshape a pilot's button presses.

use std::sync::Arc;

use gamepals_core::{
    ActionInput, ActionInputWithConfidence, ActorId, ArbitrationCfg, ControllerInput, GameAction,
    INPUT_THRESHOLD,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::actor::{Actor, ActorData, ActorHub, ActorObserver, MessageData, RoleKey};
use crate::conversion::ActionConversionManager;

// ---------------------------------------------------------------------
// Human
// ---------------------------------------------------------------------

/// A person at physical controller `user_idx`.
pub struct HumanActor {
    hub: ActorHub,
    user_idx: usize,
    conversion: Arc<ActionConversionManager>,
    confidence: IndexMap<GameAction, f32>,
}

impl HumanActor {
    pub fn new(
        cfg: &ArbitrationCfg,
        user_idx: usize,
        conversion: Arc<ActionConversionManager>,
    ) -> Self {
        Self {
            hub: ActorHub::new(),
            user_idx,
            conversion,
            confidence: cfg.confidence_levels(user_idx),
        }
    }

    pub fn user_idx(&self) -> usize {
        self.user_idx
    }

    fn confidence_of(&self, action: &GameAction) -> f32 {
        self.confidence.get(action).copied().unwrap_or(1.0)
    }

    /// Feed one controller event (or `None` to poll timers) through the
    /// user-side delegates and notify whatever is ready.
    pub fn on_controller_update(&self, input: Option<ControllerInput>) {
        for a in self.conversion.input_to_actions(self.user_idx, input) {
            let c = self.confidence_of(&a.action);
            self.hub.notify_input(a, c);
        }
    }

    pub fn notify_message(&self, message: &str) {
        self.hub.notify_message(message);
    }
}

impl Actor for HumanActor {
    fn id(&self) -> ActorId {
        self.hub.id()
    }

    fn role_key(&self) -> RoleKey {
        RoleKey::Human(self.user_idx)
    }

    fn subscribe(&self, observer: Arc<dyn ActorObserver>) {
        self.hub.subscribe(observer);
    }

    /// Announce every action at rest, so arbitration sees this human's
    /// confidence before the first button press.
    fn start(&self) {
        if !self.hub.mark_started() {
            return;
        }
        info!(actor = %self.id(), user = self.user_idx, "human actor started");
        for (action, c) in &self.confidence {
            self.hub.notify_input(ActionInput::new(action.clone(), 0.0), *c);
        }
    }

    fn controlled_actions(&self) -> Vec<GameAction> {
        self.confidence.keys().cloned().collect()
    }
}

// ---------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------

/// Decision model behind an [`AgentActor`].
pub trait GameStateAgent: Send {
    type State;

    /// Proposals for the current game state.
    fn compute(&mut self, state: &Self::State) -> Vec<ActionInputWithConfidence>;
}

/// A software agent that reacts to game-state updates.
pub struct AgentActor<A: GameStateAgent> {
    hub: ActorHub,
    name: String,
    actions: Vec<GameAction>,
    agent: Mutex<A>,
}

impl<A: GameStateAgent> AgentActor<A> {
    /// Controlled actions come from the agent's configuration entry.
    pub fn new(cfg: &ArbitrationCfg, name: impl Into<String>, agent: A) -> Self {
        let name = name.into();
        Self {
            hub: ActorHub::new(),
            actions: cfg.agent_actions(&name),
            name,
            agent: Mutex::new(agent),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn on_game_state_update(&self, state: &A::State) {
        if !self.hub.is_started() {
            return;
        }
        let proposals = self.agent.lock().compute(state);
        for p in proposals {
            let confidence = p.confidence;
            self.hub.notify_input(p.without_confidence(), confidence);
        }
    }
}

impl<A: GameStateAgent> Actor for AgentActor<A> {
    fn id(&self) -> ActorId {
        self.hub.id()
    }

    fn role_key(&self) -> RoleKey {
        RoleKey::Agent(self.name.clone())
    }

    fn subscribe(&self, observer: Arc<dyn ActorObserver>) {
        self.hub.subscribe(observer);
    }

    fn start(&self) {
        if self.hub.mark_started() {
            info!(actor = %self.id(), agent = %self.name, "agent started");
        }
    }

    fn controlled_actions(&self) -> Vec<GameAction> {
        self.actions.clone()
    }
}

/// Turns a pilot's momentary button into a latch: each press flips it, and the
/// latched state is re-sent on every game tick.
pub struct PressToToggleAgent {
    hub: ActorHub,
    name: String,
    action: GameAction,
    has_pilot: bool,
    pressed: Mutex<bool>,
}

impl PressToToggleAgent {
    /// Build the agent and subscribe it to `pilot`. Without a pilot the latch is
    /// never sent; see [`Self::on_game_state_with`].
    pub fn new(
        name: impl Into<String>,
        action: impl Into<GameAction>,
        pilot: Option<&Arc<dyn Actor>>,
    ) -> Arc<Self> {
        let agent = Arc::new(Self {
            hub: ActorHub::new(),
            name: name.into(),
            action: action.into(),
            has_pilot: pilot.is_some(),
            pressed: Mutex::new(false),
        });
        if let Some(p) = pilot {
            p.subscribe(agent.clone());
        }
        agent
    }

    /// Initial latch, before any pilot press.
    pub fn with_start_pressed(self: Arc<Self>, pressed: bool) -> Arc<Self> {
        *self.pressed.lock() = pressed;
        self
    }

    pub fn is_latched(&self) -> bool {
        *self.pressed.lock()
    }

    /// Re-send the latched state.
    pub fn on_game_state_update(&self) {
        if !self.has_pilot || !self.hub.is_started() {
            return;
        }
        self.notify_latch();
    }

    /// Game tick with a model behind the toggle. With a pilot the latch is sent
    /// as in [`Self::on_game_state_update`]; without one, `agent` decides.
    pub fn on_game_state_with<A: GameStateAgent>(&self, agent: &mut A, state: &A::State) {
        if !self.hub.is_started() {
            return;
        }
        if self.has_pilot {
            self.notify_latch();
            return;
        }
        for p in agent.compute(state) {
            if p.action != self.action {
                debug!(agent = %self.name, action = %p.action, "proposal outside the toggled action");
                continue;
            }
            let confidence = p.confidence;
            self.hub.notify_input(p.without_confidence(), confidence);
        }
    }

    fn notify_latch(&self) {
        let v = if self.is_latched() { 1.0 } else { 0.0 };
        self.hub
            .notify_input(ActionInput::new(self.action.clone(), v), 1.0);
    }
}

impl ActorObserver for PressToToggleAgent {
    fn on_input_update(&self, data: ActorData) {
        if data.input.action != self.action || data.input.value.abs() <= INPUT_THRESHOLD {
            return;
        }
        let mut pressed = self.pressed.lock();
        *pressed = !*pressed;
        debug!(agent = %self.name, action = %self.action, latched = *pressed, "press toggled");
    }

    fn on_message_update(&self, _data: MessageData) {}
}

impl Actor for PressToToggleAgent {
    fn id(&self) -> ActorId {
        self.hub.id()
    }

    fn role_key(&self) -> RoleKey {
        RoleKey::Agent(self.name.clone())
    }

    fn subscribe(&self, observer: Arc<dyn ActorObserver>) {
        self.hub.subscribe(observer);
    }

    fn start(&self) {
        self.hub.mark_started();
    }

    fn controlled_actions(&self) -> Vec<GameAction> {
        vec![self.action.clone()]
    }
}

/// Like [`PressToToggleAgent`], but reacts on the press itself: every pilot press
/// immediately sends the opposite of the current latch.
pub struct HoldToToggleAgent {
    hub: ActorHub,
    name: String,
    action: GameAction,
    latched: Mutex<bool>,
}

impl HoldToToggleAgent {
    pub fn new(
        name: impl Into<String>,
        action: impl Into<GameAction>,
        pilot: Option<&Arc<dyn Actor>>,
    ) -> Arc<Self> {
        let agent = Arc::new(Self {
            hub: ActorHub::new(),
            name: name.into(),
            action: action.into(),
            latched: Mutex::new(false),
        });
        if let Some(p) = pilot {
            p.subscribe(agent.clone());
        }
        agent
    }

    pub fn is_latched(&self) -> bool {
        *self.latched.lock()
    }
}

impl ActorObserver for HoldToToggleAgent {
    fn on_input_update(&self, data: ActorData) {
        if data.input.action != self.action || data.input.value.abs() <= INPUT_THRESHOLD {
            return;
        }
        if !self.hub.is_started() {
            return;
        }
        let v = {
            let mut latched = self.latched.lock();
            *latched = !*latched;
            if *latched {
                1.0
            } else {
                0.0
            }
        };
        self.hub
            .notify_input(ActionInput::new(self.action.clone(), v), 1.0);
    }

    fn on_message_update(&self, _data: MessageData) {}
}

impl Actor for HoldToToggleAgent {
    fn id(&self) -> ActorId {
        self.hub.id()
    }

    fn role_key(&self) -> RoleKey {
        RoleKey::Agent(self.name.clone())
    }

    fn subscribe(&self, observer: Arc<dyn ActorObserver>) {
        self.hub.subscribe(observer);
    }

    fn start(&self) {
        self.hub.mark_started();
    }

    fn controlled_actions(&self) -> Vec<GameAction> {
        vec![self.action.clone()]
    }
}

// ---------------------------------------------------------------------
// External
// ---------------------------------------------------------------------

/// An actor driven from outside the process (e.g. over the C ABI).
///
/// Keeps the arbitrated feedback it receives until taken.
pub struct ExternalActor {
    hub: ActorHub,
    name: String,
    actions: Vec<GameAction>,
    feedback: Mutex<Vec<ControllerInput>>,
}

impl ExternalActor {
    pub fn new(name: impl Into<String>, actions: Vec<GameAction>) -> Self {
        Self {
            hub: ActorHub::new(),
            name: name.into(),
            actions,
            feedback: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&self, input: ActionInput, confidence: f32) {
        self.hub.notify_input(input, confidence);
    }

    pub fn push_message(&self, message: &str) {
        self.hub.notify_message(message);
    }

    pub fn take_feedback(&self) -> Vec<ControllerInput> {
        std::mem::take(&mut *self.feedback.lock())
    }
}

impl Actor for ExternalActor {
    fn id(&self) -> ActorId {
        self.hub.id()
    }

    fn role_key(&self) -> RoleKey {
        RoleKey::Agent(self.name.clone())
    }

    fn subscribe(&self, observer: Arc<dyn ActorObserver>) {
        self.hub.subscribe(observer);
    }

    fn start(&self) {
        self.hub.mark_started();
    }

    fn controlled_actions(&self) -> Vec<GameAction> {
        self.actions.clone()
    }

    fn on_arbitrated_inputs(&self, input: &ControllerInput) {
        self.feedback.lock().push(*input);
    }
}
