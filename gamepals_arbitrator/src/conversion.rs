//! Action <-> device input conversion.
//!
//! Two directions, one delegate per action group:
//! - user side: raw controller events from a human are buffered and turned into
//!   `ActionInput`s (`register_input` then `ready_actions`), possibly with state
//!   such as toggle/hold timing;
//! - game side: an arbitrated `ActionInput` becomes the `ControllerInput`s the game
//!   reads (`convert_to_inputs`), and back (`convert_from_input`).
//!
//! Every action that is not claimed by a specialised delegate gets a
//! [`DefaultDelegate`] (one-to-one, or split stick when the game maps the action to
//! two stick halves).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use gamepals_core::{ActionInput, ArbitrationCfg, ControllerInput, GameAction, InputType};
use parking_lot::Mutex;
use tracing::{debug, warn};

pub trait ConversionDelegate: Send {
    /// Human whose controller feeds the user side.
    fn user_idx(&self) -> usize;

    /// Actions owned by this delegate.
    fn actions(&self) -> &[GameAction];

    /// Buffer one raw controller event received at `at`.
    fn register_input(&mut self, input: ControllerInput, at: Instant);

    /// Drain whatever is ready by `now`: at most one input per action per call.
    fn ready_actions(&mut self, now: Instant) -> Vec<ActionInput>;

    fn convert_to_inputs(&self, input: &ActionInput) -> Vec<ControllerInput>;

    fn convert_from_input(&self, input: &ControllerInput) -> Vec<ActionInput>;
}

/// Last raw event seen on one input type.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegisteredInput {
    pub value: f32,
    pub at: Option<Instant>,
    /// Whether this event already produced its (single) action.
    pub sent: bool,
}

impl RegisteredInput {
    pub fn new(value: f32, at: Instant) -> Self {
        Self {
            value,
            at: Some(at),
            sent: false,
        }
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.value != 0.0
    }
}

/// Per-delegate event buffer plus the queue of pending action inputs.
#[derive(Debug, Default)]
pub struct InputBuffer {
    latest: HashMap<InputType, RegisteredInput>,
    queue: VecDeque<ActionInput>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, input: ControllerInput, at: Instant) -> RegisteredInput {
        let r = RegisteredInput::new(input.value, at);
        self.latest.insert(input.kind, r);
        r
    }

    pub fn latest(&self, kind: InputType) -> RegisteredInput {
        self.latest.get(&kind).copied().unwrap_or_default()
    }

    pub fn latest_mut(&mut self, kind: InputType) -> Option<&mut RegisteredInput> {
        self.latest.get_mut(&kind)
    }

    pub fn push(&mut self, action: &GameAction, value: f32) {
        self.queue.push_back(ActionInput::new(action.clone(), value));
    }

    /// Drop queued inputs for `action` that were never handed out.
    pub fn discard(&mut self, action: &GameAction) {
        self.queue.retain(|a| &a.action != action);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pop the queue, keeping later inputs for an action already taken this call.
    pub fn drain_ready(&mut self) -> Vec<ActionInput> {
        let mut out: Vec<ActionInput> = Vec::new();
        let mut rest = VecDeque::new();
        while let Some(a) = self.queue.pop_front() {
            if out.iter().any(|o| o.action == a.action) {
                rest.push_back(a);
            } else {
                out.push(a);
            }
        }
        self.queue = rest;
        out
    }
}

/// Game-side value for an input read back from the device.
///
/// Negative stick halves may report a magnitude; the action sees the signed value.
pub(crate) fn signed_game_value(kind: InputType, value: f32) -> f32 {
    if kind.is_negative_axis() {
        -value.abs()
    } else {
        value
    }
}

/// Whether the first two game inputs are two halves of a stick.
pub(crate) fn is_split_stick(inputs: &[InputType]) -> bool {
    inputs.len() >= 2 && inputs[0].is_stick() && inputs[1].is_stick()
}

/// One-to-one game mapping: the first mapped input, or the matching stick half.
pub(crate) fn default_to_inputs(cfg: &ArbitrationCfg, input: &ActionInput) -> Vec<ControllerInput> {
    let inputs = cfg.action_to_game_inputs(&input.action);
    if inputs.is_empty() {
        warn!(action = %input.action, "no game input mapped for action");
        return Vec::new();
    }
    let idx = if is_split_stick(inputs) && input.value < 0.0 {
        1
    } else {
        0
    };
    vec![ControllerInput::new(inputs[idx], input.value)]
}

pub(crate) fn default_from_input(
    cfg: &ArbitrationCfg,
    owned: &[GameAction],
    input: &ControllerInput,
) -> Vec<ActionInput> {
    match cfg.game_input_to_action(input.kind) {
        Some(action) if owned.contains(action) => vec![ActionInput::new(
            action.clone(),
            signed_game_value(input.kind, input.value),
        )],
        _ => {
            warn!(input = %input.kind, "input not owned by delegate");
            Vec::new()
        }
    }
}

/// One action, one device input; or one action on two stick halves.
#[derive(Debug)]
pub struct DefaultDelegate {
    cfg: Arc<ArbitrationCfg>,
    user_idx: usize,
    actions: [GameAction; 1],
    buffer: InputBuffer,
}

impl DefaultDelegate {
    pub fn new(cfg: Arc<ArbitrationCfg>, user_idx: usize, action: GameAction) -> Self {
        Self {
            cfg,
            user_idx,
            actions: [action],
            buffer: InputBuffer::new(),
        }
    }

    fn action(&self) -> &GameAction {
        &self.actions[0]
    }
}

impl ConversionDelegate for DefaultDelegate {
    fn user_idx(&self) -> usize {
        self.user_idx
    }

    fn actions(&self) -> &[GameAction] {
        &self.actions
    }

    fn register_input(&mut self, input: ControllerInput, at: Instant) {
        self.buffer.record(input, at);
        let owned = self
            .cfg
            .user_input_to_actions(self.user_idx, input.kind)
            .into_iter()
            .any(|a| a == self.action());
        if !owned {
            warn!(input = %input.kind, action = %self.action(), "input not mapped to delegate action");
            return;
        }
        self.buffer.push(&self.actions[0], input.value);
    }

    fn ready_actions(&mut self, _now: Instant) -> Vec<ActionInput> {
        self.buffer.drain_ready()
    }

    fn convert_to_inputs(&self, input: &ActionInput) -> Vec<ControllerInput> {
        default_to_inputs(&self.cfg, input)
    }

    fn convert_from_input(&self, input: &ControllerInput) -> Vec<ActionInput> {
        default_from_input(&self.cfg, &self.actions, input)
    }
}

/// Routes controller events and arbitrated actions to their delegates.
///
/// Delegates sit behind their own mutexes so a controller thread and the
/// arbitrator can share one manager.
pub struct ActionConversionManager {
    cfg: Arc<ArbitrationCfg>,
    delegates: Vec<Mutex<Box<dyn ConversionDelegate>>>,
    /// User side: `(user_idx, action)` to delegate.
    by_user_action: HashMap<(usize, GameAction), usize>,
    /// Delegates to poll for each user, in registration order.
    by_user: HashMap<usize, Vec<usize>>,
    /// Game side: action to delegate.
    by_action: HashMap<GameAction, usize>,
}

impl ActionConversionManager {
    /// Build a manager from specialised delegates; every remaining configured
    /// action gets a [`DefaultDelegate`].
    pub fn new(cfg: Arc<ArbitrationCfg>, custom: Vec<Box<dyn ConversionDelegate>>) -> Self {
        let mut mgr = Self {
            cfg: cfg.clone(),
            delegates: Vec::new(),
            by_user_action: HashMap::new(),
            by_user: HashMap::new(),
            by_action: HashMap::new(),
        };

        for d in custom {
            mgr.push(d, true);
        }

        let mut defaulted: HashSet<GameAction> = HashSet::new();
        for idx in cfg.human_indices() {
            for action in cfg.controlled_actions(idx) {
                if mgr.by_user_action.contains_key(&(idx, action.clone())) {
                    continue;
                }
                if !mgr.by_action.contains_key(&action) {
                    defaulted.insert(action.clone());
                }
                mgr.push(Box::new(DefaultDelegate::new(cfg.clone(), idx, action)), true);
            }
        }

        // Output-only actions (agents, game mapping) still need a game-side delegate.
        for action in cfg.all_actions() {
            if mgr.by_action.contains_key(&action) {
                continue;
            }
            defaulted.insert(action.clone());
            mgr.push(Box::new(DefaultDelegate::new(cfg.clone(), 0, action)), false);
        }

        for action in cfg.all_actions() {
            if !defaulted.contains(&action) {
                continue;
            }
            let inputs = cfg.action_to_game_inputs(&action);
            if inputs.len() >= 2 && !is_split_stick(inputs) {
                warn!(
                    action = %action,
                    inputs = inputs.len(),
                    "action maps to several game inputs but uses the one-to-one conversion"
                );
            }
        }

        mgr
    }

    fn push(&mut self, delegate: Box<dyn ConversionDelegate>, user_side: bool) {
        let slot = self.delegates.len();
        let user_idx = delegate.user_idx();
        for action in delegate.actions() {
            if user_side {
                self.by_user_action
                    .entry((user_idx, action.clone()))
                    .or_insert(slot);
            }
            self.by_action.entry(action.clone()).or_insert(slot);
        }
        if user_side {
            self.by_user.entry(user_idx).or_default().push(slot);
        }
        self.delegates.push(Mutex::new(delegate));
    }

    pub fn cfg(&self) -> &Arc<ArbitrationCfg> {
        &self.cfg
    }

    pub fn delegate_count(&self) -> usize {
        self.delegates.len()
    }

    /// User side, stamped with the current time. `None` only polls timers.
    pub fn input_to_actions(&self, user_idx: usize, input: Option<ControllerInput>) -> Vec<ActionInput> {
        self.input_to_actions_at(user_idx, input, Instant::now())
    }

    pub fn input_to_actions_at(
        &self,
        user_idx: usize,
        input: Option<ControllerInput>,
        now: Instant,
    ) -> Vec<ActionInput> {
        if let Some(ci) = input {
            let actions = self.cfg.user_input_to_actions(user_idx, ci.kind);
            if actions.is_empty() {
                debug!(user = user_idx, input = %ci.kind, "controller input not mapped to any action");
            }
            let mut touched: Vec<usize> = Vec::new();
            for action in actions {
                match self.by_user_action.get(&(user_idx, action.clone())) {
                    Some(slot) if !touched.contains(slot) => touched.push(*slot),
                    Some(_) => {}
                    None => warn!(user = user_idx, action = %action, "no delegate for action"),
                }
            }
            for slot in touched {
                self.delegates[slot].lock().register_input(ci, now);
            }
        }

        let mut out = Vec::new();
        if let Some(slots) = self.by_user.get(&user_idx) {
            for slot in slots {
                out.extend(self.delegates[*slot].lock().ready_actions(now));
            }
        }
        out
    }

    /// Game side: arbitrated action to the device inputs that actuate it.
    pub fn action_to_inputs(&self, input: &ActionInput) -> Vec<ControllerInput> {
        match self.by_action.get(&input.action) {
            Some(slot) => self.delegates[*slot].lock().convert_to_inputs(input),
            None => {
                warn!(action = %input.action, "no conversion for action");
                Vec::new()
            }
        }
    }

    /// Game side inverse: a device input back to the action(s) it encodes.
    pub fn input_to_game_actions(&self, input: &ControllerInput) -> Vec<ActionInput> {
        let slot = self
            .cfg
            .game_input_to_action(input.kind)
            .and_then(|action| self.by_action.get(action));
        match slot {
            Some(slot) => self.delegates[*slot].lock().convert_from_input(input),
            None => {
                warn!(input = %input.kind, "device input not mapped to any action");
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for ActionConversionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionConversionManager")
            .field("delegates", &self.delegates.len())
            .field("actions", &self.by_action.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_keeps_one_per_action() {
        let mut b = InputBuffer::new();
        let jump = GameAction::from("JUMP");
        let fire = GameAction::from("FIRE");
        b.push(&jump, 1.0);
        b.push(&fire, 1.0);
        b.push(&jump, 0.0);

        let first = b.drain_ready();
        assert_eq!(first, vec![ActionInput::new("JUMP", 1.0), ActionInput::new("FIRE", 1.0)]);
        assert_eq!(b.pending(), 1);
        assert_eq!(b.drain_ready(), vec![ActionInput::new("JUMP", 0.0)]);
        assert!(b.drain_ready().is_empty());
    }

    #[test]
    fn discard_only_touches_one_action() {
        let mut b = InputBuffer::new();
        let a = GameAction::from("A");
        let c = GameAction::from("C");
        b.push(&a, 1.0);
        b.push(&c, 1.0);
        b.discard(&a);
        assert_eq!(b.drain_ready(), vec![ActionInput::new("C", 1.0)]);
    }

    #[test]
    fn split_stick_detection() {
        assert!(is_split_stick(&[InputType::StickLeftXPos, InputType::StickLeftXNeg]));
        assert!(!is_split_stick(&[InputType::StickLeftXPos]));
        assert!(!is_split_stick(&[InputType::BtnA, InputType::StickLeftXNeg]));
    }
}
