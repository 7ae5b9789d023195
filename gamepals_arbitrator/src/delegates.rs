//! Specialised conversion delegates.
//!
//! Each one validates its device mapping at construction and returns
//! `InvalidMapping` when the configured shape cannot work.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gamepals_core::{
    ActionInput, ArbitrationCfg, ArbitrationError, ControllerInput, GameAction, InputType, Result,
};
use tracing::{debug, warn};

use crate::conversion::{
    default_from_input, default_to_inputs, ConversionDelegate, InputBuffer,
};

/// Press length separating a tap from a hold on double-function buttons.
pub const HOLD_THRESHOLD: Duration = Duration::from_millis(200);

fn invalid(action: &GameAction, reason: impl Into<String>) -> ArbitrationError {
    ArbitrationError::InvalidMapping {
        action: action.clone(),
        reason: reason.into(),
    }
}

/// The two game inputs of a bipolar action: `(positive, negative)`.
///
/// The first mapped input is the positive direction, the second the negative.
fn game_pair(cfg: &ArbitrationCfg, action: &GameAction, what: &str) -> Result<(InputType, InputType)> {
    match cfg.action_to_game_inputs(action) {
        [pos, neg] => Ok((*pos, *neg)),
        other => Err(invalid(
            action,
            format!("{what} needs a positive and a negative game input, found {}", other.len()),
        )),
    }
}

/// User-side value: the second control is the negative half, unless it is a stick.
fn signed_user_value(user: &[InputType], kind: InputType, value: f32) -> Option<f32> {
    match user.iter().position(|k| *k == kind)? {
        1 if !kind.is_stick() => Some(-value),
        _ => Some(value),
    }
}

fn first_user_control(cfg: &ArbitrationCfg, user_idx: usize, action: &GameAction) -> Result<InputType> {
    cfg.action_to_user_inputs(user_idx, action)
        .first()
        .copied()
        .ok_or_else(|| invalid(action, format!("user {user_idx} has no control for the action")))
}

// ---------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------

/// One bipolar action on a positive and a negative device input (e.g. a stick axis
/// split in halves, or two triggers).
///
/// Game inputs are mapped `[positive, negative]`: values >= 0 go to the first,
/// values below zero to the second with their sign kept.
#[derive(Debug)]
pub struct AxisDelegate {
    cfg: Arc<ArbitrationCfg>,
    user_idx: usize,
    actions: [GameAction; 1],
    game: (InputType, InputType),
    user: Vec<InputType>,
    buffer: InputBuffer,
}

impl AxisDelegate {
    pub fn new(cfg: Arc<ArbitrationCfg>, user_idx: usize, action: GameAction) -> Result<Self> {
        let game = game_pair(&cfg, &action, "axis")?;
        let user = cfg.action_to_user_inputs(user_idx, &action).to_vec();
        Ok(Self {
            cfg,
            user_idx,
            actions: [action],
            game,
            user,
            buffer: InputBuffer::new(),
        })
    }
}

impl ConversionDelegate for AxisDelegate {
    fn user_idx(&self) -> usize {
        self.user_idx
    }

    fn actions(&self) -> &[GameAction] {
        &self.actions
    }

    fn register_input(&mut self, input: ControllerInput, at: Instant) {
        self.buffer.record(input, at);
        match signed_user_value(&self.user, input.kind, input.value) {
            Some(v) => self.buffer.push(&self.actions[0], v),
            None => warn!(input = %input.kind, action = %self.actions[0], "input not owned by axis"),
        }
    }

    fn ready_actions(&mut self, _now: Instant) -> Vec<ActionInput> {
        self.buffer.drain_ready()
    }

    fn convert_to_inputs(&self, input: &ActionInput) -> Vec<ControllerInput> {
        let (pos, neg) = self.game;
        let kind = if input.value >= 0.0 { pos } else { neg };
        vec![ControllerInput::new(kind, input.value)]
    }

    fn convert_from_input(&self, input: &ControllerInput) -> Vec<ActionInput> {
        let (pos, neg) = self.game;
        let action = self.actions[0].clone();
        if input.kind == pos {
            vec![ActionInput::new(action, input.value)]
        } else if input.kind == neg {
            vec![ActionInput::new(action, -input.value.abs())]
        } else {
            default_from_input(&self.cfg, &self.actions, input)
        }
    }
}

// ---------------------------------------------------------------------
// Binary pair
// ---------------------------------------------------------------------

/// One bipolar action on two on/off device inputs (e.g. two bumpers).
///
/// Game inputs are mapped `[positive, negative]`. The game side always drives
/// both inputs with magnitudes so the opposite one is released. Two halves of
/// the same stick axis are rejected; that mapping belongs to [`AxisDelegate`].
#[derive(Debug)]
pub struct BinaryPairDelegate {
    cfg: Arc<ArbitrationCfg>,
    user_idx: usize,
    actions: [GameAction; 1],
    game: (InputType, InputType),
    user: Vec<InputType>,
    buffer: InputBuffer,
}

impl BinaryPairDelegate {
    pub fn new(cfg: Arc<ArbitrationCfg>, user_idx: usize, action: GameAction) -> Result<Self> {
        let game = game_pair(&cfg, &action, "binary pair")?;
        if let (Some(pos), Some(neg)) = (game.0.stick(), game.1.stick()) {
            if pos == neg {
                return Err(invalid(
                    &action,
                    format!("{} and {} drive one stick axis", game.0, game.1),
                ));
            }
        }
        let user = cfg.action_to_user_inputs(user_idx, &action).to_vec();
        Ok(Self {
            cfg,
            user_idx,
            actions: [action],
            game,
            user,
            buffer: InputBuffer::new(),
        })
    }
}

impl ConversionDelegate for BinaryPairDelegate {
    fn user_idx(&self) -> usize {
        self.user_idx
    }

    fn actions(&self) -> &[GameAction] {
        &self.actions
    }

    fn register_input(&mut self, input: ControllerInput, at: Instant) {
        let Some(value) = signed_user_value(&self.user, input.kind, input.value) else {
            warn!(input = %input.kind, action = %self.actions[0], "input not owned by binary pair");
            return;
        };
        self.buffer.record(input, at);

        if input.value != 0.0 {
            self.buffer.push(&self.actions[0], value);
            return;
        }

        // Released: fall back to the other half if it is still held.
        let other = self
            .user
            .iter()
            .take(2)
            .copied()
            .find(|k| *k != input.kind)
            .map(|k| (k, self.buffer.latest(k)))
            .filter(|(_, r)| r.is_held());
        match other {
            Some((kind, r)) => {
                let resumed = signed_user_value(&self.user, kind, r.value).unwrap_or(r.value);
                debug!(action = %self.actions[0], input = %kind, "binary pair resumes held half");
                self.buffer.push(&self.actions[0], resumed);
            }
            None => self.buffer.push(&self.actions[0], 0.0),
        }
    }

    fn ready_actions(&mut self, _now: Instant) -> Vec<ActionInput> {
        self.buffer.drain_ready()
    }

    fn convert_to_inputs(&self, input: &ActionInput) -> Vec<ControllerInput> {
        let (pos, neg) = self.game;
        let level = input.value.abs();
        if input.value >= 0.0 {
            vec![ControllerInput::new(pos, level), ControllerInput::new(neg, 0.0)]
        } else {
            vec![ControllerInput::new(neg, level), ControllerInput::new(pos, 0.0)]
        }
    }

    fn convert_from_input(&self, input: &ControllerInput) -> Vec<ActionInput> {
        let (pos, neg) = self.game;
        let action = self.actions[0].clone();
        if input.kind == pos {
            vec![ActionInput::new(action, input.value.abs())]
        } else if input.kind == neg {
            vec![ActionInput::new(action, -input.value.abs())]
        } else {
            default_from_input(&self.cfg, &self.actions, input)
        }
    }
}

// ---------------------------------------------------------------------
// Hold threshold
// ---------------------------------------------------------------------

/// Long-press guard: the action fires once the input has been held for
/// `threshold`; shorter taps never reach the game.
#[derive(Debug)]
pub struct HoldThresholdDelegate {
    cfg: Arc<ArbitrationCfg>,
    user_idx: usize,
    actions: [GameAction; 1],
    user: Vec<InputType>,
    threshold: Duration,
    buffer: InputBuffer,
}

impl HoldThresholdDelegate {
    pub fn new(
        cfg: Arc<ArbitrationCfg>,
        user_idx: usize,
        action: GameAction,
        threshold: Duration,
    ) -> Result<Self> {
        first_user_control(&cfg, user_idx, &action)?;
        let user = cfg.action_to_user_inputs(user_idx, &action).to_vec();
        Ok(Self {
            cfg,
            user_idx,
            actions: [action],
            user,
            threshold,
            buffer: InputBuffer::new(),
        })
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl ConversionDelegate for HoldThresholdDelegate {
    fn user_idx(&self) -> usize {
        self.user_idx
    }

    fn actions(&self) -> &[GameAction] {
        &self.actions
    }

    fn register_input(&mut self, input: ControllerInput, at: Instant) {
        if !self.user.contains(&input.kind) {
            warn!(input = %input.kind, action = %self.actions[0], "input not owned by hold threshold");
            return;
        }
        let prev = self.buffer.latest(input.kind);

        if input.value != 0.0 {
            if !prev.is_held() {
                self.buffer.record(input, at);
            } else if let Some(r) = self.buffer.latest_mut(input.kind) {
                // Level change while held: keep the original press time.
                r.value = input.value;
            }
            return;
        }

        if prev.sent {
            self.buffer.push(&self.actions[0], 0.0);
        }
        self.buffer.record(input, at);
    }

    fn ready_actions(&mut self, now: Instant) -> Vec<ActionInput> {
        let mut fired = Vec::new();
        for kind in &self.user {
            if let Some(r) = self.buffer.latest_mut(*kind) {
                let due = r
                    .at
                    .map(|t| now.saturating_duration_since(t) >= self.threshold)
                    .unwrap_or(false);
                if r.is_held() && !r.sent && due {
                    r.sent = true;
                    fired.push(r.value);
                }
            }
        }
        for v in fired {
            self.buffer.push(&self.actions[0], v);
        }
        self.buffer.drain_ready()
    }

    fn convert_to_inputs(&self, input: &ActionInput) -> Vec<ControllerInput> {
        default_to_inputs(&self.cfg, input)
    }

    fn convert_from_input(&self, input: &ControllerInput) -> Vec<ActionInput> {
        default_from_input(&self.cfg, &self.actions, input)
    }
}

// ---------------------------------------------------------------------
// Double function
// ---------------------------------------------------------------------

/// One button, two actions: a tap toggles, a hold holds.
///
/// The outcome is decided by press length: releasing before the threshold sends
/// the toggle action as press then release; staying down past it sends the hold
/// action once and releases it with the button.
#[derive(Debug)]
pub struct DoubleFunctionDelegate {
    cfg: Arc<ArbitrationCfg>,
    user_idx: usize,
    /// `[toggle, hold]`.
    actions: [GameAction; 2],
    button: InputType,
    threshold: Duration,
    buffer: InputBuffer,
}

impl DoubleFunctionDelegate {
    pub fn new(
        cfg: Arc<ArbitrationCfg>,
        user_idx: usize,
        toggle: GameAction,
        hold: GameAction,
    ) -> Result<Self> {
        let button = first_user_control(&cfg, user_idx, &toggle)?;
        if !cfg.action_to_user_inputs(user_idx, &hold).contains(&button) {
            return Err(invalid(&hold, format!("hold action must share the toggle button {button}")));
        }
        Ok(Self {
            cfg,
            user_idx,
            actions: [toggle, hold],
            button,
            threshold: HOLD_THRESHOLD,
            buffer: InputBuffer::new(),
        })
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn button(&self) -> InputType {
        self.button
    }
}

impl ConversionDelegate for DoubleFunctionDelegate {
    fn user_idx(&self) -> usize {
        self.user_idx
    }

    fn actions(&self) -> &[GameAction] {
        &self.actions
    }

    fn register_input(&mut self, input: ControllerInput, at: Instant) {
        if input.kind != self.button {
            warn!(input = %input.kind, button = %self.button, "input not owned by double function");
            return;
        }
        let prev = self.buffer.latest(self.button);
        let [toggle, hold] = &self.actions;

        if input.value != 0.0 {
            if !prev.is_held() {
                self.buffer.record(input, at);
            } else if let Some(r) = self.buffer.latest_mut(self.button) {
                r.value = input.value;
            }
            return;
        }

        if prev.is_held() {
            if prev.sent {
                self.buffer.push(hold, 0.0);
            } else {
                let held_for = prev
                    .at
                    .map(|t| at.saturating_duration_since(t))
                    .unwrap_or_default();
                let action = if held_for < self.threshold { toggle } else { hold };
                self.buffer.push(action, prev.value);
                self.buffer.push(action, 0.0);
            }
        }
        self.buffer.record(input, at);
    }

    fn ready_actions(&mut self, now: Instant) -> Vec<ActionInput> {
        let threshold = self.threshold;
        let mut fired = None;
        if let Some(r) = self.buffer.latest_mut(self.button) {
            let due = r
                .at
                .map(|t| now.saturating_duration_since(t) >= threshold)
                .unwrap_or(false);
            if r.is_held() && !r.sent && due {
                r.sent = true;
                fired = Some(r.value);
            }
        }
        if let Some(v) = fired {
            self.buffer.push(&self.actions[1], v);
        }
        self.buffer.drain_ready()
    }

    fn convert_to_inputs(&self, input: &ActionInput) -> Vec<ControllerInput> {
        default_to_inputs(&self.cfg, input)
    }

    fn convert_from_input(&self, input: &ControllerInput) -> Vec<ActionInput> {
        default_from_input(&self.cfg, &self.actions, input)
    }
}

// ---------------------------------------------------------------------
// Three for two
// ---------------------------------------------------------------------

/// Three actions on two buttons: each button alone drives its own action, both
/// together drive the third.
#[derive(Debug)]
pub struct ThreeForTwoDelegate {
    cfg: Arc<ArbitrationCfg>,
    user_idx: usize,
    actions: [GameAction; 3],
    buttons: (InputType, InputType),
    invert_action_1: bool,
    combo: bool,
    buffer: InputBuffer,
}

impl ThreeForTwoDelegate {
    pub fn new(cfg: Arc<ArbitrationCfg>, user_idx: usize, actions: [GameAction; 3]) -> Result<Self> {
        let a = first_user_control(&cfg, user_idx, &actions[0])?;
        let b = first_user_control(&cfg, user_idx, &actions[1])?;
        if a == b {
            return Err(invalid(&actions[1], format!("both single actions use {a}")));
        }
        Ok(Self {
            cfg,
            user_idx,
            actions,
            buttons: (a, b),
            invert_action_1: false,
            combo: false,
            buffer: InputBuffer::new(),
        })
    }

    /// Negate the first action's value (e.g. reverse gear on a brake button).
    pub fn invert_action_1(mut self, invert: bool) -> Self {
        self.invert_action_1 = invert;
        self
    }

    pub fn in_combo(&self) -> bool {
        self.combo
    }

    fn first_value(&self, v: f32) -> f32 {
        if self.invert_action_1 {
            -v
        } else {
            v
        }
    }
}

impl ConversionDelegate for ThreeForTwoDelegate {
    fn user_idx(&self) -> usize {
        self.user_idx
    }

    fn actions(&self) -> &[GameAction] {
        &self.actions
    }

    fn register_input(&mut self, input: ControllerInput, at: Instant) {
        let (ba, bb) = self.buttons;
        if input.kind != ba && input.kind != bb {
            warn!(input = %input.kind, "input not owned by three-for-two");
            return;
        }
        self.buffer.record(input, at);

        let a = self.buffer.latest(ba);
        let b = self.buffer.latest(bb);
        let va = self.first_value(a.value);
        let [a1, a2, a3] = &self.actions;

        if a.is_held() && b.is_held() {
            if !self.combo {
                self.combo = true;
                self.buffer.discard(a1);
                self.buffer.discard(a2);
                self.buffer.push(a1, 0.0);
                self.buffer.push(a2, 0.0);
                self.buffer.push(a3, 1.0);
            }
        } else if self.combo {
            self.combo = false;
            self.buffer.push(a3, 0.0);
            if a.is_held() {
                self.buffer.push(a1, va);
            } else if b.is_held() {
                self.buffer.push(a2, b.value);
            }
        } else if input.kind == ba {
            self.buffer.push(a1, va);
        } else {
            self.buffer.push(a2, b.value);
        }
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
