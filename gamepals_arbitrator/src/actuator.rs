//! Outbound boundary: the device that finally receives arbitrated commands.

use std::collections::BTreeSet;

use gamepals_core::{Axis, ControllerInput, InputType, StickSide, INPUT_THRESHOLD};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

/// Sink for arbitrated controller inputs.
///
/// Implementations are shared between threads; calls for one action arrive
/// serialized, calls for different actions may interleave.
pub trait Actuator: Send + Sync {
    fn start(&self) {}

    fn execute(&self, input: ControllerInput);

    fn execute_stick(&self, side: StickSide, x: f32, y: f32);

    /// Release every button and center every axis.
    fn reset_controls(&self);
}

/// Snapshot of a virtual Xbox 360 style pad.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GamepadState {
    pub pressed: BTreeSet<InputType>,
    /// D-pad direction per axis, each in `{-1, 0, 1}`.
    pub dpad: (i8, i8),
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub left_stick: (f32, f32),
    pub right_stick: (f32, f32),
}

impl GamepadState {
    pub fn stick(&self, side: StickSide) -> (f32, f32) {
        match side {
            StickSide::Left => self.left_stick,
            StickSide::Right => self.right_stick,
        }
    }

    fn stick_mut(&mut self, side: StickSide) -> &mut (f32, f32) {
        match side {
            StickSide::Left => &mut self.left_stick,
            StickSide::Right => &mut self.right_stick,
        }
    }

    pub fn is_pressed(&self, kind: InputType) -> bool {
        self.pressed.contains(&kind)
    }

    fn apply(&mut self, input: ControllerInput) {
        let ControllerInput { kind, value } = input;

        if let Some((side, axis)) = kind.stick() {
            // Negative halves report magnitudes; flip them onto the negative side.
            let v = if kind.is_negative_axis() && value > 0.0 {
                -value
            } else {
                value
            };
            let stick = self.stick_mut(side);
            match axis {
                Axis::X => stick.0 = v,
                Axis::Y => stick.1 = v,
            }
        } else if kind.is_trigger() {
            let level = value.abs().min(1.0);
            match kind {
                InputType::TriggerLeft => self.left_trigger = level,
                _ => self.right_trigger = level,
            }
        } else if kind.is_dpad() {
            let dir = if value > 0.0 {
                1
            } else if value < 0.0 {
                -1
            } else {
                0
            };
            match kind {
                InputType::DirPadX => self.dpad.0 = dir,
                _ => self.dpad.1 = dir,
            }
        } else if value.abs() > INPUT_THRESHOLD {
            self.pressed.insert(kind);
        } else {
            self.pressed.remove(&kind);
        }
    }
}

#[derive(Debug, Default)]
struct Pad {
    state: GamepadState,
    history: Vec<ControllerInput>,
    started: bool,
    resets: usize,
}

/// In-memory actuator that keeps pad state and a log of executed inputs.
#[derive(Debug, Default)]
pub struct VirtualGamepad {
    inner: Mutex<Pad>,
}

impl VirtualGamepad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GamepadState {
        self.inner.lock().state.clone()
    }

    pub fn history(&self) -> Vec<ControllerInput> {
        self.inner.lock().history.clone()
    }

    /// Take the executed-input log, leaving it empty.
    pub fn drain_history(&self) -> Vec<ControllerInput> {
        std::mem::take(&mut self.inner.lock().history)
    }

    /// Most recent value executed on `kind`, if any is still in the log.
    pub fn last_value(&self, kind: InputType) -> Option<f32> {
        self.inner
            .lock()
            .history
            .iter()
            .rev()
            .find(|c| c.kind == kind)
            .map(|c| c.value)
    }

    pub fn is_started(&self) -> bool {
        self.inner.lock().started
    }

    pub fn reset_count(&self) -> usize {
        self.inner.lock().resets
    }
}

impl Actuator for VirtualGamepad {
    fn start(&self) {
        self.inner.lock().started = true;
    }

    fn execute(&self, input: ControllerInput) {
        let mut pad = self.inner.lock();
        pad.state.apply(input);
        pad.history.push(input);
    }

    fn execute_stick(&self, side: StickSide, x: f32, y: f32) {
        *self.inner.lock().state.stick_mut(side) = (x, y);
    }

    fn reset_controls(&self) {
        let mut pad = self.inner.lock();
        pad.state = GamepadState::default();
        pad.resets += 1;
        info!(resets = pad.resets, "virtual gamepad reset");
    }
}
