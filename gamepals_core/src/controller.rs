//! Device-side vocabulary: the inputs of an Xbox 360 style pad.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Analog level above which an input is interpreted as a press.
pub const INPUT_THRESHOLD: f32 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputType {
    BtnA,
    BtnB,
    BtnX,
    BtnY,
    BumperLeft,
    BumperRight,
    ThumbLeft,
    ThumbRight,
    BtnBack,
    BtnStart,
    TriggerLeft,
    TriggerRight,
    DirPadX,
    DirPadY,
    StickLeftXPos,
    StickLeftXNeg,
    StickLeftYPos,
    StickLeftYNeg,
    StickRightXPos,
    StickRightXNeg,
    StickRightYPos,
    StickRightYNeg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StickSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl InputType {
    pub const ALL: [InputType; 22] = [
        InputType::BtnA,
        InputType::BtnB,
        InputType::BtnX,
        InputType::BtnY,
        InputType::BumperLeft,
        InputType::BumperRight,
        InputType::ThumbLeft,
        InputType::ThumbRight,
        InputType::BtnBack,
        InputType::BtnStart,
        InputType::TriggerLeft,
        InputType::TriggerRight,
        InputType::DirPadX,
        InputType::DirPadY,
        InputType::StickLeftXPos,
        InputType::StickLeftXNeg,
        InputType::StickLeftYPos,
        InputType::StickLeftYNeg,
        InputType::StickRightXPos,
        InputType::StickRightXNeg,
        InputType::StickRightYPos,
        InputType::StickRightYNeg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InputType::BtnA => "BTN_A",
            InputType::BtnB => "BTN_B",
            InputType::BtnX => "BTN_X",
            InputType::BtnY => "BTN_Y",
            InputType::BumperLeft => "BUMPER_LEFT",
            InputType::BumperRight => "BUMPER_RIGHT",
            InputType::ThumbLeft => "THUMB_LEFT",
            InputType::ThumbRight => "THUMB_RIGHT",
            InputType::BtnBack => "BTN_BACK",
            InputType::BtnStart => "BTN_START",
            InputType::TriggerLeft => "TRIGGER_LEFT",
            InputType::TriggerRight => "TRIGGER_RIGHT",
            InputType::DirPadX => "DIR_PAD_X",
            InputType::DirPadY => "DIR_PAD_Y",
            InputType::StickLeftXPos => "STICK_LEFT_X_POS",
            InputType::StickLeftXNeg => "STICK_LEFT_X_NEG",
            InputType::StickLeftYPos => "STICK_LEFT_Y_POS",
            InputType::StickLeftYNeg => "STICK_LEFT_Y_NEG",
            InputType::StickRightXPos => "STICK_RIGHT_X_POS",
            InputType::StickRightXNeg => "STICK_RIGHT_X_NEG",
            InputType::StickRightYPos => "STICK_RIGHT_Y_POS",
            InputType::StickRightYNeg => "STICK_RIGHT_Y_NEG",
        }
    }

    /// Stable numeric code (index into [`InputType::ALL`]), used across the C ABI.
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<InputType> {
        Self::ALL.get(code as usize).copied()
    }

    /// Which stick and axis a split stick half belongs to.
    pub fn stick(self) -> Option<(StickSide, Axis)> {
        use InputType::*;
        match self {
            StickLeftXPos | StickLeftXNeg => Some((StickSide::Left, Axis::X)),
            StickLeftYPos | StickLeftYNeg => Some((StickSide::Left, Axis::Y)),
            StickRightXPos | StickRightXNeg => Some((StickSide::Right, Axis::X)),
            StickRightYPos | StickRightYNeg => Some((StickSide::Right, Axis::Y)),
            _ => None,
        }
    }

    #[inline]
    pub fn is_stick(self) -> bool {
        self.stick().is_some()
    }

    pub fn is_negative_axis(self) -> bool {
        matches!(
            self,
            InputType::StickLeftXNeg
                | InputType::StickLeftYNeg
                | InputType::StickRightXNeg
                | InputType::StickRightYNeg
        )
    }

    pub fn is_trigger(self) -> bool {
        matches!(self, InputType::TriggerLeft | InputType::TriggerRight)
    }

    pub fn is_dpad(self) -> bool {
        matches!(self, InputType::DirPadX | InputType::DirPadY)
    }

    /// Press/release buttons (face buttons, bumpers, thumb clicks, back/start).
    pub fn is_button(self) -> bool {
        !self.is_stick() && !self.is_trigger() && !self.is_dpad()
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete device input and its level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerInput {
    pub kind: InputType,
    pub value: f32,
}

impl ControllerInput {
    pub fn new(kind: InputType, value: f32) -> Self {
        Self { kind, value }
    }
}
