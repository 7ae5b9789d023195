use std::borrow::Borrow;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Semantic game-controllable function (e.g. "THROTTLE", "JUMP").
///
/// Opaque to the engine: the set of actions is defined by the game configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameAction(String);

impl GameAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameAction {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GameAction {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for GameAction {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Unique identity of an actor, generated once at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Why an actor's vote counts in roster-aware policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyRole {
    Pilot,
    Copilot,
}

impl fmt::Display for PolicyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyRole::Pilot => f.write_str("Pilot"),
            PolicyRole::Copilot => f.write_str("Copilot"),
        }
    }
}

/// An unweighted proposal, not yet bound to any device input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionInput {
    pub action: GameAction,
    pub value: f32,
}

impl ActionInput {
    pub fn new(action: impl Into<GameAction>, value: f32) -> Self {
        Self {
            action: action.into(),
            value,
        }
    }

    pub fn with_confidence(self, confidence: f32) -> ActionInputWithConfidence {
        ActionInputWithConfidence {
            action: self.action,
            value: self.value,
            confidence,
        }
    }
}

/// A proposal plus how much the emitting actor trusts it (in `[0, 1]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionInputWithConfidence {
    pub action: GameAction,
    pub value: f32,
    pub confidence: f32,
}

impl ActionInputWithConfidence {
    pub fn new(action: impl Into<GameAction>, value: f32, confidence: f32) -> Self {
        Self {
            action: action.into(),
            value,
            confidence,
        }
    }

    pub fn without_confidence(&self) -> ActionInput {
        ActionInput {
            action: self.action.clone(),
            value: self.value,
        }
    }
}

/// Last known contribution of one actor for one action.
///
/// `timestamp == None` marks a record that was materialized as a default and
/// never written; it orders before every real update. `seq` breaks ties
/// between writes that share a clock reading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionInputRecord {
    pub value: f32,
    pub confidence: f32,
    pub timestamp: Option<Instant>,
    pub seq: u64,
}

impl ActionInputRecord {
    pub fn new(value: f32, confidence: f32, timestamp: Instant) -> Self {
        Self {
            value,
            confidence,
            timestamp: Some(timestamp),
            seq: 0,
        }
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    /// Write order: by timestamp, then by sequence number.
    #[inline]
    pub fn recency(&self) -> (Option<Instant>, u64) {
        (self.timestamp, self.seq)
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.value != 0.0
    }
}
