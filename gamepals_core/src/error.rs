use thiserror::Error;

use crate::action::GameAction;
use crate::policy::PolicyKind;

/// Failures surfaced by the arbitration engine.
///
/// Everything here is a configuration problem: it is raised while building the
/// engine and registering actors, never in the steady-state input path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArbitrationError {
    /// The action's policy already holds as many actors as it allows.
    #[error("action {action} allows maximum {max_actors} actors under {policy}")]
    RosterFull {
        action: GameAction,
        policy: PolicyKind,
        max_actors: usize,
    },

    #[error("unknown policy name: {0}")]
    UnknownPolicy(String),

    /// A delegate was built for an action whose device mapping has the wrong shape.
    #[error("invalid input mapping for action {action}: {reason}")]
    InvalidMapping { action: GameAction, reason: String },

    #[error("confidence {confidence} for action {action} is outside [0, 1]")]
    InvalidConfidence { action: GameAction, confidence: f32 },

    #[error("actors cannot be registered once the arbitrator has started")]
    AlreadyStarted,

    #[error("malformed configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ArbitrationError>;
