//! gamepals_core
//!
//! Pure data model for shared-control arbitration: actions, per-actor records,
//! controller vocabulary, merge policies and session configuration.
//!
//! No threads, no actuator. Orchestration lives in `gamepals_arbitrator`.

pub mod action;
pub mod controller;

pub mod cfg;
pub mod error;
pub mod merge;
pub mod policy;
pub mod state;

pub use action::{
    ActionInput, ActionInputRecord, ActionInputWithConfidence, ActorId, GameAction, PolicyRole,
};
pub use controller::{Axis, ControllerInput, InputType, StickSide, INPUT_THRESHOLD};

pub use cfg::{AgentCfg, ArbitrationCfg, HumanActionCfg, HumanCfg};
pub use error::{ArbitrationError, Result};
pub use policy::{InputEntry, PolicyKind, DEFAULT_MAX_ACTORS};
pub use state::GameActionsMap;
