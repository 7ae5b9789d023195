//! gamepals_arbitrator
//!
//! Orchestration layer around `gamepals_core`.
//!
//! Responsibilities:
//! - actors and their observer fan-out
//! - per-action policy rosters
//! - action <-> device input conversion (stateful delegates)
//! - the arbitration cycle, sharded by action name
//! - the actuator boundary and an in-memory virtual gamepad
//!
//! Non-goals:
//! - no IO
//! - no async
//! - no merge logic (lives in core)

pub mod actor;
pub mod actors;
pub mod actuator;
pub mod arbitrator;
pub mod conversion;
pub mod delegates;
pub mod policy_manager;

pub use actor::{Actor, ActorData, ActorHub, ActorObserver, MessageData, RoleKey};
pub use actors::{
    AgentActor, ExternalActor, GameStateAgent, HoldToToggleAgent, HumanActor, PressToToggleAgent,
};
pub use actuator::{Actuator, GamepadState, VirtualGamepad};
pub use arbitrator::{
    ActorSnapshot, ArbitrationSnapshot, CommandArbitrator, RecordSnapshot, RESET_MESSAGE,
};
pub use conversion::{
    ActionConversionManager, ConversionDelegate, DefaultDelegate, InputBuffer, RegisteredInput,
};
pub use delegates::{
    AxisDelegate, BinaryPairDelegate, DoubleFunctionDelegate, HoldThresholdDelegate,
    ThreeForTwoDelegate, HOLD_THRESHOLD,
};
pub use policy_manager::{PolicyManager, PolicyMapEntry};
