//gamepals_core/policy.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::action::{ActionInputRecord, ActorId, PolicyRole};
use crate::error::ArbitrationError;
use crate::merge;

/// Roster limit for policies that do not declare their own.
pub const DEFAULT_MAX_ACTORS: usize = 256;

/// One actor's contribution to a merge. Built fresh per merge call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEntry {
    pub actor_id: ActorId,
    pub role: PolicyRole,
    pub record: ActionInputRecord,
}

impl InputEntry {
    pub fn new(actor_id: ActorId, role: PolicyRole, record: ActionInputRecord) -> Self {
        Self {
            actor_id,
            role,
            record,
        }
    }
}

/// Merge semantics for one action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    #[serde(rename = "POLICY_EXCLUSIVITY")]
    Exclusivity,
    #[serde(rename = "POLICY_BIN_AND")]
    BinaryAnd,
    #[serde(rename = "POLICY_BIN_OR")]
    BinaryOr,
    #[serde(rename = "POLICY_BIN_DEMOCRACY")]
    BinaryDemocracy,
    #[serde(rename = "POLICY_BIN_SUPV_BY_PILOT")]
    SupervisionByPilot,
    #[serde(rename = "POLICY_CONT_OR")]
    ContinuousOr,
    #[serde(rename = "POLICY_CONT_SUM")]
    ContinuousSum,
    #[serde(rename = "POLICY_CONT_SLOPE")]
    ContinuousSlope,
    #[serde(rename = "POLICY_CONT_SUPV_BY_PILOT")]
    ContinuousSupervisionByPilot,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 9] = [
        PolicyKind::Exclusivity,
        PolicyKind::BinaryAnd,
        PolicyKind::BinaryOr,
        PolicyKind::BinaryDemocracy,
        PolicyKind::SupervisionByPilot,
        PolicyKind::ContinuousOr,
        PolicyKind::ContinuousSum,
        PolicyKind::ContinuousSlope,
        PolicyKind::ContinuousSupervisionByPilot,
    ];

    /// Name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Exclusivity => "POLICY_EXCLUSIVITY",
            PolicyKind::BinaryAnd => "POLICY_BIN_AND",
            PolicyKind::BinaryOr => "POLICY_BIN_OR",
            PolicyKind::BinaryDemocracy => "POLICY_BIN_DEMOCRACY",
            PolicyKind::SupervisionByPilot => "POLICY_BIN_SUPV_BY_PILOT",
            PolicyKind::ContinuousOr => "POLICY_CONT_OR",
            PolicyKind::ContinuousSum => "POLICY_CONT_SUM",
            PolicyKind::ContinuousSlope => "POLICY_CONT_SLOPE",
            PolicyKind::ContinuousSupervisionByPilot => "POLICY_CONT_SUPV_BY_PILOT",
        }
    }

    /// Binary policies only ever produce 0 or 1.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            PolicyKind::BinaryAnd
                | PolicyKind::BinaryOr
                | PolicyKind::BinaryDemocracy
                | PolicyKind::SupervisionByPilot
        )
    }

    pub fn max_actors(self) -> usize {
        match self {
            PolicyKind::Exclusivity => 1,
            PolicyKind::ContinuousSlope => 2,
            _ => DEFAULT_MAX_ACTORS,
        }
    }

    /// Reduce the roster's latest records into one value.
    ///
    /// Deterministic for a given `entries` order.
    pub fn merge(self, entries: &[InputEntry]) -> f32 {
        match self {
            PolicyKind::Exclusivity => merge::exclusivity(entries),
            PolicyKind::BinaryAnd => merge::binary_and(entries),
            PolicyKind::BinaryOr => merge::binary_or(entries),
            PolicyKind::BinaryDemocracy => merge::binary_democracy(entries),
            PolicyKind::SupervisionByPilot => merge::supervision_by_pilot(entries),
            PolicyKind::ContinuousOr => merge::continuous_or(entries),
            PolicyKind::ContinuousSum => merge::continuous_sum(entries),
            PolicyKind::ContinuousSlope => merge::continuous_slope(entries),
            PolicyKind::ContinuousSupervisionByPilot => {
                merge::continuous_supervision_by_pilot(entries)
            }
        }
    }
}

impl Default for PolicyKind {
    fn default() -> Self {
        PolicyKind::ContinuousOr
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = ArbitrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PolicyKind::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| ArbitrationError::UnknownPolicy(s.to_string()))
    }
}
