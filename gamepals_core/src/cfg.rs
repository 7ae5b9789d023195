//! Session configuration, loaded once at startup and shared read-only.

use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::action::{GameAction, PolicyRole};
use crate::controller::InputType;
use crate::error::{ArbitrationError, Result};
use crate::policy::PolicyKind;

/// One human's participation in one action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HumanActionCfg {
    #[serde(default = "pilot_role")]
    pub role: PolicyRole,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    /// Physical inputs this human uses for the action.
    #[serde(default)]
    pub controls: Vec<InputType>,
}

impl Default for HumanActionCfg {
    fn default() -> Self {
        Self {
            role: PolicyRole::Pilot,
            confidence: 1.0,
            controls: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HumanCfg {
    #[serde(default)]
    pub actions: IndexMap<GameAction, HumanActionCfg>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentCfg {
    /// Role per action this agent takes part in.
    #[serde(default)]
    pub actions: IndexMap<GameAction, PolicyRole>,
    /// Free-form constructor parameters for the agent implementation.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

fn pilot_role() -> PolicyRole {
    PolicyRole::Pilot
}

fn full_confidence() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrationCfg {
    /// Policy for actions without an explicit entry in `policies`.
    pub default_policy: PolicyKind,
    pub policies: IndexMap<GameAction, PolicyKind>,
    /// Game-side mapping: the inputs the game reads for each action.
    pub game_inputs: IndexMap<GameAction, Vec<InputType>>,
    /// User-side mapping, by human index.
    pub humans: BTreeMap<usize, HumanCfg>,
    pub agents: IndexMap<String, AgentCfg>,
    /// Number of per-action lock shards in the arbitrator.
    pub shards: usize,
}

impl Default for ArbitrationCfg {
    fn default() -> Self {
        Self {
            default_policy: PolicyKind::ContinuousOr,
            policies: IndexMap::new(),
            game_inputs: IndexMap::new(),
            humans: BTreeMap::new(),
            agents: IndexMap::new(),
            shards: 8,
        }
    }
}

impl ArbitrationCfg {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: ArbitrationCfg =
            serde_json::from_str(text).map_err(|e| ArbitrationError::Config(e.to_string()))?;
        cfg.validate()?;
        tracing::debug!(
            actions = cfg.all_actions().len(),
            humans = cfg.humans_count(),
            agents = cfg.agents.len(),
            "configuration loaded"
        );
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for human in self.humans.values() {
            for (action, a) in &human.actions {
                if !(0.0..=1.0).contains(&a.confidence) {
                    return Err(ArbitrationError::InvalidConfidence {
                        action: action.clone(),
                        confidence: a.confidence,
                    });
                }
            }
        }
        if self.shards == 0 {
            return Err(ArbitrationError::Config("shards must be at least 1".into()));
        }
        Ok(())
    }

    pub fn policy_for(&self, action: &GameAction) -> Option<PolicyKind> {
        self.policies.get(action).copied()
    }

    pub fn action_to_game_inputs(&self, action: &GameAction) -> &[InputType] {
        self.game_inputs
            .get(action)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn game_input_to_action(&self, input: InputType) -> Option<&GameAction> {
        self.game_inputs
            .iter()
            .find(|(_, inputs)| inputs.contains(&input))
            .map(|(action, _)| action)
    }

    pub fn action_to_user_inputs(&self, user_idx: usize, action: &GameAction) -> &[InputType] {
        self.humans
            .get(&user_idx)
            .and_then(|h| h.actions.get(action))
            .map(|a| a.controls.as_slice())
            .unwrap_or(&[])
    }

    /// Actions the user triggers with `input`, in configuration order.
    pub fn user_input_to_actions(&self, user_idx: usize, input: InputType) -> Vec<&GameAction> {
        match self.humans.get(&user_idx) {
            Some(h) => h
                .actions
                .iter()
                .filter(|(_, a)| a.controls.contains(&input))
                .map(|(action, _)| action)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn human_role(&self, user_idx: usize, action: &GameAction) -> PolicyRole {
        self.humans
            .get(&user_idx)
            .and_then(|h| h.actions.get(action))
            .map(|a| a.role)
            .unwrap_or(PolicyRole::Pilot)
    }

    pub fn agent_role(&self, agent: &str, action: &GameAction) -> PolicyRole {
        self.agents
            .get(agent)
            .and_then(|a| a.actions.get(action))
            .copied()
            .unwrap_or(PolicyRole::Copilot)
    }

    pub fn confidence_levels(&self, user_idx: usize) -> IndexMap<GameAction, f32> {
        self.humans
            .get(&user_idx)
            .map(|h| {
                h.actions
                    .iter()
                    .map(|(action, a)| (action.clone(), a.confidence))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn controlled_actions(&self, user_idx: usize) -> Vec<GameAction> {
        self.humans
            .get(&user_idx)
            .map(|h| h.actions.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn agent_actions(&self, agent: &str) -> Vec<GameAction> {
        self.agents
            .get(agent)
            .map(|a| a.actions.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn agent_params(&self, agent: &str) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.agents.get(agent).map(|a| &a.params)
    }

    pub fn human_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.humans.keys().copied()
    }

    pub fn humans_count(&self) -> usize {
        self.humans.len()
    }

    /// Every action mentioned anywhere in the configuration, first mention first.
    pub fn all_actions(&self) -> Vec<GameAction> {
        let mut seen: IndexSet<GameAction> = IndexSet::new();
        seen.extend(self.game_inputs.keys().cloned());
        seen.extend(self.policies.keys().cloned());
        for h in self.humans.values() {
            seen.extend(h.actions.keys().cloned());
        }
        for a in self.agents.values() {
            seen.extend(a.actions.keys().cloned());
        }
        seen.into_iter().collect()
    }
}
