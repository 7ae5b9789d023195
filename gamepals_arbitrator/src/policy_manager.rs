//! Per-action policy assignment and actor rosters.

use std::collections::HashMap;
use std::sync::Arc;

use gamepals_core::{
    ActorId, ArbitrationCfg, ArbitrationError, GameAction, PolicyKind, PolicyRole, Result,
};
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use tracing::info;

use crate::actor::{Actor, RoleKey};

/// Policy plus roster for one action. Roster order is registration order.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyMapEntry {
    pub policy: PolicyKind,
    pub actors: IndexMap<ActorId, PolicyRole>,
}

impl PolicyMapEntry {
    pub fn new(policy: PolicyKind) -> Self {
        Self {
            policy,
            actors: IndexMap::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.actors.len() >= self.policy.max_actors()
    }
}

/// Owns the `GameAction -> PolicyMapEntry` table.
///
/// Entries are handed out as `Arc` snapshots; registration swaps in an updated
/// copy, so readers never observe a half-written roster.
#[derive(Debug)]
pub struct PolicyManager {
    cfg: Arc<ArbitrationCfg>,
    entries: RwLock<HashMap<GameAction, Arc<PolicyMapEntry>>>,
}

impl PolicyManager {
    pub fn new(cfg: Arc<ArbitrationCfg>) -> Self {
        Self {
            cfg,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn configured_policy(&self, action: &GameAction) -> PolicyKind {
        self.cfg
            .policy_for(action)
            .unwrap_or(self.cfg.default_policy)
    }

    pub fn role_of(&self, key: &RoleKey, action: &GameAction) -> PolicyRole {
        match key {
            RoleKey::Human(idx) => self.cfg.human_role(*idx, action),
            RoleKey::Agent(name) => self.cfg.agent_role(name, action),
        }
    }

    /// Add `actor` to the roster of every action it controls.
    ///
    /// All-or-nothing: if any roster is full, nothing is changed.
    pub fn register_actor(&self, actor: &dyn Actor) -> Result<()> {
        let id = actor.id();
        let key = actor.role_key();
        let actions: IndexSet<GameAction> = actor.controlled_actions().into_iter().collect();

        let mut entries = self.entries.write();

        for action in &actions {
            let policy = entries
                .get(action)
                .map(|e| e.policy)
                .unwrap_or_else(|| self.configured_policy(action));
            let full = entries
                .get(action)
                .map(|e| !e.actors.contains_key(&id) && e.is_full())
                .unwrap_or(policy.max_actors() == 0);
            if full {
                return Err(ArbitrationError::RosterFull {
                    action: action.clone(),
                    policy,
                    max_actors: policy.max_actors(),
                });
            }
        }

        for action in actions {
            let role = self.role_of(&key, &action);
            let policy = self.configured_policy(&action);
            let entry = entries
                .entry(action.clone())
                .or_insert_with(|| Arc::new(PolicyMapEntry::new(policy)));
            Arc::make_mut(entry).actors.insert(id, role);
            info!(actor = %id, key = %key, action = %action, role = %role, policy = %entry.policy, "actor registered");
        }

        Ok(())
    }

    /// Entry for `action`, created with the configured policy if unseen.
    pub fn policy_for(&self, action: &GameAction) -> Arc<PolicyMapEntry> {
        if let Some(e) = self.entries.read().get(action) {
            return e.clone();
        }
        let policy = self.configured_policy(action);
        self.entries
            .write()
            .entry(action.clone())
            .or_insert_with(|| Arc::new(PolicyMapEntry::new(policy)))
            .clone()
    }

    pub fn actions(&self) -> Vec<GameAction> {
        let mut out: Vec<GameAction> = self.entries.read().keys().cloned().collect();
        out.sort();
        out
    }
}
