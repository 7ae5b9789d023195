use std::collections::HashMap;
use std::time::Instant;

use crate::action::{ActionInputRecord, ActionInputWithConfidence, GameAction};

/// Latest record per action for one actor.
///
/// Entries are overwritten whole on every update and materialized lazily as a
/// zero value / zero confidence record on first read.
#[derive(Clone, Debug, Default)]
pub struct GameActionsMap {
    records: HashMap<GameAction, ActionInputRecord>,
}

impl GameActionsMap {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&mut self, input: &ActionInputWithConfidence, at: Instant, seq: u64) {
        self.records.insert(
            input.action.clone(),
            ActionInputRecord::new(input.value, input.confidence, at).with_seq(seq),
        );
    }

    /// Current record for `action`, creating the default one if missing.
    pub fn get(&mut self, action: &GameAction) -> ActionInputRecord {
        if let Some(r) = self.records.get(action) {
            return *r;
        }
        let r = ActionInputRecord::default();
        self.records.insert(action.clone(), r);
        r
    }

    pub fn peek(&self, action: &GameAction) -> Option<&ActionInputRecord> {
        self.records.get(action)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GameAction, &ActionInputRecord)> {
        self.records.iter()
    }
}
