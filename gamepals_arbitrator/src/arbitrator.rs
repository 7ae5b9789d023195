//! Sharded command arbitrator.
//!
//! One arbitration cycle per actor update:
//! record -> merge (policy) -> convert (delegate) -> actuate -> feedback.
//!
//! No IO. No async. Every call runs on the caller's thread. Cycles for one action
//! are serialized by a shard mutex picked by a stable hash of the action name;
//! cycles for actions on different shards run in parallel.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use gamepals_core::{
    ActionInput, ActionInputWithConfidence, ActorId, ArbitrationCfg, ArbitrationError,
    ControllerInput, GameAction, GameActionsMap, InputEntry, Result,
};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::actor::{Actor, ActorData, ActorObserver, MessageData};
use crate::actuator::Actuator;
use crate::conversion::ActionConversionManager;
use crate::policy_manager::PolicyManager;

/// Metacommand that releases every control.
pub const RESET_MESSAGE: &str = "RESET";

/// Serializable view of every actor's latest records.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ArbitrationSnapshot {
    /// Sorted by actor id.
    pub actors: Vec<ActorSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActorSnapshot {
    pub actor_id: ActorId,
    /// Sorted by action name.
    pub records: Vec<RecordSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordSnapshot {
    pub action: GameAction,
    pub value: f32,
    pub confidence: f32,
    /// Milliseconds since the record was written; `None` for default records.
    pub age_ms: Option<u64>,
}

struct ActorSlot {
    actor: Arc<dyn Actor>,
    actions: HashSet<GameAction>,
    records: Mutex<GameActionsMap>,
}

/// Deterministic FNV-1a hash (stable across runs).
fn fnv1a_u64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn shard_index(action: &str, shard_count: usize) -> usize {
    if shard_count <= 1 {
        return 0;
    }
    (fnv1a_u64(action) as usize) % shard_count
}

/// Forwards actor notifications without keeping the arbitrator alive.
struct ArbitratorLink(Weak<CommandArbitrator>);

impl ActorObserver for ArbitratorLink {
    fn on_input_update(&self, data: ActorData) {
        if let Some(arb) = self.0.upgrade() {
            arb.on_input_update(data);
        }
    }

    fn on_message_update(&self, data: MessageData) {
        if let Some(arb) = self.0.upgrade() {
            arb.on_message_update(data);
        }
    }
}

/// Merges every actor's proposals per action and drives one actuator.
///
/// Lock order: shard -> actor table -> per-actor records. Actor feedback is
/// delivered after the shard is released, so actors may react by notifying
/// new inputs from inside `on_arbitrated_inputs`.
pub struct CommandArbitrator {
    cfg: Arc<ArbitrationCfg>,
    policies: PolicyManager,
    conversion: Arc<ActionConversionManager>,
    actuator: Arc<dyn Actuator>,
    actors: RwLock<IndexMap<ActorId, ActorSlot>>,
    shards: Vec<Mutex<()>>,
    started: AtomicBool,
    /// Write counter stamped on records next to the clock reading.
    seq: AtomicU64,
}

impl CommandArbitrator {
    pub fn new(
        cfg: Arc<ArbitrationCfg>,
        conversion: Arc<ActionConversionManager>,
        actuator: Arc<dyn Actuator>,
    ) -> Arc<Self> {
        let shards = cfg.shards.max(1);
        let mut shard_locks = Vec::with_capacity(shards);
        for _ in 0..shards {
            shard_locks.push(Mutex::new(()));
        }

        Arc::new(Self {
            policies: PolicyManager::new(cfg.clone()),
            cfg,
            conversion,
            actuator,
            actors: RwLock::new(IndexMap::new()),
            shards: shard_locks,
            started: AtomicBool::new(false),
            seq: AtomicU64::new(0),
        })
    }

    pub fn cfg(&self) -> &Arc<ArbitrationCfg> {
        &self.cfg
    }

    pub fn policies(&self) -> &PolicyManager {
        &self.policies
    }

    pub fn conversion(&self) -> &Arc<ActionConversionManager> {
        &self.conversion
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Register `actor` in every roster it controls and subscribe to it.
    ///
    /// Fails with `RosterFull` (nothing registered) or `AlreadyStarted`.
    pub fn add_actor(self: &Arc<Self>, actor: Arc<dyn Actor>) -> Result<()> {
        let id = actor.id();
        {
            let mut actors = self.actors.write();
            if self.is_started() {
                return Err(ArbitrationError::AlreadyStarted);
            }
            if actors.contains_key(&id) {
                warn!(actor = %id, "actor already registered");
                return Ok(());
            }

            self.policies.register_actor(actor.as_ref())?;

            actors.insert(
                id,
                ActorSlot {
                    actor: actor.clone(),
                    actions: actor.controlled_actions().into_iter().collect(),
                    records: Mutex::new(GameActionsMap::new()),
                },
            );
        }

        actor.subscribe(Arc::new(ArbitratorLink(Arc::downgrade(self))));
        info!(actor = %id, key = %actor.role_key(), "actor added");
        Ok(())
    }

    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.read().keys().copied().collect()
    }

    /// Start the actuator, then every actor in registration order. Idempotent.
    pub fn start(&self) {
        let targets: Vec<Arc<dyn Actor>> = {
            let actors = self.actors.read();
            if self.started.swap(true, Ordering::AcqRel) {
                return;
            }
            actors.values().map(|s| s.actor.clone()).collect()
        };

        self.actuator.start();
        info!(actors = targets.len(), shards = self.shards.len(), "arbitrator started");
        for a in targets {
            a.start();
        }
    }

    /// Run one arbitration cycle for `input` from `actor_id`.
    ///
    /// Returns the controller inputs that were actuated (empty when the update
    /// was rejected or the action has no device mapping). Updates with a
    /// confidence outside [0, 1] or a non-finite value are dropped.
    pub fn arbitrate(&self, actor_id: ActorId, input: ActionInputWithConfidence) -> Vec<ControllerInput> {
        if !(0.0..=1.0).contains(&input.confidence) || !input.value.is_finite() {
            warn!(
                actor = %actor_id,
                action = %input.action,
                value = input.value,
                confidence = input.confidence,
                "malformed update dropped"
            );
            return Vec::new();
        }
        let shard = &self.shards[shard_index(input.action.as_str(), self.shards.len())];

        let (commands, targets) = {
            let _guard = shard.lock();
            let actors = self.actors.read();

            let Some(slot) = actors.get(&actor_id) else {
                warn!(actor = %actor_id, action = %input.action, "update from unknown actor dropped");
                return Vec::new();
            };
            if !slot.actions.contains(&input.action) {
                warn!(actor = %actor_id, action = %input.action, "actor does not control action; update dropped");
                return Vec::new();
            }

            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            slot.records.lock().set(&input, Instant::now(), seq);

            let merged = self.merge_by_action(&actors, &input.action);
            let commands = self
                .conversion
                .action_to_inputs(&ActionInput::new(input.action.clone(), merged));
            for c in &commands {
                debug!(action = %input.action, input = %c.kind, value = c.value, "execute");
                self.actuator.execute(*c);
            }

            let targets: Vec<Arc<dyn Actor>> = if commands.is_empty() {
                Vec::new()
            } else {
                actors.values().map(|s| s.actor.clone()).collect()
            };
            (commands, targets)
        };

        for c in &commands {
            for a in &targets {
                a.on_arbitrated_inputs(c);
            }
        }
        commands
    }

    fn merge_by_action(&self, actors: &IndexMap<ActorId, ActorSlot>, action: &GameAction) -> f32 {
        let entry = self.policies.policy_for(action);
        let entries: Vec<InputEntry> = entry
            .actors
            .iter()
            .map(|(id, role)| {
                let record = actors
                    .get(id)
                    .map(|s| s.records.lock().get(action))
                    .unwrap_or_default();
                InputEntry::new(*id, *role, record)
            })
            .collect();
        entry.policy.merge(&entries)
    }

    /// Current merged value for `action`, as the next cycle would see it.
    pub fn merged_value(&self, action: &GameAction) -> f32 {
        let _guard = self.shards[shard_index(action.as_str(), self.shards.len())].lock();
        let actors = self.actors.read();
        self.merge_by_action(&actors, action)
    }

    /// Handle an out-of-band message. Only `RESET` has an effect.
    pub fn handle_message(&self, actor_id: ActorId, message: &str) {
        if !message.contains(RESET_MESSAGE) {
            debug!(actor = %actor_id, text = message, "message ignored");
            return;
        }
        // Wait for every in-flight cycle; shards in ascending order.
        let _guards: Vec<_> = self.shards.iter().map(|s| s.lock()).collect();
        self.actuator.reset_controls();
        info!(actor = %actor_id, "controls reset");
    }

    /// Export every actor's records, sorted by actor id then action.
    pub fn snapshot(&self) -> ArbitrationSnapshot {
        let now = Instant::now();
        let mut out: Vec<ActorSnapshot> = Vec::new();

        for (id, slot) in self.actors.read().iter() {
            let records = slot.records.lock();
            let mut rs: Vec<RecordSnapshot> = records
                .iter()
                .map(|(action, r)| RecordSnapshot {
                    action: action.clone(),
                    value: r.value,
                    confidence: r.confidence,
                    age_ms: r
                        .timestamp
                        .map(|t| now.saturating_duration_since(t).as_millis() as u64),
                })
                .collect();
            rs.sort_by(|a, b| a.action.cmp(&b.action));
            out.push(ActorSnapshot {
                actor_id: *id,
                records: rs,
            });
        }

        out.sort_by(|a, b| a.actor_id.cmp(&b.actor_id));
        ArbitrationSnapshot { actors: out }
    }
}

impl ActorObserver for CommandArbitrator {
    fn on_input_update(&self, data: ActorData) {
        self.arbitrate(data.actor_id, data.input);
    }

    fn on_message_update(&self, data: MessageData) {
        self.handle_message(data.actor_id, &data.message);
    }
}

impl std::fmt::Debug for CommandArbitrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandArbitrator")
            .field("actors", &self.actors.read().len())
            .field("shards", &self.shards.len())
            .field("started", &self.is_started())
            .finish()
    }
}
