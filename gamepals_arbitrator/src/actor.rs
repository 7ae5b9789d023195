//! Actor boundary: who proposes values, and who listens to them.
//!
//! An actor owns an [`ActorHub`] and fans its proposals out to every subscribed
//! [`ActorObserver`], synchronously and in subscription order. The arbitrator
//! is one such observer; helper agents that watch a pilot are others.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gamepals_core::{ActionInput, ActionInputWithConfidence, ActorId, ControllerInput, GameAction};
use parking_lot::RwLock;

/// One proposal, stamped with the actor that made it.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorData {
    pub actor_id: ActorId,
    pub input: ActionInputWithConfidence,
}

/// Out-of-band metacommand (e.g. "RESET").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageData {
    pub actor_id: ActorId,
    pub message: String,
}

pub trait ActorObserver: Send + Sync {
    fn on_input_update(&self, data: ActorData);
    fn on_message_update(&self, data: MessageData);
}

/// Where an actor's per-action roles are looked up in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoleKey {
    /// A human, by controller index.
    Human(usize),
    /// A software agent, by configured name.
    Agent(String),
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleKey::Human(idx) => write!(f, "human#{idx}"),
            RoleKey::Agent(name) => write!(f, "agent:{name}"),
        }
    }
}

pub trait Actor: Send + Sync {
    fn id(&self) -> ActorId;

    fn role_key(&self) -> RoleKey;

    fn subscribe(&self, observer: Arc<dyn ActorObserver>);

    /// Activate the actor. Calling it twice has no further effect.
    fn start(&self);

    /// Actions this actor may legally drive. Read once, at registration.
    fn controlled_actions(&self) -> Vec<GameAction>;

    /// Feedback: one device input the arbitrator just actuated.
    fn on_arbitrated_inputs(&self, _input: &ControllerInput) {}
}

/// Identity, subscribers and start latch shared by every concrete actor.
pub struct ActorHub {
    id: ActorId,
    subscribers: RwLock<Vec<Arc<dyn ActorObserver>>>,
    started: AtomicBool,
}

impl ActorHub {
    pub fn new() -> Self {
        Self {
            id: ActorId::new(),
            subscribers: RwLock::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn subscribe(&self, observer: Arc<dyn ActorObserver>) {
        self.subscribers.write().push(observer);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Wrap `input` with `confidence` and deliver it to every subscriber.
    pub fn notify_input(&self, input: ActionInput, confidence: f32) {
        let data = ActorData {
            actor_id: self.id,
            input: input.with_confidence(confidence),
        };
        // Observers may subscribe further observers; never call out under the lock.
        let targets = self.subscribers.read().clone();
        for t in targets {
            t.on_input_update(data.clone());
        }
    }

    pub fn notify_message(&self, message: impl Into<String>) {
        let data = MessageData {
            actor_id: self.id,
            message: message.into(),
        };
        let targets = self.subscribers.read().clone();
        for t in targets {
            t.on_message_update(data.clone());
        }
    }

    /// Flip the start latch. Returns `true` only for the first caller.
    pub fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

impl Default for ActorHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActorHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHub")
            .field("id", &self.id)
            .field("subscribers", &self.subscriber_count())
            .field("started", &self.is_started())
            .finish()
    }
}
