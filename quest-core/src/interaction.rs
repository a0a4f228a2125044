//! Suspend/resume protocol between the rules and whoever rolls the dice.
//!
//! A resolver that needs a roll or a decision builds a request and awaits the
//! broker. The broker surfaces the request and resumes exactly that pending
//! future once an answer arrives. Each request is tracked by a
//! [`RequestId`] through two phases: `begin_*` registers it, `complete_*` or
//! [`ChannelBroker::cancel`] finishes it.

use crate::character::{CharacterId, TestedAttribute};
use crate::dice::{DiceError, DiceExpression, RandomnessProvider};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Errors from the interaction broker. Game outcomes are never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("No pending request with id {0}")]
    UnknownRequest(RequestId),

    #[error("Request {0} cannot be canceled")]
    NotCancelable(RequestId),

    #[error("Roll {value} is outside {min}..={max} for request {id}")]
    OutOfRange {
        id: RequestId,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("Option {index} does not exist for request {id} ({count} options)")]
    InvalidOption {
        id: RequestId,
        index: usize,
        count: usize,
    },

    #[error("Request {0} was answered with the wrong kind of reply")]
    KindMismatch(RequestId),

    #[error("Character {0} already has an outstanding request")]
    AlreadyPending(CharacterId),

    #[error("Request has invalid dice: {0}")]
    Dice(#[from] DiceError),

    #[error("Broker disconnected before the request was answered")]
    Disconnected,
}

// ============================================================================
// Requests and results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who is rolling and against what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollSubject {
    pub character: CharacterId,
    pub attribute: TestedAttribute,
    /// The number to roll under, for display.
    pub target: i32,
}

/// A request for a dice roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRequest {
    pub prompt: String,
    pub dice: String,
    pub subject: Option<RollSubject>,
    pub cancelable: bool,
}

impl RollRequest {
    pub fn new(prompt: impl Into<String>, dice: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            dice: dice.into(),
            subject: None,
            cancelable: false,
        }
    }

    /// A d100 roll.
    pub fn percentile(prompt: impl Into<String>) -> Self {
        Self::new(prompt, "1d100")
    }

    pub fn for_subject(
        mut self,
        character: CharacterId,
        attribute: TestedAttribute,
        target: i32,
    ) -> Self {
        self.subject = Some(RollSubject {
            character,
            attribute,
            target,
        });
        self
    }

    pub fn cancelable(mut self) -> Self {
        self.cancelable = true;
        self
    }
}

/// Answer to a roll request: a number, or the actor declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollResult {
    Rolled(i32),
    Canceled,
}

impl RollResult {
    pub fn value(&self) -> Option<i32> {
        match self {
            RollResult::Rolled(v) => Some(*v),
            RollResult::Canceled => None,
        }
    }
}

/// A request to pick one of several options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRequest {
    pub prompt: String,
    pub options: Vec<String>,
    /// Who is deciding, if the choice belongs to one character.
    pub character: Option<CharacterId>,
}

impl ChoiceRequest {
    pub fn new(prompt: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options,
            character: None,
        }
    }

    pub fn for_character(mut self, character: CharacterId) -> Self {
        self.character = Some(character);
        self
    }
}

/// Mediates rolls and choices with an external actor.
///
/// Both calls suspend until answered. Callers issue at most one request at a
/// time per resolution.
pub trait InteractionBroker: Send + Sync {
    fn request_roll(&self, request: RollRequest) -> BoxFuture<'_, Result<RollResult, BrokerError>>;

    /// Returns the index of the chosen option.
    fn request_choice(&self, request: ChoiceRequest) -> BoxFuture<'_, Result<usize, BrokerError>>;
}

// ============================================================================
// Channel broker
// ============================================================================

/// A request waiting for an answer, as shown to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingPrompt {
    Roll {
        id: RequestId,
        request: RollRequest,
    },
    Choice {
        id: RequestId,
        request: ChoiceRequest,
    },
}

impl PendingPrompt {
    pub fn id(&self) -> RequestId {
        match self {
            PendingPrompt::Roll { id, .. } | PendingPrompt::Choice { id, .. } => *id,
        }
    }
}

enum Waiting {
    Roll {
        request: RollRequest,
        min: i32,
        max: i32,
        reply: oneshot::Sender<RollResult>,
    },
    Choice {
        request: ChoiceRequest,
        reply: oneshot::Sender<usize>,
    },
}

impl Waiting {
    fn prompt(&self, id: RequestId) -> PendingPrompt {
        match self {
            Waiting::Roll { request, .. } => PendingPrompt::Roll {
                id,
                request: request.clone(),
            },
            Waiting::Choice { request, .. } => PendingPrompt::Choice {
                id,
                request: request.clone(),
            },
        }
    }

    fn character(&self) -> Option<CharacterId> {
        match self {
            Waiting::Roll { request, .. } => request.subject.map(|s| s.character),
            Waiting::Choice { request, .. } => request.character,
        }
    }

    /// Nobody is listening for the answer any more.
    fn abandoned(&self) -> bool {
        match self {
            Waiting::Roll { reply, .. } => reply.is_closed(),
            Waiting::Choice { reply, .. } => reply.is_closed(),
        }
    }
}

type PendingMap = HashMap<RequestId, Waiting>;

/// Broker that publishes requests on a channel and resumes them when
/// `complete_*` is called, typically from a UI or network handler.
pub struct ChannelBroker {
    next_id: AtomicU64,
    pending: Mutex<PendingMap>,
    prompts: mpsc::UnboundedSender<PendingPrompt>,
}

impl ChannelBroker {
    /// Create a broker and the receiver its prompts are published on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingPrompt>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let broker = Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            prompts: tx,
        };
        (broker, rx)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PendingMap> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check the character is free, then insert and publish, all under one
    /// lock so two callers cannot both pass the check.
    fn register(&self, waiting: Waiting) -> Result<RequestId, BrokerError> {
        let mut pending = self.lock();
        pending.retain(|id, w| {
            let keep = !w.abandoned();
            if !keep {
                debug!(request = %id, "dropping abandoned request");
            }
            keep
        });
        if let Some(character) = waiting.character() {
            if pending.values().any(|w| w.character() == Some(character)) {
                return Err(BrokerError::AlreadyPending(character));
            }
        }

        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if self.prompts.send(waiting.prompt(id)).is_err() {
            return Err(BrokerError::Disconnected);
        }
        pending.insert(id, waiting);
        debug!(request = %id, "request issued");
        Ok(id)
    }

    /// Forget a request whose caller stopped waiting.
    fn withdraw(&self, id: RequestId) {
        if self.lock().remove(&id).is_some() {
            debug!(request = %id, "request withdrawn");
        }
    }

    /// Phase one of a roll: register the request and publish it.
    pub fn begin_roll(
        &self,
        request: RollRequest,
    ) -> Result<(RequestId, oneshot::Receiver<RollResult>), BrokerError> {
        let expr = DiceExpression::parse(&request.dice)?;
        let (tx, rx) = oneshot::channel();
        let id = self.register(Waiting::Roll {
            request,
            min: expr.minimum(),
            max: expr.maximum(),
            reply: tx,
        })?;
        Ok((id, rx))
    }

    /// Phase one of a choice.
    pub fn begin_choice(
        &self,
        request: ChoiceRequest,
    ) -> Result<(RequestId, oneshot::Receiver<usize>), BrokerError> {
        let (tx, rx) = oneshot::channel();
        let id = self.register(Waiting::Choice { request, reply: tx })?;
        Ok((id, rx))
    }

    /// Phase two: answer a roll request with a value.
    pub fn complete_roll(&self, id: RequestId, value: i32) -> Result<(), BrokerError> {
        let mut pending = self.lock();
        match pending.get(&id) {
            None => return Err(BrokerError::UnknownRequest(id)),
            Some(Waiting::Choice { .. }) => return Err(BrokerError::KindMismatch(id)),
            Some(Waiting::Roll { min, max, .. }) if value < *min || value > *max => {
                warn!(request = %id, value, "roll rejected");
                return Err(BrokerError::OutOfRange {
                    id,
                    value,
                    min: *min,
                    max: *max,
                });
            }
            Some(Waiting::Roll { .. }) => {}
        }
        if let Some(Waiting::Roll { reply, .. }) = pending.remove(&id) {
            if reply.send(RollResult::Rolled(value)).is_err() {
                warn!(request = %id, "roll answered after the caller went away");
            }
        }
        Ok(())
    }

    /// Phase two: decline a cancelable roll request.
    pub fn cancel(&self, id: RequestId) -> Result<(), BrokerError> {
        let mut pending = self.lock();
        match pending.get(&id) {
            None => return Err(BrokerError::UnknownRequest(id)),
            Some(Waiting::Choice { .. }) => return Err(BrokerError::KindMismatch(id)),
            Some(Waiting::Roll { request, .. }) if !request.cancelable => {
                warn!(request = %id, "cancel rejected");
                return Err(BrokerError::NotCancelable(id));
            }
            Some(Waiting::Roll { .. }) => {}
        }
        if let Some(Waiting::Roll { reply, .. }) = pending.remove(&id) {
            let _ = reply.send(RollResult::Canceled);
        }
        Ok(())
    }

    /// Phase two: answer a choice request.
    pub fn complete_choice(&self, id: RequestId, index: usize) -> Result<(), BrokerError> {
        let mut pending = self.lock();
        match pending.get(&id) {
            None => return Err(BrokerError::UnknownRequest(id)),
            Some(Waiting::Roll { .. }) => return Err(BrokerError::KindMismatch(id)),
            Some(Waiting::Choice { request, .. }) if index >= request.options.len() => {
                return Err(BrokerError::InvalidOption {
                    id,
                    index,
                    count: request.options.len(),
                });
            }
            Some(Waiting::Choice { .. }) => {}
        }
        if let Some(Waiting::Choice { reply, .. }) = pending.remove(&id) {
            let _ = reply.send(index);
        }
        Ok(())
    }

    /// Everything still waiting for an answer, oldest first.
    pub fn pending(&self) -> Vec<PendingPrompt> {
        let mut prompts: Vec<PendingPrompt> =
            self.lock().iter().map(|(id, w)| w.prompt(*id)).collect();
        prompts.sort_by_key(|p| p.id());
        prompts
    }
}

/// Withdraws its request when the awaiting future is dropped, e.g. by a
/// timeout. Answered requests are already gone, so this is then a no-op.
struct PendingGuard<'a> {
    broker: &'a ChannelBroker,
    id: RequestId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.broker.withdraw(self.id);
    }
}

impl InteractionBroker for ChannelBroker {
    fn request_roll(&self, request: RollRequest) -> BoxFuture<'_, Result<RollResult, BrokerError>> {
        Box::pin(async move {
            let (id, rx) = self.begin_roll(request)?;
            let _guard = PendingGuard { broker: self, id };
            rx.await.map_err(|_| BrokerError::Disconnected)
        })
    }

    fn request_choice(&self, request: ChoiceRequest) -> BoxFuture<'_, Result<usize, BrokerError>> {
        Box::pin(async move {
            let (id, rx) = self.begin_choice(request)?;
            let _guard = PendingGuard { broker: self, id };
            rx.await.map_err(|_| BrokerError::Disconnected)
        })
    }
}

// ============================================================================
// Automated stand-in
// ============================================================================

/// Answers everything immediately: rolls with the randomness provider, never
/// cancels, and always takes the first option.
pub struct AutoBroker {
    randomness: Arc<dyn RandomnessProvider>,
}

impl AutoBroker {
    pub fn new(randomness: Arc<dyn RandomnessProvider>) -> Self {
        Self { randomness }
    }
}

impl InteractionBroker for AutoBroker {
    fn request_roll(&self, request: RollRequest) -> BoxFuture<'_, Result<RollResult, BrokerError>> {
        Box::pin(async move {
            let value = self.randomness.roll_expression(&request.dice)?;
            debug!(prompt = %request.prompt, value, "auto roll");
            Ok(RollResult::Rolled(value))
        })
    }

    fn request_choice(&self, request: ChoiceRequest) -> BoxFuture<'_, Result<usize, BrokerError>> {
        Box::pin(async move {
            if request.options.is_empty() {
                return Err(BrokerError::InvalidOption {
                    id: RequestId(0),
                    index: 0,
                    count: 0,
                });
            }
            Ok(0)
        })
    }
}
