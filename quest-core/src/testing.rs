//! Scripted collaborators for driving the resolvers deterministically.
//!
//! [`ScriptedBroker`] answers rolls and choices from a queue and records what
//! it was asked. [`SequenceRandomness`] hands out fixed die values. The
//! recording hooks capture what the status engine did to a character.

use crate::character::{Character, CharacterId, Consumable};
use crate::dice::{DieType, RandomnessProvider};
use crate::effects::hooks::{ArmourDamage, DamageSink, HealingItemHook};
use crate::interaction::{BrokerError, ChoiceRequest, InteractionBroker, RollRequest, RollResult};
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A broker that replays scripted answers.
///
/// Running out of script answers with [`BrokerError::Disconnected`], which
/// makes an unexpected prompt show up as a test failure.
#[derive(Default)]
pub struct ScriptedBroker {
    rolls: Mutex<VecDeque<RollResult>>,
    choices: Mutex<VecDeque<usize>>,
    roll_log: Mutex<Vec<RollRequest>>,
    choice_log: Mutex<Vec<ChoiceRequest>>,
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue roll answers.
    pub fn with_rolls(self, rolls: impl IntoIterator<Item = i32>) -> Self {
        lock(&self.rolls).extend(rolls.into_iter().map(RollResult::Rolled));
        self
    }

    /// Queue a cancel as the next roll answer.
    pub fn then_cancel(self) -> Self {
        lock(&self.rolls).push_back(RollResult::Canceled);
        self
    }

    /// Queue choice answers.
    pub fn with_choices(self, choices: impl IntoIterator<Item = usize>) -> Self {
        lock(&self.choices).extend(choices);
        self
    }

    /// Every roll request received so far.
    pub fn roll_requests(&self) -> Vec<RollRequest> {
        lock(&self.roll_log).clone()
    }

    /// Prompts of every choice request received so far.
    pub fn choice_prompts(&self) -> Vec<String> {
        lock(&self.choice_log).iter().map(|r| r.prompt.clone()).collect()
    }

    pub fn choices_asked(&self) -> usize {
        lock(&self.choice_log).len()
    }

    /// Unused roll answers.
    pub fn rolls_left(&self) -> usize {
        lock(&self.rolls).len()
    }
}

impl InteractionBroker for ScriptedBroker {
    fn request_roll(&self, request: RollRequest) -> BoxFuture<'_, Result<RollResult, BrokerError>> {
        Box::pin(async move {
            lock(&self.roll_log).push(request);
            lock(&self.rolls)
                .pop_front()
                .ok_or(BrokerError::Disconnected)
        })
    }

    fn request_choice(&self, request: ChoiceRequest) -> BoxFuture<'_, Result<usize, BrokerError>> {
        Box::pin(async move {
            lock(&self.choice_log).push(request);
            lock(&self.choices)
                .pop_front()
                .ok_or(BrokerError::Disconnected)
        })
    }
}

/// Randomness that returns queued values, ignoring the die shape.
///
/// # Panics
///
/// Panics when asked for more values than were queued.
pub struct SequenceRandomness {
    values: Mutex<VecDeque<u32>>,
}

impl SequenceRandomness {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        lock(&self.values).len()
    }
}

impl RandomnessProvider for SequenceRandomness {
    fn roll_die(&self, die: DieType) -> u32 {
        match lock(&self.values).pop_front() {
            Some(value) => value,
            None => panic!("SequenceRandomness ran out of values rolling a {die}"),
        }
    }
}

/// Damage sink that records every hit, then applies it like [`ArmourDamage`].
#[derive(Default)]
pub struct RecordingDamage {
    hits: Mutex<Vec<(CharacterId, i32, bool)>>,
}

impl RecordingDamage {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(character, amount, ignore_armor)` per hit.
    pub fn hits(&self) -> Vec<(CharacterId, i32, bool)> {
        lock(&self.hits).clone()
    }
}

impl DamageSink for RecordingDamage {
    fn apply_damage(&self, character: &mut Character, amount: i32, ignore_armor: bool) -> i32 {
        lock(&self.hits).push((character.id, amount, ignore_armor));
        ArmourDamage.apply_damage(character, amount, ignore_armor)
    }
}

/// Healing hook that only records which item was offered.
#[derive(Default)]
pub struct RecordingHealingHook {
    used: Mutex<Vec<(CharacterId, String)>>,
}

impl RecordingHealingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn used(&self) -> Vec<(CharacterId, String)> {
        lock(&self.used).clone()
    }
}

impl HealingItemHook for RecordingHealingHook {
    fn use_healing_item(&self, character: &mut Character, item: &Consumable) {
        lock(&self.used).push((character.id, item.name.clone()));
    }
}
