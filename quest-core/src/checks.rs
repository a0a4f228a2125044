//! Percentile tests shared by the defense resolver and the status engine.
//!
//! Heroes roll through the interaction broker; monsters roll automatically
//! with the randomness provider.

use crate::character::{Character, TestedAttribute};
use crate::dice::{DiceError, RandomnessProvider};
use crate::interaction::{BrokerError, InteractionBroker, RollRequest, RollResult};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Infrastructure failure while resolving. Rule outcomes are never errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Dice error: {0}")]
    Dice(#[from] DiceError),
}

/// Panics unless `roll` is a valid percentile.
pub fn assert_percentile(roll: u32) {
    assert!(
        (1..=100).contains(&roll),
        "percentile roll {roll} is outside 1..=100"
    );
}

/// `roll <= cap && roll <= target`. The cap keeps a floor on failure no
/// matter how high the skill is.
pub fn capped_success(roll: u32, target: i32, cap: u32) -> bool {
    assert_percentile(roll);
    roll <= cap && (roll as i32) <= target
}

/// Plain roll-under.
pub fn roll_under(roll: u32, target: i32) -> bool {
    assert_percentile(roll);
    (roll as i32) <= target
}

/// A finished roll-under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRoll {
    pub roll: u32,
    pub target: i32,
    pub success: bool,
}

/// Decides who rolls a percentile for a character.
#[derive(Clone)]
pub struct Roller {
    broker: Arc<dyn InteractionBroker>,
    randomness: Arc<dyn RandomnessProvider>,
}

impl Roller {
    pub fn new(broker: Arc<dyn InteractionBroker>, randomness: Arc<dyn RandomnessProvider>) -> Self {
        Self { broker, randomness }
    }

    pub fn randomness(&self) -> &dyn RandomnessProvider {
        self.randomness.as_ref()
    }

    /// Roll a d100 for `character`. Only a cancelable request can come back
    /// [`RollResult::Canceled`].
    pub async fn percentile(
        &self,
        character: &Character,
        request: RollRequest,
    ) -> Result<RollResult, CombatError> {
        let result = if character.is_hero() {
            self.broker.request_roll(request.clone()).await?
        } else {
            RollResult::Rolled(self.randomness.percentile() as i32)
        };

        match result {
            RollResult::Rolled(value) => {
                assert!(
                    (1..=100).contains(&value),
                    "percentile roll {value} is outside 1..=100"
                );
                debug!(character = %character.name, prompt = %request.prompt, roll = value, "rolled");
            }
            RollResult::Canceled => {
                assert!(
                    request.cancelable,
                    "broker canceled a non-cancelable request: {}",
                    request.prompt
                );
                debug!(character = %character.name, prompt = %request.prompt, "roll canceled");
            }
        }
        Ok(result)
    }

    /// A non-cancelable roll-under test against `target`.
    pub async fn test(
        &self,
        character: &Character,
        attribute: TestedAttribute,
        target: i32,
        prompt: impl Into<String>,
    ) -> Result<TestRoll, CombatError> {
        let request =
            RollRequest::percentile(prompt).for_subject(character.id, attribute, target);
        let roll = match self.percentile(character, request).await? {
            RollResult::Rolled(value) => value as u32,
            RollResult::Canceled => unreachable!("non-cancelable request came back canceled"),
        };
        let success = roll_under(roll, target);
        debug!(character = %character.name, %attribute, roll, target, success, "test");
        Ok(TestRoll {
            roll,
            target,
            success,
        })
    }
}
