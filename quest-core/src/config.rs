//! Tunable rule constants.
//!
//! Every number the resolvers compare against lives here so a house-ruled
//! table can be loaded from JSON. Missing keys keep their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Errors from loading a rules file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Numeric policy shared by the defense resolver and the status engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Highest percentile roll that can ever succeed, whatever the skill.
    pub success_cap: u32,

    /// Skill bonus for dodging or shield parrying from the Parry stance.
    pub parry_stance_bonus: i32,

    /// Skill penalty for shield parrying outside the Parry stance.
    pub off_stance_shield_penalty: i32,

    /// Weapon parry rolls at or above this fumble.
    pub fumble_threshold: u32,

    /// Dodge bonus bought through the resource gate.
    pub dodge_perk_bonus: i32,

    /// Durability lost per fumble or spillover.
    pub durability_loss: u32,

    /// Tick damage for poison and burning effects that carry no amount.
    pub default_tick_damage: i32,

    /// Dice rolled each tick for poison gas.
    pub poison_gas_damage: String,

    /// HP restored when Protective Resolve is applied to a hero.
    pub protective_resolve_heal: i32,

    /// Extra resolve penalty for Terror on top of the monster's fear rating.
    pub terror_penalty: i32,

    /// Resolve bonus bought through the resource gate when resisting fear.
    pub fear_perk_bonus: i32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            success_cap: 80,
            parry_stance_bonus: 15,
            off_stance_shield_penalty: 15,
            fumble_threshold: 95,
            dodge_perk_bonus: 20,
            durability_loss: 1,
            default_tick_damage: 1,
            poison_gas_damage: "1d3".to_string(),
            protective_resolve_heal: 5,
            terror_penalty: 20,
            fear_perk_bonus: 10,
        }
    }
}

impl RulesConfig {
    /// Parse a (possibly partial) JSON rules document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a rules document from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
