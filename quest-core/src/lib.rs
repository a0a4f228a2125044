//! Combat reactions and status effects for a dungeon-crawler companion.
//!
//! This crate provides:
//! - Defensive reactions (dodge, weapon parry, shield parry)
//! - A status effect engine with resistance checks and per-turn ticking
//! - A suspend/resume broker so a player (or a stand-in) supplies the dice
//! - Perk-based resource gating for bonuses and re-tries
//!
//! # Quick Start
//!
//! ```ignore
//! use quest_core::{
//!     create_sample_hero, ActiveStatusEffect, AutoBroker, DefenseResolver,
//!     StatusEffectEngine, StatusEffectKind, StdRandomness,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let randomness = Arc::new(StdRandomness::new());
//!     let broker = Arc::new(AutoBroker::new(randomness.clone()));
//!
//!     let defense = DefenseResolver::new(broker.clone(), randomness.clone());
//!     let effects = StatusEffectEngine::new(broker, randomness);
//!
//!     let mut hero = create_sample_hero("Kestrel");
//!     let dodge = defense.attempt_dodge(&mut hero, None).await?;
//!     println!("{}", dodge.message);
//!
//!     let fire = ActiveStatusEffect::for_turns(StatusEffectKind::FireBurning, 2);
//!     effects.attempt_apply(&mut hero, fire, None, None).await?;
//!     let report = effects.process_active_effects(&mut hero).await?;
//!     println!("{:?}", report.messages);
//!     Ok(())
//! }
//! ```

pub mod character;
pub mod checks;
pub mod config;
pub mod defense;
pub mod dice;
pub mod effects;
pub mod interaction;
pub mod resource;
pub mod status;
pub mod testing;

// Primary public API
pub use character::{
    create_sample_hero, create_sample_monster, BasicStat, Character, CharacterId, CharacterKind,
    Shield, Skill, Stance, TestedAttribute, Weapon,
};
pub use checks::CombatError;
pub use config::{ConfigError, RulesConfig};
pub use defense::{DefenseOutcome, DefenseResolver};
pub use dice::{DiceError, DiceExpression, DieType, RandomnessProvider, StdRandomness};
pub use effects::hooks::{ArmourDamage, DamageSink, HealingItemHook};
pub use effects::{ApplyOutcome, ApplyStatus, StatusEffectEngine, TickReport};
pub use interaction::{
    AutoBroker, BrokerError, ChannelBroker, ChoiceRequest, InteractionBroker, PendingPrompt,
    RequestId, RollRequest, RollResult,
};
pub use resource::{AbilityTag, NoResources, PerkGate, ResourceGate};
pub use status::{ActiveStatusEffect, DamageAmount, EffectDuration, RemovalTrigger, StatusEffectKind};
pub use testing::{RecordingDamage, ScriptedBroker, SequenceRandomness};
