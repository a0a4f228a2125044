//! The status effect engine.
//!
//! [`StatusEffectEngine::attempt_apply`] gates a new effect behind its
//! resistance check. [`StatusEffectEngine::process_active_effects`] runs once
//! at the start of a character's turn and ticks every active effect through
//! the handler table in [`handlers`].

pub mod handlers;
pub mod hooks;
pub mod resistance;

use crate::character::{Character, Stance, TestedAttribute};
use crate::checks::{assert_percentile, roll_under, CombatError, Roller};
use crate::config::RulesConfig;
use crate::dice::{DiceExpression, RandomnessProvider};
use crate::interaction::InteractionBroker;
use crate::resource::{AbilityTag, NoResources, ResourceGate};
use crate::status::{
    ActiveStatusEffect, DamageAmount, EffectDuration, RemovalTrigger, StatusEffectKind,
};
use handlers::{plan_tick, DurationRule, EffectOutcome, TickContext, TickPlan};
use hooks::{ArmourDamage, DamageSink, HealingItemHook, NoHealingHook};
use resistance::Resistance;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyStatus {
    Applied,
    Resisted,
    AlreadyAffected,
}

/// Result of trying to put an effect on a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub status: ApplyStatus,
    pub message: String,
    /// The resistance roll, when one was made.
    pub roll: Option<u32>,
}

impl ApplyOutcome {
    pub fn applied(&self) -> bool {
        self.status == ApplyStatus::Applied
    }
}

/// What one round of ticking did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub messages: Vec<String>,
    /// Kinds that left the character this tick, for any reason.
    pub expired: Vec<StatusEffectKind>,
    pub damage_taken: i32,
    pub died: bool,
}

/// Applies, ticks and removes status effects.
pub struct StatusEffectEngine {
    roller: Roller,
    gate: Arc<dyn ResourceGate>,
    damage: Arc<dyn DamageSink>,
    healing: Arc<dyn HealingItemHook>,
    config: RulesConfig,
}

impl StatusEffectEngine {
    pub fn new(broker: Arc<dyn InteractionBroker>, randomness: Arc<dyn RandomnessProvider>) -> Self {
        Self {
            roller: Roller::new(broker, randomness),
            gate: Arc::new(NoResources),
            damage: Arc::new(ArmourDamage),
            healing: Arc::new(NoHealingHook),
            config: RulesConfig::default(),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn ResourceGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_damage_sink(mut self, damage: Arc<dyn DamageSink>) -> Self {
        self.damage = damage;
        self
    }

    pub fn with_healing_hook(mut self, healing: Arc<dyn HealingItemHook>) -> Self {
        self.healing = healing;
        self
    }

    pub fn with_config(mut self, config: RulesConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Application
    // ------------------------------------------------------------------------

    /// Try to put `effect` on `target`.
    ///
    /// `monster` is whoever caused it, used for fear checks. `resist_roll`
    /// overrides the resistance percentile; without it a fresh one is rolled.
    /// Bellow lands as Stunned with the same duration.
    ///
    /// # Panics
    ///
    /// Panics if `resist_roll` is outside 1..=100.
    pub async fn attempt_apply(
        &self,
        target: &mut Character,
        mut effect: ActiveStatusEffect,
        monster: Option<&Character>,
        resist_roll: Option<u32>,
    ) -> Result<ApplyOutcome, CombatError> {
        let incoming = effect.kind;
        if incoming == StatusEffectKind::Bellow {
            effect.kind = StatusEffectKind::Stunned;
        }

        if target.has_effect(effect.kind) {
            return Ok(ApplyOutcome {
                status: ApplyStatus::AlreadyAffected,
                message: format!("{} is already {}.", target.name, effect.kind),
                roll: None,
            });
        }

        let mut roll = None;
        match resistance::check_for(incoming, target, monster, &self.config) {
            Resistance::None => {}
            Resistance::Automatic(message) => {
                debug!(character = %target.name, kind = %incoming, "resisted automatically");
                return Ok(ApplyOutcome {
                    status: ApplyStatus::Resisted,
                    message,
                    roll: None,
                });
            }
            Resistance::Test {
                attribute,
                target: value,
                fear,
            } => {
                let rolled = match resist_roll {
                    Some(r) => {
                        assert_percentile(r);
                        r
                    }
                    None => self.roller.randomness().percentile(),
                };
                roll = Some(rolled);
                if self
                    .resists(target, attribute, rolled, value, fear)
                    .await?
                {
                    if incoming == StatusEffectKind::Fear {
                        remember_fear(target, monster);
                    }
                    info!(character = %target.name, kind = %incoming, roll = rolled, "effect resisted");
                    return Ok(ApplyOutcome {
                        status: ApplyStatus::Resisted,
                        message: format!(
                            "{} resists {} ({} vs {}).",
                            target.name, incoming, rolled, value
                        ),
                        roll,
                    });
                }
            }
        }

        let kind = effect.kind;
        let duration = effect.duration;
        target.status_effects.push(effect);
        self.on_applied(target, kind);
        info!(character = %target.name, %kind, %duration, "effect applied");

        Ok(ApplyOutcome {
            status: ApplyStatus::Applied,
            message: format!("{} is now {} ({}).", target.name, kind, duration),
            roll,
        })
    }

    async fn resists(
        &self,
        target: &mut Character,
        attribute: TestedAttribute,
        roll: u32,
        value: i32,
        fear: bool,
    ) -> Result<bool, CombatError> {
        if roll_under(roll, value) {
            return Ok(true);
        }
        let bonus = self.config.fear_perk_bonus;
        if fear
            && (roll as i32) <= value + bonus
            && self.gate.can_activate(target, AbilityTag::FearBonus)
            && self.gate.try_activate(target, AbilityTag::FearBonus).await?
        {
            debug!(character = %target.name, %attribute, roll, value, bonus, "fear bonus spent");
            return Ok(true);
        }
        Ok(false)
    }

    fn on_applied(&self, target: &mut Character, kind: StatusEffectKind) {
        if kind.causes_prone() {
            target.stance = Stance::Prone;
        }
        if !target.is_hero() {
            return;
        }
        match kind {
            StatusEffectKind::PowerOfTheGods => {
                if let Some(hero) = target.hero_data_mut() {
                    hero.fear_memory.clear();
                }
            }
            StatusEffectKind::ProtectiveResolve => {
                target.heal(self.config.protective_resolve_heal);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------------

    /// Tick every active effect once. Call at the start of the character's
    /// turn. Effects added or removed while ticking do not change which
    /// effects are visited.
    ///
    /// Damage dice are checked before anything ticks, so a bad dice string
    /// returns an error with the character untouched. A broker error can
    /// still arrive mid-tick, leaving earlier effects ticked.
    pub async fn process_active_effects(
        &self,
        character: &mut Character,
    ) -> Result<TickReport, CombatError> {
        let mut report = TickReport::default();
        if character.is_dead() {
            return Ok(report);
        }
        self.check_damage_dice(character)?;

        let snapshot: Vec<StatusEffectKind> =
            character.status_effects.iter().map(|e| e.kind).collect();

        for kind in snapshot {
            if character.is_dead() {
                break;
            }
            let Some(effect) = character.effect(kind).cloned() else {
                continue;
            };
            let plan = plan_tick(&TickContext {
                character,
                effect: &effect,
                config: &self.config,
            });
            let outcome = match plan {
                TickPlan::Apply(outcome) => outcome,
                TickPlan::Test {
                    attribute,
                    target,
                    prompt,
                    on_success,
                    on_failure,
                } => {
                    let test = self
                        .roller
                        .test(character, attribute, target, prompt)
                        .await?;
                    if test.success {
                        on_success
                    } else {
                        on_failure
                    }
                }
            };
            self.carry_out(character, kind, outcome, &mut report)?;
        }

        if report.died {
            info!(character = %character.name, "died from status effects");
        }
        Ok(report)
    }

    fn check_damage_dice(&self, character: &Character) -> Result<(), CombatError> {
        use StatusEffectKind::*;
        for effect in &character.status_effects {
            if !matches!(effect.kind, Poisoned | FireBurning | AcidBurning | PoisonGas) {
                continue;
            }
            let notation = match &effect.damage {
                Some(DamageAmount::Dice(notation)) => notation,
                Some(DamageAmount::Fixed(_)) => continue,
                None if effect.kind == PoisonGas => &self.config.poison_gas_damage,
                None => continue,
            };
            DiceExpression::parse(notation)?;
        }
        Ok(())
    }

    fn carry_out(
        &self,
        character: &mut Character,
        kind: StatusEffectKind,
        outcome: EffectOutcome,
        report: &mut TickReport,
    ) -> Result<(), CombatError> {
        debug!(character = %character.name, %kind, ?outcome, "tick");
        if let Some(message) = outcome.message {
            report.messages.push(message);
        }

        if let Some(damage) = outcome.damage {
            let amount = damage.amount.resolve(self.roller.randomness())?;
            report.damage_taken += self
                .damage
                .apply_damage(character, amount, damage.ignore_armor);
            if character.is_dead() {
                report.died = true;
            }
        }
        if outcome.heal > 0 {
            character.heal(outcome.heal);
        }
        if outcome.ap_loss > 0 {
            character.spend_ap(outcome.ap_loss);
        }
        if outcome.zero_ap {
            character.zero_ap();
        }
        if outcome.clear_position {
            character.position = None;
        }
        if outcome.use_healing_item {
            if let Some(item) = character.healing_item().cloned() {
                self.healing.use_healing_item(character, &item);
            }
        }

        if outcome.remove {
            if self.remove_active_effect(character, kind) {
                report.expired.push(kind);
            }
        } else {
            self.advance_duration(character, kind, outcome.duration, report);
        }

        if let Some(added) = outcome.add {
            if !character.has_effect(added.kind) {
                info!(character = %character.name, kind = %added.kind, "effect applied");
                character.status_effects.push(added);
            }
        }
        Ok(())
    }

    fn advance_duration(
        &self,
        character: &mut Character,
        kind: StatusEffectKind,
        rule: DurationRule,
        report: &mut TickReport,
    ) {
        let Some(effect) = character.effect_mut(kind) else {
            return;
        };
        let expired = match rule {
            DurationRule::Generic => match effect.duration {
                EffectDuration::Turns(n) if n > 0 => effect.duration.tick(),
                _ => false,
            },
            DurationRule::Managed {
                next,
                expire_at_zero,
            } => {
                effect.duration = next;
                expire_at_zero && next == EffectDuration::Turns(0)
            }
        };
        if expired && self.remove_active_effect(character, kind) {
            report.expired.push(kind);
            report.messages.push(format!("{} is no longer {}.", character.name, kind));
        }
    }

    // ------------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------------

    /// Remove the effect of `kind`. Stance goes back to Normal when the last
    /// prone-causing effect leaves a prone character.
    pub fn remove_active_effect(&self, character: &mut Character, kind: StatusEffectKind) -> bool {
        let Some(index) = character.status_effects.iter().position(|e| e.kind == kind) else {
            return false;
        };
        character.status_effects.remove(index);
        if kind.causes_prone()
            && character.stance == Stance::Prone
            && !character.status_effects.iter().any(|e| e.kind.causes_prone())
        {
            character.stance = Stance::Normal;
        }
        info!(character = %character.name, %kind, "effect removed");
        true
    }

    /// Cure an effect, including ones that last until cured.
    pub fn cure(&self, character: &mut Character, kind: StatusEffectKind) -> bool {
        let cured = self.remove_active_effect(character, kind);
        if cured {
            debug!(character = %character.name, %kind, "cured");
        }
        cured
    }

    /// Clear everything flagged for `trigger`. Returns the removed kinds.
    ///
    /// End of battle (and of a dungeon) arms effects flagged for removal after
    /// the next battle, and resets per-battle character state.
    pub fn fire_trigger(
        &self,
        character: &mut Character,
        trigger: RemovalTrigger,
    ) -> Vec<StatusEffectKind> {
        let doomed: Vec<StatusEffectKind> = character
            .status_effects
            .iter()
            .filter(|e| e.cleared_by(trigger))
            .map(|e| e.kind)
            .collect();
        for kind in &doomed {
            self.remove_active_effect(character, *kind);
        }

        if matches!(
            trigger,
            RemovalTrigger::EndOfBattle | RemovalTrigger::EndOfDungeon
        ) {
            for effect in character
                .status_effects
                .iter_mut()
                .filter(|e| e.removal.after_next_battle)
            {
                effect.removal.after_next_battle = false;
                effect.removal.after_this_combat = true;
            }
            character.end_battle();
        }
        debug!(character = %character.name, ?trigger, removed = doomed.len(), "removal trigger");
        doomed
    }
}

fn remember_fear(target: &mut Character, monster: Option<&Character>) {
    let Some(monster) = monster else {
        return;
    };
    if let Some(hero) = target.hero_data_mut() {
        if !hero.fear_memory.contains(&monster.name) {
            hero.fear_memory.push(monster.name.clone());
        }
    }
}
