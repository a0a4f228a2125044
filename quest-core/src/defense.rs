//! Defensive reactions: dodge, weapon parry and shield parry.
//!
//! Every attempt returns a [`DefenseOutcome`]. Disallowed attempts are
//! reported with a message and make no roll and no change to the character.

use crate::character::{Character, Skill, Stance, TestedAttribute, Weapon};
use crate::checks::{capped_success, CombatError, Roller};
use crate::config::RulesConfig;
use crate::dice::RandomnessProvider;
use crate::interaction::{InteractionBroker, RollRequest, RollResult};
use crate::resource::{AbilityTag, NoResources, ResourceGate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one defensive reaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseOutcome {
    pub success: bool,
    /// The actor declined a cancelable roll.
    pub canceled: bool,
    pub roll: Option<u32>,
    pub damage_negated: i32,
    /// Damage the caller still has to apply after a shield parry.
    pub remaining_damage: i32,
    pub weapon_damaged: bool,
    pub shield_damaged: bool,
    pub message: String,
}

impl DefenseOutcome {
    fn refused(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    fn canceled(message: impl Into<String>) -> Self {
        Self {
            canceled: true,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Resolves defensive reactions for a defending character.
pub struct DefenseResolver {
    roller: Roller,
    gate: Arc<dyn ResourceGate>,
    config: RulesConfig,
}

impl DefenseResolver {
    pub fn new(broker: Arc<dyn InteractionBroker>, randomness: Arc<dyn RandomnessProvider>) -> Self {
        Self {
            roller: Roller::new(broker, randomness),
            gate: Arc::new(NoResources),
            config: RulesConfig::default(),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn ResourceGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_config(mut self, config: RulesConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Try to dodge an incoming attack.
    ///
    /// The roll is cancelable; a canceled dodge changes nothing. A failed
    /// dodge uses up the character's dodge for the rest of the battle unless
    /// the resource gate refreshes it.
    pub async fn attempt_dodge(
        &self,
        character: &mut Character,
        attack: Option<&Weapon>,
    ) -> Result<DefenseOutcome, CombatError> {
        if character.is_dead() {
            return Ok(DefenseOutcome::refused(format!("{} is dead.", character.name)));
        }
        let needs_refresh = character.has_dodged_this_battle;
        if needs_refresh && !self.gate.can_activate(character, AbilityTag::DodgeRefresh) {
            return Ok(DefenseOutcome::refused(format!(
                "{} has already dodged this battle.",
                character.name
            )));
        }
        if character.cannot_actively_defend() {
            return Ok(DefenseOutcome::refused(format!(
                "{} cannot dodge right now.",
                character.name
            )));
        }

        let mut effective = character.effective_skill(Skill::Dodge);
        if character.stance == Stance::Parry {
            effective += self.config.parry_stance_bonus;
        }

        let against = attack
            .map(|w| format!(" the {}", w.name))
            .unwrap_or_else(|| " the attack".to_string());
        let request = RollRequest::percentile(format!("{} dodges{}", character.name, against))
            .for_subject(character.id, TestedAttribute::Skill(Skill::Dodge), effective)
            .cancelable();

        let roll = match self.roller.percentile(character, request).await? {
            RollResult::Canceled => {
                return Ok(DefenseOutcome::canceled(format!(
                    "{} decides not to dodge.",
                    character.name
                )));
            }
            RollResult::Rolled(value) => value as u32,
        };

        if needs_refresh {
            if !self
                .gate
                .try_activate(character, AbilityTag::DodgeRefresh)
                .await?
            {
                return Ok(DefenseOutcome {
                    roll: Some(roll),
                    message: format!(
                        "{} rolled {} but has already dodged this battle.",
                        character.name, roll
                    ),
                    ..DefenseOutcome::default()
                });
            }
            character.has_dodged_this_battle = false;
        }

        let cap = self.config.success_cap;
        let mut success = capped_success(roll, effective, cap);
        if !success
            && roll <= cap
            && (roll as i32) <= effective + self.config.dodge_perk_bonus
            && self.gate.can_activate(character, AbilityTag::DodgeBonus)
            && self
                .gate
                .try_activate(character, AbilityTag::DodgeBonus)
                .await?
        {
            effective += self.config.dodge_perk_bonus;
            success = true;
        }

        debug!(character = %character.name, roll, effective, success, "dodge");
        let message = if success {
            format!("{} dodges{} ({} vs {}).", character.name, against, roll, effective)
        } else {
            character.has_dodged_this_battle = true;
            format!(
                "{} fails to dodge{} ({} vs {}).",
                character.name, against, roll, effective
            )
        };

        Ok(DefenseOutcome {
            success,
            roll: Some(roll),
            message,
            ..DefenseOutcome::default()
        })
    }

    /// Parry with the equipped melee weapon. Needs the Parry stance and is
    /// limited to once per turn. High rolls fumble and wear the weapon.
    pub async fn attempt_weapon_parry(
        &self,
        character: &mut Character,
    ) -> Result<DefenseOutcome, CombatError> {
        if character.is_dead() {
            return Ok(DefenseOutcome::refused(format!("{} is dead.", character.name)));
        }
        if character.stance != Stance::Parry {
            return Ok(DefenseOutcome::refused(format!(
                "{} is not in a parry stance.",
                character.name
            )));
        }
        if character.has_parried_this_turn {
            return Ok(DefenseOutcome::refused(format!(
                "{} has already parried this turn.",
                character.name
            )));
        }
        match &character.weapon {
            Some(weapon) if weapon.melee && weapon.durability > 0 => {}
            Some(weapon) if weapon.melee => {
                return Ok(DefenseOutcome::refused(format!(
                    "{}'s {} is broken.",
                    character.name, weapon.name
                )));
            }
            _ => {
                return Ok(DefenseOutcome::refused(format!(
                    "{} has no melee weapon to parry with.",
                    character.name
                )));
            }
        }

        let skill = character.effective_skill(Skill::CombatSkill);
        let request = RollRequest::percentile(format!("{} parries", character.name)).for_subject(
            character.id,
            TestedAttribute::Skill(Skill::CombatSkill),
            skill,
        );
        let roll = match self.roller.percentile(character, request).await? {
            RollResult::Rolled(value) => value as u32,
            RollResult::Canceled => unreachable!("weapon parry rolls are not cancelable"),
        };
        character.has_parried_this_turn = true;

        if roll >= self.config.fumble_threshold {
            let mut outcome = DefenseOutcome {
                roll: Some(roll),
                weapon_damaged: true,
                ..DefenseOutcome::default()
            };
            if let Some(weapon) = character.weapon.as_mut() {
                let broke = weapon.wear(self.config.durability_loss);
                info!(weapon = %weapon.name, durability = weapon.durability, broke, "weapon damaged by fumble");
                outcome.message = format!(
                    "{} fumbles the parry ({}); {} loses durability.",
                    character.name, roll, weapon.name
                );
            }
            return Ok(outcome);
        }

        let success = capped_success(roll, skill, self.config.success_cap);
        debug!(character = %character.name, roll, skill, success, "weapon parry");
        let message = if success {
            format!("{} parries the blow ({} vs {}).", character.name, roll, skill)
        } else {
            format!("{} fails to parry ({} vs {}).", character.name, roll, skill)
        };
        Ok(DefenseOutcome {
            success,
            roll: Some(roll),
            message,
            ..DefenseOutcome::default()
        })
    }

    /// Block `incoming_damage` with the equipped shield.
    ///
    /// A successful block negates up to the shield's defense value; the rest
    /// is reported as `remaining_damage` and wears the shield.
    ///
    /// # Panics
    ///
    /// Panics if the character has no shield equipped.
    pub async fn attempt_shield_parry(
        &self,
        character: &mut Character,
        incoming_damage: i32,
    ) -> Result<DefenseOutcome, CombatError> {
        if character.is_dead() {
            return Ok(DefenseOutcome::refused(format!("{} is dead.", character.name)));
        }
        if character.cannot_actively_defend() {
            return Ok(DefenseOutcome::refused(format!(
                "{} cannot parry with a shield right now.",
                character.name
            )));
        }
        let Some(shield) = &character.shield else {
            panic!("shield parry attempted by {} without a shield", character.name);
        };
        if shield.durability == 0 {
            return Ok(DefenseOutcome::refused(format!(
                "{}'s {} is broken.",
                character.name, shield.name
            )));
        }
        let defense_value = shield.defense_value;

        if character.has_parried_this_turn {
            let allowed = self.gate.can_activate(character, AbilityTag::SecondParry)
                && self
                    .gate
                    .try_activate(character, AbilityTag::SecondParry)
                    .await?;
            if !allowed {
                return Ok(DefenseOutcome::refused(format!(
                    "{} has already parried this turn.",
                    character.name
                )));
            }
        }

        let skill = character.effective_skill(Skill::CombatSkill);
        let effective = if character.stance == Stance::Parry {
            skill + self.config.parry_stance_bonus
        } else {
            skill - self.config.off_stance_shield_penalty
        };

        let request = RollRequest::percentile(format!("{} blocks with a shield", character.name))
            .for_subject(
                character.id,
                TestedAttribute::Skill(Skill::CombatSkill),
                effective,
            );
        let roll = match self.roller.percentile(character, request).await? {
            RollResult::Rolled(value) => value as u32,
            RollResult::Canceled => unreachable!("shield parry rolls are not cancelable"),
        };
        character.has_parried_this_turn = true;

        let success = capped_success(roll, effective, self.config.success_cap);
        debug!(character = %character.name, roll, effective, success, "shield parry");
        if !success {
            return Ok(DefenseOutcome {
                roll: Some(roll),
                remaining_damage: incoming_damage,
                message: format!(
                    "{} fails to block ({} vs {}).",
                    character.name, roll, effective
                ),
                ..DefenseOutcome::default()
            });
        }

        let negated = defense_value.min(incoming_damage).max(0);
        let remaining = incoming_damage - negated;
        let mut outcome = DefenseOutcome {
            success: true,
            roll: Some(roll),
            damage_negated: negated,
            remaining_damage: remaining,
            ..DefenseOutcome::default()
        };

        if remaining > 0 {
            outcome.shield_damaged = true;
            if let Some(shield) = character.shield.as_mut() {
                let broke = shield.wear(self.config.durability_loss);
                info!(shield = %shield.name, durability = shield.durability, broke, "shield damaged by spillover");
            }
            outcome.message = format!(
                "{} blocks {} damage, but {} gets through.",
                character.name, negated, remaining
            );
        } else {
            outcome.message = format!("{} blocks the blow completely.", character.name);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{create_sample_hero, create_sample_monster, Perk, Shield};
    use crate::resource::PerkGate;
    use crate::status::{ActiveStatusEffect, StatusEffectKind};
    use crate::testing::{ScriptedBroker, SequenceRandomness};

    fn resolver(broker: Arc<ScriptedBroker>) -> DefenseResolver {
        DefenseResolver::new(broker, Arc::new(SequenceRandomness::new([])))
    }

    fn resolver_with_perks(broker: Arc<ScriptedBroker>) -> DefenseResolver {
        resolver(broker.clone()).with_gate(Arc::new(PerkGate::new(broker)))
    }

    // ------------------------------------------------------------------------
    // Dodge
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_dodge_success_rule() {
        let mut hero = create_sample_hero("Kestrel");
        hero.skills.insert(Skill::Dodge, 35);

        let broker = Arc::new(ScriptedBroker::new().with_rolls([35]));
        let outcome = resolver(broker).attempt_dodge(&mut hero, None).await.unwrap();
        assert!(outcome.success);
        assert!(!hero.has_dodged_this_battle);

        let broker = Arc::new(ScriptedBroker::new().with_rolls([36]));
        let outcome = resolver(broker).attempt_dodge(&mut hero, None).await.unwrap();
        assert!(!outcome.success);
        assert!(hero.has_dodged_this_battle);
    }

    #[tokio::test]
    async fn test_dodge_cap_at_80() {
        let mut hero = create_sample_hero("Kestrel");
        hero.skills.insert(Skill::Dodge, 95);

        let broker = Arc::new(ScriptedBroker::new().with_rolls([81]));
        let outcome = resolver(broker).attempt_dodge(&mut hero, None).await.unwrap();
        assert!(!outcome.success);

        hero.end_battle();
        let broker = Arc::new(ScriptedBroker::new().with_rolls([80]));
        let outcome = resolver(broker).attempt_dodge(&mut hero, None).await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_dodge_parry_stance_bonus() {
        let mut hero = create_sample_hero("Kestrel");
        hero.skills.insert(Skill::Dodge, 35);
        hero.stance = Stance::Parry;

        let broker = Arc::new(ScriptedBroker::new().with_rolls([50]));
        let outcome = resolver(broker.clone())
            .attempt_dodge(&mut hero, None)
            .await
            .unwrap();
        assert!(outcome.success);
        let request = &broker.roll_requests()[0];
        assert!(request.cancelable);
        assert_eq!(request.subject.unwrap().target, 50);
    }

    #[tokio::test]
    async fn test_dodge_only_once_per_battle() {
        let mut hero = create_sample_hero("Kestrel");
        hero.has_dodged_this_battle = true;

        let broker = Arc::new(ScriptedBroker::new());
        let outcome = resolver(broker.clone())
            .attempt_dodge(&mut hero, None)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.roll.is_none());
        assert!(outcome.message.contains("already dodged"));
        assert!(broker.roll_requests().is_empty());
    }

    #[tokio::test]
    async fn test_cannot_dodge_when_vulnerable_or_frenzied() {
        let broker = Arc::new(ScriptedBroker::new());

        let mut hero = create_sample_hero("Kestrel");
        hero.vulnerable_after_power_attack = true;
        let outcome = resolver(broker.clone())
            .attempt_dodge(&mut hero, None)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(!hero.has_dodged_this_battle);

        let mut berserker = create_sample_hero("Ulf");
        berserker
            .status_effects
            .push(ActiveStatusEffect::for_turns(StatusEffectKind::Frenzy, 3));
        let outcome = resolver(broker.clone())
            .attempt_dodge(&mut berserker, None)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(broker.roll_requests().is_empty());
    }

    #[tokio::test]
    async fn test_canceled_dodge_changes_nothing() {
        let mut hero = create_sample_hero("Kestrel");
        if let Some(data) = hero.hero_data_mut() {
            data.perks.insert(Perk::QuickDodge);
        }
        let before = hero.clone();

        let broker = Arc::new(ScriptedBroker::new().then_cancel());
        let outcome = resolver_with_perks(broker.clone())
            .attempt_dodge(&mut hero, None)
            .await
            .unwrap();
        assert!(outcome.canceled);
        assert!(!outcome.success);
        assert_eq!(hero, before);
        assert_eq!(broker.choices_asked(), 0);
    }

    #[tokio::test]
    async fn test_dodge_bonus_perk_turns_miss_into_dodge() {
        let mut hero = create_sample_hero("Kestrel");
        hero.skills.insert(Skill::Dodge, 35);
        if let Some(data) = hero.hero_data_mut() {
            data.perks.insert(Perk::QuickDodge);
            data.energy = 1;
        }

        let broker = Arc::new(ScriptedBroker::new().with_rolls([50]).with_choices([0]));
        let outcome = resolver_with_perks(broker)
            .attempt_dodge(&mut hero, None)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(hero.hero_data().unwrap().energy, 0);
        assert!(!hero.has_dodged_this_battle);
    }

    #[tokio::test]
    async fn test_dodge_bonus_not_offered_when_it_cannot_help() {
        let mut hero = create_sample_hero("Kestrel");
        hero.skills.insert(Skill::Dodge, 35);
        if let Some(data) = hero.hero_data_mut() {
            data.perks.insert(Perk::QuickDodge);
            data.energy = 1;
        }

        let broker = Arc::new(ScriptedBroker::new().with_rolls([70]));
        let outcome = resolver_with_perks(broker.clone())
            .attempt_dodge(&mut hero, None)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(broker.choices_asked(), 0);
        assert_eq!(hero.hero_data().unwrap().energy, 1);
    }

    #[tokio::test]
    async fn test_evasive_refreshes_dodge() {
        let mut hero = create_sample_hero("Kestrel");
        hero.skills.insert(Skill::Dodge, 40);
        hero.has_dodged_this_battle = true;
        if let Some(data) = hero.hero_data_mut() {
            data.perks.insert(Perk::Evasive);
            data.energy = 1;
        }

        let broker = Arc::new(ScriptedBroker::new().with_rolls([20]).with_choices([0]));
        let outcome = resolver_with_perks(broker)
            .attempt_dodge(&mut hero, None)
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(!hero.has_dodged_this_battle);
        assert_eq!(hero.hero_data().unwrap().energy, 0);
    }

    #[tokio::test]
    async fn test_declined_evasive_keeps_the_roll() {
        let mut hero = create_sample_hero("Kestrel");
        hero.skills.insert(Skill::Dodge, 40);
        hero.has_dodged_this_battle = true;
        if let Some(data) = hero.hero_data_mut() {
            data.perks.insert(Perk::Evasive);
            data.energy = 1;
        }

        let broker = Arc::new(ScriptedBroker::new().with_rolls([20]).with_choices([1]));
        let outcome = resolver_with_perks(broker)
            .attempt_dodge(&mut hero, None)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(!outcome.canceled);
        assert_eq!(outcome.roll, Some(20));
        assert!(outcome.message.contains("already dodged"));
        assert!(hero.has_dodged_this_battle);
        assert_eq!(hero.hero_data().unwrap().energy, 1);
    }

    #[tokio::test]
    async fn test_monster_dodge_rolls_automatically() {
        let mut goblin = create_sample_monster("Goblin");
        let broker = Arc::new(ScriptedBroker::new());
        let resolver = DefenseResolver::new(broker.clone(), Arc::new(SequenceRandomness::new([15])));
        let outcome = resolver.attempt_dodge(&mut goblin, None).await.unwrap();
        assert!(outcome.success);
        assert!(broker.roll_requests().is_empty());
    }

    // ------------------------------------------------------------------------
    // Weapon parry
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_weapon_parry_requires_parry_stance() {
        let mut hero = create_sample_hero("Kestrel");
        let broker = Arc::new(ScriptedBroker::new());
        let outcome = resolver(broker.clone())
            .attempt_weapon_parry(&mut hero)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(broker.roll_requests().is_empty());
    }

    #[tokio::test]
    async fn test_weapon_parry_without_weapon() {
        let mut hero = create_sample_hero("Kestrel");
        hero.stance = Stance::Parry;
        hero.weapon = None;
        let broker = Arc::new(ScriptedBroker::new());
        let outcome = resolver(broker.clone())
            .attempt_weapon_parry(&mut hero)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.message.contains("no melee weapon"));
        assert!(broker.roll_requests().is_empty());

        hero.weapon = Some(Weapon::ranged("Shortbow", 5));
        let outcome = resolver(broker).attempt_weapon_parry(&mut hero).await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_weapon_parry_fumble_damages_weapon() {
        for roll in [95, 100] {
            let mut hero = create_sample_hero("Kestrel");
            hero.stance = Stance::Parry;
            hero.skills.insert(Skill::CombatSkill, 100);
            let before = hero.weapon.as_ref().unwrap().durability;

            let broker = Arc::new(ScriptedBroker::new().with_rolls([roll]));
            let outcome = resolver(broker).attempt_weapon_parry(&mut hero).await.unwrap();
            assert!(!outcome.success);
            assert!(outcome.weapon_damaged);
            assert_eq!(hero.weapon.as_ref().unwrap().durability, before - 1);
        }
    }

    #[tokio::test]
    async fn test_weapon_parry_plain_failure_keeps_weapon() {
        let mut hero = create_sample_hero("Kestrel");
        hero.stance = Stance::Parry;
        hero.skills.insert(Skill::CombatSkill, 60);
        let before = hero.weapon.clone();

        let broker = Arc::new(ScriptedBroker::new().with_rolls([85]));
        let outcome = resolver(broker).attempt_weapon_parry(&mut hero).await.unwrap();
        assert!(!outcome.success);
        assert!(!outcome.weapon_damaged);
        assert_eq!(hero.weapon, before);
        assert!(hero.has_parried_this_turn);
    }

    #[tokio::test]
    async fn test_weapon_parry_once_per_turn() {
        let mut hero = create_sample_hero("Kestrel");
        hero.stance = Stance::Parry;

        let broker = Arc::new(ScriptedBroker::new().with_rolls([10]));
        let resolver = resolver(broker.clone());
        assert!(resolver.attempt_weapon_parry(&mut hero).await.unwrap().success);
        let second = resolver.attempt_weapon_parry(&mut hero).await.unwrap();
        assert!(!second.success);
        assert!(second.message.contains("already parried"));
        assert_eq!(broker.roll_requests().len(), 1);
        assert!(!broker.roll_requests()[0].cancelable);
    }

    // ------------------------------------------------------------------------
    // Shield parry
    // ------------------------------------------------------------------------

    fn shield_bearer(defense: i32) -> Character {
        let mut hero = create_sample_hero("Kestrel");
        hero.stance = Stance::Parry;
        hero.skills.insert(Skill::CombatSkill, 60);
        hero.shield = Some(Shield::new("Kite Shield", defense, 4));
        hero
    }

    #[tokio::test]
    async fn test_shield_spillover() {
        let mut hero = shield_bearer(5);
        let broker = Arc::new(ScriptedBroker::new().with_rolls([20]));
        let outcome = resolver(broker)
            .attempt_shield_parry(&mut hero, 8)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.damage_negated, 5);
        assert_eq!(outcome.remaining_damage, 3);
        assert!(outcome.shield_damaged);
        assert_eq!(hero.shield.as_ref().unwrap().durability, 3);
    }

    #[tokio::test]
    async fn test_shield_absorbs_small_hit() {
        let mut hero = shield_bearer(5);
        let broker = Arc::new(ScriptedBroker::new().with_rolls([20]));
        let outcome = resolver(broker)
            .attempt_shield_parry(&mut hero, 5)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.damage_negated, 5);
        assert_eq!(outcome.remaining_damage, 0);
        assert!(!outcome.shield_damaged);
        assert_eq!(hero.shield.as_ref().unwrap().durability, 4);
    }

    #[tokio::test]
    async fn test_shield_off_stance_penalty() {
        let mut hero = shield_bearer(5);
        hero.stance = Stance::Normal;
        // 60 - 15 = 45
        let broker = Arc::new(ScriptedBroker::new().with_rolls([46]));
        let outcome = resolver(broker.clone())
            .attempt_shield_parry(&mut hero, 4)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.damage_negated, 0);
        assert_eq!(outcome.remaining_damage, 4);
        assert_eq!(broker.roll_requests()[0].subject.unwrap().target, 45);
    }

    #[tokio::test]
    async fn test_shield_parry_cap() {
        let mut hero = shield_bearer(5);
        hero.skills.insert(Skill::CombatSkill, 90);
        let broker = Arc::new(ScriptedBroker::new().with_rolls([81]));
        let outcome = resolver(broker)
            .attempt_shield_parry(&mut hero, 3)
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_second_shield_parry_needs_shield_wall() {
        let mut hero = shield_bearer(5);
        hero.has_parried_this_turn = true;

        let broker = Arc::new(ScriptedBroker::new());
        let outcome = resolver_with_perks(broker.clone())
            .attempt_shield_parry(&mut hero, 3)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(broker.roll_requests().is_empty());

        if let Some(data) = hero.hero_data_mut() {
            data.perks.insert(Perk::ShieldWall);
            data.energy = 1;
        }
        let broker = Arc::new(ScriptedBroker::new().with_choices([0]).with_rolls([10]));
        let outcome = resolver_with_perks(broker)
            .attempt_shield_parry(&mut hero, 3)
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(hero.hero_data().unwrap().energy, 0);
    }

    #[tokio::test]
    async fn test_shield_parry_blocked_by_frenzy() {
        let mut hero = shield_bearer(5);
        hero.status_effects
            .push(ActiveStatusEffect::for_turns(StatusEffectKind::Frenzy, 2));
        let broker = Arc::new(ScriptedBroker::new());
        let outcome = resolver(broker)
            .attempt_shield_parry(&mut hero, 3)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(!hero.has_parried_this_turn);
    }

    #[tokio::test]
    #[should_panic(expected = "without a shield")]
    async fn test_shield_parry_without_shield_panics() {
        let mut hero = create_sample_hero("Kestrel");
        hero.shield = None;
        let broker = Arc::new(ScriptedBroker::new());
        let _ = resolver(broker).attempt_shield_parry(&mut hero, 3).await;
    }
}
