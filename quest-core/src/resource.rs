//! Gating bonuses and re-tries behind scarce hero resources.

use crate::character::{Character, Perk};
use crate::interaction::{BrokerError, ChoiceRequest, InteractionBroker};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Something a character may pay for mid-resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityTag {
    /// Bonus to a dodge roll that would otherwise miss.
    DodgeBonus,
    /// Dodge again after a failed dodge this battle.
    DodgeRefresh,
    /// Shield parry a second time this turn.
    SecondParry,
    /// Bonus to a fear or terror resistance roll.
    FearBonus,
}

impl fmt::Display for AbilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AbilityTag::DodgeBonus => "dodge bonus",
            AbilityTag::DodgeRefresh => "dodge refresh",
            AbilityTag::SecondParry => "second parry",
            AbilityTag::FearBonus => "fear bonus",
        };
        write!(f, "{name}")
    }
}

/// Yes/no gate for spending a resource. A `true` answer has already paid.
pub trait ResourceGate: Send + Sync {
    /// Could the character pay for `tag` right now? Never mutates.
    fn can_activate(&self, character: &Character, tag: AbilityTag) -> bool;

    /// Ask, and on consent deduct the cost from the character.
    fn try_activate<'a>(
        &'a self,
        character: &'a mut Character,
        tag: AbilityTag,
    ) -> BoxFuture<'a, Result<bool, BrokerError>>;
}

/// A gate that never opens. Default for callers without a resource system.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceGate for NoResources {
    fn can_activate(&self, _character: &Character, _tag: AbilityTag) -> bool {
        false
    }

    fn try_activate<'a>(
        &'a self,
        _character: &'a mut Character,
        _tag: AbilityTag,
    ) -> BoxFuture<'a, Result<bool, BrokerError>> {
        Box::pin(async { Ok(false) })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PerkCost {
    pub perk: Perk,
    pub energy: u32,
    pub label: &'static str,
}

lazy_static::lazy_static! {
    /// Which perk pays for which ability, and what it costs.
    pub static ref PERK_TABLE: HashMap<AbilityTag, PerkCost> = {
        let mut table = HashMap::new();
        table.insert(AbilityTag::DodgeBonus, PerkCost {
            perk: Perk::QuickDodge,
            energy: 1,
            label: "Quick Dodge",
        });
        table.insert(AbilityTag::DodgeRefresh, PerkCost {
            perk: Perk::Evasive,
            energy: 1,
            label: "Evasive",
        });
        table.insert(AbilityTag::SecondParry, PerkCost {
            perk: Perk::ShieldWall,
            energy: 1,
            label: "Shield Wall",
        });
        table.insert(AbilityTag::FearBonus, PerkCost {
            perk: Perk::Steadfast,
            energy: 1,
            label: "Steadfast",
        });
        table
    };
}

/// Hero perks paid for with energy. Asks the player before spending.
pub struct PerkGate {
    broker: Arc<dyn InteractionBroker>,
}

impl PerkGate {
    pub fn new(broker: Arc<dyn InteractionBroker>) -> Self {
        Self { broker }
    }
}

impl ResourceGate for PerkGate {
    fn can_activate(&self, character: &Character, tag: AbilityTag) -> bool {
        let (Some(hero), Some(cost)) = (character.hero_data(), PERK_TABLE.get(&tag)) else {
            return false;
        };
        hero.perks.contains(&cost.perk) && hero.energy >= cost.energy
    }

    fn try_activate<'a>(
        &'a self,
        character: &'a mut Character,
        tag: AbilityTag,
    ) -> BoxFuture<'a, Result<bool, BrokerError>> {
        Box::pin(async move {
            if !self.can_activate(character, tag) {
                return Ok(false);
            }
            let Some(cost) = PERK_TABLE.get(&tag) else {
                return Ok(false);
            };

            let prompt = format!(
                "{}: spend {} energy on {} ({})?",
                character.name, cost.energy, cost.label, tag
            );
            let choice = self
                .broker
                .request_choice(
                    ChoiceRequest::new(prompt, vec!["Spend".to_string(), "Decline".to_string()])
                        .for_character(character.id),
                )
                .await?;
            if choice != 0 {
                debug!(character = %character.name, %tag, "perk declined");
                return Ok(false);
            }

            if let Some(hero) = character.hero_data_mut() {
                hero.energy -= cost.energy;
                info!(perk = cost.label, energy_left = hero.energy, "perk spent");
            }
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{create_sample_hero, create_sample_monster};
    use crate::testing::ScriptedBroker;

    fn hero_with_perk(perk: Perk) -> Character {
        let mut hero = create_sample_hero("Aldric");
        if let Some(data) = hero.hero_data_mut() {
            data.perks.insert(perk);
            data.energy = 1;
        }
        hero
    }

    #[tokio::test]
    async fn test_spend_on_consent() {
        let broker = Arc::new(ScriptedBroker::new().with_choices([0]));
        let gate = PerkGate::new(broker.clone());
        let mut hero = hero_with_perk(Perk::ShieldWall);

        assert!(gate.can_activate(&hero, AbilityTag::SecondParry));
        assert!(gate
            .try_activate(&mut hero, AbilityTag::SecondParry)
            .await
            .unwrap());
        assert_eq!(hero.hero_data().unwrap().energy, 0);
        assert!(!gate.can_activate(&hero, AbilityTag::SecondParry));
        assert_eq!(broker.choices_asked(), 1);
        let prompts = broker.choice_prompts();
        assert!(prompts[0].starts_with("Aldric: spend 1 energy"), "{}", prompts[0]);
    }

    #[tokio::test]
    async fn test_decline_keeps_energy() {
        let broker = Arc::new(ScriptedBroker::new().with_choices([1]));
        let gate = PerkGate::new(broker);
        let mut hero = hero_with_perk(Perk::QuickDodge);

        assert!(!gate
            .try_activate(&mut hero, AbilityTag::DodgeBonus)
            .await
            .unwrap());
        assert_eq!(hero.hero_data().unwrap().energy, 1);
    }

    #[tokio::test]
    async fn test_unknown_perk_never_asks() {
        let broker = Arc::new(ScriptedBroker::new());
        let gate = PerkGate::new(broker.clone());
        let mut hero = hero_with_perk(Perk::Steadfast);

        assert!(!gate
            .try_activate(&mut hero, AbilityTag::DodgeRefresh)
            .await
            .unwrap());
        assert_eq!(broker.choices_asked(), 0);
    }

    #[tokio::test]
    async fn test_monsters_have_no_perks() {
        let gate = PerkGate::new(Arc::new(ScriptedBroker::new()));
        let mut goblin = create_sample_monster("Goblin");
        assert!(!gate.can_activate(&goblin, AbilityTag::DodgeBonus));
        assert!(!gate
            .try_activate(&mut goblin, AbilityTag::DodgeBonus)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_no_resources() {
        let mut hero = hero_with_perk(Perk::QuickDodge);
        assert!(!NoResources.can_activate(&hero, AbilityTag::DodgeBonus));
        assert!(!NoResources
            .try_activate(&mut hero, AbilityTag::DodgeBonus)
            .await
            .unwrap());
    }
}
