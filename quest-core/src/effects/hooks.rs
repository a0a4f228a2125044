//! Seams the status engine calls out through when an effect hurts or heals.

use crate::character::{Character, Consumable};
use tracing::debug;

/// Applies damage dealt by a ticking effect. Returns HP actually lost.
pub trait DamageSink: Send + Sync {
    fn apply_damage(&self, character: &mut Character, amount: i32, ignore_armor: bool) -> i32;
}

/// Default sink: armour soaks damage unless the effect ignores it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArmourDamage;

impl DamageSink for ArmourDamage {
    fn apply_damage(&self, character: &mut Character, amount: i32, ignore_armor: bool) -> i32 {
        let soaked = if ignore_armor {
            amount
        } else {
            (amount - character.armour).max(0)
        };
        let lost = character.take_damage(soaked);
        debug!(character = %character.name, amount, soaked, lost, ignore_armor, "effect damage");
        lost
    }
}

/// Offered a healing item when a hero is bleeding out.
pub trait HealingItemHook: Send + Sync {
    fn use_healing_item(&self, character: &mut Character, item: &Consumable);
}

/// Ignores the offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHealingHook;

impl HealingItemHook for NoHealingHook {
    fn use_healing_item(&self, _character: &mut Character, _item: &Consumable) {}
}

impl<F> HealingItemHook for F
where
    F: Fn(&mut Character, &Consumable) + Send + Sync,
{
    fn use_healing_item(&self, character: &mut Character, item: &Consumable) {
        self(character, item)
    }
}
