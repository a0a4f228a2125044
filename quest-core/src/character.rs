//! The character aggregate shared by heroes and monsters.
//!
//! Both variants expose the same combat surface (stats, skills, HP, AP,
//! stance, active effects). Hero- and monster-only data sits in
//! [`CharacterKind`] and is reached by pattern matching.

use crate::status::{ActiveStatusEffect, StatusEffectKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Stats and Skills
// ============================================================================

/// Basic stats. Percentile stats are tested with a d100 roll-under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicStat {
    Strength,
    Constitution,
    Dexterity,
    Wisdom,
    Resolve,
    Luck,
    ActionPoints,
    Move,
}

impl BasicStat {
    pub fn name(&self) -> &'static str {
        match self {
            BasicStat::Strength => "Strength",
            BasicStat::Constitution => "Constitution",
            BasicStat::Dexterity => "Dexterity",
            BasicStat::Wisdom => "Wisdom",
            BasicStat::Resolve => "Resolve",
            BasicStat::Luck => "Luck",
            BasicStat::ActionPoints => "Action Points",
            BasicStat::Move => "Move",
        }
    }
}

impl fmt::Display for BasicStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    CombatSkill,
    RangedSkill,
    Dodge,
    Perception,
    PickLocks,
    Heal,
    ArcaneArts,
    BattlePrayers,
}

impl Skill {
    pub fn name(&self) -> &'static str {
        match self {
            Skill::CombatSkill => "Combat Skill",
            Skill::RangedSkill => "Ranged Skill",
            Skill::Dodge => "Dodge",
            Skill::Perception => "Perception",
            Skill::PickLocks => "Pick Locks",
            Skill::Heal => "Heal",
            Skill::ArcaneArts => "Arcane Arts",
            Skill::BattlePrayers => "Battle Prayers",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a roll is testing. Carried on roll requests so the broker can
/// pre-fill or validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestedAttribute {
    Stat(BasicStat),
    Skill(Skill),
}

impl fmt::Display for TestedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestedAttribute::Stat(s) => write!(f, "{s}"),
            TestedAttribute::Skill(s) => write!(f, "{s}"),
        }
    }
}

/// Tactical posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Stance {
    #[default]
    Normal,
    Parry,
    Overwatch,
    Aiming,
    Prone,
}

// ============================================================================
// Health
// ============================================================================

/// Hit points, always within `[0, maximum]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub maximum: i32,
}

impl HitPoints {
    pub fn new(maximum: i32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Remove HP, clamping at zero. Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let old = self.current;
        self.current = (self.current - amount.max(0)).clamp(0, self.maximum);
        old - self.current
    }

    /// Restore HP, clamping at maximum. Returns the HP actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let old = self.current;
        self.current = (self.current + amount.max(0)).clamp(0, self.maximum);
        self.current - old
    }

    pub fn is_wounded(&self) -> bool {
        self.current < self.maximum
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

// ============================================================================
// Equipment
// ============================================================================

/// A weapon. Durability 0 means broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub melee: bool,
    pub durability: u32,
    pub max_durability: u32,
}

impl Weapon {
    pub fn melee(name: impl Into<String>, durability: u32) -> Self {
        Self {
            name: name.into(),
            melee: true,
            durability,
            max_durability: durability,
        }
    }

    pub fn ranged(name: impl Into<String>, durability: u32) -> Self {
        Self {
            melee: false,
            ..Self::melee(name, durability)
        }
    }

    /// Returns true if this broke the weapon.
    pub fn wear(&mut self, amount: u32) -> bool {
        let was_intact = self.durability > 0;
        self.durability = self.durability.saturating_sub(amount);
        was_intact && self.durability == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shield {
    pub name: String,
    pub defense_value: i32,
    pub durability: u32,
    pub max_durability: u32,
}

impl Shield {
    pub fn new(name: impl Into<String>, defense_value: i32, durability: u32) -> Self {
        Self {
            name: name.into(),
            defense_value,
            durability,
            max_durability: durability,
        }
    }

    /// Returns true if this broke the shield.
    pub fn wear(&mut self, amount: u32) -> bool {
        let was_intact = self.durability > 0;
        self.durability = self.durability.saturating_sub(amount);
        was_intact && self.durability == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsumableKind {
    /// Restores the given dice of HP.
    Healing { amount: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumable {
    pub name: String,
    pub kind: ConsumableKind,
    pub quantity: u32,
}

impl Consumable {
    pub fn healing(name: impl Into<String>, amount: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            kind: ConsumableKind::Healing {
                amount: amount.into(),
            },
            quantity,
        }
    }

    pub fn is_healing(&self) -> bool {
        matches!(self.kind, ConsumableKind::Healing { .. })
    }
}

// ============================================================================
// Variants
// ============================================================================

/// Spendable hero abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Perk {
    /// +20 to a dodge roll.
    QuickDodge,
    /// Dodge again in a battle after a failed dodge.
    Evasive,
    /// A second shield parry in the same turn.
    ShieldWall,
    /// Bonus when resisting fear.
    Steadfast,
}

/// Passive hero bonuses to resistance checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Talent {
    PoisonResistant,
    DiseaseResistant,
    Hardy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeroData {
    pub perks: HashSet<Perk>,
    pub talents: HashSet<Talent>,
    pub energy: u32,
    pub max_energy: u32,
    /// Monsters whose fear this hero has already overcome.
    pub fear_memory: Vec<String>,
    pub consumables: Vec<Consumable>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonsterData {
    /// Subtracted from a hero's Resolve when resisting this monster's fear.
    pub fear_rating: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CharacterKind {
    Hero(HeroData),
    Monster(MonsterData),
}

// ============================================================================
// Character
// ============================================================================

/// A combatant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub kind: CharacterKind,

    pub stats: HashMap<BasicStat, i32>,
    pub skills: HashMap<Skill, i32>,
    pub hit_points: HitPoints,
    pub armour: i32,
    pub current_ap: i32,
    pub stance: Stance,
    pub position: Option<Position>,
    pub status_effects: Vec<ActiveStatusEffect>,

    pub dead: bool,
    pub has_dodged_this_battle: bool,
    pub has_parried_this_turn: bool,
    pub vulnerable_after_power_attack: bool,

    pub weapon: Option<Weapon>,
    pub shield: Option<Shield>,
}

impl Character {
    fn with_kind(name: impl Into<String>, kind: CharacterKind) -> Self {
        let mut stats = HashMap::new();
        stats.insert(BasicStat::ActionPoints, 2);
        stats.insert(BasicStat::Move, 4);
        Self {
            id: CharacterId::new(),
            name: name.into(),
            kind,
            stats,
            skills: HashMap::new(),
            hit_points: HitPoints::new(10),
            armour: 0,
            current_ap: 2,
            stance: Stance::Normal,
            position: None,
            status_effects: Vec::new(),
            dead: false,
            has_dodged_this_battle: false,
            has_parried_this_turn: false,
            vulnerable_after_power_attack: false,
            weapon: None,
            shield: None,
        }
    }

    pub fn hero(name: impl Into<String>) -> Self {
        Self::with_kind(name, CharacterKind::Hero(HeroData::default()))
    }

    pub fn monster(name: impl Into<String>) -> Self {
        Self::with_kind(name, CharacterKind::Monster(MonsterData::default()))
    }

    pub fn is_hero(&self) -> bool {
        matches!(self.kind, CharacterKind::Hero(_))
    }

    pub fn hero_data(&self) -> Option<&HeroData> {
        match &self.kind {
            CharacterKind::Hero(data) => Some(data),
            CharacterKind::Monster(_) => None,
        }
    }

    pub fn hero_data_mut(&mut self) -> Option<&mut HeroData> {
        match &mut self.kind {
            CharacterKind::Hero(data) => Some(data),
            CharacterKind::Monster(_) => None,
        }
    }

    pub fn with_stat(mut self, stat: BasicStat, value: i32) -> Self {
        self.stats.insert(stat, value);
        if stat == BasicStat::ActionPoints {
            self.current_ap = value;
        }
        self
    }

    pub fn with_skill(mut self, skill: Skill, value: i32) -> Self {
        self.skills.insert(skill, value);
        self
    }

    pub fn with_hit_points(mut self, maximum: i32) -> Self {
        self.hit_points = HitPoints::new(maximum);
        self
    }

    // ------------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------------

    pub fn base_stat(&self, stat: BasicStat) -> i32 {
        self.stats.get(&stat).copied().unwrap_or(0)
    }

    pub fn base_skill(&self, skill: Skill) -> i32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    /// Base stat plus every active effect's stat delta.
    pub fn effective_stat(&self, stat: BasicStat) -> i32 {
        let delta: i32 = self
            .status_effects
            .iter()
            .filter_map(|e| e.stat_delta)
            .filter(|d| d.stat == stat)
            .map(|d| d.amount)
            .sum();
        self.base_stat(stat) + delta
    }

    /// Base skill plus every active effect's skill delta.
    pub fn effective_skill(&self, skill: Skill) -> i32 {
        let delta: i32 = self
            .status_effects
            .iter()
            .filter_map(|e| e.skill_delta)
            .filter(|d| d.skill == skill)
            .map(|d| d.amount)
            .sum();
        self.base_skill(skill) + delta
    }

    /// Total to-hit penalty from active effects.
    pub fn to_hit_penalty(&self) -> i32 {
        self.status_effects.iter().map(|e| e.to_hit_penalty).sum()
    }

    // ------------------------------------------------------------------------
    // Action points
    // ------------------------------------------------------------------------

    pub fn max_ap(&self) -> i32 {
        self.effective_stat(BasicStat::ActionPoints).max(0)
    }

    /// Spend AP, clamped to `[0, max]`. Returns the AP actually spent.
    pub fn spend_ap(&mut self, amount: i32) -> i32 {
        let old = self.current_ap;
        self.current_ap = (self.current_ap - amount.max(0)).clamp(0, self.max_ap());
        old - self.current_ap
    }

    /// Restore AP, clamped to `[0, max]`.
    pub fn restore_ap(&mut self, amount: i32) {
        self.current_ap = (self.current_ap + amount.max(0)).clamp(0, self.max_ap());
    }

    pub fn zero_ap(&mut self) {
        self.current_ap = 0;
    }

    // ------------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------------

    /// Apply damage straight to HP. Reaching 0 kills the character.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        if self.dead {
            return 0;
        }
        let lost = self.hit_points.take_damage(amount);
        if self.hit_points.current == 0 {
            self.dead = true;
        }
        lost
    }

    /// Heal HP. The dead stay dead.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if self.dead {
            return 0;
        }
        self.hit_points.heal(amount)
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    // ------------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------------

    pub fn has_effect(&self, kind: StatusEffectKind) -> bool {
        self.status_effects.iter().any(|e| e.kind == kind)
    }

    pub fn effect(&self, kind: StatusEffectKind) -> Option<&ActiveStatusEffect> {
        self.status_effects.iter().find(|e| e.kind == kind)
    }

    pub fn effect_mut(&mut self, kind: StatusEffectKind) -> Option<&mut ActiveStatusEffect> {
        self.status_effects.iter_mut().find(|e| e.kind == kind)
    }

    /// Vulnerable after a power attack, or in a state that forbids it.
    pub fn cannot_actively_defend(&self) -> bool {
        self.vulnerable_after_power_attack
            || self
                .status_effects
                .iter()
                .any(|e| e.kind.blocks_active_defense())
    }

    pub fn healing_item(&self) -> Option<&Consumable> {
        self.hero_data()?
            .consumables
            .iter()
            .find(|c| c.is_healing() && c.quantity > 0)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Reset per-turn state: full AP, parry available again.
    pub fn start_turn(&mut self) {
        self.current_ap = self.max_ap();
        self.has_parried_this_turn = false;
    }

    /// Reset per-battle state.
    pub fn end_battle(&mut self) {
        self.has_dodged_this_battle = false;
        self.has_parried_this_turn = false;
        self.vulnerable_after_power_attack = false;
    }
}

/// Create a sample hero for testing.
pub fn create_sample_hero(name: &str) -> Character {
    let mut hero = Character::hero(name)
        .with_hit_points(20)
        .with_stat(BasicStat::Strength, 55)
        .with_stat(BasicStat::Constitution, 50)
        .with_stat(BasicStat::Dexterity, 60)
        .with_stat(BasicStat::Wisdom, 45)
        .with_stat(BasicStat::Resolve, 50)
        .with_stat(BasicStat::Luck, 30)
        .with_stat(BasicStat::ActionPoints, 2)
        .with_stat(BasicStat::Move, 4)
        .with_skill(Skill::CombatSkill, 60)
        .with_skill(Skill::RangedSkill, 40)
        .with_skill(Skill::Dodge, 35);
    hero.armour = 2;
    hero.weapon = Some(Weapon::melee("Longsword", 6));
    hero.shield = Some(Shield::new("Heater Shield", 5, 6));
    if let Some(data) = hero.hero_data_mut() {
        data.energy = 1;
        data.max_energy = 1;
        data.consumables
            .push(Consumable::healing("Healing Potion", "1d6", 1));
    }
    hero
}

/// Create a sample monster for testing.
pub fn create_sample_monster(name: &str) -> Character {
    let mut monster = Character::monster(name)
        .with_hit_points(12)
        .with_stat(BasicStat::Strength, 50)
        .with_stat(BasicStat::Constitution, 45)
        .with_stat(BasicStat::Dexterity, 40)
        .with_stat(BasicStat::Resolve, 40)
        .with_stat(BasicStat::ActionPoints, 2)
        .with_skill(Skill::CombatSkill, 45)
        .with_skill(Skill::Dodge, 20);
    monster.armour = 1;
    monster.weapon = Some(Weapon::melee("Rusty Axe", 4));
    monster
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusEffectKind;

    #[test]
    fn test_hit_points_clamp() {
        let mut hp = HitPoints::new(10);
        assert_eq!(hp.take_damage(4), 4);
        assert_eq!(hp.current, 6);
        assert_eq!(hp.heal(10), 4);
        assert_eq!(hp.current, 10);
        assert_eq!(hp.take_damage(50), 10);
        assert_eq!(hp.current, 0);
        // Negative amounts never move HP the other way.
        assert_eq!(hp.take_damage(-3), 0);
        assert_eq!(hp.current, 0);
    }

    #[test]
    fn test_death_is_terminal() {
        let mut hero = create_sample_hero("Brand");
        hero.take_damage(100);
        assert!(hero.is_dead());
        assert_eq!(hero.hit_points.current, 0);
        assert_eq!(hero.heal(5), 0);
        assert_eq!(hero.hit_points.current, 0);
    }

    #[test]
    fn test_ap_clamp() {
        let mut hero = create_sample_hero("Brand");
        assert_eq!(hero.current_ap, 2);
        assert_eq!(hero.spend_ap(5), 2);
        assert_eq!(hero.current_ap, 0);
        hero.restore_ap(10);
        assert_eq!(hero.current_ap, 2);
    }

    #[test]
    fn test_effective_stats_include_deltas() {
        let mut hero = create_sample_hero("Brand");
        hero.status_effects.push(
            ActiveStatusEffect::until_cured(StatusEffectKind::Cursed)
                .with_stat_delta(BasicStat::Strength, -10)
                .with_to_hit_penalty(5),
        );
        hero.status_effects.push(
            ActiveStatusEffect::for_turns(StatusEffectKind::Blessed, 3)
                .with_skill_delta(Skill::Dodge, 10)
                .with_to_hit_penalty(-5),
        );
        assert_eq!(hero.effective_stat(BasicStat::Strength), 45);
        assert_eq!(hero.base_stat(BasicStat::Strength), 55);
        assert_eq!(hero.effective_skill(Skill::Dodge), 45);
        assert_eq!(hero.to_hit_penalty(), 0);
    }

    #[test]
    fn test_frenzy_blocks_active_defense() {
        let mut hero = create_sample_hero("Brand");
        assert!(!hero.cannot_actively_defend());
        hero.status_effects
            .push(ActiveStatusEffect::for_turns(StatusEffectKind::Frenzy, 2));
        assert!(hero.cannot_actively_defend());
    }

    #[test]
    fn test_turn_and_battle_lifecycle() {
        let mut hero = create_sample_hero("Brand");
        hero.zero_ap();
        hero.has_parried_this_turn = true;
        hero.has_dodged_this_battle = true;
        hero.start_turn();
        assert_eq!(hero.current_ap, 2);
        assert!(!hero.has_parried_this_turn);
        assert!(hero.has_dodged_this_battle);
        hero.end_battle();
        assert!(!hero.has_dodged_this_battle);
    }

    #[test]
    fn test_healing_item_lookup() {
        let hero = create_sample_hero("Brand");
        assert_eq!(hero.healing_item().unwrap().name, "Healing Potion");
        let monster = create_sample_monster("Goblin");
        assert!(monster.healing_item().is_none());
    }

    #[test]
    fn test_weapon_wear_reports_break() {
        let mut weapon = Weapon::melee("Dagger", 1);
        assert!(weapon.wear(1));
        assert!(!weapon.wear(1));
        assert_eq!(weapon.durability, 0);
    }
}
