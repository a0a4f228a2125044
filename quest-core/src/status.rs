//! Status effect records.
//!
//! An [`ActiveStatusEffect`] is what a character carries: the kind, how long
//! it lasts, and whatever data the kind needs (stat curses, tick damage,
//! removal triggers). The engine that applies and ticks them lives in
//! [`crate::effects`].

use crate::character::{BasicStat, Skill};
use crate::dice::{DiceError, RandomnessProvider};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Kinds
// ============================================================================

/// Every effect a character can carry. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusEffectKind {
    // Afflictions
    Poisoned,
    Diseased,
    FireBurning,
    AcidBurning,
    PoisonGas,
    Stunned,
    Entangled,
    Incapacitated,
    Petrified,
    Prone,
    BleedingOut,

    // Monster specials
    Seduce,
    Bellow,
    BeingSwallowed,
    Swallowed,

    // Traps
    Pit,
    Caged,
    DetectedMimic,

    // Psychological
    Fear,
    Terror,
    Frenzy,

    // Curses and buffs
    Cursed,
    Weakened,
    Slowed,
    Blessed,
    MetheiasWard,
    LitanyOfMetheia,
    PowerOfTheGods,
    ProtectiveResolve,
}

impl StatusEffectKind {
    pub fn name(&self) -> &'static str {
        match self {
            StatusEffectKind::Poisoned => "Poisoned",
            StatusEffectKind::Diseased => "Diseased",
            StatusEffectKind::FireBurning => "Burning",
            StatusEffectKind::AcidBurning => "Acid Burn",
            StatusEffectKind::PoisonGas => "Poison Gas",
            StatusEffectKind::Stunned => "Stunned",
            StatusEffectKind::Entangled => "Entangled",
            StatusEffectKind::Incapacitated => "Incapacitated",
            StatusEffectKind::Petrified => "Petrified",
            StatusEffectKind::Prone => "Prone",
            StatusEffectKind::BleedingOut => "Bleeding Out",
            StatusEffectKind::Seduce => "Seduced",
            StatusEffectKind::Bellow => "Bellow",
            StatusEffectKind::BeingSwallowed => "Being Swallowed",
            StatusEffectKind::Swallowed => "Swallowed",
            StatusEffectKind::Pit => "In a Pit",
            StatusEffectKind::Caged => "Caged",
            StatusEffectKind::DetectedMimic => "Held by Mimic",
            StatusEffectKind::Fear => "Afraid",
            StatusEffectKind::Terror => "Terrified",
            StatusEffectKind::Frenzy => "Frenzy",
            StatusEffectKind::Cursed => "Cursed",
            StatusEffectKind::Weakened => "Weakened",
            StatusEffectKind::Slowed => "Slowed",
            StatusEffectKind::Blessed => "Blessed",
            StatusEffectKind::MetheiasWard => "Metheia's Ward",
            StatusEffectKind::LitanyOfMetheia => "Litany of Metheia",
            StatusEffectKind::PowerOfTheGods => "Power of the Gods",
            StatusEffectKind::ProtectiveResolve => "Protective Resolve",
        }
    }

    /// Effects that leave the character lying down.
    pub fn causes_prone(&self) -> bool {
        matches!(self, StatusEffectKind::Prone)
    }

    /// Effects that stop the character from dodging or shield parrying.
    pub fn blocks_active_defense(&self) -> bool {
        matches!(self, StatusEffectKind::Frenzy)
    }
}

impl fmt::Display for StatusEffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Attached data
// ============================================================================

/// How long an effect lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectDuration {
    /// Remaining turns. Reaching zero removes the effect (except where the
    /// kind manages its own countdown).
    Turns(u32),
    /// Lasts until cured or removed by a trigger.
    UntilCured,
}

impl EffectDuration {
    pub fn remaining(&self) -> Option<u32> {
        match self {
            EffectDuration::Turns(n) => Some(*n),
            EffectDuration::UntilCured => None,
        }
    }

    /// Count one turn down. Returns true when the count has reached zero.
    pub fn tick(&mut self) -> bool {
        match self {
            EffectDuration::Turns(n) => {
                *n = n.saturating_sub(1);
                *n == 0
            }
            EffectDuration::UntilCured => false,
        }
    }
}

impl fmt::Display for EffectDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectDuration::Turns(1) => write!(f, "1 turn"),
            EffectDuration::Turns(n) => write!(f, "{n} turns"),
            EffectDuration::UntilCured => write!(f, "until cured"),
        }
    }
}

/// External events that clear flagged effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalTrigger {
    EndOfBattle,
    EndOfDungeon,
    EndOfDay,
}

/// Which external events clear an effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalFlags {
    pub after_this_combat: bool,
    pub after_next_battle: bool,
    pub end_of_dungeon: bool,
    pub end_of_day: bool,
}

/// Signed change to a basic stat while the effect is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    pub stat: BasicStat,
    pub amount: i32,
}

/// Signed change to a skill while the effect is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDelta {
    pub skill: Skill,
    pub amount: i32,
}

/// Damage dealt by a ticking effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageAmount {
    Fixed(i32),
    Dice(String),
}

impl DamageAmount {
    pub fn resolve(&self, rng: &dyn RandomnessProvider) -> Result<i32, DiceError> {
        match self {
            DamageAmount::Fixed(n) => Ok(*n),
            DamageAmount::Dice(notation) => rng.roll_expression(notation),
        }
    }
}

// ============================================================================
// Active effect
// ============================================================================

/// A status effect carried by a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStatusEffect {
    pub kind: StatusEffectKind,
    pub duration: EffectDuration,
    pub stat_delta: Option<StatDelta>,
    pub skill_delta: Option<SkillDelta>,
    pub to_hit_penalty: i32,
    pub damage: Option<DamageAmount>,
    pub removal: RemovalFlags,
    pub source: String,
}

impl ActiveStatusEffect {
    pub fn new(kind: StatusEffectKind, duration: EffectDuration) -> Self {
        Self {
            kind,
            duration,
            stat_delta: None,
            skill_delta: None,
            to_hit_penalty: 0,
            damage: None,
            removal: RemovalFlags::default(),
            source: String::new(),
        }
    }

    pub fn for_turns(kind: StatusEffectKind, turns: u32) -> Self {
        Self::new(kind, EffectDuration::Turns(turns))
    }

    pub fn until_cured(kind: StatusEffectKind) -> Self {
        Self::new(kind, EffectDuration::UntilCured)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_stat_delta(mut self, stat: BasicStat, amount: i32) -> Self {
        self.stat_delta = Some(StatDelta { stat, amount });
        self
    }

    pub fn with_skill_delta(mut self, skill: Skill, amount: i32) -> Self {
        self.skill_delta = Some(SkillDelta { skill, amount });
        self
    }

    pub fn with_to_hit_penalty(mut self, penalty: i32) -> Self {
        self.to_hit_penalty = penalty;
        self
    }

    pub fn with_damage(mut self, damage: DamageAmount) -> Self {
        self.damage = Some(damage);
        self
    }

    pub fn remove_after_combat(mut self) -> Self {
        self.removal.after_this_combat = true;
        self
    }

    pub fn remove_after_next_battle(mut self) -> Self {
        self.removal.after_next_battle = true;
        self
    }

    pub fn remove_at_end_of_dungeon(mut self) -> Self {
        self.removal.end_of_dungeon = true;
        self
    }

    pub fn remove_at_end_of_day(mut self) -> Self {
        self.removal.end_of_day = true;
        self
    }

    /// Whether `trigger` clears this effect right now.
    pub fn cleared_by(&self, trigger: RemovalTrigger) -> bool {
        match trigger {
            RemovalTrigger::EndOfBattle => self.removal.after_this_combat,
            RemovalTrigger::EndOfDungeon => {
                self.removal.end_of_dungeon || self.removal.after_this_combat
            }
            RemovalTrigger::EndOfDay => self.removal.end_of_day,
        }
    }
}
