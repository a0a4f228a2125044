//! Which check, if any, stands between an effect and its target.

use crate::character::{BasicStat, Character, CharacterKind, Talent, TestedAttribute};
use crate::config::RulesConfig;
use crate::status::StatusEffectKind;

/// How an incoming effect may be resisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resistance {
    /// Lands without a roll.
    None,
    /// Resisted on a roll-under against `target`.
    Test {
        attribute: TestedAttribute,
        target: i32,
        /// Whether the fear bonus may be bought for this test.
        fear: bool,
    },
    /// Resisted without a roll.
    Automatic(String),
}

fn talent_bonus(character: &Character, talents: &[(Talent, i32)]) -> i32 {
    let Some(hero) = character.hero_data() else {
        return 0;
    };
    talents
        .iter()
        .filter(|(talent, _)| hero.talents.contains(talent))
        .map(|(_, bonus)| bonus)
        .sum()
}

/// Constitution plus poison talents.
pub fn poison_target(character: &Character) -> i32 {
    character.effective_stat(BasicStat::Constitution)
        + talent_bonus(
            character,
            &[(Talent::PoisonResistant, 10), (Talent::Hardy, 5)],
        )
}

/// Constitution plus disease talents.
pub fn disease_target(character: &Character) -> i32 {
    character.effective_stat(BasicStat::Constitution)
        + talent_bonus(
            character,
            &[(Talent::DiseaseResistant, 10), (Talent::Hardy, 5)],
        )
}

/// Resolve, lowered by the threatening monster's fear rating.
pub fn fear_target(character: &Character, monster: Option<&Character>) -> i32 {
    let rating = match monster.map(|m| &m.kind) {
        Some(CharacterKind::Monster(data)) => data.fear_rating,
        _ => 0,
    };
    character.effective_stat(BasicStat::Resolve) - rating
}

/// Has this hero already overcome fear of `monster`?
pub fn remembers(character: &Character, monster: &Character) -> bool {
    character
        .hero_data()
        .is_some_and(|hero| hero.fear_memory.iter().any(|name| *name == monster.name))
}

/// Work out the check for `kind` as it arrives, before any conversion.
pub fn check_for(
    kind: StatusEffectKind,
    target: &Character,
    monster: Option<&Character>,
    config: &RulesConfig,
) -> Resistance {
    let stat = |stat: BasicStat, value: i32| Resistance::Test {
        attribute: TestedAttribute::Stat(stat),
        target: value,
        fear: false,
    };

    match kind {
        StatusEffectKind::Poisoned => stat(BasicStat::Constitution, poison_target(target)),
        StatusEffectKind::Diseased => stat(BasicStat::Constitution, disease_target(target)),
        StatusEffectKind::Fear => {
            if let Some(monster) = monster.filter(|m| remembers(target, m)) {
                return Resistance::Automatic(format!(
                    "{} has faced {} before and is not afraid.",
                    target.name, monster.name
                ));
            }
            Resistance::Test {
                attribute: TestedAttribute::Stat(BasicStat::Resolve),
                target: fear_target(target, monster),
                fear: true,
            }
        }
        StatusEffectKind::Terror => Resistance::Test {
            attribute: TestedAttribute::Stat(BasicStat::Resolve),
            target: fear_target(target, monster) - config.terror_penalty,
            fear: true,
        },
        StatusEffectKind::Incapacitated | StatusEffectKind::Petrified | StatusEffectKind::Bellow => {
            stat(BasicStat::Resolve, target.effective_stat(BasicStat::Resolve))
        }
        StatusEffectKind::Prone => stat(
            BasicStat::Dexterity,
            target.effective_stat(BasicStat::Dexterity),
        ),
        _ => Resistance::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{create_sample_hero, create_sample_monster, MonsterData};

    fn ogre() -> Character {
        let mut ogre = create_sample_monster("Ogre");
        ogre.kind = CharacterKind::Monster(MonsterData { fear_rating: 10 });
        ogre
    }

    #[test]
    fn test_poison_talents_stack() {
        let mut hero = create_sample_hero("Maren");
        assert_eq!(poison_target(&hero), 50);
        if let Some(data) = hero.hero_data_mut() {
            data.talents.insert(Talent::PoisonResistant);
            data.talents.insert(Talent::Hardy);
        }
        assert_eq!(poison_target(&hero), 65);
        assert_eq!(disease_target(&hero), 55);
    }

    #[test]
    fn test_fear_and_terror_targets() {
        let hero = create_sample_hero("Maren");
        let config = RulesConfig::default();
        assert_eq!(
            check_for(StatusEffectKind::Fear, &hero, Some(&ogre()), &config),
            Resistance::Test {
                attribute: TestedAttribute::Stat(BasicStat::Resolve),
                target: 40,
                fear: true,
            }
        );
        assert!(matches!(
            check_for(StatusEffectKind::Terror, &hero, Some(&ogre()), &config),
            Resistance::Test { target: 20, .. }
        ));
    }

    #[test]
    fn test_remembered_fear_is_automatic_but_terror_is_not() {
        let mut hero = create_sample_hero("Maren");
        if let Some(data) = hero.hero_data_mut() {
            data.fear_memory.push("Ogre".to_string());
        }
        let config = RulesConfig::default();
        assert!(matches!(
            check_for(StatusEffectKind::Fear, &hero, Some(&ogre()), &config),
            Resistance::Automatic(_)
        ));
        assert!(matches!(
            check_for(StatusEffectKind::Terror, &hero, Some(&ogre()), &config),
            Resistance::Test { .. }
        ));
    }

    #[test]
    fn test_unchecked_kinds() {
        let hero = create_sample_hero("Maren");
        let config = RulesConfig::default();
        for kind in [
            StatusEffectKind::FireBurning,
            StatusEffectKind::Entangled,
            StatusEffectKind::Stunned,
            StatusEffectKind::Blessed,
        ] {
            assert_eq!(check_for(kind, &hero, None, &config), Resistance::None);
        }
        assert!(matches!(
            check_for(StatusEffectKind::Prone, &hero, None, &config),
            Resistance::Test {
                attribute: TestedAttribute::Stat(BasicStat::Dexterity),
                target: 60,
                ..
            }
        ));
    }
}
