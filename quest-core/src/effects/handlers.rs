//! Per-turn behaviour of each effect kind.
//!
//! Handlers are pure: they look at the character and the effect and return a
//! [`TickPlan`]. The engine rolls any test the plan asks for and then carries
//! out the chosen [`EffectOutcome`]. Kinds without an entry only count down.

use crate::character::{BasicStat, Character, TestedAttribute};
use crate::config::RulesConfig;
use crate::effects::resistance;
use crate::status::{ActiveStatusEffect, DamageAmount, EffectDuration, StatusEffectKind};
use std::collections::HashMap;

/// What a handler gets to look at.
pub struct TickContext<'a> {
    pub character: &'a Character,
    pub effect: &'a ActiveStatusEffect,
    pub config: &'a RulesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickDamage {
    pub amount: DamageAmount,
    pub ignore_armor: bool,
}

/// How the effect's duration moves after this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DurationRule {
    /// Positive turn counts go down by one; zero removes the effect.
    #[default]
    Generic,
    /// The handler counted down itself.
    Managed {
        next: EffectDuration,
        expire_at_zero: bool,
    },
}

/// Changes a tick makes, applied by the engine in field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectOutcome {
    pub damage: Option<TickDamage>,
    pub heal: i32,
    pub ap_loss: i32,
    pub zero_ap: bool,
    pub clear_position: bool,
    pub use_healing_item: bool,
    /// Drop this effect now, skipping the duration rule.
    pub remove: bool,
    /// Effect to add in its place.
    pub add: Option<ActiveStatusEffect>,
    pub duration: DurationRule,
    pub message: Option<String>,
}

impl EffectOutcome {
    fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickPlan {
    Apply(EffectOutcome),
    /// Roll under `target`, then apply one of the two outcomes.
    Test {
        attribute: TestedAttribute,
        target: i32,
        prompt: String,
        on_success: EffectOutcome,
        on_failure: EffectOutcome,
    },
}

pub type TickHandler = fn(&TickContext<'_>) -> TickPlan;

fn damage_or_default(ctx: &TickContext<'_>) -> DamageAmount {
    ctx.effect
        .damage
        .clone()
        .unwrap_or(DamageAmount::Fixed(ctx.config.default_tick_damage))
}

fn piercing(amount: DamageAmount) -> Option<TickDamage> {
    Some(TickDamage {
        amount,
        ignore_armor: true,
    })
}

fn stat_test(
    stat: BasicStat,
    target: i32,
    prompt: String,
    on_success: EffectOutcome,
    on_failure: EffectOutcome,
) -> TickPlan {
    TickPlan::Test {
        attribute: TestedAttribute::Stat(stat),
        target,
        prompt,
        on_success,
        on_failure,
    }
}

fn held_fast() -> EffectOutcome {
    EffectOutcome {
        zero_ap: true,
        ..EffectOutcome::default()
    }
}

fn poisoned(ctx: &TickContext<'_>) -> TickPlan {
    let name = &ctx.character.name;
    stat_test(
        BasicStat::Constitution,
        resistance::poison_target(ctx.character),
        format!("{name} fights off the poison"),
        EffectOutcome::default().with_message(format!("{name} shrugs off the poison this turn.")),
        EffectOutcome {
            damage: piercing(damage_or_default(ctx)),
            ..EffectOutcome::default()
        }
        .with_message(format!("Poison courses through {name}.")),
    )
}

fn burning(ctx: &TickContext<'_>) -> TickPlan {
    TickPlan::Apply(
        EffectOutcome {
            damage: piercing(damage_or_default(ctx)),
            ..EffectOutcome::default()
        }
        .with_message(format!("{} burns.", ctx.character.name)),
    )
}

fn poison_gas(ctx: &TickContext<'_>) -> TickPlan {
    let amount = ctx
        .effect
        .damage
        .clone()
        .unwrap_or_else(|| DamageAmount::Dice(ctx.config.poison_gas_damage.clone()));
    TickPlan::Apply(
        EffectOutcome {
            damage: piercing(amount),
            ..EffectOutcome::default()
        }
        .with_message(format!("{} chokes on the gas.", ctx.character.name)),
    )
}

fn stunned(ctx: &TickContext<'_>) -> TickPlan {
    TickPlan::Apply(
        EffectOutcome {
            ap_loss: 1,
            ..EffectOutcome::default()
        }
        .with_message(format!("{} is stunned and loses an action point.", ctx.character.name)),
    )
}

/// Damage equals the turns left, so the grip hurts most when fresh.
fn entangled(ctx: &TickContext<'_>) -> TickPlan {
    let (damage, next) = match ctx.effect.duration {
        EffectDuration::Turns(n) => (n as i32, EffectDuration::Turns(n.saturating_sub(1))),
        EffectDuration::UntilCured => (1, EffectDuration::UntilCured),
    };
    TickPlan::Apply(
        EffectOutcome {
            damage: (damage > 0).then_some(TickDamage {
                amount: DamageAmount::Fixed(damage),
                ignore_armor: false,
            }),
            duration: DurationRule::Managed {
                next,
                expire_at_zero: true,
            },
            ..EffectOutcome::default()
        }
        .with_message(format!("The bindings tighten around {}.", ctx.character.name)),
    )
}

fn resolve_to_break_free(ctx: &TickContext<'_>) -> TickPlan {
    let name = &ctx.character.name;
    let kind = ctx.effect.kind;
    stat_test(
        BasicStat::Resolve,
        ctx.character.effective_stat(BasicStat::Resolve),
        format!("{name} tries to shake off {kind}"),
        EffectOutcome {
            remove: true,
            ..EffectOutcome::default()
        }
        .with_message(format!("{name} is no longer {kind}.")),
        held_fast().with_message(format!("{name} is {kind} and cannot act.")),
    )
}

fn cannot_act(ctx: &TickContext<'_>) -> TickPlan {
    TickPlan::Apply(held_fast().with_message(format!(
        "{} is {} and cannot act.",
        ctx.character.name, ctx.effect.kind
    )))
}

/// Escape gets harder once the countdown runs out.
fn being_swallowed(ctx: &TickContext<'_>) -> TickPlan {
    let name = &ctx.character.name;
    let strength = ctx.character.effective_stat(BasicStat::Strength);
    let escaped = EffectOutcome {
        remove: true,
        ..EffectOutcome::default()
    }
    .with_message(format!("{name} struggles free."));

    match ctx.effect.duration {
        EffectDuration::Turns(0) => stat_test(
            BasicStat::Strength,
            strength / 2,
            format!("{name} makes a last attempt to escape"),
            escaped,
            EffectOutcome {
                zero_ap: true,
                clear_position: true,
                remove: true,
                add: Some(
                    ActiveStatusEffect::until_cured(StatusEffectKind::Swallowed)
                        .with_source(ctx.effect.source.clone()),
                ),
                ..EffectOutcome::default()
            }
            .with_message(format!("{name} has been swallowed whole.")),
        ),
        duration => {
            let next = match duration {
                EffectDuration::Turns(n) => EffectDuration::Turns(n - 1),
                EffectDuration::UntilCured => EffectDuration::UntilCured,
            };
            stat_test(
                BasicStat::Strength,
                strength,
                format!("{name} struggles against being swallowed"),
                escaped,
                EffectOutcome {
                    zero_ap: true,
                    duration: DurationRule::Managed {
                        next,
                        expire_at_zero: false,
                    },
                    ..EffectOutcome::default()
                }
                .with_message(format!("{name} is being swallowed.")),
            )
        }
    }
}

fn pit(ctx: &TickContext<'_>) -> TickPlan {
    let name = &ctx.character.name;
    stat_test(
        BasicStat::Dexterity,
        ctx.character.effective_stat(BasicStat::Dexterity),
        format!("{name} climbs out of the pit"),
        EffectOutcome {
            zero_ap: true,
            remove: true,
            ..EffectOutcome::default()
        }
        .with_message(format!("{name} climbs out of the pit.")),
        held_fast().with_message(format!("{name} is stuck in the pit.")),
    )
}

fn metheias_ward(ctx: &TickContext<'_>) -> TickPlan {
    if !ctx.character.hit_points.is_wounded() {
        return TickPlan::Apply(EffectOutcome::default());
    }
    TickPlan::Apply(EffectOutcome {
        heal: 1,
        ..EffectOutcome::default()
    })
}

fn litany_of_metheia(ctx: &TickContext<'_>) -> TickPlan {
    if !ctx.character.hit_points.is_wounded() {
        return TickPlan::Apply(EffectOutcome::default());
    }
    let name = &ctx.character.name;
    stat_test(
        BasicStat::Resolve,
        ctx.character.effective_stat(BasicStat::Resolve),
        format!("{name} recites the litany"),
        EffectOutcome {
            heal: 1,
            ..EffectOutcome::default()
        },
        EffectOutcome::default(),
    )
}

fn bleeding_out(ctx: &TickContext<'_>) -> TickPlan {
    TickPlan::Apply(
        EffectOutcome {
            use_healing_item: true,
            zero_ap: true,
            ..EffectOutcome::default()
        }
        .with_message(format!("{} is bleeding out.", ctx.character.name)),
    )
}

lazy_static::lazy_static! {
    static ref TICK_HANDLERS: HashMap<StatusEffectKind, TickHandler> = {
        use StatusEffectKind::*;
        let mut table: HashMap<StatusEffectKind, TickHandler> = HashMap::new();
        table.insert(Poisoned, poisoned);
        table.insert(FireBurning, burning);
        table.insert(AcidBurning, burning);
        table.insert(PoisonGas, poison_gas);
        table.insert(Stunned, stunned);
        table.insert(Entangled, entangled);
        table.insert(Seduce, resolve_to_break_free);
        table.insert(Incapacitated, resolve_to_break_free);
        table.insert(Swallowed, cannot_act);
        table.insert(DetectedMimic, cannot_act);
        table.insert(Caged, cannot_act);
        table.insert(BeingSwallowed, being_swallowed);
        table.insert(Pit, pit);
        table.insert(MetheiasWard, metheias_ward);
        table.insert(LitanyOfMetheia, litany_of_metheia);
        table.insert(BleedingOut, bleeding_out);
        table
    };
}

/// Look up the handler for the effect in `ctx` and run it.
pub fn plan_tick(ctx: &TickContext<'_>) -> TickPlan {
    match TICK_HANDLERS.get(&ctx.effect.kind) {
        Some(handler) => handler(ctx),
        None => TickPlan::Apply(EffectOutcome::default()),
    }
}
