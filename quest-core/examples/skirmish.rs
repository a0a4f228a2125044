//! A short skirmish between a hero and a goblin, rolled automatically.
//!
//! Run with: `RUST_LOG=quest_core=debug cargo run -p quest-core --example skirmish`

use quest_core::{
    create_sample_hero, create_sample_monster, ActiveStatusEffect, AutoBroker, DamageAmount,
    DefenseResolver, PerkGate, RemovalTrigger, Stance, StatusEffectEngine, StatusEffectKind,
    StdRandomness,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(7);
    let randomness = Arc::new(StdRandomness::seeded(seed));
    let broker = Arc::new(AutoBroker::new(randomness.clone()));
    let gate = Arc::new(PerkGate::new(broker.clone()));

    let defense = DefenseResolver::new(broker.clone(), randomness.clone()).with_gate(gate.clone());
    let effects = StatusEffectEngine::new(broker, randomness).with_gate(gate);

    let mut hero = create_sample_hero("Kestrel");
    let mut goblin = create_sample_monster("Goblin Shaman");
    hero.stance = Stance::Parry;

    println!("=== Skirmish (seed {seed}) ===\n");

    for turn in 1..=4 {
        println!("--- Turn {turn} ---");
        hero.start_turn();
        goblin.start_turn();

        let report = effects.process_active_effects(&mut hero).await?;
        for message in &report.messages {
            println!("  {message}");
        }
        if hero.is_dead() {
            println!("  {} has fallen.", hero.name);
            break;
        }

        // The goblin swings; the hero tries to avoid it.
        let dodge = defense.attempt_dodge(&mut hero, goblin.weapon.as_ref()).await?;
        println!("  {}", dodge.message);
        if !dodge.success {
            let block = defense.attempt_shield_parry(&mut hero, 6).await?;
            println!("  {}", block.message);
            if block.remaining_damage > 0 || !block.success {
                let hurt = if block.success { block.remaining_damage } else { 6 };
                let lost = hero.take_damage((hurt - hero.armour).max(0));
                println!("  {} takes {lost} damage.", hero.name);
            }
        }

        // The shaman's curse.
        let curse = ActiveStatusEffect::for_turns(StatusEffectKind::Poisoned, 2)
            .with_damage(DamageAmount::Dice("1d2".to_string()))
            .with_source(goblin.name.clone());
        let applied = effects
            .attempt_apply(&mut hero, curse, Some(&goblin), None)
            .await?;
        println!("  {}", applied.message);

        // The hero's riposte.
        goblin.stance = Stance::Parry;
        let parry = defense.attempt_weapon_parry(&mut goblin).await?;
        println!("  {}", parry.message);
        println!(
            "  {} HP {}/{}, {} HP {}/{}\n",
            hero.name,
            hero.hit_points.current,
            hero.hit_points.maximum,
            goblin.name,
            goblin.hit_points.current,
            goblin.hit_points.maximum
        );
    }

    let cleared = effects.fire_trigger(&mut hero, RemovalTrigger::EndOfBattle);
    println!("Battle over. Cleared: {cleared:?}");
    println!("Still active: {:?}", hero.status_effects.iter().map(|e| e.kind).collect::<Vec<_>>());
    Ok(())
}
