//! Equipment example: equipping and unequipping items on a player
//!
//! This example demonstrates:
//! - Building a registry and service
//! - Syncing max health into a (simulated) live attribute via a binding
//! - Re-applying a source to update its contribution
//! - Unequipping everything under a slot prefix
//!
//! Run with `RUST_LOG=statcore=trace cargo run --example equipment` to see
//! the engine's own logging.

use parking_lot::Mutex;
use statcore::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Stand-in for the game runtime's health attribute.
#[derive(Default)]
struct HealthBar {
    max: Mutex<HashMap<EntityKey, f64>>,
    current: Mutex<HashMap<EntityKey, f64>>,
}

impl AttributeSink for HealthBar {
    fn set_base(&self, entity: EntityKey, value: f64) -> Result<(), String> {
        self.max.lock().insert(entity, value);
        Ok(())
    }

    fn current(&self, entity: EntityKey) -> Option<f64> {
        self.current.lock().get(&entity).copied()
    }

    fn set_current(&self, entity: EntityKey, value: f64) -> Result<(), String> {
        self.current.lock().insert(entity, value);
        Ok(())
    }
}

fn main() -> Result<(), StatError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = Arc::new(StatRegistry::with_defaults());
    let service = StatService::new(registry.clone());

    // Print every change
    service.add_listener(Arc::new(|change: &StatChange| -> Result<(), StatError> {
        println!(
            "  [{}] {}: {:.2} -> {:.2}",
            change.entity, change.stat_id, change.old_value, change.new_value
        );
        Ok(())
    }));

    // Keep the health bar in sync
    let health = Arc::new(HealthBar::default());
    let bindings = Arc::new(StatBindingManager::new());
    let max_health = StatId::new("max_health")?;
    bindings.register(Arc::new(
        AttributeBinding::new(max_health.clone(), health.clone()).clamp_current(true),
    ));
    service.add_listener(bindings);

    let player = EntityKey::random();
    let container = service.get_container(player);
    let armor = StatId::new("armor")?;
    let damage = StatId::new("attack_damage")?;

    println!("Equipping plate chestplate:");
    let chest: StatSourceId = "item:chest:plate".parse()?;
    container.add_modifier(StatModifier::flat(max_health.clone(), chest.clone(), 4.0)?)?;
    container.add_modifier(StatModifier::flat(armor.clone(), chest.clone(), 8.0)?)?;

    println!("\nEquipping sword with sharpness:");
    let sword: StatSourceId = "item:main_hand:fulcrum:sword".parse()?;
    let sharpness = sword.child("enchant")?.child("sharpness")?;
    container.add_modifier(StatModifier::flat(damage.clone(), sword.clone(), 6.0)?)?;
    container.add_modifier(StatModifier::flat(damage.clone(), sharpness.clone(), 1.5)?)?;

    println!("\nRegeneration buff (+10% max health):");
    container.add_modifier(StatModifier::percent_add(
        max_health.clone(),
        "buff:regen".parse()?,
        0.10,
    )?)?;

    println!("\nSharpness upgraded (same source, new value):");
    container.add_modifier(StatModifier::flat(damage.clone(), sharpness, 2.5)?)?;

    // Player is at full health
    health
        .current
        .lock()
        .insert(player, container.final_value(&max_health));

    println!("\n=== Breakdown ===");
    for snapshot in container.debug_view() {
        println!(
            "{} (base {:.2}) = {:.2}",
            snapshot.stat_id, snapshot.base, snapshot.final_value
        );
        for (op, sources) in &snapshot.modifiers {
            for (source, value) in sources {
                println!("  {:<13} {:<45} {:+.2}", op.as_str(), source.as_str(), value);
            }
        }
    }

    println!("\nUnequipping main hand:");
    let removed = container.clear_source_prefix(&"item:main_hand".parse()?)?;
    println!("  removed sources: {:?}", removed);

    println!("\nUnequipping chestplate:");
    container.clear_source(&chest)?;

    let max = container.final_value(&max_health);
    let bar = health.current.lock().get(&player).copied();
    println!("\nMax health now {:.2}, health bar clamped to {:?}", max, bar);

    service.remove_container(&player);
    Ok(())
}
