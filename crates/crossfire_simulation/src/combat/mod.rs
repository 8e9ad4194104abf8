//! Combat system module (server-authoritative)
//!
//! Сервер решает:
//! - State machine: firing / reloading / aiming / exploding / dead
//! - Ammo, hit-scan, splash, health, смерть
//! - Events: DamageEvent → DamageDealt / EntityDied
//!
//! Клиенты получают только:
//! - Replicated fields (net::replication)
//! - Cosmetic broadcasts + owner feedback (hints, не truth)

use bevy::prelude::*;

pub mod actions;
pub mod commands;
pub mod damage;
pub mod death;
pub mod events;
pub mod grenade;
pub mod timers;

#[cfg(test)]
mod damage_tests;

// Re-export основных типов
pub use actions::CombatParams;
pub use damage::{
    hitscan_damage, planar_distance_sq, splash_damage, DamageDealt, DamageEvent, DamageSource, Dead, EntityDied,
};
pub use events::{
    CombatCommand, Command, CommandRejection, CosmeticBroadcast, CosmeticEvent, DeathPose, FeedbackEvent,
    FireTrigger, OwnerFeedback, ShotResolved,
};
pub use grenade::{sweep_directions, Grenade};

/// Фазы combat тика (FixedUpdate, строго последовательно)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatSet {
    /// Часы, коллайдеры, входящие кадры, выдача оружия (дальше Rapier step)
    Intake,
    /// Команды клиентов/AI
    Commands,
    /// Созревшие tasks (автоматика, перезарядка, затвор, кулдауны)
    Timers,
    /// Гранаты
    Projectiles,
    /// DamageEvent → Health
    Damage,
    /// Смерть, очки, уход из матча
    Death,
    /// Исходящие кадры
    Replicate,
}

/// Combat Plugin
///
/// Порядок выполнения внутри тика:
/// 1. Commands: process_combat_commands (stop-fire отменяет автоматику ДО таймеров)
/// 2. Timers: collect_due_tasks → run_combat_tasks
/// 3. Projectiles: полёт и детонация гранат (импульсы props забирает следующий Rapier step)
/// 4. Damage: apply_damage
/// 5. Death: handle_deaths
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        // Регистрация событий
        app.add_event::<CombatCommand>()
            .add_event::<DamageEvent>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .add_event::<CosmeticBroadcast>()
            .add_event::<OwnerFeedback>()
            .add_event::<ShotResolved>();

        app.add_systems(
            FixedUpdate,
            (
                commands::process_combat_commands.in_set(CombatSet::Commands),
                (crate::schedule::collect_due_tasks, timers::run_combat_tasks)
                    .chain()
                    .in_set(CombatSet::Timers),
                (grenade::integrate_grenades, grenade::detonate_grenades)
                    .chain()
                    .in_set(CombatSet::Projectiles),
                damage::apply_damage.in_set(CombatSet::Damage),
                death::handle_deaths.in_set(CombatSet::Death),
            ),
        );
    }
}
