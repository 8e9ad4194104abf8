//! Созревшие combat tasks → state machine (устаревший task = no-op с логом)

use bevy::prelude::*;

use super::actions::{self, CombatParams};
use super::events::FireTrigger;
use crate::schedule::{TaskElapsed, TaskKind};

/// Система: AutomaticFire / ReloadComplete / Rechamber / GrenadeCooldown
pub fn run_combat_tasks(mut elapsed: EventReader<TaskElapsed>, mut params: CombatParams) {
    for event in elapsed.read() {
        let result = match event.kind() {
            TaskKind::AutomaticFire => actions::fire(&mut params, event.entity, FireTrigger::Automatic),
            TaskKind::ReloadComplete => actions::complete_reload(&mut params, event.entity),
            TaskKind::Rechamber => actions::finish_rechamber(&mut params, event.entity),
            TaskKind::GrenadeCooldown => actions::end_grenade_cooldown(&mut params, event.entity),
            // Fuse/Retire/ControllerRetry обрабатывают grenade и match_rules
            TaskKind::GrenadeFuse | TaskKind::Retire | TaskKind::ControllerRetry => continue,
        };

        if let Err(reason) = result {
            crate::logger::log(&format!("⏱️ {:?} on {:?} skipped: {}", event.kind(), event.entity, reason));
        }
    }
}
