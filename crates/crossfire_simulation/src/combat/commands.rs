//! Command intake → state machine. Отклонения логируются (debug), отправителю ничего.

use bevy::prelude::*;

use super::actions::{self, CombatParams};
use super::events::{CombatCommand, Command, FireTrigger};

/// Система: CombatCommand events в порядке поступления
pub fn process_combat_commands(mut commands_in: EventReader<CombatCommand>, mut params: CombatParams) {
    for CombatCommand { combatant, command } in commands_in.read() {
        let combatant = *combatant;
        let result = match command {
            Command::UpdateView { origin, direction, moving } => {
                actions::update_view(&mut params, combatant, Vec3::from(*origin), Vec3::from(*direction), *moving)
            }
            Command::Fire { origin, direction, moving } => {
                actions::update_view(&mut params, combatant, Vec3::from(*origin), Vec3::from(*direction), *moving)
                    .and_then(|_| actions::fire(&mut params, combatant, FireTrigger::Press))
            }
            Command::StopFire => actions::stop_fire(&mut params, combatant),
            Command::Reload => actions::start_reload(&mut params, combatant),
            Command::ToggleAim => actions::toggle_aim(&mut params, combatant),
            Command::ThrowGrenade => actions::throw_grenade(&mut params, combatant),
            Command::SetSpeedTier(tier) => actions::set_speed_tier(&mut params, combatant, *tier),
            Command::LockDirection { yaw } => actions::lock_direction(&mut params, combatant, Some(*yaw)),
            Command::UnlockDirection => actions::lock_direction(&mut params, combatant, None),
            Command::ToggleFireMode => actions::toggle_fire_mode(&mut params, combatant),
        };

        if let Err(reason) = result {
            crate::logger::log(&format!(
                "🚫 {:?} from {:?} rejected: {} (weapon {:?})",
                command,
                combatant,
                reason,
                actions::active_weapon_kind(&params, combatant)
            ));
        }
    }
}
