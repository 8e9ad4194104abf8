//! Dead entry: отмена tasks, уничтожение оружия, анимация смерти, отложенный уход

use bevy::prelude::*;

use super::damage::{Dead, EntityDied};
use super::events::{CosmeticBroadcast, CosmeticEvent, DeathPose, FeedbackEvent, OwnerFeedback};
use crate::components::{Combatant, Loadout, NetId, RecoilState};
use crate::config::CombatConfig;
use crate::schedule::{CombatClock, ScheduledTasks, TaskKind};

/// Система: EntityDied → один раз на комбатанта
///
/// 1. Отменяем ВСЕ pending tasks (reload, автоматика, затвор, кулдауны)
/// 2. Despawn weapon authority entities
/// 3. Cosmetic: анимация смерти, владельцу weapon cleared
/// 4. Retire task через death_delay_seconds
pub fn handle_deaths(
    mut died_events: EventReader<EntityDied>,
    clock: Res<CombatClock>,
    config: Res<CombatConfig>,
    mut victims: Query<(&mut ScheduledTasks, &mut Loadout, &mut RecoilState), With<Combatant>>,
    mut cosmetics: EventWriter<CosmeticBroadcast>,
    mut feedback: EventWriter<OwnerFeedback>,
    mut commands: Commands,
) {
    for event in died_events.read() {
        let Ok((mut tasks, mut loadout, mut recoil)) = victims.get_mut(event.entity) else {
            crate::logger::log_warning(&format!("EntityDied: {:?} is not a combatant", event.entity));
            continue;
        };

        let cancelled = tasks.cancel_all();
        recoil.reset();

        let weapons = loadout.clear();
        for weapon in &weapons {
            if let Ok(mut entity_commands) = commands.get_entity(*weapon) {
                entity_commands.despawn();
            }
        }

        if let Ok(mut entity_commands) = commands.get_entity(event.entity) {
            entity_commands.insert(Dead);
        }

        let pose = if event.cause.is_splash() {
            DeathPose::Down
        } else {
            DeathPose::Standing
        };
        cosmetics.write(CosmeticBroadcast(CosmeticEvent::Death {
            combatant: NetId::from(event.entity),
            pose,
        }));
        feedback.write(OwnerFeedback {
            combatant: event.entity,
            event: FeedbackEvent::WeaponCleared,
        });

        tasks.schedule(TaskKind::Retire, clock.now(), config.rules.death_delay_seconds as f64);

        crate::logger::log_info(&format!(
            "⚰️ {:?} dead: {} tasks cancelled, {} weapons destroyed, pose {:?}",
            event.entity,
            cancelled,
            weapons.len(),
            pose
        ));
    }
}
