//! Combatant State Machine: guarded actions
//!
//! Одни и те же функции вызываются из command intake (`commands.rs`) и из
//! созревших tasks (`timers.rs`). Каждая action:
//! 1. Проверяет guard'ы → `CommandRejection` (без побочных эффектов)
//! 2. Мутирует авторитетное состояние (флаги, ammo, tasks)
//! 3. Пишет cosmetic/feedback/damage events

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::damage::{hitscan_damage, DamageEvent, DamageSource};
use super::events::{
    CommandRejection, CosmeticBroadcast, CosmeticEvent, FeedbackEvent, FireTrigger, OwnerFeedback, ShotResolved,
};
use super::grenade::Grenade;
use crate::components::{
    AimInput, CombatFlags, Combatant, DirectionLock, Loadout, MovementSpeed, NetId, RecoilState, SpeedTier,
};
use crate::config::CombatConfig;
use crate::schedule::{CombatClock, ScheduledTasks, TaskKind};
use crate::weapon::{resolve_hitscan, ShotOutcome, ShotRequest, WeaponAuthority, WeaponKind};
use crate::world::PhysicsWorld;
use crate::DeterministicRng;

type CombatantState = (
    &'static mut CombatFlags,
    &'static mut ScheduledTasks,
    &'static mut RecoilState,
    &'static mut AimInput,
    &'static Loadout,
    &'static mut DirectionLock,
    &'static mut MovementSpeed,
);

/// Всё, что нужно actions state machine
#[derive(SystemParam)]
pub struct CombatParams<'w, 's> {
    pub clock: Res<'w, CombatClock>,
    pub config: Res<'w, CombatConfig>,
    pub rng: ResMut<'w, DeterministicRng>,
    pub world: PhysicsWorld<'w, 's>,
    pub combatants: Query<'w, 's, CombatantState, With<Combatant>>,
    pub weapons: Query<'w, 's, &'static mut WeaponAuthority>,
    pub commands: Commands<'w, 's>,
    pub damage: EventWriter<'w, DamageEvent>,
    pub cosmetics: EventWriter<'w, CosmeticBroadcast>,
    pub feedback: EventWriter<'w, OwnerFeedback>,
    pub shots: EventWriter<'w, ShotResolved>,
}

/// Выстрел (нажатие или автоматический повтор)
pub fn fire(p: &mut CombatParams, shooter: Entity, trigger: FireTrigger) -> Result<(), CommandRejection> {
    let now = p.clock.now();

    // Фаза 1: guard'ы + мутация состояния
    let (shot, weapon_entity, kind, left_aim, recoil_kick) = {
        let Ok((mut flags, mut tasks, mut recoil, aim, loadout, _, _)) = p.combatants.get_mut(shooter) else {
            return Err(CommandRejection::UnknownCombatant);
        };
        if flags.is_dead() {
            return Err(CommandRejection::Dead);
        }
        if flags.is_reloading() {
            return Err(CommandRejection::Reloading);
        }
        if trigger == FireTrigger::Automatic && !flags.is_firing() {
            tasks.cancel_kind(TaskKind::AutomaticFire);
            return Err(CommandRejection::NotFiring);
        }
        if trigger == FireTrigger::Press && tasks.is_pending(TaskKind::AutomaticFire) {
            return Err(CommandRejection::Busy);
        }

        let weapon_entity = loadout.active_weapon().ok_or(CommandRejection::NoWeapon)?;
        let Ok(mut weapon) = p.weapons.get_mut(weapon_entity) else {
            return Err(CommandRejection::NoWeapon);
        };
        let kind = weapon.kind();

        if kind.is_scoped() && (flags.is_firing() || tasks.is_pending(TaskKind::Rechamber)) {
            return Err(CommandRejection::Rechambering);
        }

        if !weapon.consume_round() {
            if trigger == FireTrigger::Automatic {
                // Магазин опустел посреди очереди → принудительный stop
                tasks.cancel_kind(TaskKind::AutomaticFire);
                recoil.reset();
                flags.set_firing(false);
            }
            return Err(CommandRejection::EmptyMagazine);
        }

        let shot = ShotRequest {
            shooter,
            origin: aim.origin,
            direction: aim.direction,
            moving: aim.moving,
            aiming: flags.is_aiming(),
        };

        flags.set_firing(true);
        let profile = weapon.profile();

        let recoil_kick = match trigger {
            FireTrigger::Automatic => Some(recoil.advance(&profile.recoil)),
            FireTrigger::Press => None,
        };

        if kind.is_scoped() {
            if profile.rechamber_duration > 0.0 {
                tasks.schedule(TaskKind::Rechamber, now, profile.rechamber_duration as f64);
            } else {
                flags.set_firing(false);
            }
        } else if trigger == FireTrigger::Press && weapon.is_automatic() {
            tasks.schedule_repeating(TaskKind::AutomaticFire, now, profile.fire_interval as f64);
        }

        // Выстрел из снайперки выбивает из прицела
        let left_aim = kind.is_scoped() && flags.is_aiming();
        if left_aim {
            flags.set_aiming(false);
        }

        (shot, weapon_entity, kind, left_aim, recoil_kick)
    };

    // Фаза 2: резолюция через WorldQuery
    let Ok(weapon) = p.weapons.get(weapon_entity) else {
        return Err(CommandRejection::NoWeapon);
    };
    let profile = weapon.profile();
    let combatants = &p.combatants;
    let outcome = resolve_hitscan(
        &mut p.world,
        profile,
        &shot,
        &mut p.rng.rng,
        |entity| combatants.contains(entity),
    );

    // Фаза 3: события
    match outcome {
        ShotOutcome::Combatant { target, hit } => {
            p.damage.write(DamageEvent {
                target,
                instigator: Some(shooter),
                source: DamageSource::HitScan(kind),
                amount: hitscan_damage(profile.base_damage, hit.surface),
                hit_point: hit.point,
                surface: hit.surface,
                direction: shot.direction.normalize_or_zero(),
            });
        }
        ShotOutcome::Surface { hit, .. } => {
            p.cosmetics.write(CosmeticBroadcast(CosmeticEvent::BulletDecal {
                point: hit.point.to_array(),
                normal: hit.normal.to_array(),
                weapon: kind,
            }));
        }
        ShotOutcome::Miss => {}
    }

    p.cosmetics.write(CosmeticBroadcast(CosmeticEvent::Shoot {
        combatant: NetId::from(shooter),
        weapon: kind,
    }));
    p.feedback.write(OwnerFeedback {
        combatant: shooter,
        event: FeedbackEvent::LocalFire { weapon: kind },
    });
    if let Some(kick) = recoil_kick {
        p.feedback.write(OwnerFeedback {
            combatant: shooter,
            event: FeedbackEvent::Recoil { pitch: kick.x, yaw: kick.y },
        });
    }
    if left_aim {
        p.feedback.write(OwnerFeedback {
            combatant: shooter,
            event: FeedbackEvent::AimChanged { aiming: false },
        });
    }
    p.shots.write(ShotResolved {
        shooter,
        weapon: kind,
        trigger,
        outcome,
    });

    Ok(())
}

/// Отпустили огонь: стоп автоматики + сброс отдачи
pub fn stop_fire(p: &mut CombatParams, shooter: Entity) -> Result<(), CommandRejection> {
    let Ok((mut flags, mut tasks, mut recoil, ..)) = p.combatants.get_mut(shooter) else {
        return Err(CommandRejection::UnknownCombatant);
    };
    if flags.is_dead() {
        return Err(CommandRejection::Dead);
    }

    tasks.cancel_kind(TaskKind::AutomaticFire);
    recoil.reset();
    // Затвор снайперки доигрывает сам (Rechamber task снимет firing)
    if !tasks.is_pending(TaskKind::Rechamber) {
        flags.set_firing(false);
    }
    Ok(())
}

/// Начало перезарядки
pub fn start_reload(p: &mut CombatParams, combatant: Entity) -> Result<(), CommandRejection> {
    let now = p.clock.now();
    let (kind, left_aim) = {
        let Ok((mut flags, mut tasks, mut recoil, _, loadout, _, _)) = p.combatants.get_mut(combatant) else {
            return Err(CommandRejection::UnknownCombatant);
        };
        if flags.is_dead() {
            return Err(CommandRejection::Dead);
        }
        if flags.is_reloading() {
            return Err(CommandRejection::AlreadyReloading);
        }
        let weapon_entity = loadout.active_weapon().ok_or(CommandRejection::NoWeapon)?;
        let Ok(weapon) = p.weapons.get(weapon_entity) else {
            return Err(CommandRejection::NoWeapon);
        };
        if !weapon.can_reload() {
            return Err(CommandRejection::NothingToReload);
        }

        flags.set_reloading(true);
        tasks.cancel_kind(TaskKind::AutomaticFire);
        tasks.cancel_kind(TaskKind::Rechamber);
        recoil.reset();
        flags.set_firing(false);

        let left_aim = flags.is_aiming();
        flags.set_aiming(false);

        tasks.schedule(TaskKind::ReloadComplete, now, weapon.profile().reload_duration as f64);
        (weapon.kind(), left_aim)
    };

    p.cosmetics.write(CosmeticBroadcast(CosmeticEvent::Reload {
        combatant: NetId::from(combatant),
        weapon: kind,
    }));
    p.feedback.write(OwnerFeedback {
        combatant,
        event: FeedbackEvent::LocalReload { weapon: kind },
    });
    if left_aim {
        p.feedback.write(OwnerFeedback {
            combatant,
            event: FeedbackEvent::AimChanged { aiming: false },
        });
    }
    Ok(())
}

/// Перезарядка завершилась (task): перенос min(reserve, capacity − magazine)
pub fn complete_reload(p: &mut CombatParams, combatant: Entity) -> Result<(), CommandRejection> {
    let Ok((mut flags, _, _, _, loadout, _, _)) = p.combatants.get_mut(combatant) else {
        return Err(CommandRejection::UnknownCombatant);
    };
    if flags.is_dead() {
        return Err(CommandRejection::Dead);
    }
    if !flags.is_reloading() {
        return Err(CommandRejection::NotReloading);
    }
    flags.set_reloading(false);

    let weapon_entity = loadout.active_weapon().ok_or(CommandRejection::NoWeapon)?;
    let Ok(mut weapon) = p.weapons.get_mut(weapon_entity) else {
        return Err(CommandRejection::NoWeapon);
    };
    let moved = weapon.complete_reload();

    crate::logger::log(&format!(
        "🔄 {:?} reloaded {} rounds ({}/{} + {})",
        combatant,
        moved,
        weapon.magazine(),
        weapon.capacity(),
        weapon.reserve()
    ));
    Ok(())
}

/// Затвор передёрнут (task)
pub fn finish_rechamber(p: &mut CombatParams, combatant: Entity) -> Result<(), CommandRejection> {
    let Ok((mut flags, ..)) = p.combatants.get_mut(combatant) else {
        return Err(CommandRejection::UnknownCombatant);
    };
    if flags.is_dead() {
        return Err(CommandRejection::Dead);
    }
    flags.set_firing(false);
    Ok(())
}

/// Вход/выход из прицела (только scoped оружие)
pub fn toggle_aim(p: &mut CombatParams, combatant: Entity) -> Result<(), CommandRejection> {
    let aiming = {
        let Ok((mut flags, _, _, _, loadout, _, _)) = p.combatants.get_mut(combatant) else {
            return Err(CommandRejection::UnknownCombatant);
        };
        if flags.is_dead() {
            return Err(CommandRejection::Dead);
        }
        let weapon_entity = loadout.active_weapon().ok_or(CommandRejection::NoWeapon)?;
        let Ok(weapon) = p.weapons.get(weapon_entity) else {
            return Err(CommandRejection::NoWeapon);
        };
        if !weapon.kind().is_scoped() {
            return Err(CommandRejection::CannotAim);
        }

        let aiming = !flags.is_aiming();
        flags.set_aiming(aiming);
        aiming
    };

    p.feedback.write(OwnerFeedback {
        combatant,
        event: FeedbackEvent::AimChanged { aiming },
    });
    Ok(())
}

/// Бросок гранаты
pub fn throw_grenade(p: &mut CombatParams, thrower: Entity) -> Result<(), CommandRejection> {
    let now = p.clock.now();
    let grenade_config = p.config.grenade.clone();

    let (origin, direction) = {
        let Ok((mut flags, mut tasks, _, aim, _, _, _)) = p.combatants.get_mut(thrower) else {
            return Err(CommandRejection::UnknownCombatant);
        };
        if flags.is_dead() {
            return Err(CommandRejection::Dead);
        }
        if flags.is_firing() || flags.is_reloading() || flags.is_exploding() {
            return Err(CommandRejection::Busy);
        }

        flags.set_exploding(true);
        tasks.schedule(TaskKind::GrenadeCooldown, now, grenade_config.fuse_seconds as f64);

        let direction = aim.direction.normalize_or(Vec3::NEG_Z);
        (aim.origin + direction * grenade_config.muzzle_offset, direction)
    };

    let mut fuse = ScheduledTasks::default();
    fuse.schedule(TaskKind::GrenadeFuse, now, grenade_config.fuse_seconds as f64);
    let grenade = p
        .commands
        .spawn((
            Grenade {
                thrower,
                velocity: direction * grenade_config.launch_speed,
            },
            Transform::from_translation(origin),
            fuse,
        ))
        .id();

    p.cosmetics.write(CosmeticBroadcast(CosmeticEvent::GrenadeThrown {
        thrower: NetId::from(thrower),
        origin: origin.to_array(),
        direction: direction.to_array(),
    }));

    crate::logger::log(&format!("💣 {:?} threw grenade {:?}", thrower, grenade));
    Ok(())
}

/// Кулдаун гранаты закончился (task)
pub fn end_grenade_cooldown(p: &mut CombatParams, thrower: Entity) -> Result<(), CommandRejection> {
    let Ok((mut flags, ..)) = p.combatants.get_mut(thrower) else {
        return Err(CommandRejection::UnknownCombatant);
    };
    if flags.is_dead() {
        return Err(CommandRejection::Dead);
    }
    flags.set_exploding(false);
    Ok(())
}

/// Новый прицел владельца
pub fn update_view(p: &mut CombatParams, combatant: Entity, origin: Vec3, direction: Vec3, moving: bool) -> Result<(), CommandRejection> {
    let Ok((flags, _, _, mut aim, ..)) = p.combatants.get_mut(combatant) else {
        return Err(CommandRejection::UnknownCombatant);
    };
    if flags.is_dead() {
        return Err(CommandRejection::Dead);
    }
    if !origin.is_finite() || !direction.is_finite() {
        return Err(CommandRejection::InvalidAim);
    }
    aim.origin = origin;
    aim.direction = direction;
    aim.moving = moving;
    Ok(())
}

pub fn set_speed_tier(p: &mut CombatParams, combatant: Entity, tier: SpeedTier) -> Result<(), CommandRejection> {
    let Ok((flags, _, _, _, _, _, mut speed)) = p.combatants.get_mut(combatant) else {
        return Err(CommandRejection::UnknownCombatant);
    };
    if flags.is_dead() {
        return Err(CommandRejection::Dead);
    }
    *speed = MovementSpeed::from_tier(tier);
    Ok(())
}

pub fn lock_direction(p: &mut CombatParams, combatant: Entity, yaw: Option<f32>) -> Result<(), CommandRejection> {
    let Ok((flags, _, _, _, _, mut lock, _)) = p.combatants.get_mut(combatant) else {
        return Err(CommandRejection::UnknownCombatant);
    };
    if flags.is_dead() {
        return Err(CommandRejection::Dead);
    }
    lock.yaw = yaw;
    Ok(())
}

pub fn toggle_fire_mode(p: &mut CombatParams, combatant: Entity) -> Result<(), CommandRejection> {
    let Ok((mut flags, mut tasks, mut recoil, _, loadout, _, _)) = p.combatants.get_mut(combatant) else {
        return Err(CommandRejection::UnknownCombatant);
    };
    if flags.is_dead() {
        return Err(CommandRejection::Dead);
    }
    let weapon_entity = loadout.active_weapon().ok_or(CommandRejection::NoWeapon)?;
    let Ok(mut weapon) = p.weapons.get_mut(weapon_entity) else {
        return Err(CommandRejection::NoWeapon);
    };
    let automatic = weapon.toggle_fire_mode().ok_or(CommandRejection::FixedFireMode)?;

    // Переключение посреди очереди её останавливает
    if !automatic && tasks.cancel_kind(TaskKind::AutomaticFire) {
        recoil.reset();
        flags.set_firing(false);
    }

    crate::logger::log(&format!(
        "🔁 {:?} fire mode: {}",
        combatant,
        if automatic { "automatic" } else { "semi" }
    ));
    Ok(())
}

/// Weapon kind активного оружия (для логов)
pub fn active_weapon_kind(p: &CombatParams, combatant: Entity) -> Option<WeaponKind> {
    let (_, _, _, _, loadout, _, _) = p.combatants.get(combatant).ok()?;
    let weapon = p.weapons.get(loadout.active_weapon()?).ok()?;
    Some(weapon.kind())
}
