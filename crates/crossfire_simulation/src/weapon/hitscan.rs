//! Hit-scan resolution (чистая функция над `WorldQuery` + RNG)
//!
//! 1. end = origin + dir × max_range
//! 2. moving ИЛИ (scoped && !aiming) → end += U[-spread, spread] по каждой оси
//! 3. ray origin → end, стрелок исключён
//! 4. попадание в комбатанта → target + surface
//! 5. попадание в геометрию → decal; physics body → импульс вдоль выстрела

use bevy::prelude::*;
use rand::Rng;

use super::profile::WeaponProfile;
use crate::world::{RayHit, WorldQuery};

/// Параметры одного выстрела
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRequest {
    pub shooter: Entity,
    pub origin: Vec3,
    pub direction: Vec3,
    pub moving: bool,
    pub aiming: bool,
}

/// Итог выстрела
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotOutcome {
    /// Никаких событий
    Miss,
    /// Попадание в другого комбатанта → Damage Event
    Combatant { target: Entity, hit: RayHit },
    /// Попадание в геометрию → decal (+ импульс если physics body)
    Surface { hit: RayHit, impulse_applied: bool },
}

/// Нужен ли разброс для этого выстрела
pub fn needs_spread(profile: &WeaponProfile, shot: &ShotRequest) -> bool {
    shot.moving || (profile.kind.is_scoped() && !shot.aiming)
}

/// Конечная точка луча (с разбросом если нужно)
pub fn shot_end(profile: &WeaponProfile, shot: &ShotRequest, rng: &mut impl Rng) -> Option<Vec3> {
    let direction = shot.direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return None;
    }

    let mut end = shot.origin + direction * profile.max_range;
    if needs_spread(profile, shot) && profile.spread > 0.0 {
        let spread = profile.spread;
        end += Vec3::new(
            rng.gen_range(-spread..=spread),
            rng.gen_range(-spread..=spread),
            rng.gen_range(-spread..=spread),
        );
    }
    Some(end)
}

/// Полная резолюция выстрела. `is_combatant` отличает комбатантов от props/стен.
pub fn resolve_hitscan(
    world: &mut dyn WorldQuery,
    profile: &WeaponProfile,
    shot: &ShotRequest,
    rng: &mut impl Rng,
    is_combatant: impl Fn(Entity) -> bool,
) -> ShotOutcome {
    let Some(end) = shot_end(profile, shot, rng) else {
        return ShotOutcome::Miss;
    };

    let Some(hit) = world.raycast(shot.origin, end, &[shot.shooter]) else {
        return ShotOutcome::Miss;
    };

    if let Some(target) = hit.entity.filter(|e| *e != shot.shooter && is_combatant(*e)) {
        return ShotOutcome::Combatant { target, hit };
    }

    let mut impulse_applied = false;
    if hit.physics_body {
        if let Some(entity) = hit.entity {
            world.apply_impulse(entity, end - shot.origin, profile.impulse);
            impulse_applied = true;
        }
    }

    ShotOutcome::Surface { hit, impulse_applied }
}
