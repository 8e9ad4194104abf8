//! Grenade projectile: полёт, фитиль, радиальный sweep
//!
//! Детонация:
//! - N лучей (1° шаг при 360) с наклоном вверх, длина explosion_range
//! - Комбатант → один DamageEvent (splash по планарной дистанции)
//! - Physics body → один импульс
//! - Дедупликация в пределах одной детонации

use bevy::prelude::*;
use std::collections::HashSet;

use super::damage::{planar_distance_sq, splash_damage, DamageEvent, DamageSource};
use super::events::{CosmeticBroadcast, CosmeticEvent};
use crate::components::Combatant;
use crate::config::CombatConfig;
use crate::schedule::{CombatClock, TaskElapsed, TaskKind};
use crate::world::{PhysicsWorld, WorldQuery};

/// Летящая граната (ScheduledTasks на этой же entity держит фитиль)
#[derive(Component, Debug, Clone, Copy)]
pub struct Grenade {
    pub thrower: Entity,
    pub velocity: Vec3,
}

/// Направления лучей sweep (детерминированный порядок)
pub fn sweep_directions(rays: u32, pitch_degrees: f32) -> impl Iterator<Item = Vec3> {
    let pitch = pitch_degrees.to_radians();
    let step = std::f32::consts::TAU / rays.max(1) as f32;
    (0..rays).map(move |i| {
        let yaw = step * i as f32;
        Vec3::new(pitch.cos() * yaw.cos(), pitch.sin(), pitch.cos() * yaw.sin())
    })
}

/// Полёт: гравитация, остановка на полу (y = 0)
pub fn integrate_grenades(
    clock: Res<CombatClock>,
    config: Res<CombatConfig>,
    mut grenades: Query<(&mut Grenade, &mut Transform)>,
) {
    let dt = clock.step() as f32;
    for (mut grenade, mut transform) in grenades.iter_mut() {
        if grenade.velocity == Vec3::ZERO {
            continue;
        }
        grenade.velocity.y -= config.grenade.gravity * dt;
        transform.translation += grenade.velocity * dt;
        if transform.translation.y <= 0.0 {
            transform.translation.y = 0.0;
            grenade.velocity = Vec3::ZERO;
        }
    }
}

/// Фитиль догорел → sweep + despawn гранаты
pub fn detonate_grenades(
    mut elapsed: EventReader<TaskElapsed>,
    config: Res<CombatConfig>,
    mut world: PhysicsWorld,
    grenades: Query<(&Grenade, &Transform)>,
    combatants: Query<&Transform, With<Combatant>>,
    mut damage: EventWriter<DamageEvent>,
    mut cosmetics: EventWriter<CosmeticBroadcast>,
    mut commands: Commands,
) {
    for event in elapsed.read() {
        if event.kind() != TaskKind::GrenadeFuse {
            continue;
        }
        let Ok((grenade, transform)) = grenades.get(event.entity) else {
            continue;
        };

        let center = transform.translation;
        let range = config.grenade.explosion_range;
        let mut struck: HashSet<Entity> = HashSet::new();
        let mut damaged = 0;

        for direction in sweep_directions(config.grenade.sweep_rays, config.grenade.sweep_pitch_degrees) {
            let Some(hit) = world.raycast(center, center + direction * range, &[event.entity]) else {
                continue;
            };
            let Some(entity) = hit.entity else {
                continue;
            };
            if !struck.insert(entity) {
                continue;
            }

            if let Ok(victim) = combatants.get(entity) {
                damage.write(DamageEvent {
                    target: entity,
                    instigator: Some(grenade.thrower),
                    source: DamageSource::Splash { grenade: event.entity },
                    amount: splash_damage(planar_distance_sq(center, victim.translation)),
                    hit_point: hit.point,
                    surface: hit.surface,
                    direction,
                });
                damaged += 1;
            } else if hit.physics_body {
                world.apply_impulse(entity, direction, config.grenade.impulse);
            }
        }

        cosmetics.write(CosmeticBroadcast(CosmeticEvent::GrenadeExplosion {
            center: center.to_array(),
        }));

        crate::logger::log(&format!(
            "💥 Grenade {:?} (thrower {:?}) detonated at {:?}: {} combatants hit",
            event.entity, grenade.thrower, center, damaged
        ));

        if let Ok(mut entity_commands) = commands.get_entity(event.entity) {
            entity_commands.despawn();
        }
    }
}
