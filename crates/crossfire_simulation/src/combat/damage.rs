//! Damage Model
//!
//! - Hit-scan: base × multiplier поверхности (head 4.0, torso 1.0, arm 0.8, leg 0.7)
//! - Splash: ступенчатая функция от квадрата планарной дистанции (XZ)
//! - `apply_damage`: health = max(health − amount, 0), переход в Dead ровно один раз

use bevy::prelude::*;

use crate::components::{CombatFlags, Health};
use crate::weapon::WeaponKind;
use crate::world::SurfaceClass;

/// Полосы splash урона (квадрат планарной дистанции)
pub const SPLASH_INNER_RADIUS_SQ: f32 = 160_000.0;
pub const SPLASH_OUTER_RADIUS_SQ: f32 = 1_000_000.0;
pub const SPLASH_INNER_DAMAGE: f32 = 100.0;
pub const SPLASH_OUTER_DAMAGE: f32 = 50.0;
pub const SPLASH_EDGE_DAMAGE: f32 = 20.0;

impl SurfaceClass {
    pub fn damage_multiplier(self) -> f32 {
        match self {
            SurfaceClass::Head => 4.0,
            SurfaceClass::Torso => 1.0,
            SurfaceClass::Arm => 0.8,
            SurfaceClass::Leg => 0.7,
        }
    }
}

/// Источник урона
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageSource {
    HitScan(WeaponKind),
    Splash { grenade: Entity },
}

impl DamageSource {
    pub fn is_splash(&self) -> bool {
        matches!(self, DamageSource::Splash { .. })
    }
}

/// Damage Event: один на разрезолвленное попадание, потребляется сразу
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub target: Entity,
    pub instigator: Option<Entity>,
    pub source: DamageSource,
    pub amount: f32,
    pub hit_point: Vec3,
    pub surface: Option<SurfaceClass>,
    pub direction: Vec3,
}

/// Событие: урон применён к Health
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageDealt {
    pub attacker: Option<Entity>,
    pub target: Entity,
    pub damage: f32,
    pub target_died: bool,
}

/// Событие: комбатант умер (health достиг 0)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct EntityDied {
    pub entity: Entity,
    /// None для самоубийства / урона без инициатора
    pub killer: Option<Entity>,
    pub cause: DamageSource,
}

/// Компонент-маркер: комбатант мёртв (вставляется death системой)
#[derive(Component, Debug)]
pub struct Dead;

/// Урон hit-scan попадания (неклассифицированная поверхность = torso)
pub fn hitscan_damage(base_damage: f32, surface: Option<SurfaceClass>) -> f32 {
    base_damage * surface.unwrap_or_default().damage_multiplier()
}

/// Квадрат дистанции в горизонтальной плоскости (Y-up → XZ)
pub fn planar_distance_sq(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

/// Splash урон по квадрату планарной дистанции
pub fn splash_damage(planar_distance_sq: f32) -> f32 {
    if planar_distance_sq < SPLASH_INNER_RADIUS_SQ {
        SPLASH_INNER_DAMAGE
    } else if planar_distance_sq < SPLASH_OUTER_RADIUS_SQ {
        SPLASH_OUTER_DAMAGE
    } else {
        SPLASH_EDGE_DAMAGE
    }
}

/// Система: DamageEvent → Health
///
/// 1. Мёртвая цель → no-op (двойная смерть невозможна)
/// 2. health = max(health − amount, 0)
/// 3. Переход в 0 → CombatFlags::mark_dead + EntityDied (killer None при самоповреждении)
pub fn apply_damage(
    mut damage_events: EventReader<DamageEvent>,
    mut targets: Query<(&mut Health, &mut CombatFlags)>,
    mut dealt_events: EventWriter<DamageDealt>,
    mut died_events: EventWriter<EntityDied>,
) {
    for event in damage_events.read() {
        let Ok((mut health, mut flags)) = targets.get_mut(event.target) else {
            crate::logger::log_warning(&format!("DamageEvent: target {:?} has no Health", event.target));
            continue;
        };

        if !health.is_alive() || flags.is_dead() {
            crate::logger::log(&format!("💀 Damage on dead {:?} ignored", event.target));
            continue;
        }

        let applied = health.take_damage(event.amount);
        let died = !health.is_alive();

        dealt_events.write(DamageDealt {
            attacker: event.instigator,
            target: event.target,
            damage: applied,
            target_died: died,
        });

        crate::logger::log(&format!(
            "🎯 {:?} → {:?}: {:.1} damage ({:?}, {:?}), HP {:.1}/{:.1}",
            event.instigator,
            event.target,
            applied,
            event.source,
            event.surface,
            health.current(),
            health.max()
        ));

        if died && flags.mark_dead() {
            let killer = event.instigator.filter(|instigator| *instigator != event.target);
            died_events.write(EntityDied {
                entity: event.target,
                killer,
                cause: event.source,
            });

            crate::logger::log_info(&format!("☠️ {:?} killed by {:?}", event.target, killer));
        }
    }
}
