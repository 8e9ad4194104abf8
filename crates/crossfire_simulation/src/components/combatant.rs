//! Combatant capability: одна для людей и AI.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::OwnerLink;
use crate::schedule::ScheduledTasks;
use crate::weapon::RecoilProfile;
use crate::world::BodyShape;

/// Кто управляет комбатантом
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum ControllerKind {
    Human,
    #[default]
    Ai,
}

/// Участник боя (человек или AI)
///
/// Автоматически добавляет Health, CombatFlags, Loadout, ... через Required Components.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(
    Health,
    CombatFlags,
    Loadout,
    DirectionLock,
    MovementSpeed,
    AimInput,
    RecoilState,
    ScheduledTasks,
    BodyShape,
    OwnerLink,
    Transform
)]
pub struct Combatant {
    pub controller: ControllerKind,
}

impl Combatant {
    pub fn human() -> Self {
        Self {
            controller: ControllerKind::Human,
        }
    }

    pub fn ai() -> Self {
        Self {
            controller: ControllerKind::Ai,
        }
    }
}

/// Здоровье комбатанта
///
/// Инварианты: 0 ≤ current ≤ max, current только убывает
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// max(current − amount, 0). Мёртвым и отрицательному урону: no-op.
    /// Возвращает реально снятое HP.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if !self.is_alive() || !(amount > 0.0) {
            return 0.0;
        }
        let applied = amount.min(self.current);
        self.current = (self.current - amount).max(0.0);
        applied
    }
}

/// Флаги state machine (одна запись → не рассинхронизируются)
///
/// dead перекрывает всё: при смерти остальные флаги сбрасываются и
/// больше не выставляются.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct CombatFlags {
    firing: bool,
    reloading: bool,
    aiming: bool,
    exploding: bool,
    dead: bool,
}

impl CombatFlags {
    pub fn is_firing(&self) -> bool {
        self.firing
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    pub fn is_aiming(&self) -> bool {
        self.aiming
    }

    pub fn is_exploding(&self) -> bool {
        self.exploding
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn set_firing(&mut self, value: bool) {
        self.firing = value && !self.dead;
    }

    pub fn set_reloading(&mut self, value: bool) {
        self.reloading = value && !self.dead;
    }

    pub fn set_aiming(&mut self, value: bool) {
        self.aiming = value && !self.dead;
    }

    pub fn set_exploding(&mut self, value: bool) {
        self.exploding = value && !self.dead;
    }

    /// One-way переход в Dead. true только при первом вызове.
    pub fn mark_dead(&mut self) -> bool {
        if self.dead {
            return false;
        }
        *self = CombatFlags {
            dead: true,
            ..Default::default()
        };
        true
    }
}

/// Слот оружия
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum WeaponSlot {
    #[default]
    Primary,
    Secondary,
}

/// Оружие комбатанта (entities с `WeaponAuthority`). Secondary носится скрытым.
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Loadout {
    pub primary: Option<Entity>,
    pub secondary: Option<Entity>,
    pub active: WeaponSlot,
}

impl Loadout {
    pub fn slot(&self, slot: WeaponSlot) -> Option<Entity> {
        match slot {
            WeaponSlot::Primary => self.primary,
            WeaponSlot::Secondary => self.secondary,
        }
    }

    pub fn active_weapon(&self) -> Option<Entity> {
        self.slot(self.active)
    }

    /// Primary если свободен (становится активным), иначе secondary, иначе None
    pub fn equip(&mut self, weapon: Entity) -> Option<WeaponSlot> {
        if self.primary.is_none() {
            self.primary = Some(weapon);
            self.active = WeaponSlot::Primary;
            Some(WeaponSlot::Primary)
        } else if self.secondary.is_none() {
            self.secondary = Some(weapon);
            Some(WeaponSlot::Secondary)
        } else {
            None
        }
    }

    pub fn has_free_slot(&self) -> bool {
        self.primary.is_none() || self.secondary.is_none()
    }

    /// Освободить все слоты, вернуть weapon entities
    pub fn clear(&mut self) -> Vec<Entity> {
        let weapons = [self.primary.take(), self.secondary.take()];
        self.active = WeaponSlot::Primary;
        weapons.into_iter().flatten().collect()
    }
}

/// Yaw override для locomotion (None = свободное вращение)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct DirectionLock {
    pub yaw: Option<f32>,
}

/// Скоростной режим ходьбы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum SpeedTier {
    Low,
    #[default]
    Normal,
    High,
}

impl SpeedTier {
    pub fn max_walk_speed(self) -> f32 {
        match self {
            SpeedTier::Low => 300.0,
            SpeedTier::Normal => 600.0,
            SpeedTier::High => 1200.0,
        }
    }
}

/// Текущий скоростной режим (читает locomotion)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MovementSpeed {
    pub tier: SpeedTier,
    pub max_walk_speed: f32,
}

impl Default for MovementSpeed {
    fn default() -> Self {
        Self::from_tier(SpeedTier::default())
    }
}

impl MovementSpeed {
    pub fn from_tier(tier: SpeedTier) -> Self {
        Self {
            tier,
            max_walk_speed: tier.max_walk_speed(),
        }
    }
}

/// Последний известный прицел (обновляется командами владельца)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AimInput {
    pub origin: Vec3,
    pub direction: Vec3,
    pub moving: bool,
}

impl Default for AimInput {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            moving: false,
        }
    }
}

/// Аккумулятор отдачи автоматического огня
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct RecoilState {
    pub accumulator: f32,
}

impl RecoilState {
    /// Следующий kick (pitch, yaw) по кривым; аккумулятор растёт на step
    pub fn advance(&mut self, recoil: &RecoilProfile) -> Vec2 {
        self.accumulator += recoil.step;
        Vec2::new(
            recoil.vertical.sample(self.accumulator),
            recoil.horizontal.sample(self.accumulator),
        )
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::WeaponProfile;

    #[test]
    fn test_health_damage_clamps_at_zero() {
        let mut health = Health::new(100.0);

        assert_eq!(health.take_damage(30.0), 30.0);
        assert_eq!(health.current(), 70.0);
        assert!(health.is_alive());

        assert_eq!(health.take_damage(100.0), 70.0);
        assert_eq!(health.current(), 0.0);
        assert!(!health.is_alive());
    }

    #[test]
    fn test_health_ignores_damage_when_dead_or_negative() {
        let mut health = Health::new(50.0);
        assert_eq!(health.take_damage(-20.0), 0.0);
        assert_eq!(health.take_damage(f32::NAN), 0.0);
        assert_eq!(health.current(), 50.0);

        health.take_damage(50.0);
        assert_eq!(health.take_damage(10.0), 0.0);
        assert_eq!(health.current(), 0.0);
    }

    #[test]
    fn test_dead_overrides_flags() {
        let mut flags = CombatFlags::default();
        flags.set_firing(true);
        flags.set_aiming(true);
        flags.set_exploding(true);

        assert!(flags.mark_dead());
        assert!(!flags.mark_dead(), "death is one-way and happens once");
        assert!(!flags.is_firing() && !flags.is_aiming() && !flags.is_exploding());

        flags.set_reloading(true);
        flags.set_firing(true);
        assert!(!flags.is_reloading());
        assert!(!flags.is_firing());
    }

    #[test]
    fn test_loadout_fills_primary_then_secondary() {
        let mut loadout = Loadout::default();
        let a = Entity::from_raw(10);
        let b = Entity::from_raw(11);
        let c = Entity::from_raw(12);

        assert_eq!(loadout.equip(a), Some(WeaponSlot::Primary));
        assert_eq!(loadout.equip(b), Some(WeaponSlot::Secondary));
        assert_eq!(loadout.equip(c), None);
        assert_eq!(loadout.active_weapon(), Some(a));

        let cleared = loadout.clear();
        assert_eq!(cleared, vec![a, b]);
        assert_eq!(loadout.active_weapon(), None);
    }

    #[test]
    fn test_weapon_slots_order_primary_first() {
        use crate::components::NetId;
        use std::collections::BTreeMap;

        let mut mirrors = BTreeMap::new();
        mirrors.insert((NetId(2), WeaponSlot::Secondary), "sniper");
        mirrors.insert((NetId(2), WeaponSlot::Primary), "rifle");
        mirrors.insert((NetId(1), WeaponSlot::Secondary), "pistol");

        assert!(WeaponSlot::Primary < WeaponSlot::Secondary);
        let keys: Vec<_> = mirrors.into_keys().collect();
        assert_eq!(
            keys,
            vec![
                (NetId(1), WeaponSlot::Secondary),
                (NetId(2), WeaponSlot::Primary),
                (NetId(2), WeaponSlot::Secondary),
            ]
        );
    }

    #[test]
    fn test_speed_tiers() {
        assert_eq!(MovementSpeed::from_tier(SpeedTier::Low).max_walk_speed, 300.0);
        assert_eq!(MovementSpeed::from_tier(SpeedTier::Normal).max_walk_speed, 600.0);
        assert_eq!(MovementSpeed::from_tier(SpeedTier::High).max_walk_speed, 1200.0);
    }

    #[test]
    fn test_recoil_accumulates_and_resets() {
        let profile = WeaponProfile::rifle();
        let mut recoil = RecoilState::default();

        let first = recoil.advance(&profile.recoil);
        recoil.advance(&profile.recoil);
        let third = recoil.advance(&profile.recoil);
        assert!(third.x > first.x, "vertical kick grows with sustained fire");

        recoil.reset();
        assert_eq!(recoil.accumulator, 0.0);
    }
}
