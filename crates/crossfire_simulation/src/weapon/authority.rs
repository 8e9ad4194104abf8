//! Server-owned weapon state: ammo truth + resolved profile.
//!
//! Инварианты (поля приватные, меняются только через методы):
//! - 0 ≤ magazine ≤ capacity
//! - reserve ≥ 0 (u32)
//! - magazine + reserve меняется только выстрелом (-1)

use bevy::prelude::*;

use super::profile::{WeaponKind, WeaponProfile};

/// Weapon Authority instance (отдельная entity, принадлежит ровно одному Combatant)
#[derive(Component, Debug, Clone)]
pub struct WeaponAuthority {
    owner: Entity,
    profile: WeaponProfile,
    magazine: u32,
    reserve: u32,
    automatic: bool,
}

impl WeaponAuthority {
    /// Новое оружие: полный магазин + стартовый резерв из профиля
    pub fn issue(owner: Entity, profile: WeaponProfile) -> Self {
        let magazine = profile.magazine_capacity;
        let reserve = profile.starting_reserve;
        Self::with_ammo(owner, profile, magazine, reserve)
    }

    /// Явное состояние патронов (magazine clamp к capacity)
    pub fn with_ammo(owner: Entity, profile: WeaponProfile, magazine: u32, reserve: u32) -> Self {
        let automatic = profile.automatic;
        Self {
            owner,
            magazine: magazine.min(profile.magazine_capacity),
            reserve,
            automatic,
            profile,
        }
    }

    pub fn owner(&self) -> Entity {
        self.owner
    }

    pub fn kind(&self) -> WeaponKind {
        self.profile.kind
    }

    pub fn profile(&self) -> &WeaponProfile {
        &self.profile
    }

    pub fn magazine(&self) -> u32 {
        self.magazine
    }

    pub fn reserve(&self) -> u32 {
        self.reserve
    }

    pub fn capacity(&self) -> u32 {
        self.profile.magazine_capacity
    }

    pub fn is_automatic(&self) -> bool {
        self.automatic
    }

    pub fn total_ammo(&self) -> u32 {
        self.magazine + self.reserve
    }

    /// Списать один патрон. false = магазин пуст (ничего не меняется).
    pub fn consume_round(&mut self) -> bool {
        if self.magazine == 0 {
            return false;
        }
        self.magazine -= 1;
        true
    }

    /// Есть что перезаряжать: магазин не полный И резерв не пуст
    pub fn can_reload(&self) -> bool {
        self.magazine < self.capacity() && self.reserve > 0
    }

    /// Завершение перезарядки: min(reserve, capacity − magazine) из резерва в магазин.
    /// Возвращает количество перенесённых патронов.
    pub fn complete_reload(&mut self) -> u32 {
        let moved = self.reserve.min(self.capacity() - self.magazine);
        self.magazine += moved;
        self.reserve -= moved;
        moved
    }

    /// Auto/semi переключение. Только rifle-class; возвращает новый режим.
    pub fn toggle_fire_mode(&mut self) -> Option<bool> {
        if self.kind() != WeaponKind::Rifle {
            return None;
        }
        self.automatic = !self.automatic;
        Some(self.automatic)
    }
}
