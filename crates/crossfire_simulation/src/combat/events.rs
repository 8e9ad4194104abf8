//! Combat events: команды (client → server), cosmetic broadcasts, owner feedback
//!
//! Векторы в payload: `[f32; 3]` (тот же формат уходит на провод).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{NetId, SpeedTier, WeaponSlot};
use crate::weapon::{ShotOutcome, WeaponKind};

/// Команда комбатанта (untrusted, валидируется guard'ами state machine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Обновить прицел (камера владельца)
    UpdateView {
        origin: [f32; 3],
        direction: [f32; 3],
        moving: bool,
    },
    /// Нажат огонь (с актуальным прицелом)
    Fire {
        origin: [f32; 3],
        direction: [f32; 3],
        moving: bool,
    },
    StopFire,
    Reload,
    ToggleAim,
    ThrowGrenade,
    SetSpeedTier(SpeedTier),
    LockDirection { yaw: f32 },
    UnlockDirection,
    ToggleFireMode,
}

/// Команда для конкретного комбатанта (после intake)
#[derive(Event, Debug, Clone)]
pub struct CombatCommand {
    pub combatant: Entity,
    pub command: Command,
}

/// Причина отклонения команды (логируется, клиенту не отправляется)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandRejection {
    #[error("entity is not a combatant")]
    UnknownCombatant,
    #[error("combatant is dead")]
    Dead,
    #[error("weapon is reloading")]
    Reloading,
    #[error("reload already in progress")]
    AlreadyReloading,
    #[error("no active weapon")]
    NoWeapon,
    #[error("magazine is empty")]
    EmptyMagazine,
    #[error("sniper is still rechambering")]
    Rechambering,
    #[error("magazine full or reserve empty")]
    NothingToReload,
    #[error("active weapon cannot aim")]
    CannotAim,
    #[error("busy firing, reloading or throwing")]
    Busy,
    #[error("automatic fire is no longer active")]
    NotFiring,
    #[error("no reload in progress")]
    NotReloading,
    #[error("active weapon has a fixed fire mode")]
    FixedFireMode,
    #[error("aim origin or direction is not a finite vector")]
    InvalidAim,
}

/// Поза смерти (splash валит с ног)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum DeathPose {
    Down,
    Standing,
}

/// One-shot cosmetic hint для всех наблюдателей
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CosmeticEvent {
    Shoot { combatant: NetId, weapon: WeaponKind },
    Reload { combatant: NetId, weapon: WeaponKind },
    Death { combatant: NetId, pose: DeathPose },
    BulletDecal { point: [f32; 3], normal: [f32; 3], weapon: WeaponKind },
    GrenadeThrown { thrower: NetId, origin: [f32; 3], direction: [f32; 3] },
    GrenadeExplosion { center: [f32; 3] },
}

/// One-shot feedback только владельцу
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeedbackEvent {
    LocalFire { weapon: WeaponKind },
    LocalReload { weapon: WeaponKind },
    Recoil { pitch: f32, yaw: f32 },
    AimChanged { aiming: bool },
    WeaponEquipped { slot: WeaponSlot, weapon: WeaponKind },
    WeaponCleared,
    HudReady,
}

/// Серверный broadcast (net слой раздаёт всем)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct CosmeticBroadcast(pub CosmeticEvent);

/// Feedback владельцу комбатанта (net слой маршрутизирует по OwnerLink)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct OwnerFeedback {
    pub combatant: Entity,
    pub event: FeedbackEvent,
}

/// Что запустило выстрел
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireTrigger {
    Press,
    Automatic,
}

/// Выстрел разрезолвлен (один на каждое списание патрона)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ShotResolved {
    pub shooter: Entity,
    pub weapon: WeaponKind,
    pub trigger: FireTrigger,
    pub outcome: ShotOutcome,
}
