//! Per-kind weapon configuration (WeaponProfile + WeaponCatalog)
//!
//! Architecture:
//! - Один `WeaponProfile` на kind: stats, тайминги, сокеты, recoil, presentation ids
//! - Profile резолвится ОДИН раз при экипировке (копия живёт в `WeaponAuthority`)
//! - Catalog общий для сервера и клиента (клиенту нужны только presentation ids)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Тип оружия (hit-scan rifle / hit-scan sniper)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum WeaponKind {
    Rifle,
    Sniper,
}

impl WeaponKind {
    /// Scoped оружие: поддерживает aim mode, без прицела стреляет с разбросом
    pub fn is_scoped(self) -> bool {
        matches!(self, WeaponKind::Sniper)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeaponKind::Rifle => "rifle",
            WeaponKind::Sniper => "sniper",
        }
    }
}

/// Piecewise-linear кривая отдачи: ключи `[x, value]`, x по возрастанию
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecoilCurve {
    pub keys: Vec<[f32; 2]>,
}

impl RecoilCurve {
    pub fn new(keys: Vec<[f32; 2]>) -> Self {
        Self { keys }
    }

    /// Значение кривой в точке x (за краями: clamp к крайним ключам)
    pub fn sample(&self, x: f32) -> f32 {
        let Some(first) = self.keys.first() else {
            return 0.0;
        };
        if x <= first[0] {
            return first[1];
        }

        for pair in self.keys.windows(2) {
            let [x0, y0] = pair[0];
            let [x1, y1] = pair[1];
            if x <= x1 {
                let span = x1 - x0;
                if span <= f32::EPSILON {
                    return y1;
                }
                return y0 + (y1 - y0) * (x - x0) / span;
            }
        }

        self.keys.last().map(|key| key[1]).unwrap_or(0.0)
    }
}

/// Кривые отдачи + шаг аккумулятора на каждый автоматический выстрел
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoilProfile {
    pub step: f32,
    pub vertical: RecoilCurve,
    pub horizontal: RecoilCurve,
}

/// Attachment sockets (first person arms / third person body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentSockets {
    pub arms: String,
    pub body: String,
}

/// Presentation ids (анимации, звуки, эффекты). Сервер их не интерпретирует.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponPresentation {
    pub body_fire_animation: String,
    pub body_reload_animation: String,
    pub arms_fire_animation: String,
    pub arms_reload_animation: String,
    pub fire_sound: String,
    pub reload_sound: String,
    pub muzzle_flash: String,
    pub muzzle_socket: String,
    pub impact_decal: String,
    pub scope_overlay: Option<String>,
}

/// Полная конфигурация одного kind оружия
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub kind: WeaponKind,
    pub magazine_capacity: u32,
    pub starting_reserve: u32,
    /// Интервал автоматической стрельбы (секунды)
    pub fire_interval: f32,
    pub automatic: bool,
    pub base_damage: f32,
    pub max_range: f32,
    /// Радиус разброса по каждой оси
    pub spread: f32,
    pub impulse: f32,
    pub reload_duration: f32,
    /// Перезарядка затвора после выстрела (только sniper, 0 = нет)
    pub rechamber_duration: f32,
    pub recoil: RecoilProfile,
    pub sockets: AttachmentSockets,
    pub presentation: WeaponPresentation,
}

impl WeaponProfile {
    /// Автоматическая винтовка
    pub fn rifle() -> Self {
        Self {
            kind: WeaponKind::Rifle,
            magazine_capacity: 30,
            starting_reserve: 90,
            fire_interval: 0.1,
            automatic: true,
            base_damage: 25.0,
            max_range: 10_000.0,
            spread: 50.0,
            impulse: 3_000.0,
            reload_duration: 2.0,
            rechamber_duration: 0.0,
            recoil: RecoilProfile {
                step: 0.1,
                vertical: RecoilCurve::new(vec![[0.0, 0.2], [1.0, 0.6], [3.0, 1.0]]),
                horizontal: RecoilCurve::new(vec![[0.0, 0.0], [1.0, 0.3], [2.0, -0.3], [3.0, 0.4]]),
            },
            sockets: AttachmentSockets {
                arms: "weapon_socket_rifle".into(),
                body: "weapon_body_rifle".into(),
            },
            presentation: WeaponPresentation {
                body_fire_animation: "body_rifle_fire".into(),
                body_reload_animation: "body_rifle_reload".into(),
                arms_fire_animation: "arms_rifle_fire".into(),
                arms_reload_animation: "arms_rifle_reload".into(),
                fire_sound: "rifle_fire".into(),
                reload_sound: "rifle_reload".into(),
                muzzle_flash: "muzzle_flash_rifle".into(),
                muzzle_socket: "muzzle".into(),
                impact_decal: "bullet_hole".into(),
                scope_overlay: None,
            },
        }
    }

    /// Снайперская винтовка (semi, затвор, прицел)
    pub fn sniper() -> Self {
        Self {
            kind: WeaponKind::Sniper,
            magazine_capacity: 5,
            starting_reserve: 20,
            fire_interval: 1.0,
            automatic: false,
            base_damage: 100.0,
            max_range: 20_000.0,
            spread: 200.0,
            impulse: 8_000.0,
            reload_duration: 3.0,
            rechamber_duration: 1.0,
            recoil: RecoilProfile {
                step: 0.0,
                vertical: RecoilCurve::default(),
                horizontal: RecoilCurve::default(),
            },
            sockets: AttachmentSockets {
                arms: "weapon_socket_sniper".into(),
                body: "weapon_body_sniper".into(),
            },
            presentation: WeaponPresentation {
                body_fire_animation: "body_sniper_fire".into(),
                body_reload_animation: "body_sniper_reload".into(),
                arms_fire_animation: "arms_sniper_fire".into(),
                arms_reload_animation: "arms_sniper_reload".into(),
                fire_sound: "sniper_fire".into(),
                reload_sound: "sniper_reload".into(),
                muzzle_flash: "muzzle_flash_sniper".into(),
                muzzle_socket: "muzzle".into(),
                impact_decal: "bullet_hole".into(),
                scope_overlay: Some("sniper_scope".into()),
            },
        }
    }
}

/// Каталог профилей (часть `CombatConfig`). Общий для сервера и клиента.
///
/// В TOML профиль задаётся целиком; отсутствующий профиль берётся по умолчанию.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponCatalog {
    pub rifle: WeaponProfile,
    pub sniper: WeaponProfile,
}

impl Default for WeaponCatalog {
    fn default() -> Self {
        Self {
            rifle: WeaponProfile::rifle(),
            sniper: WeaponProfile::sniper(),
        }
    }
}

impl WeaponCatalog {
    pub fn profile(&self, kind: WeaponKind) -> &WeaponProfile {
        match kind {
            WeaponKind::Rifle => &self.rifle,
            WeaponKind::Sniper => &self.sniper,
        }
    }
}
