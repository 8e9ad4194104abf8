//! Combat tuning (TOML). Всё имеет встроенные defaults.
//!
//! ```toml
//! tick_hz = 60.0
//! seed = 42
//!
//! [grenade]
//! fuse_seconds = 3.0
//!
//! [rules]
//! death_delay_seconds = 3.0
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::match_rules::RetireOutcome;
use crate::weapon::WeaponCatalog;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Вся боевая конфигурация (resource, общий для сервера и клиента)
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Частота симуляции (тиков в секунду)
    pub tick_hz: f64,
    /// Seed для `DeterministicRng`
    pub seed: u64,
    pub weapons: WeaponCatalog,
    pub grenade: GrenadeConfig,
    pub rules: MatchRulesConfig,
    pub presentation: CharacterPresentation,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60.0,
            seed: 42,
            weapons: WeaponCatalog::default(),
            grenade: GrenadeConfig::default(),
            rules: MatchRulesConfig::default(),
            presentation: CharacterPresentation::default(),
        }
    }
}

impl CombatConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: CombatConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_hz > 0.0) {
            return Err(ConfigError::Invalid(format!("tick_hz must be positive, got {}", self.tick_hz)));
        }

        for (slot, profile) in [("rifle", &self.weapons.rifle), ("sniper", &self.weapons.sniper)] {
            if profile.kind.as_str() != slot {
                return Err(ConfigError::Invalid(format!(
                    "weapons.{} has kind {:?}",
                    slot, profile.kind
                )));
            }
            if profile.magazine_capacity == 0 {
                return Err(ConfigError::Invalid(format!("weapons.{}.magazine_capacity must be > 0", slot)));
            }
            if !(profile.fire_interval > 0.0) {
                return Err(ConfigError::Invalid(format!("weapons.{}.fire_interval must be > 0", slot)));
            }
            if profile.spread < 0.0 || profile.max_range <= 0.0 {
                return Err(ConfigError::Invalid(format!("weapons.{} spread/range out of bounds", slot)));
            }
        }

        if self.grenade.sweep_rays == 0 || self.grenade.explosion_range <= 0.0 {
            return Err(ConfigError::Invalid("grenade sweep needs rays and a positive range".into()));
        }

        if self.rules.controller_retry_seconds <= 0.0 {
            return Err(ConfigError::Invalid("rules.controller_retry_seconds must be > 0".into()));
        }

        Ok(())
    }
}

/// Граната: бросок, фитиль, радиальный sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrenadeConfig {
    pub fuse_seconds: f32,
    pub launch_speed: f32,
    pub gravity: f32,
    /// Смещение точки спавна от глаз вдоль направления прицела
    pub muzzle_offset: f32,
    pub explosion_range: f32,
    pub impulse: f32,
    pub sweep_rays: u32,
    pub sweep_pitch_degrees: f32,
}

impl Default for GrenadeConfig {
    fn default() -> Self {
        Self {
            fuse_seconds: 3.0,
            launch_speed: 2000.0,
            gravity: 980.0,
            muzzle_offset: 60.0,
            explosion_range: 1500.0,
            impulse: 400_000.0,
            sweep_rays: 360,
            sweep_pitch_degrees: 5.0,
        }
    }
}

/// Правила матча: HP, смерть → уход, связывание с клиентом, подбор оружия
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRulesConfig {
    pub starting_health: f32,
    pub death_delay_seconds: f32,
    pub human_outcome: RetireOutcome,
    pub ai_outcome: RetireOutcome,
    pub controller_retry_seconds: f32,
    pub pickup_radius: f32,
}

impl Default for MatchRulesConfig {
    fn default() -> Self {
        Self {
            starting_health: 100.0,
            death_delay_seconds: 3.0,
            human_outcome: RetireOutcome::RespawnEligible,
            ai_outcome: RetireOutcome::Removal,
            controller_retry_seconds: 0.5,
            pickup_radius: 100.0,
        }
    }
}

/// Presentation ids персонажа и гранаты (клиент)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterPresentation {
    pub death_down_animation: String,
    pub death_standing_animation: String,
    pub grenade_throw_animation: String,
    pub grenade_trail_effect: String,
    pub explosion_effect: String,
    pub explosion_sound: String,
}

impl Default for CharacterPresentation {
    fn default() -> Self {
        Self {
            death_down_animation: "death_down".into(),
            death_standing_animation: "death_no_down".into(),
            grenade_throw_animation: "grenade_throw".into(),
            grenade_trail_effect: "grenade_trail".into(),
            explosion_effect: "explosion".into(),
            explosion_sound: "explosion".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::WeaponKind;

    #[test]
    fn test_defaults_are_valid() {
        let config = CombatConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weapons.rifle.kind, WeaponKind::Rifle);
        assert_eq!(config.grenade.explosion_range, 1500.0);
        assert_eq!(config.rules.controller_retry_seconds, 0.5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CombatConfig::from_toml_str(
            r#"
            seed = 7

            [rules]
            death_delay_seconds = 5.0
            ai_outcome = "RespawnEligible"
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.seed, 7);
        assert_eq!(config.tick_hz, 60.0);
        assert_eq!(config.rules.death_delay_seconds, 5.0);
        assert_eq!(config.rules.ai_outcome, RetireOutcome::RespawnEligible);
        assert_eq!(config.rules.starting_health, 100.0);
        assert_eq!(config.weapons, WeaponCatalog::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = CombatConfig::from_toml_str("tick_hz = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CombatConfig::from_toml_str("[grenade]\nsweep_rays = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = CombatConfig::from_toml_str("seed = = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CombatConfig::load("/definitely/not/here/combat.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
