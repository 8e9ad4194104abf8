//! Wire protocol: ClientFrame (commands) / ServerFrame (replication, cosmetics, feedback)
//!
//! Формат: JSON text (serde_json). Клиенту никогда не доверяем:
//! битый кадр → `ProtocolError`, кадр выбрасывается, тик продолжается.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::{Command, CosmeticEvent, FeedbackEvent};
use crate::components::{ClientId, NetId, WeaponSlot};
use crate::match_rules::RetireOutcome;
use crate::weapon::WeaponKind;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown entity {0}")]
    UnknownEntity(NetId),

    #[error("{client} does not own {entity}")]
    NotOwner { client: ClientId, entity: NetId },
}

/// Client → server: одна команда для своего комбатанта
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    /// Монотонный номер кадра на подключение (дубликаты отбрасываются)
    pub sequence: u64,
    pub combatant: NetId,
    pub command: Command,
}

/// Реплицируемые поля комбатанта (server → all)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub health: f32,
    pub max_health: f32,
    pub magazine: u32,
    pub reserve: u32,
    pub firing: bool,
    pub reloading: bool,
    pub aiming: bool,
    pub exploding: bool,
    pub dead: bool,
    pub weapon: Option<WeaponKind>,
    pub active_slot: WeaponSlot,
}

/// Server → client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerFrame {
    /// Авторитетное состояние; revision строго растёт per entity
    Replicate {
        entity: NetId,
        revision: u64,
        state: CombatantSnapshot,
    },
    /// Cosmetic hint для всех
    Cosmetic(CosmeticEvent),
    /// Feedback только владельцу
    Feedback { entity: NetId, event: FeedbackEvent },
    /// Комбатант ушёл из матча
    Retired { entity: NetId, outcome: RetireOutcome },
}

pub fn encode<T: Serialize>(frame: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(frame)?)
}

pub fn decode<T: DeserializeOwned>(payload: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(payload)?)
}

impl ClientFrame {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        encode(self)
    }

    pub fn decode(payload: &str) -> Result<Self, ProtocolError> {
        decode(payload)
    }
}

impl ServerFrame {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        encode(self)
    }

    pub fn decode(payload: &str) -> Result<Self, ProtocolError> {
        decode(payload)
    }

    /// Entity, к которой относится кадр (None для мировых cosmetic)
    pub fn entity(&self) -> Option<NetId> {
        match self {
            ServerFrame::Replicate { entity, .. }
            | ServerFrame::Feedback { entity, .. }
            | ServerFrame::Retired { entity, .. } => Some(*entity),
            ServerFrame::Cosmetic(_) => None,
        }
    }
}
