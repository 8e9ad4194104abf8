//! Сетевая идентичность: NetId (wire id entity), ClientId, OwnerLink

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire id entity (bits серверного `Entity`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetId(pub u64);

impl NetId {
    /// Обратно в `Entity` (None для мусорных bits от клиента)
    pub fn entity(self) -> Option<Entity> {
        Entity::try_from_bits(self.0).ok()
    }
}

impl From<Entity> for NetId {
    fn from(entity: Entity) -> Self {
        NetId(entity.to_bits())
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

/// Id подключения клиента (выдаёт транспорт)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Reflect)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Связь комбатанта с владеющим клиентом (AI: client = None навсегда)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct OwnerLink {
    pub client: Option<ClientId>,
    /// HUD-ready уже отправлен владельцу
    pub hud_ready: bool,
}

impl OwnerLink {
    pub fn owned_by(client: ClientId) -> Self {
        Self {
            client: Some(client),
            hud_ready: false,
        }
    }

    pub fn is_owned_by(&self, client: ClientId) -> bool {
        self.client == Some(client)
    }
}
