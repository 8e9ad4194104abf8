//! Client link: входящие server кадры, исходящие команды, possession
//!
//! Транспорт вне crate: кладёт payload'ы через `push_server`, забирает `drain_outgoing`.
//! Клиент только ПРОСИТ действия; исход решает сервер.

use bevy::prelude::*;
use thiserror::Error;

use crossfire_simulation::net::ProtocolError;
use crossfire_simulation::{logger, ClientFrame, ClientId, Command, NetId, SpeedTier};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("no possessed combatant yet")]
    NotPossessed,

    #[error("failed to encode frame: {0}")]
    Encode(#[from] ProtocolError),
}

/// Подключение этого клиента к серверу (resource)
#[derive(Resource, Debug)]
pub struct ClientLink {
    pub client_id: ClientId,
    inbox: Vec<String>,
    outbox: Vec<String>,
    next_sequence: u64,
    possessed: Option<NetId>,
}

impl ClientLink {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            inbox: Vec::new(),
            outbox: Vec::new(),
            next_sequence: 1,
            possessed: None,
        }
    }

    /// Сырой server payload от транспорта
    pub fn push_server(&mut self, payload: impl Into<String>) {
        self.inbox.push(payload.into());
    }

    pub(crate) fn take_incoming(&mut self) -> Vec<String> {
        std::mem::take(&mut self.inbox)
    }

    /// Закодированные `ClientFrame` для транспорта
    pub fn drain_outgoing(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending_outgoing(&self) -> usize {
        self.outbox.len()
    }

    pub fn possessed(&self) -> Option<NetId> {
        self.possessed
    }

    pub fn possess(&mut self, combatant: NetId) {
        if self.possessed != Some(combatant) {
            logger::log_info(&format!("🎮 {} possesses {}", self.client_id, combatant));
        }
        self.possessed = Some(combatant);
    }

    pub fn release(&mut self) -> Option<NetId> {
        self.possessed.take()
    }

    /// Упаковать команду для своего комбатанта; вернуть sequence кадра
    pub fn send(&mut self, command: Command) -> Result<u64, InputError> {
        let combatant = self.possessed.ok_or(InputError::NotPossessed)?;
        let frame = ClientFrame {
            sequence: self.next_sequence,
            combatant,
            command,
        };
        self.outbox.push(frame.encode()?);
        self.next_sequence += 1;
        Ok(frame.sequence)
    }
}

/// Локальное действие игрока (command surface)
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    FirePressed { origin: Vec3, direction: Vec3, moving: bool },
    FireReleased,
    Reload,
    AimPressed,
    ThrowGrenade,
    SpeedTier(SpeedTier),
    /// Только локально, на сервер не уходит
    SwitchPerspective,
    LockDirection { yaw: f32 },
    UnlockDirection,
    ToggleFireMode,
    /// Камера сдвинулась
    Look { origin: Vec3, direction: Vec3, moving: bool },
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct ClientInput(pub InputAction);

impl InputAction {
    /// Команда для сервера (None = чисто локальное действие)
    pub fn to_command(&self) -> Option<Command> {
        let command = match *self {
            InputAction::FirePressed {
                origin,
                direction,
                moving,
            } => Command::Fire {
                origin: origin.to_array(),
                direction: direction.to_array(),
                moving,
            },
            InputAction::Look {
                origin,
                direction,
                moving,
            } => Command::UpdateView {
                origin: origin.to_array(),
                direction: direction.to_array(),
                moving,
            },
            InputAction::FireReleased => Command::StopFire,
            InputAction::Reload => Command::Reload,
            InputAction::AimPressed => Command::ToggleAim,
            InputAction::ThrowGrenade => Command::ThrowGrenade,
            InputAction::SpeedTier(tier) => Command::SetSpeedTier(tier),
            InputAction::LockDirection { yaw } => Command::LockDirection { yaw },
            InputAction::UnlockDirection => Command::UnlockDirection,
            InputAction::ToggleFireMode => Command::ToggleFireMode,
            InputAction::SwitchPerspective => return None,
        };
        Some(command)
    }
}

/// Система: ClientInput → ClientFrame в outbox
pub fn send_client_input(mut inputs: EventReader<ClientInput>, mut link: ResMut<ClientLink>) {
    for ClientInput(action) in inputs.read() {
        let Some(command) = action.to_command() else {
            continue;
        };
        if let Err(err) = link.send(command) {
            logger::log_warning(&format!("🎮 Input {:?} not sent: {}", action, err));
        }
    }
}
