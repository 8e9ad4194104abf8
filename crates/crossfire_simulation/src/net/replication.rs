//! Server-side replication
//!
//! Intake: ServerInbox (сырые кадры) → CombatCommand
//! Replicate: snapshot diff → ServerOutbox, cosmetics всем, feedback владельцу.

use bevy::prelude::*;
use std::collections::HashMap;

use super::protocol::{ClientFrame, CombatantSnapshot, ProtocolError, ServerFrame};
use crate::combat::{CombatCommand, CosmeticBroadcast, OwnerFeedback};
use crate::components::{ClientId, CombatFlags, Combatant, Health, Loadout, NetId, OwnerLink};
use crate::match_rules::CombatantRetired;
use crate::weapon::WeaponAuthority;

/// Входящие кадры от клиентов (заполняет транспорт)
#[derive(Resource, Debug, Default)]
pub struct ServerInbox {
    frames: Vec<(ClientId, String)>,
}

impl ServerInbox {
    pub fn push(&mut self, client: ClientId, payload: impl Into<String>) {
        self.frames.push((client, payload.into()));
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Кому адресован исходящий кадр
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    Client(ClientId),
}

impl Audience {
    pub fn includes(self, client: ClientId) -> bool {
        match self {
            Audience::All => true,
            Audience::Client(target) => target == client,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub audience: Audience,
    pub payload: String,
}

/// Исходящие кадры (забирает транспорт через `drain`)
#[derive(Resource, Debug, Default)]
pub struct ServerOutbox {
    messages: Vec<Outbound>,
}

impl ServerOutbox {
    fn send(&mut self, audience: Audience, frame: &ServerFrame) {
        match frame.encode() {
            Ok(payload) => self.messages.push(Outbound { audience, payload }),
            Err(err) => crate::logger::log_error(&format!("📡 Failed to encode {:?}: {}", frame, err)),
        }
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.messages)
    }

    pub fn messages(&self) -> &[Outbound] {
        &self.messages
    }
}

/// Последний принятый sequence по клиенту
#[derive(Resource, Debug, Default)]
pub struct ClientSequences {
    last: HashMap<ClientId, u64>,
}

impl ClientSequences {
    /// true если кадр новый (строго больше последнего принятого)
    pub fn accept(&mut self, client: ClientId, sequence: u64) -> bool {
        match self.last.get(&client) {
            Some(&last) if sequence <= last => false,
            _ => {
                self.last.insert(client, sequence);
                true
            }
        }
    }
}

/// Что и с какой revision уже ушло по каждой entity
#[derive(Resource, Debug, Default)]
pub struct ReplicationLedger {
    sent: HashMap<Entity, (u64, CombatantSnapshot)>,
}

impl ReplicationLedger {
    pub fn revision(&self, entity: Entity) -> Option<u64> {
        self.sent.get(&entity).map(|(revision, _)| *revision)
    }
}

fn validate_frame(
    client: ClientId,
    frame: &ClientFrame,
    owners: &Query<&OwnerLink, With<Combatant>>,
) -> Result<Entity, ProtocolError> {
    let entity = frame
        .combatant
        .entity()
        .ok_or(ProtocolError::UnknownEntity(frame.combatant))?;
    let link = owners
        .get(entity)
        .map_err(|_| ProtocolError::UnknownEntity(frame.combatant))?;
    if !link.is_owned_by(client) {
        return Err(ProtocolError::NotOwner {
            client,
            entity: frame.combatant,
        });
    }
    Ok(entity)
}

/// Система (Intake): decode + dedupe + проверка владения → CombatCommand
pub fn ingest_client_frames(
    mut inbox: ResMut<ServerInbox>,
    mut sequences: ResMut<ClientSequences>,
    owners: Query<&OwnerLink, With<Combatant>>,
    mut commands_out: EventWriter<CombatCommand>,
) {
    for (client, payload) in inbox.frames.drain(..) {
        let frame = match ClientFrame::decode(&payload) {
            Ok(frame) => frame,
            Err(err) => {
                crate::logger::log_warning(&format!("📡 Dropped frame from {}: {}", client, err));
                continue;
            }
        };

        if !sequences.accept(client, frame.sequence) {
            crate::logger::log(&format!(
                "📡 Duplicate/stale frame #{} from {} ignored",
                frame.sequence, client
            ));
            continue;
        }

        match validate_frame(client, &frame, &owners) {
            Ok(combatant) => {
                commands_out.write(CombatCommand {
                    combatant,
                    command: frame.command,
                });
            }
            Err(err) => crate::logger::log_warning(&format!("📡 Rejected frame from {}: {}", client, err)),
        }
    }
}

/// Собрать snapshot (оружие: активный слот)
pub fn snapshot_of(
    health: &Health,
    flags: &CombatFlags,
    loadout: &Loadout,
    weapon: Option<&WeaponAuthority>,
) -> CombatantSnapshot {
    CombatantSnapshot {
        health: health.current(),
        max_health: health.max(),
        magazine: weapon.map_or(0, |w| w.magazine()),
        reserve: weapon.map_or(0, |w| w.reserve()),
        firing: flags.is_firing(),
        reloading: flags.is_reloading(),
        aiming: flags.is_aiming(),
        exploding: flags.is_exploding(),
        dead: flags.is_dead(),
        weapon: weapon.map(|w| w.kind()),
        active_slot: loadout.active,
    }
}

/// Система (Replicate): отправить изменившиеся snapshots (reliable, ordered per entity)
pub fn replicate_combatants(
    mut ledger: ResMut<ReplicationLedger>,
    mut outbox: ResMut<ServerOutbox>,
    combatants: Query<(Entity, &Health, &CombatFlags, &Loadout), With<Combatant>>,
    weapons: Query<&WeaponAuthority>,
) {
    // Детерминированный порядок кадров
    let mut rows: Vec<_> = combatants.iter().collect();
    rows.sort_by_key(|(entity, ..)| *entity);

    for (entity, health, flags, loadout) in rows {
        let weapon = loadout.active_weapon().and_then(|w| weapons.get(w).ok());
        let snapshot = snapshot_of(health, flags, loadout, weapon);

        let revision = match ledger.sent.get(&entity) {
            Some((_, last)) if *last == snapshot => continue,
            Some((revision, _)) => revision + 1,
            None => 1,
        };

        outbox.send(
            Audience::All,
            &ServerFrame::Replicate {
                entity: NetId::from(entity),
                revision,
                state: snapshot.clone(),
            },
        );
        ledger.sent.insert(entity, (revision, snapshot));
    }

    ledger.sent.retain(|entity, _| combatants.contains(*entity));
}

/// Система (Replicate): cosmetic broadcasts → все
pub fn fan_out_cosmetics(mut cosmetics: EventReader<CosmeticBroadcast>, mut outbox: ResMut<ServerOutbox>) {
    for CosmeticBroadcast(event) in cosmetics.read() {
        outbox.send(Audience::All, &ServerFrame::Cosmetic(event.clone()));
    }
}

/// Система (Replicate): owner feedback → только владельцу (AI: никому)
pub fn route_owner_feedback(
    mut feedback: EventReader<OwnerFeedback>,
    owners: Query<&OwnerLink>,
    mut outbox: ResMut<ServerOutbox>,
) {
    for OwnerFeedback { combatant, event } in feedback.read() {
        let Some(client) = owners.get(*combatant).ok().and_then(|link| link.client) else {
            continue;
        };
        outbox.send(
            Audience::Client(client),
            &ServerFrame::Feedback {
                entity: NetId::from(*combatant),
                event: event.clone(),
            },
        );
    }
}

/// Система (Replicate): уход из матча → все
pub fn announce_retirements(mut retired: EventReader<CombatantRetired>, mut outbox: ResMut<ServerOutbox>) {
    for event in retired.read() {
        outbox.send(
            Audience::All,
            &ServerFrame::Retired {
                entity: event.combatant,
                outcome: event.outcome,
            },
        );
    }
}
