//! Replication / Command Protocol
//!
//! Два канала:
//! - Authoritative fields: `ServerFrame::Replicate` (revision per entity, on change)
//! - One-shot hints: cosmetic broadcasts всем, feedback владельцу
//!
//! Транспорт вне crate: кладёт сырые кадры в `ServerInbox`, забирает `ServerOutbox`.

use bevy::prelude::*;

use crate::combat::CombatSet;

pub mod protocol;
pub mod replication;


pub use protocol::{decode, encode, ClientFrame, CombatantSnapshot, ProtocolError, ServerFrame};
pub use replication::{
    snapshot_of, Audience, ClientSequences, Outbound, ReplicationLedger, ServerInbox, ServerOutbox,
};

pub struct NetPlugin;

impl Plugin for NetPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ServerInbox>()
            .init_resource::<ServerOutbox>()
            .init_resource::<ClientSequences>()
            .init_resource::<ReplicationLedger>();

        app.add_systems(
            FixedUpdate,
            (
                replication::ingest_client_frames.in_set(CombatSet::Intake),
                (
                    replication::replicate_combatants,
                    replication::fan_out_cosmetics,
                    replication::route_owner_feedback,
                    replication::announce_retirements,
                )
                    .chain()
                    .in_set(CombatSet::Replicate),
            ),
        );
    }
}
