//! Crossfire client demo: in-process сервер + два клиента (владелец и наблюдатель)
//!
//! Транспорт: просто перекладывание строк между outbox/inbox.

use bevy::prelude::*;
use crossfire_client::{create_client_app, ClientInput, ClientLink, Hud, InputAction, LogPresentation, MirrorRegistry};
use crossfire_simulation::net::Outbound;
use crossfire_simulation::*;

const OWNER: ClientId = ClientId(1);
const OBSERVER: ClientId = ClientId(2);

/// Один шаг: клиенты → сервер, тик, сервер → клиенты
fn pump(server: &mut App, clients: &mut [(ClientId, App)]) {
    for (client_id, client) in clients.iter_mut() {
        let outgoing = client.world_mut().resource_mut::<ClientLink>().drain_outgoing();
        let mut inbox = server.world_mut().resource_mut::<ServerInbox>();
        for payload in outgoing {
            inbox.push(*client_id, payload);
        }
    }

    run_combat_tick(server);

    let messages = server.world_mut().resource_mut::<ServerOutbox>().drain();
    for (client_id, client) in clients.iter_mut() {
        let mut link = client.world_mut().resource_mut::<ClientLink>();
        for Outbound { audience, payload } in &messages {
            if audience.includes(*client_id) {
                link.push_server(payload.clone());
            }
        }
    }
    for (_, client) in clients.iter_mut() {
        client.update();
    }
}

fn main() {
    let mut server = create_headless_app(7);
    logger::set_log_level(logger::LogLevel::Info);
    server.add_plugins(SimulationPlugin);

    spawn_combatant(
        server.world_mut(),
        CombatantSpawn::human(Vec3::ZERO)
            .owned_by(OWNER)
            .with_weapon(WeaponKind::Sniper),
    );
    spawn_combatant(
        server.world_mut(),
        CombatantSpawn::human(Vec3::new(0.0, 0.0, -1500.0))
            .owned_by(OBSERVER)
            .with_weapon(WeaponKind::Rifle),
    );

    let mut clients = vec![
        (OWNER, create_client_app(OWNER, LogPresentation)),
        (OBSERVER, create_client_app(OBSERVER, LogPresentation)),
    ];

    let fire = InputAction::FirePressed {
        origin: Vec3::new(0.0, 165.0, 0.0),
        direction: Vec3::NEG_Z,
        moving: false,
    };

    for frame in 0..240u32 {
        let owner = &mut clients[0].1;
        match frame {
            5 => {
                owner.world_mut().send_event(ClientInput(InputAction::AimPressed));
            }
            10 => {
                owner.world_mut().send_event(ClientInput(fire.clone()));
            }
            20 => {
                owner.world_mut().send_event(ClientInput(InputAction::AimPressed));
            }
            25 => {
                owner.world_mut().send_event(ClientInput(InputAction::SwitchPerspective));
            }
            90 => {
                owner.world_mut().send_event(ClientInput(fire.clone()));
            }
            _ => {}
        }
        pump(&mut server, &mut clients);
    }

    for (client_id, client) in &clients {
        let hud = client.world().resource::<Hud>();
        let mirrors = client.world().resource::<MirrorRegistry>();
        logger::log_info(&format!(
            "{}: HP {:.0}/{:.0}, ammo {}/{}, {} mirror(s)",
            client_id,
            hud.health,
            hud.max_health,
            hud.magazine,
            hud.reserve,
            mirrors.len()
        ));
    }

    logger::log_info("Client demo complete!");
}
