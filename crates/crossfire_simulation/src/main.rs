//! Headless симуляция Crossfire
//!
//! Сценарий: человек с винтовкой против AI со снайперкой, 600 тиков.
//! Первый аргумент: путь к TOML конфигу (иначе defaults).

use bevy::prelude::*;
use crossfire_simulation::logger;
use crossfire_simulation::*;
// bevy prelude тоже экспортирует `Command` (trait)
use crossfire_simulation::Command;

fn load_config() -> CombatConfig {
    let Some(path) = std::env::args().nth(1) else {
        return CombatConfig::default();
    };
    match CombatConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            logger::log_error(&format!("Config {} rejected ({}), using defaults", path, err));
            CombatConfig::default()
        }
    }
}

fn main() {
    let config = load_config();
    let seed = config.seed;

    let mut app = create_headless_app(seed);
    logger::set_log_level(logger::LogLevel::Info);
    app.insert_resource(config);
    app.add_plugins(SimulationPlugin);

    logger::log_info(&format!("Starting Crossfire headless simulation (seed: {})", seed));

    let human = spawn_combatant(
        app.world_mut(),
        CombatantSpawn::human(Vec3::ZERO)
            .owned_by(ClientId(1))
            .with_weapon(WeaponKind::Rifle),
    );
    let bot = spawn_combatant(
        app.world_mut(),
        CombatantSpawn::ai(Vec3::new(0.0, 0.0, -1200.0)).with_weapon(WeaponKind::Sniper),
    );
    app.world_mut().spawn((Obstacle { half_extents: Vec3::new(400.0, 10.0, 400.0) }, Transform::from_xyz(0.0, -10.0, 0.0)));
    app.world_mut().spawn((PhysicsProp::new(40.0, 50.0), Transform::from_xyz(250.0, 40.0, -300.0)));

    let aim_at_bot = Command::Fire {
        origin: [0.0, 165.0, 0.0],
        direction: [0.0, 0.0, -1.0],
        moving: false,
    };
    let aim_at_human = Command::Fire {
        origin: [0.0, 165.0, -1200.0],
        direction: [0.0, 0.0, 1.0],
        moving: false,
    };

    for tick in 0..600u32 {
        match tick {
            10 => {
                app.world_mut().send_event(CombatCommand { combatant: bot, command: Command::ToggleAim });
            }
            20 => {
                app.world_mut().send_event(CombatCommand { combatant: human, command: aim_at_bot.clone() });
                app.world_mut().send_event(CombatCommand { combatant: bot, command: aim_at_human.clone() });
            }
            35 => {
                app.world_mut().send_event(CombatCommand { combatant: human, command: Command::StopFire });
            }
            40 => {
                app.world_mut().send_event(CombatCommand { combatant: human, command: Command::Reload });
            }
            200 => {
                app.world_mut().send_event(CombatCommand { combatant: human, command: aim_at_bot.clone() });
            }
            _ => {}
        }

        run_combat_tick(&mut app);

        let sent = app.world_mut().resource_mut::<ServerOutbox>().drain().len();
        if tick % 100 == 0 {
            let entity_count = app.world().entities().len();
            logger::log_info(&format!("Tick {}: {} entities, {} frames out", tick, entity_count, sent));
        }
    }

    let scoreboard = app.world().resource::<Scoreboard>();
    for (combatant, entry) in scoreboard.entries() {
        logger::log_info(&format!(
            "{}: {} kills, {} deaths, {:.1} damage",
            combatant, entry.kills, entry.deaths, entry.damage_dealt
        ));
    }

    logger::log_info("Simulation complete!");
}
