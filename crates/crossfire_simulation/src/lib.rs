//! Crossfire Simulation Core
//!
//! Server-authoritative combat на Bevy 0.16 (headless):
//! - Сервер решает ammo / hit-scan / splash / HP / смерть
//! - Клиенты шлют команды и проигрывают cosmetic hints
//!
//! Один FixedUpdate = один тик (`CombatClock`), порядок фаз: `CombatSet`.

use bevy::app::PluginsState;
use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod combat;
pub mod components;
pub mod config;
pub mod logger;
pub mod match_rules;
pub mod net;
pub mod schedule;
pub mod weapon;
pub mod world;

use world::WorldPhysicsPlugin;

// Re-export для удобства
pub use combat::{
    CombatCommand, CombatPlugin, CombatSet, Command, CommandRejection, CosmeticBroadcast, CosmeticEvent, DamageDealt,
    DamageEvent, DamageSource, Dead, DeathPose, EntityDied, FeedbackEvent, OwnerFeedback, ShotResolved,
};
pub use components::*;
pub use config::{CombatConfig, ConfigError};
pub use match_rules::{
    issue_weapon, spawn_combatant, CombatantRetired, CombatantSpawn, ConnectionRegistry, IssueWeapon,
    MatchRulesPlugin, RetireOutcome, Scoreboard, WeaponPickup,
};
pub use net::{ClientFrame, NetPlugin, ServerFrame, ServerInbox, ServerOutbox};
pub use schedule::{CombatClock, ScheduledTasks, TaskElapsed, TaskHandle, TaskKind};
pub use weapon::{WeaponAuthority, WeaponKind, WeaponProfile};
pub use world::{BodyShape, Obstacle, PhysicsProp, PhysicsWorld, SurfaceClass, WorldQuery};

/// Главный plugin симуляции (объединяет все подсистемы)
///
/// `CombatConfig` берётся из World, если вставлен до plugin'а, иначе defaults.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = app
            .world()
            .get_resource::<CombatConfig>()
            .cloned()
            .unwrap_or_default();

        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(config.seed));
        }

        app.insert_resource(Time::<Fixed>::from_hz(config.tick_hz))
            .insert_resource(CombatClock::from_hz(config.tick_hz))
            .insert_resource(config)
            .add_event::<TaskElapsed>();

        app.configure_sets(
            FixedUpdate,
            (
                CombatSet::Intake,
                CombatSet::Commands,
                CombatSet::Timers,
                CombatSet::Projectiles,
                CombatSet::Damage,
                CombatSet::Death,
                CombatSet::Replicate,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            schedule::advance_combat_clock
                .before(world::attach_colliders)
                .in_set(CombatSet::Intake),
        );

        app.add_plugins((WorldPhysicsPlugin, CombatPlugin, MatchRulesPlugin, NetPlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    logger::init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed));

    app
}

/// Один тик симуляции, независимо от wall clock
///
/// `First` → `FixedUpdate` → `FixedPostUpdate`: буферы событий вращаются раз в тик
/// (сигнал даёт FixedPostUpdate), после вызова `iter_current_update_events`
/// отдаёт события ровно этого тика.
pub fn run_combat_tick(app: &mut App) {
    start_once(app);
    let world = app.world_mut();
    world.run_schedule(First);
    world.run_schedule(FixedUpdate);
    world.run_schedule(FixedPostUpdate);
}

/// То же, что `App::run` делает до первого кадра: finish/cleanup plugins + Startup
fn start_once(app: &mut App) {
    if matches!(app.plugins_state(), PluginsState::Cleaned) {
        return;
    }
    app.finish();
    app.cleanup();

    let world = app.world_mut();
    for result in [
        world.try_run_schedule(PreStartup),
        world.try_run_schedule(Startup),
        world.try_run_schedule(PostStartup),
    ] {
        if let Err(err) = result {
            logger::log(&format!("⏭️ {}", err));
        }
    }
}

pub fn run_combat_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        run_combat_tick(app);
    }
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
