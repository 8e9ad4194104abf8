//! Match rules collaborator
//!
//! - Выдача оружия (`IssueWeapon`) и подбор с земли (`WeaponPickup`)
//! - Scoreboard (EntityDied / DamageDealt)
//! - Уход после смерти (`CombatantRetired`: respawn-eligible или removal)
//! - Связывание комбатанта с клиентом (повтор каждые 0.5 s)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::combat::{CombatSet, DamageDealt, EntityDied, FeedbackEvent, OwnerFeedback};
use crate::components::{AimInput, ClientId, CombatFlags, Combatant, ControllerKind, Health, Loadout, NetId, OwnerLink};
use crate::config::CombatConfig;
use crate::schedule::{advance_combat_clock, collect_due_tasks, CombatClock, ScheduledTasks, TaskElapsed, TaskKind};
use crate::weapon::{WeaponAuthority, WeaponKind};
use crate::world::BodyShape;


/// Match rules plugin: выдача оружия, связывание владельцев, очки, уход
pub struct MatchRulesPlugin;

impl Plugin for MatchRulesPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<IssueWeapon>()
            .add_event::<CombatantRetired>()
            .init_resource::<Scoreboard>()
            .init_resource::<ConnectionRegistry>();

        app.add_systems(
            FixedUpdate,
            (
                (process_weapon_issues, collect_weapon_pickups, link_new_owners)
                    .chain()
                    .after(advance_combat_clock)
                    .in_set(CombatSet::Intake),
                retry_owner_links.after(collect_due_tasks).in_set(CombatSet::Timers),
                (record_scores, retire_combatants)
                    .chain()
                    .after(crate::combat::death::handle_deaths)
                    .in_set(CombatSet::Death),
            ),
        );
    }
}

/// Высота глаз над Transform (origin прицела по умолчанию)
pub const EYE_HEIGHT: f32 = 165.0;

/// Что происходит с комбатантом после смерти
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum RetireOutcome {
    /// Entity уходит, владелец может респавниться
    RespawnEligible,
    /// Entity уходит навсегда
    Removal,
}

/// Выдать оружие комбатанту
#[derive(Event, Debug, Clone, Copy)]
pub struct IssueWeapon {
    pub combatant: Entity,
    pub kind: WeaponKind,
}

/// Комбатант ушёл из матча (entity уже despawn)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct CombatantRetired {
    pub combatant: NetId,
    pub controller: ControllerKind,
    pub owner: Option<ClientId>,
    pub outcome: RetireOutcome,
}

/// Оружие на земле: подбирается живым комбатантом в радиусе
#[derive(Component, Debug, Clone, Copy)]
pub struct WeaponPickup {
    pub kind: WeaponKind,
    /// (magazine, reserve); None = как новое
    pub ammo: Option<(u32, u32)>,
}

/// Клиенты, владеющие комбатантами (заполняет транспорт/лобби)
#[derive(Resource, Debug, Default)]
pub struct ConnectionRegistry {
    possessions: HashMap<NetId, ClientId>,
}

impl ConnectionRegistry {
    pub fn possess(&mut self, combatant: NetId, client: ClientId) {
        self.possessions.insert(combatant, client);
    }

    pub fn release(&mut self, combatant: NetId) {
        self.possessions.remove(&combatant);
    }

    pub fn owner_of(&self, combatant: NetId) -> Option<ClientId> {
        self.possessions.get(&combatant).copied()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreEntry {
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: f32,
}

/// Очки матча (детерминированный порядок по NetId)
#[derive(Resource, Debug, Default)]
pub struct Scoreboard {
    entries: BTreeMap<NetId, ScoreEntry>,
}

impl Scoreboard {
    pub fn entry(&self, combatant: impl Into<NetId>) -> ScoreEntry {
        self.entries.get(&combatant.into()).copied().unwrap_or_default()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&NetId, &ScoreEntry)> {
        self.entries.iter()
    }

    fn entry_mut(&mut self, combatant: Entity) -> &mut ScoreEntry {
        self.entries.entry(NetId::from(combatant)).or_default()
    }
}

/// Параметры спавна комбатанта
#[derive(Debug, Clone)]
pub struct CombatantSpawn {
    pub controller: ControllerKind,
    pub position: Vec3,
    pub owner: Option<ClientId>,
    pub weapon: Option<WeaponKind>,
    pub body: Option<BodyShape>,
}

impl CombatantSpawn {
    pub fn human(position: Vec3) -> Self {
        Self {
            controller: ControllerKind::Human,
            position,
            owner: None,
            weapon: None,
            body: None,
        }
    }

    pub fn ai(position: Vec3) -> Self {
        Self {
            controller: ControllerKind::Ai,
            ..Self::human(position)
        }
    }

    pub fn owned_by(mut self, client: ClientId) -> Self {
        self.owner = Some(client);
        self
    }

    pub fn with_weapon(mut self, kind: WeaponKind) -> Self {
        self.weapon = Some(kind);
        self
    }

    pub fn with_body(mut self, body: BodyShape) -> Self {
        self.body = Some(body);
        self
    }
}

/// Спавн комбатанта прямо в World (тесты, headless main, лобби)
pub fn spawn_combatant(world: &mut World, spawn: CombatantSpawn) -> Entity {
    let starting_health = world
        .get_resource::<CombatConfig>()
        .map(|config| config.rules.starting_health)
        .unwrap_or(100.0);

    let mut entity = world.spawn((
        Combatant {
            controller: spawn.controller,
        },
        Transform::from_translation(spawn.position),
        Health::new(starting_health),
        AimInput {
            origin: spawn.position + Vec3::Y * EYE_HEIGHT,
            ..default()
        },
    ));
    if let Some(client) = spawn.owner {
        entity.insert(OwnerLink::owned_by(client));
    }
    if let Some(body) = spawn.body {
        entity.insert(body);
    }
    let combatant = entity.id();

    if let Some(kind) = spawn.weapon {
        issue_weapon(world, combatant, kind, None);
    }

    crate::logger::log(&format!(
        "🧍 Spawned {:?} {:?} at {:?}",
        spawn.controller, combatant, spawn.position
    ));
    combatant
}

/// Выдать оружие прямо в World. None если слотов нет / комбатант мёртв.
pub fn issue_weapon(world: &mut World, combatant: Entity, kind: WeaponKind, ammo: Option<(u32, u32)>) -> Option<Entity> {
    let alive = world.get::<CombatFlags>(combatant).is_some_and(|flags| !flags.is_dead());
    let has_slot = world.get::<Loadout>(combatant).is_some_and(|loadout| loadout.has_free_slot());
    if !alive || !has_slot {
        crate::logger::log(&format!("🚫 Cannot issue {:?} to {:?}", kind, combatant));
        return None;
    }

    let profile = world
        .get_resource::<CombatConfig>()
        .map(|config| config.weapons.profile(kind).clone())
        .unwrap_or_else(|| CombatConfig::default().weapons.profile(kind).clone());
    let weapon = world.spawn(make_authority(combatant, profile, ammo)).id();

    let slot = world.get_mut::<Loadout>(combatant).and_then(|mut loadout| loadout.equip(weapon))?;
    world.send_event(OwnerFeedback {
        combatant,
        event: FeedbackEvent::WeaponEquipped { slot, weapon: kind },
    });
    Some(weapon)
}

fn make_authority(owner: Entity, profile: crate::weapon::WeaponProfile, ammo: Option<(u32, u32)>) -> WeaponAuthority {
    match ammo {
        Some((magazine, reserve)) => WeaponAuthority::with_ammo(owner, profile, magazine, reserve),
        None => WeaponAuthority::issue(owner, profile),
    }
}

/// Система: IssueWeapon events → WeaponAuthority entity + экипировка
pub fn process_weapon_issues(
    mut issues: EventReader<IssueWeapon>,
    config: Res<CombatConfig>,
    mut combatants: Query<(&CombatFlags, &mut Loadout), With<Combatant>>,
    mut feedback: EventWriter<OwnerFeedback>,
    mut commands: Commands,
) {
    for issue in issues.read() {
        let Ok((flags, mut loadout)) = combatants.get_mut(issue.combatant) else {
            crate::logger::log_warning(&format!("IssueWeapon: {:?} is not a combatant", issue.combatant));
            continue;
        };
        if flags.is_dead() || !loadout.has_free_slot() {
            crate::logger::log(&format!("🚫 IssueWeapon {:?} → {:?} rejected", issue.kind, issue.combatant));
            continue;
        }

        let profile = config.weapons.profile(issue.kind).clone();
        let weapon = commands.spawn(WeaponAuthority::issue(issue.combatant, profile)).id();
        let Some(slot) = loadout.equip(weapon) else {
            continue;
        };
        feedback.write(OwnerFeedback {
            combatant: issue.combatant,
            event: FeedbackEvent::WeaponEquipped { slot, weapon: issue.kind },
        });
    }
}

/// Система: подбор оружия с земли (живой комбатант со свободным слотом в радиусе)
pub fn collect_weapon_pickups(
    config: Res<CombatConfig>,
    pickups: Query<(Entity, &WeaponPickup, &Transform)>,
    mut combatants: Query<(Entity, &Transform, &CombatFlags, &mut Loadout), With<Combatant>>,
    mut feedback: EventWriter<OwnerFeedback>,
    mut commands: Commands,
) {
    let radius_sq = config.rules.pickup_radius * config.rules.pickup_radius;

    for (pickup_entity, pickup, pickup_transform) in pickups.iter() {
        let nearest = combatants
            .iter_mut()
            .filter(|(_, transform, flags, loadout)| {
                !flags.is_dead()
                    && loadout.has_free_slot()
                    && transform.translation.distance_squared(pickup_transform.translation) <= radius_sq
            })
            .min_by(|a, b| {
                let da = a.1.translation.distance_squared(pickup_transform.translation);
                let db = b.1.translation.distance_squared(pickup_transform.translation);
                da.total_cmp(&db).then(a.0.cmp(&b.0))
            });

        let Some((combatant, _, _, mut loadout)) = nearest else {
            continue;
        };

        let profile = config.weapons.profile(pickup.kind).clone();
        let weapon = commands.spawn(make_authority(combatant, profile, pickup.ammo)).id();
        let Some(slot) = loadout.equip(weapon) else {
            continue;
        };
        commands.entity(pickup_entity).despawn();

        feedback.write(OwnerFeedback {
            combatant,
            event: FeedbackEvent::WeaponEquipped { slot, weapon: pickup.kind },
        });
        crate::logger::log(&format!("🔫 {:?} picked up {:?} into {:?}", combatant, pickup.kind, slot));
    }
}

/// Система: связывание новых человеческих комбатантов с клиентом + HUD ready
pub fn link_new_owners(
    clock: Res<CombatClock>,
    config: Res<CombatConfig>,
    registry: Res<ConnectionRegistry>,
    mut spawned: Query<(Entity, &Combatant, &mut OwnerLink, &mut ScheduledTasks), Added<Combatant>>,
    mut feedback: EventWriter<OwnerFeedback>,
) {
    for (entity, combatant, mut link, mut tasks) in spawned.iter_mut() {
        if combatant.controller != ControllerKind::Human {
            continue;
        }
        try_link_owner(entity, &registry, &mut link, &mut feedback);
        if link.client.is_none() {
            tasks.schedule(TaskKind::ControllerRetry, clock.now(), config.rules.controller_retry_seconds as f64);
        }
    }
}

/// Система: ControllerRetry task → ещё попытка (и снова через 0.5 s при неудаче)
pub fn retry_owner_links(
    mut elapsed: EventReader<TaskElapsed>,
    clock: Res<CombatClock>,
    config: Res<CombatConfig>,
    registry: Res<ConnectionRegistry>,
    mut combatants: Query<(&CombatFlags, &mut OwnerLink, &mut ScheduledTasks)>,
    mut feedback: EventWriter<OwnerFeedback>,
) {
    for event in elapsed.read() {
        if event.kind() != TaskKind::ControllerRetry {
            continue;
        }
        let Ok((flags, mut link, mut tasks)) = combatants.get_mut(event.entity) else {
            continue;
        };
        if flags.is_dead() {
            continue;
        }

        try_link_owner(event.entity, &registry, &mut link, &mut feedback);
        if link.client.is_none() {
            crate::logger::log(&format!("🔌 {:?} has no controller yet, retrying", event.entity));
            tasks.schedule(TaskKind::ControllerRetry, clock.now(), config.rules.controller_retry_seconds as f64);
        }
    }
}

fn try_link_owner(
    entity: Entity,
    registry: &ConnectionRegistry,
    link: &mut OwnerLink,
    feedback: &mut EventWriter<OwnerFeedback>,
) {
    if link.client.is_none() {
        link.client = registry.owner_of(NetId::from(entity));
    }
    if link.client.is_some() && !link.hud_ready {
        link.hud_ready = true;
        feedback.write(OwnerFeedback {
            combatant: entity,
            event: FeedbackEvent::HudReady,
        });
    }
}

/// Система: очки (kill засчитывается только при наличии killer)
pub fn record_scores(
    mut died: EventReader<EntityDied>,
    mut dealt: EventReader<DamageDealt>,
    mut scoreboard: ResMut<Scoreboard>,
) {
    for event in dealt.read() {
        if let Some(attacker) = event.attacker.filter(|attacker| *attacker != event.target) {
            scoreboard.entry_mut(attacker).damage_dealt += event.damage;
        }
    }

    for event in died.read() {
        scoreboard.entry_mut(event.entity).deaths += 1;
        if let Some(killer) = event.killer {
            scoreboard.entry_mut(killer).kills += 1;
        }
    }
}

/// Система: Retire task → CombatantRetired + despawn
pub fn retire_combatants(
    mut elapsed: EventReader<TaskElapsed>,
    config: Res<CombatConfig>,
    mut registry: ResMut<ConnectionRegistry>,
    combatants: Query<(&Combatant, &OwnerLink, &CombatFlags)>,
    mut retired: EventWriter<CombatantRetired>,
    mut commands: Commands,
) {
    for event in elapsed.read() {
        if event.kind() != TaskKind::Retire {
            continue;
        }
        let Ok((combatant, link, flags)) = combatants.get(event.entity) else {
            continue;
        };
        if !flags.is_dead() {
            continue;
        }

        let outcome = match combatant.controller {
            ControllerKind::Human => config.rules.human_outcome,
            ControllerKind::Ai => config.rules.ai_outcome,
        };
        let net_id = NetId::from(event.entity);
        registry.release(net_id);

        retired.write(CombatantRetired {
            combatant: net_id,
            controller: combatant.controller,
            owner: link.client,
            outcome,
        });

        if let Ok(mut entity_commands) = commands.get_entity(event.entity) {
            entity_commands.despawn();
        }
        crate::logger::log_info(&format!("👋 {:?} retired ({:?})", event.entity, outcome));
    }
}
