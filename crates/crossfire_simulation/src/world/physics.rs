//! Rapier-backed `WorldQuery` + коллайдеры из ECS shapes.
//!
//! Rapier живёт в том же FixedUpdate: sync → step → writeback идут между
//! `CombatSet::Intake` и `CombatSet::Commands`, так что лучи тика видят мир,
//! уже включающий всё заспавненное к этому тику.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_rapier3d::plugin::PhysicsSet;
use bevy_rapier3d::prelude::*;

use super::{BodyShape, Obstacle, PhysicsProp, RayHit, WorldQuery};
use crate::combat::{CombatSet, Dead};
use crate::config::CombatConfig;

/// Затухание props (linear + angular damping)
const PROP_DAMPING: f32 = 2.0;

/// Rapier в combat тике (fixed dt = один тик)
pub struct WorldPhysicsPlugin;

impl Plugin for WorldPhysicsPlugin {
    fn build(&self, app: &mut App) {
        let tick_hz = app
            .world()
            .get_resource::<CombatConfig>()
            .map(|config| config.tick_hz)
            .unwrap_or_else(|| CombatConfig::default().tick_hz);

        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_schedule(FixedUpdate))
            .insert_resource(TimestepMode::Fixed {
                dt: (1.0 / tick_hz) as f32,
                substeps: 1,
            });

        app.configure_sets(
            FixedUpdate,
            (PhysicsSet::SyncBackend, PhysicsSet::StepSimulation, PhysicsSet::Writeback)
                .chain()
                .after(CombatSet::Intake)
                .before(CombatSet::Commands),
        );

        app.add_systems(Startup, apply_world_gravity).add_systems(
            FixedUpdate,
            (attach_colliders, disable_dead_bodies).in_set(CombatSet::Intake),
        );
    }
}

/// Гравитация props = гравитация гранат (одна на мир)
fn apply_world_gravity(config: Res<CombatConfig>, mut contexts: Query<&mut RapierConfiguration>) {
    for mut rapier in contexts.iter_mut() {
        rapier.gravity = Vec3::NEG_Y * config.grenade.gravity;
    }
}

/// Система: новые/изменённые shapes → Rapier коллайдеры
///
/// GlobalTransform выставляется сразу: Rapier читает его при первом sync.
pub fn attach_colliders(
    mut commands: Commands,
    bodies: Query<(Entity, &Transform, &BodyShape), Changed<BodyShape>>,
    obstacles: Query<(Entity, &Transform, &Obstacle), Added<Obstacle>>,
    props: Query<(Entity, &Transform, &PhysicsProp), Added<PhysicsProp>>,
) {
    for (entity, transform, body) in bodies.iter() {
        let (bottom, top, radius) = body.capsule();
        commands
            .entity(entity)
            .insert((Collider::capsule(bottom, top, radius), GlobalTransform::from(*transform)));
    }

    for (entity, transform, obstacle) in obstacles.iter() {
        let half = obstacle.half_extents;
        commands.entity(entity).insert((
            RigidBody::Fixed,
            Collider::cuboid(half.x, half.y, half.z),
            GlobalTransform::from(*transform),
        ));
    }

    for (entity, transform, prop) in props.iter() {
        commands.entity(entity).insert((
            RigidBody::Dynamic,
            Collider::ball(prop.radius),
            ColliderMassProperties::Mass(prop.mass),
            ExternalImpulse::default(),
            Velocity::default(),
            Damping {
                linear_damping: PROP_DAMPING,
                angular_damping: PROP_DAMPING,
            },
            GlobalTransform::from(*transform),
        ));
    }
}

/// Мёртвые прозрачны для лучей
pub fn disable_dead_bodies(mut commands: Commands, dead: Query<Entity, (Added<Dead>, With<BodyShape>)>) {
    for entity in dead.iter() {
        commands.entity(entity).insert(ColliderDisabled);
    }
}

/// `WorldQuery` поверх Rapier контекста (raycast + импульсы props)
#[derive(SystemParam)]
pub struct PhysicsWorld<'w, 's> {
    rapier: ReadRapierContext<'w, 's>,
    bodies: Query<'w, 's, (&'static Transform, &'static BodyShape)>,
    props: Query<'w, 's, &'static mut ExternalImpulse, With<PhysicsProp>>,
}

impl WorldQuery for PhysicsWorld<'_, '_> {
    fn raycast(&self, origin: Vec3, end: Vec3, ignore: &[Entity]) -> Option<RayHit> {
        let delta = end - origin;
        if !origin.is_finite() || !delta.is_finite() {
            return None;
        }
        let length = delta.length();
        if length <= f32::EPSILON {
            return None;
        }

        let context = match self.rapier.single() {
            Ok(context) => context,
            Err(err) => {
                crate::logger::log_warning(&format!("⚠️ Raycast without physics context: {}", err));
                return None;
            }
        };

        let visible = |entity: Entity| !ignore.contains(&entity);
        let filter = QueryFilter::default().predicate(&visible);
        let (entity, intersection) = context.cast_ray_and_get_normal(origin, delta / length, length, true, filter)?;

        let surface = self.bodies.get(entity).ok().map(|(transform, body)| {
            let local = transform.rotation.inverse() * (intersection.point - transform.translation);
            body.region_at(local)
        });

        Some(RayHit {
            point: intersection.point,
            normal: intersection.normal,
            entity: Some(entity),
            surface,
            physics_body: self.props.contains(entity),
        })
    }

    fn apply_impulse(&mut self, entity: Entity, direction: Vec3, magnitude: f32) {
        let impulse = direction.normalize_or_zero() * magnitude;
        if impulse == Vec3::ZERO || !impulse.is_finite() {
            return;
        }
        match self.props.get_mut(entity) {
            Ok(mut external) => external.impulse += impulse,
            Err(_) => crate::logger::log(&format!("🪨 Impulse for {:?} ignored: not a physics prop", entity)),
        }
    }
}
