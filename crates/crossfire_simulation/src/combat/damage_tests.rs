use super::damage::*;
use crate::components::{CombatFlags, Health};
use crate::weapon::WeaponKind;
use crate::world::SurfaceClass;
use bevy::prelude::*;

#[test]
fn test_region_multipliers() {
    assert_eq!(hitscan_damage(25.0, Some(SurfaceClass::Head)), 100.0);
    assert_eq!(hitscan_damage(25.0, Some(SurfaceClass::Torso)), 25.0);
    assert_eq!(hitscan_damage(25.0, Some(SurfaceClass::Arm)), 20.0);
    assert!((hitscan_damage(25.0, Some(SurfaceClass::Leg)) - 17.5).abs() < 1e-5);
    // Неклассифицированная поверхность = torso
    assert_eq!(hitscan_damage(25.0, None), 25.0);
}

#[test]
fn test_splash_bands() {
    assert_eq!(splash_damage(0.0), 100.0);
    assert_eq!(splash_damage(50_000.0), 100.0);
    assert_eq!(splash_damage(159_999.0), 100.0);
    assert_eq!(splash_damage(160_000.0), 50.0);
    assert_eq!(splash_damage(500_000.0), 50.0);
    assert_eq!(splash_damage(1_000_000.0), 20.0);
    assert_eq!(splash_damage(9_000_000.0), 20.0);
}

#[test]
fn test_planar_distance_ignores_height() {
    let center = Vec3::new(0.0, 0.0, 0.0);
    let victim = Vec3::new(300.0, 5000.0, 400.0);
    assert_eq!(planar_distance_sq(center, victim), 250_000.0);
}

fn damage_app() -> App {
    let mut app = App::new();
    app.add_event::<DamageEvent>()
        .add_event::<DamageDealt>()
        .add_event::<EntityDied>()
        .add_systems(Update, apply_damage);
    app
}

fn hit(target: Entity, instigator: Option<Entity>, amount: f32) -> DamageEvent {
    DamageEvent {
        target,
        instigator,
        source: DamageSource::HitScan(WeaponKind::Rifle),
        amount,
        hit_point: Vec3::ZERO,
        surface: None,
        direction: Vec3::NEG_Z,
    }
}

fn died_events(app: &App) -> Vec<EntityDied> {
    app.world()
        .resource::<Events<EntityDied>>()
        .iter_current_update_events()
        .copied()
        .collect()
}

#[test]
fn test_apply_damage_is_monotone_and_kills_once() {
    let mut app = damage_app();
    let shooter = app.world_mut().spawn((Health::new(100.0), CombatFlags::default())).id();
    let target = app.world_mut().spawn((Health::new(100.0), CombatFlags::default())).id();

    app.world_mut().send_event(hit(target, Some(shooter), 60.0));
    app.world_mut().send_event(hit(target, Some(shooter), 60.0));
    app.world_mut().send_event(hit(target, Some(shooter), 60.0));
    app.update();

    let health = app.world().get::<Health>(target).unwrap();
    assert_eq!(health.current(), 0.0);
    assert!(app.world().get::<CombatFlags>(target).unwrap().is_dead());

    let died = died_events(&app);
    assert_eq!(died.len(), 1, "double death is a no-op");
    assert_eq!(died[0].killer, Some(shooter));
}

#[test]
fn test_self_damage_has_no_killer() {
    let mut app = damage_app();
    let victim = app.world_mut().spawn((Health::new(50.0), CombatFlags::default())).id();

    app.world_mut().send_event(DamageEvent {
        source: DamageSource::Splash { grenade: Entity::from_raw(999) },
        ..hit(victim, Some(victim), 100.0)
    });
    app.update();

    let died = died_events(&app);
    assert_eq!(died.len(), 1);
    assert_eq!(died[0].killer, None);
    assert!(died[0].cause.is_splash());
}

#[test]
fn test_negative_damage_does_not_heal() {
    let mut app = damage_app();
    let target = app.world_mut().spawn((Health::new(100.0), CombatFlags::default())).id();

    app.world_mut().send_event(hit(target, None, 30.0));
    app.world_mut().send_event(hit(target, None, -50.0));
    app.update();

    assert_eq!(app.world().get::<Health>(target).unwrap().current(), 70.0);
    assert!(died_events(&app).is_empty());
}
