//! World/physics collaborator: raycast + impulse contract.
//!
//! Combat код видит мир только через `WorldQuery`. Встроенная реализация
//! (`PhysicsWorld`) сидит на Rapier:
//! - `BodyShape` комбатантов → капсула от пола до макушки (зоны по высоте)
//! - `Obstacle` → статичный cuboid
//! - `PhysicsProp` → `RigidBody::Dynamic` шар, принимает `ExternalImpulse`

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

mod physics;


pub use physics::{attach_colliders, PhysicsWorld, WorldPhysicsPlugin};

/// Класс поверхности в точке попадания (множитель урона, см. `combat::damage`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum SurfaceClass {
    Head,
    #[default]
    Torso,
    Arm,
    Leg,
}

/// Результат raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    /// None = статичная геометрия без entity
    pub entity: Option<Entity>,
    pub surface: Option<SurfaceClass>,
    /// Физически симулируемое тело (принимает импульс)
    pub physics_body: bool,
}

/// Контракт мира для combat кода
pub trait WorldQuery {
    /// Ближайшее попадание на отрезке origin → end (entities из `ignore` пропускаются).
    /// Нечисловые (NaN / inf) origin или end: всегда промах.
    fn raycast(&self, origin: Vec3, end: Vec3, ignore: &[Entity]) -> Option<RayHit>;

    /// Импульс физическому телу (direction нормализуется реализацией)
    fn apply_impulse(&mut self, entity: Entity, direction: Vec3, magnitude: f32);
}

/// Тело комбатанта: вертикальная капсула от ног (local y = 0) до макушки.
///
/// Зона попадания определяется по локальной точке: голова сверху, ноги снизу,
/// боковые попадания в корпус идут в руки.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct BodyShape {
    pub radius: f32,
    pub height: f32,
    /// Выше: голова
    pub head_from: f32,
    /// Ниже: ноги
    pub legs_below: f32,
    /// |local x| не меньше: рука
    pub arm_from: f32,
}

impl Default for BodyShape {
    fn default() -> Self {
        Self::humanoid()
    }
}

impl BodyShape {
    /// Гуманоид ~180 units (Y-up)
    pub fn humanoid() -> Self {
        Self {
            radius: 30.0,
            height: 180.0,
            head_from: 150.0,
            legs_below: 80.0,
            arm_from: 22.0,
        }
    }

    /// Пригнувшийся: та же ширина, ниже рост
    pub fn crouched() -> Self {
        Self {
            height: 120.0,
            head_from: 95.0,
            legs_below: 50.0,
            ..Self::humanoid()
        }
    }

    /// Капсула в локальном пространстве: (низ сегмента, верх сегмента, радиус)
    pub fn capsule(&self) -> (Vec3, Vec3, f32) {
        let radius = self.radius.min(self.height * 0.5);
        (Vec3::Y * radius, Vec3::Y * (self.height - radius), radius)
    }

    pub fn region_at(&self, local: Vec3) -> SurfaceClass {
        if local.y >= self.head_from {
            SurfaceClass::Head
        } else if local.y < self.legs_below {
            SurfaceClass::Leg
        } else if local.x.abs() >= self.arm_from {
            SurfaceClass::Arm
        } else {
            SurfaceClass::Torso
        }
    }
}

/// Статичная геометрия (box вокруг Transform.translation)
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Obstacle {
    pub half_extents: Vec3,
}

/// Подвижный физический объект (бочка, ящик). Скорость ведёт Rapier (`Velocity`).
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct PhysicsProp {
    pub radius: f32,
    pub mass: f32,
}

impl PhysicsProp {
    pub fn new(radius: f32, mass: f32) -> Self {
        Self {
            radius,
            mass: mass.max(0.001),
        }
    }
}
