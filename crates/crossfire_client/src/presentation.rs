//! Presentation collaborator: анимации, звук, декали, частицы, меши оружия.
//!
//! Клиент только ВЫЗЫВАЕТ presentation; что реально играет: решает backend
//! (движок, лог, запись для тестов).

use bevy::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard};

use crossfire_simulation::logger;
use crossfire_simulation::{NetId, WeaponKind, WeaponSlot};

/// Куда прикрепить эффект
#[derive(Debug, Clone, PartialEq)]
pub enum EffectAnchor {
    World(Vec3),
    Socket { combatant: NetId, socket: String },
}

pub trait Presentation: Send + Sync + 'static {
    fn play_animation(&mut self, combatant: NetId, animation: &str);
    fn play_sound(&mut self, sound: &str, anchor: EffectAnchor);
    fn spawn_decal(&mut self, decal: &str, point: Vec3, normal: Vec3);
    fn spawn_particle(&mut self, effect: &str, anchor: EffectAnchor);
    fn attach_mirror(&mut self, combatant: NetId, slot: WeaponSlot, weapon: WeaponKind, socket: &str);
    fn detach_mirror(&mut self, combatant: NetId, slot: WeaponSlot);
}

/// Backend presentation (resource)
#[derive(Resource)]
pub struct PresentationHost(pub Box<dyn Presentation>);

impl PresentationHost {
    pub fn new(presentation: impl Presentation) -> Self {
        Self(Box::new(presentation))
    }
}

/// Один вызов presentation (для проверок в тестах)
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationCall {
    Animation { combatant: NetId, animation: String },
    Sound { sound: String, anchor: EffectAnchor },
    Decal { decal: String, point: Vec3, normal: Vec3 },
    Particle { effect: String, anchor: EffectAnchor },
    Attach { combatant: NetId, slot: WeaponSlot, weapon: WeaponKind, socket: String },
    Detach { combatant: NetId, slot: WeaponSlot },
}

/// Пишет вызовы в общий буфер (clone остаётся у теста)
#[derive(Clone, Default)]
pub struct RecordingPresentation {
    calls: Arc<Mutex<Vec<PresentationCall>>>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PresentationCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn calls(&self) -> Vec<PresentationCall> {
        self.lock().clone()
    }

    pub fn take(&self) -> Vec<PresentationCall> {
        std::mem::take(&mut *self.lock())
    }

    pub fn animations_of(&self, combatant: NetId) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                PresentationCall::Animation { combatant: c, animation } if *c == combatant => Some(animation.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: PresentationCall) {
        self.lock().push(call);
    }
}

impl Presentation for RecordingPresentation {
    fn play_animation(&mut self, combatant: NetId, animation: &str) {
        self.record(PresentationCall::Animation {
            combatant,
            animation: animation.to_string(),
        });
    }

    fn play_sound(&mut self, sound: &str, anchor: EffectAnchor) {
        self.record(PresentationCall::Sound {
            sound: sound.to_string(),
            anchor,
        });
    }

    fn spawn_decal(&mut self, decal: &str, point: Vec3, normal: Vec3) {
        self.record(PresentationCall::Decal {
            decal: decal.to_string(),
            point,
            normal,
        });
    }

    fn spawn_particle(&mut self, effect: &str, anchor: EffectAnchor) {
        self.record(PresentationCall::Particle {
            effect: effect.to_string(),
            anchor,
        });
    }

    fn attach_mirror(&mut self, combatant: NetId, slot: WeaponSlot, weapon: WeaponKind, socket: &str) {
        self.record(PresentationCall::Attach {
            combatant,
            slot,
            weapon,
            socket: socket.to_string(),
        });
    }

    fn detach_mirror(&mut self, combatant: NetId, slot: WeaponSlot) {
        self.record(PresentationCall::Detach { combatant, slot });
    }
}

/// Headless backend: всё в logger
pub struct LogPresentation;

impl Presentation for LogPresentation {
    fn play_animation(&mut self, combatant: NetId, animation: &str) {
        logger::log(&format!("🎬 {} plays '{}'", combatant, animation));
    }

    fn play_sound(&mut self, sound: &str, anchor: EffectAnchor) {
        logger::log(&format!("🔊 '{}' at {:?}", sound, anchor));
    }

    fn spawn_decal(&mut self, decal: &str, point: Vec3, normal: Vec3) {
        logger::log(&format!("🕳️ decal '{}' at {:?} (normal {:?})", decal, point, normal));
    }

    fn spawn_particle(&mut self, effect: &str, anchor: EffectAnchor) {
        logger::log(&format!("✨ '{}' at {:?}", effect, anchor));
    }

    fn attach_mirror(&mut self, combatant: NetId, slot: WeaponSlot, weapon: WeaponKind, socket: &str) {
        logger::log(&format!("🔧 {} {:?}: {:?} → '{}'", combatant, slot, weapon, socket));
    }

    fn detach_mirror(&mut self, combatant: NetId, slot: WeaponSlot) {
        logger::log(&format!("🔧 {} {:?}: detached", combatant, slot));
    }
}
