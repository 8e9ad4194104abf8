//! Server frame dispatcher: replicate → Replicas/HUD, cosmetics → Presentation,
//! feedback → HUD + mirrors владельца, retired → cleanup.
//!
//! Порядок cosmetic кадров между entities не гарантирован; любой из них может
//! потеряться. Mirrors и HUD всё равно сходятся к replica.

use bevy::prelude::*;

use crossfire_simulation::net::CombatantSnapshot;
use crossfire_simulation::{
    logger, CombatConfig, CosmeticEvent, DeathPose, FeedbackEvent, NetId, ServerFrame, WeaponKind, WeaponSlot,
};

use crate::link::ClientLink;
use crate::mirror::{socket_for, MirrorRegistry, Perspective};
use crate::presentation::{EffectAnchor, Presentation, PresentationHost};
use crate::replica::{Hud, Replicas};

/// Всё, что трогает один кадр (заимствования из resources)
struct FrameContext<'a> {
    config: &'a CombatConfig,
    link: &'a mut ClientLink,
    replicas: &'a mut Replicas,
    hud: &'a mut Hud,
    mirrors: &'a mut MirrorRegistry,
    perspective: Perspective,
    presentation: &'a mut dyn Presentation,
}

/// Система: разобрать все входящие payload'ы за кадр
pub fn receive_server_frames(
    config: Res<CombatConfig>,
    mut link: ResMut<ClientLink>,
    mut replicas: ResMut<Replicas>,
    mut hud: ResMut<Hud>,
    mut mirrors: ResMut<MirrorRegistry>,
    perspective: Res<Perspective>,
    mut host: ResMut<PresentationHost>,
) {
    let payloads = link.take_incoming();
    if payloads.is_empty() {
        return;
    }

    let mut ctx = FrameContext {
        config: &*config,
        link: &mut *link,
        replicas: &mut *replicas,
        hud: &mut *hud,
        mirrors: &mut *mirrors,
        perspective: *perspective,
        presentation: host.0.as_mut(),
    };

    for payload in payloads {
        match ServerFrame::decode(&payload) {
            Ok(frame) => ctx.dispatch(frame),
            Err(err) => logger::log_warning(&format!("📡 Dropped server frame: {}", err)),
        }
    }
}

impl FrameContext<'_> {
    fn dispatch(&mut self, frame: ServerFrame) {
        match frame {
            ServerFrame::Replicate { entity, revision, state } => self.on_replicate(entity, revision, state),
            ServerFrame::Cosmetic(event) => self.on_cosmetic(event),
            ServerFrame::Feedback { entity, event } => self.on_feedback(entity, event),
            ServerFrame::Retired { entity, outcome } => {
                logger::log(&format!("👋 {} retired ({:?})", entity, outcome));
                self.replicas.remove(entity);
                self.mirrors.clear_combatant(self.presentation, entity);
                if self.link.possessed() == Some(entity) {
                    self.link.release();
                    *self.hud = Hud::default();
                }
            }
        }
    }

    fn is_own(&self, combatant: NetId) -> bool {
        self.link.possessed() == Some(combatant)
    }

    fn on_replicate(&mut self, entity: NetId, revision: u64, state: CombatantSnapshot) {
        if !self.replicas.apply(entity, revision, state) {
            logger::log(&format!("📡 Stale replicate {} rev {} ignored", entity, revision));
            return;
        }
        let Some(state) = self.replicas.state(entity).cloned() else {
            return;
        };

        if self.is_own(entity) {
            self.hud.sync_from(&state);
        }
        self.converge_mirrors(entity, &state);
    }

    /// Mirrors = функция от replica (активный слот, на нужном socket)
    fn converge_mirrors(&mut self, entity: NetId, state: &CombatantSnapshot) {
        let weapon = match state.weapon {
            Some(weapon) if !state.dead => weapon,
            _ => {
                self.mirrors.clear_combatant(self.presentation, entity);
                return;
            }
        };

        let own = self.is_own(entity);
        let socket = socket_for(&self.config.weapons, weapon, own, self.perspective);
        self.mirrors
            .ensure(self.presentation, entity, state.active_slot, weapon, Some(socket));
    }

    fn weapon_of(&self, combatant: NetId) -> Option<WeaponKind> {
        self.replicas.state(combatant).and_then(|state| state.weapon)
    }

    fn on_cosmetic(&mut self, event: CosmeticEvent) {
        let config = self.config;
        match event {
            CosmeticEvent::Shoot { combatant, weapon } => {
                // Свой выстрел уже проигран через LocalFire
                if self.is_own(combatant) {
                    return;
                }
                let presentation = &config.weapons.profile(weapon).presentation;
                self.presentation
                    .play_animation(combatant, &presentation.body_fire_animation);
                let muzzle = EffectAnchor::Socket {
                    combatant,
                    socket: presentation.muzzle_socket.clone(),
                };
                self.presentation.play_sound(&presentation.fire_sound, muzzle.clone());
                self.presentation.spawn_particle(&presentation.muzzle_flash, muzzle);
            }
            CosmeticEvent::Reload { combatant, weapon } => {
                if self.is_own(combatant) {
                    return;
                }
                let presentation = &config.weapons.profile(weapon).presentation;
                self.presentation
                    .play_animation(combatant, &presentation.body_reload_animation);
                self.presentation.play_sound(
                    &presentation.reload_sound,
                    EffectAnchor::Socket {
                        combatant,
                        socket: config.weapons.profile(weapon).sockets.body.clone(),
                    },
                );
            }
            CosmeticEvent::Death { combatant, pose } => {
                let animation = match pose {
                    DeathPose::Down => &config.presentation.death_down_animation,
                    DeathPose::Standing => &config.presentation.death_standing_animation,
                };
                self.presentation.play_animation(combatant, animation);
                let removed = self.mirrors.clear_combatant(self.presentation, combatant);
                logger::log(&format!("💀 {} died, {} mirror(s) torn down", combatant, removed));
            }
            CosmeticEvent::BulletDecal { point, normal, weapon } => {
                let decal = &config.weapons.profile(weapon).presentation.impact_decal;
                self.presentation
                    .spawn_decal(decal, Vec3::from_array(point), Vec3::from_array(normal));
            }
            CosmeticEvent::GrenadeThrown { thrower, origin, .. } => {
                self.presentation
                    .play_animation(thrower, &config.presentation.grenade_throw_animation);
                self.presentation.spawn_particle(
                    &config.presentation.grenade_trail_effect,
                    EffectAnchor::World(Vec3::from_array(origin)),
                );
            }
            CosmeticEvent::GrenadeExplosion { center } => {
                let anchor = EffectAnchor::World(Vec3::from_array(center));
                self.presentation
                    .spawn_particle(&config.presentation.explosion_effect, anchor.clone());
                self.presentation.play_sound(&config.presentation.explosion_sound, anchor);
            }
        }
    }

    fn on_feedback(&mut self, entity: NetId, event: FeedbackEvent) {
        // Feedback адресован только владельцу: первый кадр говорит, кем мы управляем
        if self.link.possessed().is_none() {
            self.link.possess(entity);
            self.mirrors
                .reattach(self.presentation, &self.config.weapons, entity, self.perspective);
        }
        if !self.is_own(entity) {
            logger::log_warning(&format!("📡 Feedback for foreign {} ignored", entity));
            return;
        }

        let config = self.config;
        let first_person = self.perspective == Perspective::FirstPerson;
        match event {
            FeedbackEvent::LocalFire { weapon } => {
                let presentation = &config.weapons.profile(weapon).presentation;
                let animation = if first_person {
                    &presentation.arms_fire_animation
                } else {
                    &presentation.body_fire_animation
                };
                self.presentation.play_animation(entity, animation);
                let muzzle = EffectAnchor::Socket {
                    combatant: entity,
                    socket: presentation.muzzle_socket.clone(),
                };
                self.presentation.play_sound(&presentation.fire_sound, muzzle.clone());
                self.presentation.spawn_particle(&presentation.muzzle_flash, muzzle);
            }
            FeedbackEvent::LocalReload { weapon } => {
                let presentation = &config.weapons.profile(weapon).presentation;
                let animation = if first_person {
                    &presentation.arms_reload_animation
                } else {
                    &presentation.body_reload_animation
                };
                self.presentation.play_animation(entity, animation);
                self.presentation.play_sound(
                    &presentation.reload_sound,
                    EffectAnchor::Socket {
                        combatant: entity,
                        socket: socket_for(&config.weapons, weapon, true, self.perspective),
                    },
                );
            }
            FeedbackEvent::Recoil { pitch, yaw } => {
                self.hud.view_kick += Vec2::new(pitch, yaw);
            }
            FeedbackEvent::AimChanged { aiming } => {
                self.hud.aiming = aiming;
                self.hud.scope_overlay = self
                    .hud
                    .weapon
                    .or_else(|| self.weapon_of(entity))
                    .filter(|_| aiming)
                    .and_then(|weapon| config.weapons.profile(weapon).presentation.scope_overlay.clone());
            }
            FeedbackEvent::WeaponEquipped { slot, weapon } => {
                // Secondary носится скрытым
                let socket = match slot {
                    WeaponSlot::Primary => Some(socket_for(&config.weapons, weapon, true, self.perspective)),
                    WeaponSlot::Secondary => None,
                };
                self.mirrors.ensure(self.presentation, entity, slot, weapon, socket);
                logger::log(&format!("🔫 Equipped {:?} in {:?}", weapon, slot));
            }
            FeedbackEvent::WeaponCleared => {
                self.mirrors.clear_combatant(self.presentation, entity);
                self.hud.weapon = None;
                self.hud.aiming = false;
                self.hud.scope_overlay = None;
            }
            FeedbackEvent::HudReady => {
                self.hud.ready = true;
                if let Some(state) = self.replicas.state(entity).cloned() {
                    self.hud.sync_from(&state);
                }
                logger::log_info(&format!("🖥️ HUD ready for {}", entity));
            }
        }
    }
}
