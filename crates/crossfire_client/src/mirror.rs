//! Weapon cosmetic mirrors (per observer, non-authoritative)
//!
//! Mirror держит только presentation ids: kind, socket, видимость.
//! Ammo здесь нет и быть не может. Потеря mirror = потеря картинки, не состояния.

use bevy::prelude::*;
use std::collections::BTreeMap;

use crossfire_simulation::weapon::WeaponCatalog;
use crossfire_simulation::{logger, CombatConfig, NetId, WeaponKind, WeaponSlot};

use crate::link::{ClientInput, ClientLink, InputAction};
use crate::presentation::{Presentation, PresentationHost};
use crate::replica::Hud;

/// Камера владельца (только локально, сервер не знает)
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Perspective {
    #[default]
    FirstPerson,
    ThirdPerson,
}

impl Perspective {
    pub fn toggled(self) -> Self {
        match self {
            Perspective::FirstPerson => Perspective::ThirdPerson,
            Perspective::ThirdPerson => Perspective::FirstPerson,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeaponMirror {
    pub weapon: WeaponKind,
    /// None = носится скрытым (secondary)
    pub socket: Option<String>,
}

/// Все mirrors этого наблюдателя
#[derive(Resource, Debug, Default)]
pub struct MirrorRegistry {
    mirrors: BTreeMap<(NetId, WeaponSlot), WeaponMirror>,
}

/// Socket оружия (свои в first person на руках, всё остальное на теле)
pub fn socket_for(catalog: &WeaponCatalog, weapon: WeaponKind, own: bool, perspective: Perspective) -> String {
    let sockets = &catalog.profile(weapon).sockets;
    if own && perspective == Perspective::FirstPerson {
        sockets.arms.clone()
    } else {
        sockets.body.clone()
    }
}

impl MirrorRegistry {
    pub fn get(&self, combatant: NetId, slot: WeaponSlot) -> Option<&WeaponMirror> {
        self.mirrors.get(&(combatant, slot))
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    pub fn slots_of(&self, combatant: NetId) -> Vec<WeaponSlot> {
        self.mirrors
            .keys()
            .filter(|(owner, _)| *owner == combatant)
            .map(|(_, slot)| *slot)
            .collect()
    }

    /// Построить mirror если его нет (или kind сменился). Повторный вызов: no-op.
    pub fn ensure(
        &mut self,
        presentation: &mut dyn Presentation,
        combatant: NetId,
        slot: WeaponSlot,
        weapon: WeaponKind,
        socket: Option<String>,
    ) -> bool {
        if self
            .mirrors
            .get(&(combatant, slot))
            .is_some_and(|mirror| mirror.weapon == weapon)
        {
            return false;
        }
        self.remove(presentation, combatant, slot);

        if let Some(socket) = &socket {
            presentation.attach_mirror(combatant, slot, weapon, socket);
        }
        self.mirrors.insert((combatant, slot), WeaponMirror { weapon, socket });
        true
    }

    pub fn remove(&mut self, presentation: &mut dyn Presentation, combatant: NetId, slot: WeaponSlot) -> bool {
        let Some(mirror) = self.mirrors.remove(&(combatant, slot)) else {
            return false;
        };
        if mirror.socket.is_some() {
            presentation.detach_mirror(combatant, slot);
        }
        true
    }

    /// Снести все mirrors комбатанта (смерть, weapon cleared, уход)
    pub fn clear_combatant(&mut self, presentation: &mut dyn Presentation, combatant: NetId) -> usize {
        let slots = self.slots_of(combatant);
        for slot in &slots {
            self.remove(presentation, combatant, *slot);
        }
        slots.len()
    }

    /// Переприкрепить видимые mirrors к другому socket (смена перспективы)
    pub fn reattach(
        &mut self,
        presentation: &mut dyn Presentation,
        catalog: &WeaponCatalog,
        combatant: NetId,
        perspective: Perspective,
    ) {
        for ((owner, slot), mirror) in self.mirrors.iter_mut() {
            if *owner != combatant || mirror.socket.is_none() {
                continue;
            }
            let socket = socket_for(catalog, mirror.weapon, true, perspective);
            presentation.detach_mirror(*owner, *slot);
            presentation.attach_mirror(*owner, *slot, mirror.weapon, &socket);
            mirror.socket = Some(socket);
        }
    }
}

/// Система: смена перспективы (локально, в прицеле заблокирована)
pub fn switch_perspective(
    mut inputs: EventReader<ClientInput>,
    mut perspective: ResMut<Perspective>,
    mut mirrors: ResMut<MirrorRegistry>,
    mut host: ResMut<PresentationHost>,
    link: Res<ClientLink>,
    hud: Res<Hud>,
    config: Res<CombatConfig>,
) {
    for ClientInput(action) in inputs.read() {
        if *action != InputAction::SwitchPerspective {
            continue;
        }
        if hud.aiming {
            logger::log("📷 Perspective switch blocked while aiming");
            continue;
        }

        *perspective = perspective.toggled();
        logger::log(&format!("📷 Perspective → {:?}", *perspective));

        if let Some(own) = link.possessed() {
            mirrors.reattach(host.0.as_mut(), &config.weapons, own, *perspective);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::{PresentationCall, RecordingPresentation};

    #[test]
    fn test_ensure_is_idempotent() {
        let recording = RecordingPresentation::new();
        let mut presentation = recording.clone();
        let mut registry = MirrorRegistry::default();
        let id = NetId(5);

        assert!(registry.ensure(&mut presentation, id, WeaponSlot::Primary, WeaponKind::Rifle, Some("hand".into())));
        assert!(!registry.ensure(&mut presentation, id, WeaponSlot::Primary, WeaponKind::Rifle, Some("hand".into())));
        assert_eq!(recording.calls().len(), 1);

        // Hidden secondary: без attach
        registry.ensure(&mut presentation, id, WeaponSlot::Secondary, WeaponKind::Sniper, None);
        assert_eq!(recording.calls().len(), 1);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.clear_combatant(&mut presentation, id), 2);
        assert!(registry.is_empty());
        assert_eq!(
            recording.calls().last(),
            Some(&PresentationCall::Detach {
                combatant: id,
                slot: WeaponSlot::Primary
            })
        );
    }

    #[test]
    fn test_reattach_switches_socket() {
        let catalog = WeaponCatalog::default();
        let recording = RecordingPresentation::new();
        let mut presentation = recording.clone();
        let mut registry = MirrorRegistry::default();
        let id = NetId(9);

        let arms = socket_for(&catalog, WeaponKind::Rifle, true, Perspective::FirstPerson);
        registry.ensure(&mut presentation, id, WeaponSlot::Primary, WeaponKind::Rifle, Some(arms.clone()));
        registry.reattach(&mut presentation, &catalog, id, Perspective::ThirdPerson);

        let body = catalog.rifle.sockets.body.clone();
        assert_ne!(arms, body);
        assert_eq!(registry.get(id, WeaponSlot::Primary).unwrap().socket, Some(body.clone()));
        assert_eq!(
            recording.take()[1..].to_vec(),
            vec![
                PresentationCall::Detach {
                    combatant: id,
                    slot: WeaponSlot::Primary
                },
                PresentationCall::Attach {
                    combatant: id,
                    slot: WeaponSlot::Primary,
                    weapon: WeaponKind::Rifle,
                    socket: body
                },
            ]
        );
    }
}
