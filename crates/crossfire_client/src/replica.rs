//! Replica store: последнее авторитетное состояние каждого комбатанта
//!
//! Обновляется ТОЛЬКО из `ServerFrame::Replicate`. Revision строго растёт per entity,
//! поэтому дубликаты и устаревшие кадры просто игнорируются.

use bevy::prelude::*;
use std::collections::HashMap;

use crossfire_simulation::net::CombatantSnapshot;
use crossfire_simulation::NetId;

#[derive(Debug, Clone, PartialEq)]
pub struct Replica {
    pub revision: u64,
    pub state: CombatantSnapshot,
}

#[derive(Resource, Debug, Default)]
pub struct Replicas {
    entries: HashMap<NetId, Replica>,
}

impl Replicas {
    /// Применить кадр; false если revision не новее уже принятой
    pub fn apply(&mut self, entity: NetId, revision: u64, state: CombatantSnapshot) -> bool {
        if let Some(current) = self.entries.get(&entity) {
            if revision <= current.revision {
                return false;
            }
        }
        self.entries.insert(entity, Replica { revision, state });
        true
    }

    pub fn get(&self, entity: NetId) -> Option<&Replica> {
        self.entries.get(&entity)
    }

    pub fn state(&self, entity: NetId) -> Option<&CombatantSnapshot> {
        self.entries.get(&entity).map(|replica| &replica.state)
    }

    pub fn remove(&mut self, entity: NetId) -> Option<Replica> {
        self.entries.remove(&entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// HUD владельца: ammo и HP из replica, остальное из feedback
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct Hud {
    /// HUD-ready получен (до этого ничего не рисуем)
    pub ready: bool,
    pub health: f32,
    pub max_health: f32,
    pub magazine: u32,
    pub reserve: u32,
    pub weapon: Option<crossfire_simulation::WeaponKind>,
    pub aiming: bool,
    pub dead: bool,
    /// Overlay прицела (sniper, пока aiming)
    pub scope_overlay: Option<String>,
    /// Накопленный kick камеры (pitch, yaw) от recoil feedback
    pub view_kick: Vec2,
}

impl Hud {
    /// Перенести реплицированные поля в HUD
    pub fn sync_from(&mut self, state: &CombatantSnapshot) {
        self.health = state.health;
        self.max_health = state.max_health;
        self.magazine = state.magazine;
        self.reserve = state.reserve;
        self.weapon = state.weapon;
        self.dead = state.dead;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(magazine: u32) -> CombatantSnapshot {
        CombatantSnapshot {
            health: 100.0,
            max_health: 100.0,
            magazine,
            ..Default::default()
        }
    }

    #[test]
    fn test_only_newer_revisions_apply() {
        let mut replicas = Replicas::default();
        let id = NetId(3);

        assert!(replicas.apply(id, 2, snapshot(29)));
        // Переставленный старый кадр
        assert!(!replicas.apply(id, 1, snapshot(30)));
        // Дубликат
        assert!(!replicas.apply(id, 2, snapshot(30)));
        assert_eq!(replicas.state(id).map(|s| s.magazine), Some(29));

        assert!(replicas.apply(id, 5, snapshot(28)));
        assert_eq!(replicas.get(id).map(|r| r.revision), Some(5));
    }

    #[test]
    fn test_hud_sync() {
        let mut hud = Hud::default();
        hud.sync_from(&CombatantSnapshot {
            health: 75.0,
            max_health: 100.0,
            magazine: 12,
            reserve: 60,
            weapon: Some(crossfire_simulation::WeaponKind::Rifle),
            ..Default::default()
        });
        assert_eq!(hud.health, 75.0);
        assert_eq!(hud.magazine, 12);
        assert_eq!(hud.reserve, 60);
        assert!(!hud.ready);
    }
}
