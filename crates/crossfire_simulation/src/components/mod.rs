//! ECS Components комбатантов
//!
//! Организация по доменам:
//! - combatant: Combatant capability (health, флаги, loadout, прицел, отдача)
//! - identity: сетевая идентичность (NetId, ClientId, OwnerLink)

pub mod combatant;
pub mod identity;

// Re-exports для удобного импорта
pub use combatant::*;
pub use identity::*;
