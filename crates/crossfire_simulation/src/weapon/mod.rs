//! Weapon Authority Model
//!
//! - profile: per-kind конфигурация (`WeaponProfile`, `WeaponCatalog`)
//! - authority: серверный ammo truth (`WeaponAuthority`)
//! - hitscan: резолюция выстрела через `WorldQuery`

pub mod authority;
pub mod hitscan;
pub mod profile;


pub use authority::WeaponAuthority;
pub use hitscan::{needs_spread, resolve_hitscan, shot_end, ShotOutcome, ShotRequest};
pub use profile::{
    AttachmentSockets, RecoilCurve, RecoilProfile, WeaponCatalog, WeaponKind, WeaponPresentation, WeaponProfile,
};
