//! Crossfire Client: non-authoritative cosmetic mirror
//!
//! Клиент НИЧЕГО не решает:
//! - Input → `ClientFrame` (просьба к серверу)
//! - `ServerFrame::Replicate` → `Replicas` / HUD (единственный источник цифр)
//! - Cosmetic / feedback → `Presentation` (анимации, звук, декали, mirrors)
//!
//! Mirrors можно потерять и пересобрать в любой момент, правды в них нет.

use bevy::prelude::*;

use crossfire_simulation::{logger, ClientId, CombatConfig};

pub mod dispatch;
pub mod link;
pub mod mirror;
pub mod presentation;
pub mod replica;

pub use link::{ClientInput, ClientLink, InputAction, InputError};
pub use mirror::{MirrorRegistry, Perspective, WeaponMirror};
pub use presentation::{
    EffectAnchor, LogPresentation, Presentation, PresentationCall, PresentationHost, RecordingPresentation,
};
pub use replica::{Hud, Replica, Replicas};

/// Client plugin (ждёт `ClientLink` и `PresentationHost` в World)
pub struct ClientPlugin;

impl Plugin for ClientPlugin {
    fn build(&self, app: &mut App) {
        // Presentation ids общие с сервером; без конфига берём defaults
        if !app.world().contains_resource::<CombatConfig>() {
            app.insert_resource(CombatConfig::default());
        }

        app.add_event::<ClientInput>()
            .init_resource::<Replicas>()
            .init_resource::<Hud>()
            .init_resource::<MirrorRegistry>()
            .init_resource::<Perspective>();

        app.add_systems(
            Update,
            (
                dispatch::receive_server_frames,
                mirror::switch_perspective,
                link::send_client_input,
            )
                .chain(),
        );
    }
}

/// Headless client app (без рендера; presentation решает backend)
pub fn create_client_app(client_id: ClientId, presentation: impl Presentation) -> App {
    let mut app = App::new();
    logger::init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(ClientLink::new(client_id))
        .insert_resource(PresentationHost::new(presentation))
        .add_plugins(ClientPlugin);

    app
}
