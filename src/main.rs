use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier2d::prelude::*;

use monster_kong::AppState;
use monster_kong::assets::GameAssetsPlugin;
use monster_kong::game::GamePlugin;

const WINDOW_WIDTH: f32 = 360.0;
const WINDOW_HEIGHT: f32 = 640.0;
const PIXELS_PER_METER: f32 = 100.0;

fn main() -> AppExit {
    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Monster Kong".into(),
                    resolution: WindowResolution::new(WINDOW_WIDTH, WINDOW_HEIGHT),
                    resizable: false,
                    #[cfg(target_family = "wasm")]
                    canvas: Some("#bevy-canvas".into()),
                    ..default()
                }),
                ..default()
            })
            .set(ImagePlugin::default_nearest()),
    )
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(
        PIXELS_PER_METER,
    ))
    .init_state::<AppState>()
    .add_plugins((GameAssetsPlugin, GamePlugin))
    // no physics until the level is loaded
    .configure_sets(
        PostUpdate,
        (
            PhysicsSet::SyncBackend,
            PhysicsSet::StepSimulation,
            PhysicsSet::Writeback,
        )
            .run_if(not(in_state(AppState::Loading))),
    );

    #[cfg(debug_assertions)]
    app.add_plugins(RapierDebugRenderPlugin::default());

    app.run()
}
