use bevy::prelude::*;
use bevy::transform::TransformSystem;
use bevy::window::PrimaryWindow;
use bevy_rapier2d::prelude::PhysicsSet;

use crate::AppState;
use crate::assets::levels::WorldBounds;

use super::player::Player;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera).add_systems(
            PostUpdate,
            camera_follow_system
                .after(PhysicsSet::Writeback)
                .before(TransformSystem::TransformPropagate)
                .run_if(in_state(AppState::Running)),
        );
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((Name::new("Camera"), Camera2d));
}

/// Camera centre that keeps the view inside the world. Axes where the world
/// is smaller than the view are centred instead.
pub fn clamp_to_world(target: Vec2, half_view: Vec2, world: Vec2) -> Vec2 {
    let axis = |target: f32, half: f32, size: f32| {
        if size <= 2.0 * half {
            size / 2.0
        } else {
            target.clamp(half, size - half)
        }
    };
    Vec2::new(
        axis(target.x, half_view.x, world.x),
        axis(target.y, half_view.y, world.y),
    )
}

fn camera_follow_system(
    world: Option<Res<WorldBounds>>,
    window: Query<&Window, With<PrimaryWindow>>,
    player: Query<&Transform, With<Player>>,
    mut camera: Query<&mut Transform, (With<Camera2d>, Without<Player>)>,
) {
    let (Some(world), Ok(window), Ok(player), Ok(mut camera)) =
        (world, window.single(), player.single(), camera.single_mut())
    else {
        return;
    };

    let half_view = Vec2::new(window.width(), window.height()) / 2.0;
    let center = clamp_to_world(player.translation.truncate(), half_view, world.size());
    camera.translation = center.extend(camera.translation.z);
}
