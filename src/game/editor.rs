//! Helpers for laying out levels by hand. Pointer presses log their level
//! coordinates; with `levelEditing` on, fires can be dragged around and
//! report where they ended up, ready to paste into the level file.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::AppState;
use crate::assets::GameAssets;
use crate::assets::levels::WorldBounds;

use super::level::Fire;

pub struct EditorPlugin;

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            log_pointer_down.run_if(in_state(AppState::Running)),
        );
    }
}

/// Level-space top-left corner of a sprite centred at `center`.
pub fn level_top_left(world: &WorldBounds, center: Vec2, size: Vec2) -> Vec2 {
    world.to_level(center + Vec2::new(-size.x, size.y) / 2.0)
}

fn log_pointer_down(
    buttons: Res<ButtonInput<MouseButton>>,
    world: Option<Res<WorldBounds>>,
    window: Query<&Window, With<PrimaryWindow>>,
    camera: Query<(&Camera, &GlobalTransform)>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    let (Some(world), Ok(window), Ok((camera, camera_transform))) =
        (world, window.single(), camera.single())
    else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    match camera.viewport_to_world_2d(camera_transform, cursor) {
        Ok(point) => {
            let level = world.to_level(point);
            info!(x = level.x, y = level.y, "pointer down");
        }
        Err(err) => debug!(?err, "pointer outside the viewport"),
    }
}

pub fn drag_fire(
    trigger: Trigger<Pointer<Drag>>,
    mut fires: Query<&mut Transform, With<Fire>>,
    world: Res<WorldBounds>,
    assets: Res<GameAssets>,
) {
    let Ok(mut transform) = fires.get_mut(trigger.target()) else {
        return;
    };
    let delta = trigger.event().delta;
    // screen y points down
    transform.translation.x += delta.x;
    transform.translation.y -= delta.y;

    let top_left = level_top_left(
        &world,
        transform.translation.truncate(),
        assets.fire.frame.as_vec2(),
    );
    info!(x = top_left.x, y = top_left.y, "fire moved");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_left_inverts_rect_center() {
        let world = WorldBounds {
            width: 360.0,
            height: 700.0,
        };
        let size = Vec2::new(20.0, 21.0);
        let top_left = Vec2::new(200.0, 649.0);

        let center = world.rect_center(top_left, size);
        assert_eq!(level_top_left(&world, center, size), top_left);
    }
}
