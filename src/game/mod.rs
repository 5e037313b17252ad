use bevy::prelude::*;

pub mod animation;
pub mod barrel;
pub mod camera;
pub mod editor;
pub mod level;
pub mod player;
pub mod restart;

/// Tags everything that belongs to one attempt at the level. A restart
/// despawns all of it.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct LevelEntity;

/// Rapier collision layers.
pub mod layers {
    use bevy_rapier2d::prelude::Group;

    pub const PLATFORMS: Group = Group::GROUP_1;
    pub const PLAYER: Group = Group::GROUP_2;
    pub const GOAL: Group = Group::GROUP_3;
    pub const BARRELS: Group = Group::GROUP_4;
    pub const FIRES: Group = Group::GROUP_5;
    pub const WORLD_EDGES: Group = Group::GROUP_6;
}

pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            animation::AnimationPlugin,
            level::LevelPlugin,
            player::PlayerPlugin,
            barrel::BarrelPlugin,
            camera::CameraPlugin,
            restart::RestartPlugin,
            editor::EditorPlugin,
        ));
    }
}
