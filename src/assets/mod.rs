use std::collections::HashMap;
use std::fmt::Display;

use bevy::asset::{LoadState, UntypedAssetId};
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;

use crate::AppState;
use crate::game::level::{LevelLayout, plan_platforms};

pub mod levels;
pub mod settings;

use levels::{LevelData, LevelDescriptor};
use settings::GameSettings;

const LEVEL_PATH: &str = "json/monster_kong.level.json";
const SETTINGS_PATH: &str = "json/game.settings.json";

/// Plain textures addressable from level files by key.
const TEXTURES: [(&str, &str); 5] = [
    ("ground", "images/ground.png"),
    ("platform", "images/platform.png"),
    ("block", "images/block.png"),
    ("goal", "images/gorilla3.png"),
    ("barrel", "images/barrel.png"),
];

pub const PLAYER_FRAME: UVec2 = UVec2::new(28, 30);
pub const FIRE_FRAME: UVec2 = UVec2::new(20, 21);

pub struct GameAssetsPlugin;

impl Plugin for GameAssetsPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            JsonAssetPlugin::<LevelData>::new(&["level.json"]),
            JsonAssetPlugin::<GameSettings>::new(&["settings.json"]),
        ))
        .init_resource::<GameSettings>()
        .add_systems(Startup, load_assets)
        .add_systems(
            Update,
            finish_loading.run_if(in_state(AppState::Loading)),
        );
    }
}

pub struct SpriteSheet {
    pub image: Handle<Image>,
    pub layout: Handle<TextureAtlasLayout>,
    pub frame: UVec2,
}

impl SpriteSheet {
    pub fn sprite(&self, index: usize) -> Sprite {
        Sprite::from_atlas_image(
            self.image.clone(),
            TextureAtlas {
                layout: self.layout.clone(),
                index,
            },
        )
    }
}

#[derive(Resource)]
pub struct GameAssets {
    pub level: Handle<LevelData>,
    pub settings: Handle<GameSettings>,
    pub textures: HashMap<String, Handle<Image>>,
    pub player: SpriteSheet,
    pub fire: SpriteSheet,
}

impl GameAssets {
    pub fn texture(&self, key: &str) -> Handle<Image> {
        self.textures.get(key).cloned().unwrap_or_default()
    }

    fn tracked(&self) -> Vec<(String, UntypedAssetId)> {
        let mut ids = vec![
            (LEVEL_PATH.to_string(), self.level.id().untyped()),
            (SETTINGS_PATH.to_string(), self.settings.id().untyped()),
            ("player spritesheet".to_string(), self.player.image.id().untyped()),
            ("fire spritesheet".to_string(), self.fire.image.id().untyped()),
        ];
        ids.extend(
            self.textures
                .iter()
                .map(|(key, handle)| (format!("texture `{key}`"), handle.id().untyped())),
        );
        ids
    }
}

#[cfg(test)]
impl GameAssets {
    /// Handles that point nowhere, for worlds without an asset server.
    pub fn placeholder() -> Self {
        Self {
            level: Handle::default(),
            settings: Handle::default(),
            textures: HashMap::new(),
            player: SpriteSheet {
                image: Handle::default(),
                layout: Handle::default(),
                frame: PLAYER_FRAME,
            },
            fire: SpriteSheet {
                image: Handle::default(),
                layout: Handle::default(),
                frame: FIRE_FRAME,
            },
        }
    }
}

/// Pixel size of every plain texture, filled in once the images are loaded.
#[derive(Resource, Debug, Default, Clone)]
pub struct TextureSizes(pub HashMap<String, Vec2>);

impl TextureSizes {
    pub fn get(&self, key: &str) -> Option<Vec2> {
        self.0.get(key).copied()
    }
}

fn spritesheet_layout(frame: UVec2, columns: u32) -> TextureAtlasLayout {
    // 1px margin around the sheet and 1px spacing between frames
    TextureAtlasLayout::from_grid(frame, columns, 1, Some(UVec2::ONE), Some(UVec2::ONE))
}

fn load_assets(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut layouts: ResMut<Assets<TextureAtlasLayout>>,
) {
    let textures = TEXTURES
        .iter()
        .map(|(key, path)| (key.to_string(), asset_server.load(*path)))
        .collect();

    commands.insert_resource(GameAssets {
        level: asset_server.load(LEVEL_PATH),
        settings: asset_server.load(SETTINGS_PATH),
        textures,
        player: SpriteSheet {
            image: asset_server.load("images/player_spritesheet.png"),
            layout: layouts.add(spritesheet_layout(PLAYER_FRAME, 5)),
            frame: PLAYER_FRAME,
        },
        fire: SpriteSheet {
            image: asset_server.load("images/fire_spritesheet.png"),
            layout: layouts.add(spritesheet_layout(FIRE_FRAME, 2)),
            frame: FIRE_FRAME,
        },
    });
}

fn abort(exit: &mut EventWriter<AppExit>, message: impl Display) {
    error!("cannot start the level: {message}");
    exit.write(AppExit::error());
}

#[allow(clippy::too_many_arguments)]
fn finish_loading(
    mut commands: Commands,
    mut aborted: Local<bool>,
    asset_server: Res<AssetServer>,
    assets: Res<GameAssets>,
    levels: Res<Assets<LevelData>>,
    settings: Res<Assets<GameSettings>>,
    images: Res<Assets<Image>>,
    mut next_state: ResMut<NextState<AppState>>,
    mut exit: EventWriter<AppExit>,
) {
    if *aborted {
        return;
    }

    let mut pending = 0;
    for (name, id) in assets.tracked() {
        match asset_server.load_state(id) {
            LoadState::Loaded => {}
            LoadState::Failed(err) => {
                *aborted = true;
                abort(&mut exit, format!("failed to load {name}: {err}"));
                return;
            }
            _ => pending += 1,
        }
    }
    if pending > 0 {
        return;
    }

    let (Some(level), Some(loaded_settings)) =
        (levels.get(&assets.level), settings.get(&assets.settings))
    else {
        return;
    };

    let result = loaded_settings.validate().and_then(|()| {
        let descriptor = LevelDescriptor::from_data(level)?;
        let sizes = TextureSizes(
            assets
                .textures
                .iter()
                .filter_map(|(key, handle)| {
                    images.get(handle).map(|image| (key.clone(), image.size().as_vec2()))
                })
                .collect(),
        );
        let platforms = plan_platforms(&descriptor, |key| sizes.get(key))?;
        Ok((descriptor, sizes, platforms))
    });

    match result {
        Ok((descriptor, sizes, platforms)) => {
            info!(
                platforms = descriptor.platforms.len(),
                fires = descriptor.fires.len(),
                "level loaded"
            );
            commands.insert_resource(loaded_settings.clone());
            commands.insert_resource(LevelLayout { platforms });
            commands.insert_resource(sizes);
            commands.insert_resource(descriptor);
            next_state.set(AppState::Running);
        }
        Err(err) => {
            *aborted = true;
            abort(&mut exit, err);
        }
    }
}
