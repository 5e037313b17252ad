use bevy::prelude::*;
use bevy::sprite::SpriteImageMode;
use bevy_rapier2d::prelude::*;

use crate::AppState;
use crate::assets::levels::{ConfigurationError, LevelDescriptor, WorldBounds};
use crate::assets::settings::GameSettings;
use crate::assets::{GameAssets, TextureSizes};

use super::animation::{BURNING, SpriteAnimation};
use super::restart::{ContactKind, ResetOnContact};
use super::{LevelEntity, editor, layers, player};

/// Thickness of the invisible walls around the world.
const EDGE_THICKNESS: f32 = 32.0;

pub struct LevelPlugin;

impl Plugin for LevelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::Running), spawn_level);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformLayout {
    pub key: String,
    /// Level-space top-left corner.
    pub top_left: Vec2,
    pub size: Vec2,
    /// Repeats the texture horizontally instead of drawing it once.
    pub tiled: bool,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct LevelLayout {
    pub platforms: Vec<PlatformLayout>,
}

#[derive(Component, Debug)]
pub struct Platform {
    pub index: usize,
}

#[derive(Component)]
pub struct Fire;

#[derive(Component)]
pub struct Goal;

/// Resolves every platform spec against the texture sizes. Multi-tile
/// platforms are `tiles` textures wide.
pub fn plan_platforms(
    descriptor: &LevelDescriptor,
    tile_size: impl Fn(&str) -> Option<Vec2>,
) -> Result<Vec<PlatformLayout>, ConfigurationError> {
    descriptor
        .platforms
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            let tile = tile_size(&spec.key).ok_or_else(|| ConfigurationError::UnknownTexture {
                index,
                key: spec.key.clone(),
            })?;
            Ok(PlatformLayout {
                key: spec.key.clone(),
                top_left: spec.position,
                size: Vec2::new(tile.x * spec.tiles as f32, tile.y),
                tiled: spec.tiles > 1,
            })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub fn spawn_level(
    mut commands: Commands,
    descriptor: Res<LevelDescriptor>,
    layout: Res<LevelLayout>,
    assets: Res<GameAssets>,
    sizes: Res<TextureSizes>,
    settings: Res<GameSettings>,
    mut rapier_configs: Query<&mut RapierConfiguration>,
) {
    let world = descriptor.world;
    for mut config in rapier_configs.iter_mut() {
        config.gravity = Vec2::new(0.0, -settings.gravity);
    }
    commands.insert_resource(world);
    spawn_world_edges(&mut commands, &world);

    for (index, platform) in layout.platforms.iter().enumerate() {
        let image = assets.texture(&platform.key);
        let sprite = if platform.tiled {
            Sprite {
                image,
                custom_size: Some(platform.size),
                image_mode: SpriteImageMode::Tiled {
                    tile_x: true,
                    tile_y: false,
                    stretch_value: 1.0,
                },
                ..default()
            }
        } else {
            Sprite::from_image(image)
        };
        let center = world.rect_center(platform.top_left, platform.size);

        commands.spawn((
            Name::new(format!("Platform {index}")),
            Platform { index },
            LevelEntity,
            sprite,
            Transform::from_translation(center.extend(0.0)),
            RigidBody::Fixed,
            Collider::cuboid(platform.size.x / 2.0, platform.size.y / 2.0),
            CollisionGroups::new(
                layers::PLATFORMS,
                layers::PLAYER | layers::GOAL | layers::BARRELS,
            ),
        ));
    }

    let fire_size = assets.fire.frame.as_vec2();
    for (index, fire) in descriptor.fires.iter().enumerate() {
        let center = world.rect_center(*fire, fire_size);
        let mut entity = commands.spawn((
            Name::new(format!("Fire {index}")),
            Fire,
            LevelEntity,
            ResetOnContact(ContactKind::Fire),
            assets.fire.sprite(0),
            SpriteAnimation::playing(BURNING),
            Transform::from_translation(center.extend(1.0)),
            Collider::cuboid(fire_size.x / 2.0, fire_size.y / 2.0),
            Sensor,
            CollisionGroups::new(layers::FIRES, layers::PLAYER),
        ));
        if settings.level_editing {
            entity.observe(editor::drag_fire);
        }
    }

    player::spawn_player(&mut commands, &assets, world.to_world(descriptor.player));

    let goal_half = sizes.get("goal").unwrap_or(Vec2::splat(32.0)) / 2.0;
    commands.spawn((
        Name::new("Goal"),
        Goal,
        LevelEntity,
        ResetOnContact(ContactKind::Goal),
        Sprite::from_image(assets.texture("goal")),
        Transform::from_translation(world.to_world(descriptor.goal).extend(1.0)),
        RigidBody::Dynamic,
        Collider::cuboid(goal_half.x, goal_half.y),
        LockedAxes::ROTATION_LOCKED,
        CollisionGroups::new(layers::GOAL, layers::PLATFORMS | layers::PLAYER),
        SolverGroups::new(layers::GOAL, layers::PLATFORMS),
    ));

    info!(
        platforms = layout.platforms.len(),
        fires = descriptor.fires.len(),
        "level instantiated"
    );
}

fn spawn_world_edges(commands: &mut Commands, world: &WorldBounds) {
    let (w, h, t) = (world.width, world.height, EDGE_THICKNESS);
    let vertical = Vec2::new(t, h + 2.0 * t);
    let horizontal = Vec2::new(w + 2.0 * t, t);
    let edges = [
        ("left", Vec2::new(-t / 2.0, h / 2.0), vertical, 1.0),
        ("right", Vec2::new(w + t / 2.0, h / 2.0), vertical, 1.0),
        ("bottom", Vec2::new(w / 2.0, -t / 2.0), horizontal, 0.0),
        ("top", Vec2::new(w / 2.0, h + t / 2.0), horizontal, 0.0),
    ];

    for (name, center, size, bounce) in edges {
        commands.spawn((
            Name::new(format!("World edge {name}")),
            LevelEntity,
            Transform::from_translation(center.extend(0.0)),
            RigidBody::Fixed,
            Collider::cuboid(size.x / 2.0, size.y / 2.0),
            // barrels bounce back fully from the side walls
            Restitution {
                coefficient: bounce,
                combine_rule: CoefficientCombineRule::Max,
            },
            CollisionGroups::new(layers::WORLD_EDGES, layers::PLAYER | layers::BARRELS),
        ));
    }
}
