use std::time::Duration;

use bevy::prelude::*;
use serde::Deserialize;
use thiserror::Error;

/// Everything that can be wrong with a level or settings file.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("level data is missing required field `{0}`")]
    MissingField(String),
    #[error("world size must be positive, got {width}x{height}")]
    InvalidWorld { width: f32, height: f32 },
    #[error("platform {index} has {tiles} tiles, expected at least 1")]
    InvalidTileCount { index: usize, tiles: i64 },
    #[error("platform {index} has an empty texture key")]
    EmptyTextureKey { index: usize },
    #[error("platform {index} uses texture `{key}` which is not loaded")]
    UnknownTexture { index: usize, key: String },
    #[error("{what} at ({x}, {y}) lies outside the {width}x{height} world")]
    OutOfBounds {
        what: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    #[error("spawner {field} must be positive, got {value}")]
    InvalidSpawner { field: &'static str, value: f64 },
    #[error("setting `{field}` has invalid value {value}")]
    InvalidSetting { field: &'static str, value: f32 },
}

// Raw JSON shape. Everything is optional so a missing key is reported by name
// instead of failing inside the asset loader.

#[derive(Deserialize, Debug, Clone, Default, Asset, TypePath)]
pub struct LevelData {
    pub world: Option<WorldData>,
    pub spawner: Option<SpawnerData>,
    pub player: Option<PointData>,
    pub goal: Option<PointData>,
    pub platforms: Option<Vec<PlatformData>>,
    pub fires: Option<Vec<PointData>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct WorldData {
    pub width: Option<f32>,
    pub height: Option<f32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SpawnerData {
    /// Milliseconds between two barrels.
    pub interval: Option<f64>,
    pub speed: Option<f32>,
    /// Milliseconds a barrel stays alive.
    pub lifespan: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct PointData {
    pub x: Option<f32>,
    pub y: Option<f32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlatformData {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub num_tiles: Option<i64>,
    pub key: Option<String>,
}

impl LevelData {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Size of the level in pixels. Level files use a top-left origin with y
/// pointing down, the world uses Bevy's y-up space with the origin at the
/// bottom-left corner of the level.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }

    pub fn to_world(&self, level_point: Vec2) -> Vec2 {
        Vec2::new(level_point.x, self.height - level_point.y)
    }

    pub fn to_level(&self, world_point: Vec2) -> Vec2 {
        Vec2::new(world_point.x, self.height - world_point.y)
    }

    /// World-space centre of a rectangle given by its level-space top-left corner.
    pub fn rect_center(&self, top_left: Vec2, size: Vec2) -> Vec2 {
        self.to_world(top_left + size / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnerSpec {
    pub interval: Duration,
    pub speed: f32,
    pub lifespan: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlatformSpec {
    /// Top-left corner in level space.
    pub position: Vec2,
    pub tiles: u32,
    pub key: String,
}

/// Validated, immutable description of one level. Every attempt is built from
/// the same descriptor.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct LevelDescriptor {
    pub world: WorldBounds,
    pub spawner: SpawnerSpec,
    pub player: Vec2,
    pub goal: Vec2,
    pub platforms: Vec<PlatformSpec>,
    pub fires: Vec<Vec2>,
}

fn required<T>(value: Option<T>, field: impl Into<String>) -> Result<T, ConfigurationError> {
    value.ok_or_else(|| ConfigurationError::MissingField(field.into()))
}

fn millis(value: f64, field: &'static str) -> Result<Duration, ConfigurationError> {
    let invalid = || ConfigurationError::InvalidSpawner { field, value };
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(value / 1000.0).map_err(|_| invalid())
}

impl LevelDescriptor {
    pub fn from_data(data: &LevelData) -> Result<Self, ConfigurationError> {
        let world_data = required(data.world.as_ref(), "world")?;
        let world = WorldBounds {
            width: required(world_data.width, "world.width")?,
            height: required(world_data.height, "world.height")?,
        };
        if !(world.width > 0.0 && world.height > 0.0) {
            return Err(ConfigurationError::InvalidWorld {
                width: world.width,
                height: world.height,
            });
        }

        let spawner_data = required(data.spawner.as_ref(), "spawner")?;
        let spawner = SpawnerSpec {
            interval: millis(
                required(spawner_data.interval, "spawner.interval")?,
                "interval",
            )?,
            speed: required(spawner_data.speed, "spawner.speed")?,
            lifespan: millis(
                required(spawner_data.lifespan, "spawner.lifespan")?,
                "lifespan",
            )?,
        };

        let point = |data: Option<&PointData>, name: &str| -> Result<Vec2, ConfigurationError> {
            let data = required(data, name)?;
            let point = Vec2::new(
                required(data.x, format!("{name}.x"))?,
                required(data.y, format!("{name}.y"))?,
            );
            check_bounds(&world, point, name)?;
            Ok(point)
        };

        let player = point(data.player.as_ref(), "player")?;
        let goal = point(data.goal.as_ref(), "goal")?;

        let platforms = required(data.platforms.as_ref(), "platforms")?
            .iter()
            .enumerate()
            .map(|(index, platform)| {
                let name = format!("platforms[{index}]");
                let position = Vec2::new(
                    required(platform.x, format!("{name}.x"))?,
                    required(platform.y, format!("{name}.y"))?,
                );
                check_bounds(&world, position, &name)?;
                let tiles = required(platform.num_tiles, format!("{name}.numTiles"))?;
                if tiles < 1 || tiles > i64::from(u32::MAX) {
                    return Err(ConfigurationError::InvalidTileCount { index, tiles });
                }
                let key = required(platform.key.clone(), format!("{name}.key"))?;
                if key.trim().is_empty() {
                    return Err(ConfigurationError::EmptyTextureKey { index });
                }
                Ok(PlatformSpec {
                    position,
                    tiles: tiles as u32,
                    key,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fires = required(data.fires.as_ref(), "fires")?
            .iter()
            .enumerate()
            .map(|(index, fire)| point(Some(fire), &format!("fires[{index}]")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            world,
            spawner,
            player,
            goal,
            platforms,
            fires,
        })
    }
}

fn check_bounds(world: &WorldBounds, point: Vec2, what: &str) -> Result<(), ConfigurationError> {
    if world.contains(point) {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfBounds {
            what: what.to_string(),
            x: point.x,
            y: point.y,
            width: world.width,
            height: world.height,
        })
    }
}
