use bevy::prelude::*;
use monster_kong::assets::levels::{LevelData, LevelDescriptor};
use monster_kong::assets::settings::GameSettings;
use monster_kong::game::level::plan_platforms;

const LEVEL: &str = include_str!("../assets/json/monster_kong.level.json");
const SETTINGS: &str = include_str!("../assets/json/game.settings.json");

fn tile_size(key: &str) -> Option<Vec2> {
    match key {
        "ground" => Some(Vec2::new(36.0, 30.0)),
        "platform" => Some(Vec2::new(36.0, 16.0)),
        "block" => Some(Vec2::new(30.0, 30.0)),
        _ => None,
    }
}

#[test]
fn shipped_level_is_valid() {
    let data = LevelData::parse(LEVEL).expect("level json");
    let level = LevelDescriptor::from_data(&data).expect("valid level");
    let platforms = plan_platforms(&level, tile_size).expect("known textures");

    assert_eq!(platforms.len(), level.platforms.len());
    for (layout, spec) in platforms.iter().zip(&level.platforms) {
        assert_eq!(layout.top_left, spec.position);
        assert!(layout.top_left.x + layout.size.x <= level.world.width);
        assert!(layout.top_left.y + layout.size.y <= level.world.height);
    }
    assert!(level.spawner.interval < level.spawner.lifespan);
}

#[test]
fn shipped_fires_rest_on_a_platform() {
    let level = LevelDescriptor::from_data(&LevelData::parse(LEVEL).unwrap()).unwrap();
    let platforms = plan_platforms(&level, tile_size).unwrap();
    let fire_height = 21.0;

    for fire in &level.fires {
        let resting = platforms.iter().any(|p| {
            p.top_left.y == fire.y + fire_height
                && (p.top_left.x..=p.top_left.x + p.size.x).contains(&fire.x)
        });
        assert!(resting, "fire at {fire} floats");
    }
}

#[test]
fn shipped_settings_are_valid() {
    let settings: GameSettings = serde_json::from_str(SETTINGS).unwrap();
    settings.validate().unwrap();
    assert_eq!(settings, GameSettings::default());
}
