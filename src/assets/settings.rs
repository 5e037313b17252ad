use std::time::Duration;

use bevy::prelude::*;
use serde::Deserialize;

use super::levels::ConfigurationError;

/// Tunables loaded from `json/game.settings.json`. Missing keys fall back to
/// the defaults below.
#[derive(Resource, Deserialize, Debug, Clone, PartialEq, Asset, TypePath)]
#[serde(default, rename_all = "camelCase")]
pub struct GameSettings {
    /// Horizontal walking speed in px/s.
    pub player_speed: f32,
    /// Upward take-off speed in px/s.
    pub jump_speed: f32,
    /// Downward acceleration in px/s².
    pub gravity: f32,
    pub fade_duration_ms: u64,
    /// Makes fires draggable and logs their level coordinates.
    pub level_editing: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            player_speed: 150.0,
            jump_speed: 600.0,
            gravity: 1000.0,
            fade_duration_ms: 500,
            level_editing: false,
        }
    }
}

impl GameSettings {
    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let checks = [
            ("playerSpeed", self.player_speed, self.player_speed >= 0.0),
            ("jumpSpeed", self.jump_speed, self.jump_speed > 0.0),
            ("gravity", self.gravity, self.gravity >= 0.0),
        ];
        for (field, value, ok) in checks {
            if !ok || !value.is_finite() {
                return Err(ConfigurationError::InvalidSetting { field, value });
            }
        }
        Ok(())
    }
}
