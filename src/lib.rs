use bevy::prelude::*;

pub mod assets;
pub mod game;

#[derive(States, PartialEq, Eq, Clone, Copy, Debug, Hash, Default)]
pub enum AppState {
    /// Waiting for level data, settings and textures.
    #[default]
    Loading,
    Running,
    /// One frame between fade-out and the next attempt: the old level is torn down here.
    Restarting,
}
