use std::time::Duration;

use bevy::prelude::*;

use crate::AppState;

pub struct AnimationPlugin;

impl Plugin for AnimationPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            animate_sprites.run_if(not(in_state(AppState::Loading))),
        );
    }
}

/// A looping frame sequence on a spritesheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    pub name: &'static str,
    pub frames: &'static [usize],
    pub fps: f32,
    /// Plays forward then backward (0,1,2,1,0,...).
    pub yoyo: bool,
}

pub const WALKING: Clip = Clip {
    name: "walking",
    frames: &[0, 1, 2],
    fps: 12.0,
    yoyo: true,
};

pub const BURNING: Clip = Clip {
    name: "burning",
    frames: &[0, 1],
    fps: 4.0,
    yoyo: false,
};

impl Clip {
    fn cycle_len(&self) -> usize {
        match self.frames.len() {
            n if self.yoyo && n > 2 => 2 * n - 2,
            n => n,
        }
    }

    fn frame_at(&self, step: usize) -> usize {
        let n = self.frames.len();
        let step = step % self.cycle_len().max(1);
        if step < n {
            self.frames[step]
        } else {
            self.frames[2 * n - 2 - step]
        }
    }
}

#[derive(Component, Debug, Default, Clone)]
pub struct SpriteAnimation {
    clip: Option<Clip>,
    step: usize,
    timer: Timer,
    frame: usize,
}

impl SpriteAnimation {
    pub fn playing(clip: Clip) -> Self {
        let mut animation = Self::default();
        animation.play(clip);
        animation
    }

    pub fn still(frame: usize) -> Self {
        Self {
            frame,
            ..default()
        }
    }

    /// Restarts `clip` from its first frame.
    pub fn play(&mut self, clip: Clip) {
        self.clip = Some(clip);
        self.step = 0;
        self.timer = Timer::from_seconds(1.0 / clip.fps, TimerMode::Repeating);
        self.frame = clip.frame_at(0);
    }

    /// Freezes on the current frame.
    pub fn stop(&mut self) {
        self.clip = None;
    }

    pub fn set_frame(&mut self, frame: usize) {
        self.frame = frame;
    }

    pub fn is_playing(&self) -> bool {
        self.clip.is_some()
    }

    pub fn clip(&self) -> Option<&'static str> {
        self.clip.map(|clip| clip.name)
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn advance(&mut self, delta: Duration) {
        let Some(clip) = self.clip else {
            return;
        };
        if clip.frames.is_empty() {
            return;
        }
        let steps = self.timer.tick(delta).times_finished_this_tick() as usize;
        self.step = (self.step + steps) % clip.cycle_len();
        self.frame = clip.frame_at(self.step);
    }
}

fn animate_sprites(time: Res<Time>, mut query: Query<(&mut SpriteAnimation, &mut Sprite)>) {
    for (mut animation, mut sprite) in query.iter_mut() {
        animation.advance(time.delta());
        let frame = animation.frame();
        if let Some(atlas) = sprite.texture_atlas.as_mut().filter(|a| a.index != frame) {
            atlas.index = frame;
        }
    }
}
