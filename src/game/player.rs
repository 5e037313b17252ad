use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::AppState;
use crate::assets::GameAssets;
use crate::assets::settings::GameSettings;

use super::LevelEntity;
use super::animation::{SpriteAnimation, WALKING};
use super::layers;

pub const IDLE_FRAME: usize = 3;
pub const JUMP_FRAME: usize = 2;

/// How far below the feet a surface still counts as ground.
const GROUND_PROBE_DISTANCE: f32 = 2.0;

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (probe_ground, player_control_system)
                .chain()
                .run_if(in_state(AppState::Running)),
        );
    }
}

#[derive(Component)]
pub struct Player {
    pub half_size: Vec2,
}

/// Ground flags refreshed from the physics world every tick. `blocked_down`
/// means resting on the lower world edge, `touching_down` resting on a
/// platform. Either one counts as grounded.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GroundContact {
    pub blocked_down: bool,
    pub touching_down: bool,
}

impl GroundContact {
    pub fn is_grounded(&self) -> bool {
        self.blocked_down || self.touching_down
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControlInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub jump: bool,
}

impl ControlInput {
    pub fn from_keys(keys: &ButtonInput<KeyCode>) -> Self {
        Self {
            left: keys.pressed(KeyCode::ArrowLeft),
            right: keys.pressed(KeyCode::ArrowRight),
            up: keys.pressed(KeyCode::ArrowUp),
            jump: keys.pressed(KeyCode::Space),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Idle,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationChange {
    Keep,
    StartWalking,
    Stop,
    /// Stop and show a fixed frame.
    Show(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    pub movement: Movement,
    pub velocity_x: f32,
    /// New vertical velocity when a jump starts this tick.
    pub jump_velocity: Option<f32>,
    /// The spritesheet faces left, so facing right means flipped.
    pub flip_x: bool,
    pub animation: AnimationChange,
}

/// One tick of the player state machine.
///
/// Left and right held together count as idle. The jump is not guarded
/// against an ongoing jump: it re-applies on every grounded tick the key is
/// held.
pub fn control(
    input: ControlInput,
    grounded: bool,
    animating: bool,
    speed: f32,
    jump_speed: f32,
) -> ControlOutput {
    let movement = match (input.left, input.right) {
        (true, false) => Movement::Left,
        (false, true) => Movement::Right,
        _ => Movement::Idle,
    };

    let (velocity_x, mut animation) = match movement {
        Movement::Left | Movement::Right => {
            let sign = if movement == Movement::Left { -1.0 } else { 1.0 };
            let animation = if grounded && !animating {
                AnimationChange::StartWalking
            } else {
                AnimationChange::Keep
            };
            (sign * speed, animation)
        }
        Movement::Idle if grounded => (0.0, AnimationChange::Show(IDLE_FRAME)),
        Movement::Idle => (0.0, AnimationChange::Stop),
    };

    let mut jump_velocity = None;
    if grounded && (input.jump || input.up) {
        jump_velocity = Some(jump_speed);
        animation = AnimationChange::Show(JUMP_FRAME);
    }

    ControlOutput {
        movement,
        velocity_x,
        jump_velocity,
        flip_x: movement == Movement::Right,
        animation,
    }
}

pub fn spawn_player(commands: &mut Commands, assets: &GameAssets, position: Vec2) -> Entity {
    let half_size = assets.player.frame.as_vec2() / 2.0;
    commands
        .spawn((
            Name::new("Player"),
            Player { half_size },
            LevelEntity,
            GroundContact::default(),
            assets.player.sprite(IDLE_FRAME),
            SpriteAnimation::still(IDLE_FRAME),
            Transform::from_translation(position.extend(2.0)),
            (
                RigidBody::Dynamic,
                Collider::cuboid(half_size.x, half_size.y),
                LockedAxes::ROTATION_LOCKED,
                Velocity::zero(),
                Friction {
                    coefficient: 0.0,
                    combine_rule: CoefficientCombineRule::Min,
                },
                CollisionGroups::new(
                    layers::PLAYER,
                    layers::PLATFORMS
                        | layers::WORLD_EDGES
                        | layers::FIRES
                        | layers::BARRELS
                        | layers::GOAL,
                ),
                // only platforms and world edges push back, the rest just reports contact
                SolverGroups::new(layers::PLAYER, layers::PLATFORMS | layers::WORLD_EDGES),
                ActiveEvents::COLLISION_EVENTS,
            ),
        ))
        .id()
}

fn probe_ground(
    rapier_context: ReadRapierContext,
    mut players: Query<(Entity, &Player, &Transform, &mut GroundContact)>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, player, transform, mut contact) in players.iter_mut() {
        // cast from just inside the feet, at both lower corners
        let feet = transform.translation.truncate() - Vec2::Y * (player.half_size.y - 1.0);
        let corners = [-1.0, 1.0].map(|side| feet + Vec2::X * side * (player.half_size.x - 1.0));

        let hits = |group: Group| {
            let filter = QueryFilter::default()
                .exclude_rigid_body(entity)
                .exclude_sensors()
                .groups(CollisionGroups::new(Group::ALL, group));
            corners.iter().any(|origin| {
                context
                    .cast_ray(*origin, -Vec2::Y, GROUND_PROBE_DISTANCE + 1.0, true, filter)
                    .is_some()
            })
        };

        let probed = GroundContact {
            blocked_down: hits(layers::WORLD_EDGES),
            touching_down: hits(layers::PLATFORMS),
        };
        if *contact != probed {
            *contact = probed;
        }
    }
}

fn player_control_system(
    keys: Res<ButtonInput<KeyCode>>,
    settings: Res<GameSettings>,
    mut players: Query<
        (
            &GroundContact,
            &mut Velocity,
            &mut Sprite,
            &mut SpriteAnimation,
        ),
        With<Player>,
    >,
) {
    let input = ControlInput::from_keys(&keys);

    for (contact, mut velocity, mut sprite, mut animation) in players.iter_mut() {
        let output = control(
            input,
            contact.is_grounded(),
            animation.is_playing(),
            settings.player_speed,
            settings.jump_speed,
        );

        velocity.linvel.x = output.velocity_x;
        if let Some(vy) = output.jump_velocity {
            velocity.linvel.y = vy;
        }
        sprite.flip_x = output.flip_x;

        match output.animation {
            AnimationChange::Keep => {}
            AnimationChange::StartWalking => animation.play(WALKING),
            AnimationChange::Stop => animation.stop(),
            AnimationChange::Show(frame) => {
                animation.stop();
                animation.set_frame(frame);
            }
        }
    }
}
