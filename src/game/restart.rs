use std::time::Duration;

use bevy::picking::Pickable;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::AppState;
use crate::assets::settings::GameSettings;

use super::LevelEntity;
use super::player::Player;

pub struct RestartPlugin;

impl Plugin for RestartPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Fade>()
            .init_resource::<Attempt>()
            .add_systems(Startup, spawn_fade_overlay)
            .add_systems(
                Update,
                (
                    detect_fatal_contacts.run_if(in_state(AppState::Running)),
                    advance_fade,
                )
                    .chain()
                    .run_if(not(in_state(AppState::Loading))),
            )
            .add_systems(OnEnter(AppState::Restarting), reset_level);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Fire,
    Barrel,
    Goal,
}

/// Touching this entity restarts the level. The goal carries it too: reaching
/// it is handled exactly like dying.
#[derive(Component, Debug, Clone, Copy)]
pub struct ResetOnContact(pub ContactKind);

/// How many times the level has been restarted.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Attempt(pub u32);

#[derive(Component)]
struct FadeOverlay;

#[derive(Debug, Default, Clone)]
enum FadePhase {
    #[default]
    Clear,
    Out(Timer),
    In(Timer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeStep {
    Idle,
    Running,
    OutFinished,
    InFinished,
}

#[derive(Resource, Debug, Default)]
pub struct Fade {
    phase: FadePhase,
}

impl Fade {
    pub fn is_fading_out(&self) -> bool {
        matches!(self.phase, FadePhase::Out(_))
    }

    pub fn is_clear(&self) -> bool {
        matches!(self.phase, FadePhase::Clear)
    }

    /// Overlay opacity, 0 for a clear view and 1 for black.
    pub fn alpha(&self) -> f32 {
        match &self.phase {
            FadePhase::Clear => 0.0,
            FadePhase::Out(timer) => timer.fraction(),
            FadePhase::In(timer) => 1.0 - timer.fraction(),
        }
    }

    /// Starts darkening from the current opacity. Returns false while a
    /// fade-out is already under way.
    pub fn start_out(&mut self, duration: Duration) -> bool {
        if self.is_fading_out() {
            return false;
        }
        let mut timer = Timer::new(duration, TimerMode::Once);
        timer.set_elapsed(duration.mul_f32(self.alpha()));
        self.phase = FadePhase::Out(timer);
        true
    }

    pub fn start_in(&mut self, duration: Duration) {
        self.phase = FadePhase::In(Timer::new(duration, TimerMode::Once));
    }

    pub fn tick(&mut self, delta: Duration) -> FadeStep {
        match &mut self.phase {
            FadePhase::Clear => FadeStep::Idle,
            FadePhase::Out(timer) => {
                timer.tick(delta);
                if timer.just_finished() {
                    FadeStep::OutFinished
                } else {
                    FadeStep::Running
                }
            }
            FadePhase::In(timer) => {
                timer.tick(delta);
                if timer.finished() {
                    self.phase = FadePhase::Clear;
                    FadeStep::InFinished
                } else {
                    FadeStep::Running
                }
            }
        }
    }
}

fn spawn_fade_overlay(mut commands: Commands) {
    commands.spawn((
        FadeOverlay,
        Node {
            position_type: PositionType::Absolute,
            top: Val::Percent(0.0),
            left: Val::Percent(0.0),
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        BackgroundColor(Color::NONE),
        GlobalZIndex(i32::MAX),
        Pickable::IGNORE,
    ));
}

pub fn detect_fatal_contacts(
    mut collision_events: EventReader<CollisionEvent>,
    players: Query<(), With<Player>>,
    hazards: Query<&ResetOnContact>,
    settings: Res<GameSettings>,
    mut fade: ResMut<Fade>,
) {
    for event in collision_events.read() {
        let CollisionEvent::Started(e1, e2, _) = event else {
            continue;
        };
        let other = if players.contains(*e1) {
            *e2
        } else if players.contains(*e2) {
            *e1
        } else {
            continue;
        };
        let Ok(ResetOnContact(cause)) = hazards.get(other) else {
            continue;
        };

        // several overlaps in one tick still make a single restart
        if fade.start_out(settings.fade_duration()) {
            info!(?cause, "player hit something, restarting level");
        }
    }
}

fn advance_fade(
    time: Res<Time>,
    mut fade: ResMut<Fade>,
    mut overlay: Query<&mut BackgroundColor, With<FadeOverlay>>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if fade.is_clear() {
        return;
    }
    match fade.tick(time.delta()) {
        FadeStep::OutFinished => next_state.set(AppState::Restarting),
        FadeStep::InFinished => debug!("fade-in finished"),
        FadeStep::Idle | FadeStep::Running => {}
    }
    for mut color in overlay.iter_mut() {
        color.0 = Color::BLACK.with_alpha(fade.alpha());
    }
}

pub fn reset_level(
    mut commands: Commands,
    level_entities: Query<Entity, With<LevelEntity>>,
    settings: Res<GameSettings>,
    mut attempt: ResMut<Attempt>,
    mut fade: ResMut<Fade>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let mut despawned = 0;
    for entity in level_entities.iter() {
        commands.entity(entity).despawn();
        despawned += 1;
    }
    attempt.0 += 1;
    fade.start_in(settings.fade_duration());
    info!(despawned, attempt = attempt.0, "level torn down");
    next_state.set(AppState::Running);
}

#[cfg(test)]
mod tests {
    use bevy::state::app::StatesPlugin;
    use bevy::time::TimeUpdateStrategy;
    use bevy_rapier2d::rapier::geometry::CollisionEventFlags;

    use super::*;

    fn level_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(100)))
            .insert_state(AppState::Running)
            .add_event::<CollisionEvent>()
            .insert_resource(GameSettings::default())
            .add_plugins(RestartPlugin);
        app.update();
        app
    }

    fn spawn_player(app: &mut App) -> Entity {
        app.world_mut()
            .spawn((
                Player {
                    half_size: Vec2::new(14.0, 15.0),
                },
                LevelEntity,
            ))
            .id()
    }

    fn spawn_hazard(app: &mut App, kind: ContactKind) -> Entity {
        app.world_mut()
            .spawn((ResetOnContact(kind), LevelEntity))
            .id()
    }

    fn touch(app: &mut App, a: Entity, b: Entity) {
        app.world_mut()
            .send_event(CollisionEvent::Started(a, b, CollisionEventFlags::empty()));
    }

    /// Long enough for a full fade-out, reset and fade-in.
    fn settle(app: &mut App) {
        for _ in 0..20 {
            app.update();
        }
    }

    fn attempts(app: &App) -> u32 {
        app.world().resource::<Attempt>().0
    }

    #[test]
    fn full_reset_cycle() {
        let mut app = level_app();
        let player = spawn_player(&mut app);
        let fire = spawn_hazard(&mut app, ContactKind::Fire);

        touch(&mut app, player, fire);
        app.update();
        assert!(app.world().resource::<Fade>().is_fading_out());
        settle(&mut app);

        assert_eq!(attempts(&app), 1);
        assert!(app.world().get_entity(player).is_err());
        assert!(app.world().get_entity(fire).is_err());
        assert_eq!(
            *app.world().resource::<State<AppState>>().get(),
            AppState::Running
        );
        assert!(app.world().resource::<Fade>().is_clear());
    }

    #[test]
    fn simultaneous_overlaps_restart_once() {
        let mut app = level_app();
        let player = spawn_player(&mut app);
        let fire = spawn_hazard(&mut app, ContactKind::Fire);
        let barrel = spawn_hazard(&mut app, ContactKind::Barrel);

        touch(&mut app, player, fire);
        touch(&mut app, barrel, player);
        app.update();
        // still fading out
        touch(&mut app, fire, player);
        settle(&mut app);

        assert_eq!(attempts(&app), 1);
    }

    #[test]
    fn goal_restarts_like_a_hazard() {
        for kind in [ContactKind::Fire, ContactKind::Goal] {
            let mut app = level_app();
            let player = spawn_player(&mut app);
            let other = spawn_hazard(&mut app, kind);

            touch(&mut app, other, player);
            settle(&mut app);

            assert_eq!(attempts(&app), 1, "{kind:?}");
        }
    }

    #[test]
    fn contacts_without_the_player_are_ignored() {
        let mut app = level_app();
        spawn_player(&mut app);
        let barrel = spawn_hazard(&mut app, ContactKind::Barrel);
        let platform = app.world_mut().spawn_empty().id();

        touch(&mut app, barrel, platform);
        settle(&mut app);

        assert_eq!(attempts(&app), 0);
        assert!(app.world().resource::<Fade>().is_clear());
    }

    #[test]
    fn fade_out_resumes_from_current_opacity() {
        let mut fade = Fade::default();
        let duration = Duration::from_millis(500);
        fade.start_in(duration);
        fade.tick(Duration::from_millis(100));
        assert!((fade.alpha() - 0.8).abs() < 1e-4);

        assert!(fade.start_out(duration));
        assert!((fade.alpha() - 0.8).abs() < 1e-4);
        assert!(!fade.start_out(duration));
        assert_eq!(fade.tick(Duration::from_millis(100)), FadeStep::OutFinished);
    }

    #[test]
    fn fade_in_clears_the_overlay() {
        let mut fade = Fade::default();
        fade.start_in(Duration::from_millis(200));
        assert_eq!(fade.tick(Duration::from_millis(100)), FadeStep::Running);
        assert_eq!(fade.tick(Duration::from_millis(100)), FadeStep::InFinished);
        assert!(fade.is_clear());
        assert_eq!(fade.tick(Duration::from_millis(100)), FadeStep::Idle);
    }
}
