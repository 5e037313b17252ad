use std::time::Duration;

use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

use crate::AppState;
use crate::assets::levels::LevelDescriptor;
use crate::assets::{GameAssets, TextureSizes};

use super::level::Goal;
use super::restart::{ContactKind, ResetOnContact};
use super::{LevelEntity, layers};

pub struct BarrelPlugin;

impl Plugin for BarrelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(AppState::Running), start_spawner)
            .add_systems(
                Update,
                (expire_barrels, spawn_barrels)
                    .chain()
                    .run_if(in_state(AppState::Running)),
            );
    }
}

/// Drops a barrel at the goal every interval. Each attempt gets a fresh one.
#[derive(Resource, Debug)]
pub struct BarrelSpawner {
    timer: Timer,
}

impl BarrelSpawner {
    pub fn new(interval: Duration) -> Self {
        Self {
            timer: Timer::new(
                interval.max(Duration::from_millis(1)),
                TimerMode::Repeating,
            ),
        }
    }

    /// Ticks the spawn timer and returns, oldest first, how long ago each
    /// spawn that came due during `delta` was due.
    pub fn tick(&mut self, delta: Duration) -> Vec<Duration> {
        self.timer.tick(delta);
        let elapsed = self.timer.elapsed();
        let interval = self.timer.duration();
        (0..self.timer.times_finished_this_tick())
            .rev()
            .map(|missed| elapsed + interval * missed)
            .collect()
    }
}

#[derive(Component)]
pub struct Barrel;

/// Present while a barrel is in play. Retired barrels lose it and wait,
/// hidden, for a later spawn to pick them up.
#[derive(Component, Debug)]
pub struct BarrelLifetime {
    timer: Timer,
}

impl BarrelLifetime {
    /// Lifetime whose clock started `late` ago, so frame hitches do not
    /// stretch it.
    pub fn new(lifespan: Duration, late: Duration) -> Self {
        let mut timer = Timer::new(lifespan, TimerMode::Once);
        timer.set_elapsed(late);
        Self { timer }
    }
}

fn start_spawner(mut commands: Commands, descriptor: Res<LevelDescriptor>) {
    commands.insert_resource(BarrelSpawner::new(descriptor.spawner.interval));
}

fn barrel_body(radius: f32) -> impl Bundle {
    (
        RigidBody::Dynamic,
        Collider::ball(radius),
        LockedAxes::ROTATION_LOCKED,
        Restitution {
            coefficient: 0.1,
            combine_rule: CoefficientCombineRule::Max,
        },
        Friction {
            coefficient: 0.0,
            combine_rule: CoefficientCombineRule::Min,
        },
        CollisionGroups::new(
            layers::BARRELS,
            layers::PLATFORMS | layers::WORLD_EDGES | layers::PLAYER,
        ),
        SolverGroups::new(layers::BARRELS, layers::PLATFORMS | layers::WORLD_EDGES),
    )
}

fn expire_barrels(
    mut commands: Commands,
    time: Res<Time>,
    mut barrels: Query<(Entity, &mut BarrelLifetime), With<Barrel>>,
) {
    for (barrel, mut lifetime) in barrels.iter_mut() {
        if !lifetime.timer.tick(time.delta()).just_finished() {
            continue;
        }
        commands.entity(barrel).remove::<BarrelLifetime>().insert((
            RigidBodyDisabled,
            ColliderDisabled,
            Visibility::Hidden,
            Velocity::zero(),
        ));
        debug!(?barrel, "barrel retired");
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_barrels(
    mut commands: Commands,
    time: Res<Time>,
    mut spawner: ResMut<BarrelSpawner>,
    descriptor: Res<LevelDescriptor>,
    assets: Res<GameAssets>,
    sizes: Res<TextureSizes>,
    goal: Query<&Transform, With<Goal>>,
    idle: Query<Entity, (With<Barrel>, Without<BarrelLifetime>)>,
) {
    let due = spawner.tick(time.delta());
    if due.is_empty() {
        return;
    }
    let Ok(goal) = goal.single() else {
        warn!("no goal to spawn barrels from");
        return;
    };

    let spawner = descriptor.spawner;
    let launch = (
        Transform::from_translation(goal.translation.truncate().extend(1.5)),
        Velocity::linear(Vec2::new(spawner.speed, 0.0)),
    );
    let mut idle = idle.iter();

    for late in due {
        let lifetime = BarrelLifetime::new(spawner.lifespan, late);
        match idle.next() {
            Some(barrel) => {
                commands
                    .entity(barrel)
                    .remove::<(RigidBodyDisabled, ColliderDisabled)>()
                    .insert((lifetime, launch, Visibility::Visible));
                debug!(?barrel, "barrel reused");
            }
            None => {
                let radius = sizes.get("barrel").map_or(10.0, |size| size.min_element() / 2.0);
                let barrel = commands
                    .spawn((
                        Name::new("Barrel"),
                        Barrel,
                        LevelEntity,
                        ResetOnContact(ContactKind::Barrel),
                        Sprite::from_image(assets.texture("barrel")),
                        lifetime,
                        launch,
                        barrel_body(radius),
                    ))
                    .id();
                debug!(?barrel, "barrel spawned");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bevy::ecs::schedule::ExecutorKind;

    use super::*;
    use crate::assets::levels::{SpawnerSpec, WorldBounds};

    const GOAL: Vec3 = Vec3::new(40.0, 640.0, 1.0);
    const SPEED: f32 = 100.0;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    struct TestLevel {
        world: World,
        schedule: Schedule,
    }

    impl TestLevel {
        fn new(interval: u64, lifespan: u64) -> Self {
            let mut world = World::new();
            world.insert_resource(Time::<()>::default());
            world.insert_resource(LevelDescriptor {
                world: WorldBounds {
                    width: 360.0,
                    height: 700.0,
                },
                spawner: SpawnerSpec {
                    interval: ms(interval),
                    speed: SPEED,
                    lifespan: ms(lifespan),
                },
                player: Vec2::new(40.0, 640.0),
                goal: Vec2::new(40.0, 60.0),
                platforms: Vec::new(),
                fires: Vec::new(),
            });
            world.insert_resource(GameAssets::placeholder());
            world.insert_resource(TextureSizes(HashMap::from([(
                "barrel".to_string(),
                Vec2::splat(20.0),
            )])));
            world.insert_resource(BarrelSpawner::new(ms(interval)));

            let mut schedule = Schedule::default();
            schedule.set_executor_kind(ExecutorKind::SingleThreaded);
            schedule.add_systems((expire_barrels, spawn_barrels).chain());
            Self { world, schedule }
        }

        fn with_goal(mut self) -> Self {
            self.world.spawn((Goal, Transform::from_translation(GOAL)));
            self
        }

        fn advance(&mut self, millis: u64) {
            self.world.resource_mut::<Time>().advance_by(ms(millis));
            self.schedule.run(&mut self.world);
        }

        /// (all barrels, barrels in play)
        fn counts(&mut self) -> (usize, usize) {
            let all = self
                .world
                .query_filtered::<(), With<Barrel>>()
                .iter(&self.world)
                .count();
            let active = self
                .world
                .query_filtered::<(), (With<Barrel>, With<BarrelLifetime>)>()
                .iter(&self.world)
                .count();
            (all, active)
        }

        fn only_barrel(&mut self) -> Entity {
            self.world
                .query_filtered::<Entity, With<Barrel>>()
                .single(&self.world)
                .unwrap()
        }
    }

    #[test]
    fn spawner_reports_how_late_each_spawn_is() {
        let mut spawner = BarrelSpawner::new(ms(1000));
        assert!(spawner.tick(ms(999)).is_empty());
        assert_eq!(spawner.tick(ms(2501)), vec![ms(2500), ms(1500), ms(500)]);
    }

    #[test]
    fn overlapping_lifespans_share_two_barrels() {
        let mut level = TestLevel::new(2000, 3000).with_goal();
        let mut timeline = Vec::new();
        for _ in 0..9 {
            level.advance(1000);
            timeline.push(level.counts());
        }

        // t = 1s .. 9s
        assert_eq!(
            timeline,
            vec![
                (0, 0),
                (1, 1),
                (1, 1),
                (2, 2),
                (2, 1),
                (2, 2),
                (2, 1),
                (2, 2),
                (2, 1),
            ]
        );
    }

    #[test]
    fn late_frames_do_not_extend_lifespan() {
        let mut level = TestLevel::new(2000, 3000).with_goal();
        // one long frame covering the first spawn
        level.advance(2500);
        assert_eq!(level.counts(), (1, 1));
        level.advance(2499);
        assert_eq!(level.counts(), (2, 2));
        // first barrel was due at 2s, so it expires at 5s
        level.advance(1);
        assert_eq!(level.counts(), (2, 1));
    }

    #[test]
    fn expired_barrels_are_disabled_and_hidden() {
        let mut level = TestLevel::new(2000, 1000).with_goal();
        level.advance(2000);
        let barrel = level.only_barrel();
        assert!(level.world.get::<RigidBodyDisabled>(barrel).is_none());

        level.advance(1000);
        let entity = level.world.entity(barrel);
        assert!(entity.contains::<RigidBodyDisabled>());
        assert!(entity.contains::<ColliderDisabled>());
        assert!(!entity.contains::<BarrelLifetime>());
        assert_eq!(entity.get::<Visibility>(), Some(&Visibility::Hidden));
        assert_eq!(entity.get::<Velocity>().map(|v| v.linvel), Some(Vec2::ZERO));
    }

    #[test]
    fn reused_barrels_relaunch_from_the_goal() {
        let mut level = TestLevel::new(2000, 1000).with_goal();
        level.advance(2000);
        level.advance(1000);
        assert_eq!(level.counts(), (1, 0));
        let barrel = level.only_barrel();
        level
            .world
            .entity_mut(barrel)
            .insert(Transform::from_xyz(300.0, 20.0, 1.5));

        level.advance(1000);
        assert_eq!(level.counts(), (1, 1));
        assert_eq!(level.only_barrel(), barrel);

        let entity = level.world.entity(barrel);
        assert!(!entity.contains::<RigidBodyDisabled>());
        assert!(!entity.contains::<ColliderDisabled>());
        assert_eq!(entity.get::<Visibility>(), Some(&Visibility::Visible));
        assert_eq!(
            entity.get::<Transform>().map(|t| t.translation.truncate()),
            Some(GOAL.truncate())
        );
        assert_eq!(
            entity.get::<Velocity>().map(|v| v.linvel),
            Some(Vec2::new(SPEED, 0.0))
        );
    }

    #[test]
    fn no_goal_means_no_barrels() {
        let mut level = TestLevel::new(2000, 3000);
        level.advance(4000);
        assert_eq!(level.counts(), (0, 0));
    }

    #[test]
    fn a_new_attempt_restarts_the_interval() {
        let mut level = TestLevel::new(2000, 3000).with_goal();
        level.advance(1500);
        level.world.insert_resource(BarrelSpawner::new(ms(2000)));

        level.advance(1000);
        assert_eq!(level.counts(), (0, 0));
        level.advance(1000);
        assert_eq!(level.counts(), (1, 1));
    }
}
