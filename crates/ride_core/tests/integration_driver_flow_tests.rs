mod support;

use bevy_ecs::prelude::World;
use ride_core::clock::{SimulationClock, ONE_SEC_MS};
use ride_core::config::DriverSimConfig;
use ride_core::driver::{
    accept_request, decline_request, driver_online_status, finish_ride, go_offline, go_online,
    start_ride, take_active_ride_handoff, teardown_driver_session, DriverPhase, DriverSession,
    DriverShiftStats,
};
use ride_core::error::OrchestratorError;
use ride_core::position::DRIVER_START_POSITION;
use ride_core::pricing::{driver_earnings, PEAK_BONUS};
use ride_core::signals::{Navigation, NotificationLevel, Signals};
use support::schedule::ScheduleRunner;
use support::world::TestWorldBuilder;

fn session(world: &World) -> &DriverSession {
    world.resource::<DriverSession>()
}

fn online_with_request(driver: DriverSimConfig) -> (World, ScheduleRunner) {
    let mut world = TestWorldBuilder::new().with_driver(driver).build();
    go_online(&mut world).expect("online");
    let mut runner = ScheduleRunner::new();
    runner.run_until(&mut world, 8 * ONE_SEC_MS);
    assert_eq!(session(&world).phase(), DriverPhase::Request);
    (world, runner)
}

#[test]
fn unanswered_request_expires_after_15_seconds() {
    let (mut world, mut runner) = online_with_request(DriverSimConfig::default().with_seed(1));

    runner.run_until(&mut world, 22 * ONE_SEC_MS);
    assert_eq!(session(&world).phase(), DriverPhase::Request);
    assert_eq!(session(&world).countdown(), 1);

    runner.run_until(&mut world, 23 * ONE_SEC_MS);
    let driver = session(&world);
    assert_eq!(driver.phase(), DriverPhase::Searching);
    assert!(driver.offer().is_none());
    assert_eq!(driver.countdown(), 15);
    assert_eq!(
        world.resource::<SimulationClock>().next_event_time(),
        Some(31 * ONE_SEC_MS)
    );

    let stats = world.resource::<DriverShiftStats>();
    assert_eq!(stats.requests_timed_out, 1);
    assert_eq!(stats.requests_declined, 0);
    let last = world
        .resource::<Signals>()
        .notifications
        .last()
        .cloned()
        .expect("notification");
    assert_eq!(last.level, NotificationLevel::Warning);
}

#[test]
fn decline_returns_to_searching_with_a_fresh_countdown() {
    let (mut world, mut runner) = online_with_request(DriverSimConfig::default().with_seed(2));
    runner.run_until(&mut world, 12 * ONE_SEC_MS);
    assert_eq!(session(&world).countdown(), 11);

    decline_request(&mut world).expect("decline");
    let driver = session(&world);
    assert_eq!(driver.phase(), DriverPhase::Searching);
    assert_eq!(driver.countdown(), 15);
    assert!(driver.offer().is_none());
    assert_eq!(driver.armed_timers(), 1);
    assert_eq!(world.resource::<DriverShiftStats>().requests_declined, 1);

    runner.run_until(&mut world, 20 * ONE_SEC_MS);
    assert_eq!(session(&world).phase(), DriverPhase::Request);
    assert_eq!(world.resource::<DriverShiftStats>().requests_offered, 2);
}

#[test]
fn full_ride_pays_out_and_returns_to_dashboard() {
    let (mut world, mut runner) = online_with_request(DriverSimConfig::default().with_seed(3));
    let offer = session(&world).offer().cloned().expect("offer");

    accept_request(&mut world).expect("accept");
    assert_eq!(session(&world).phase(), DriverPhase::Accepted);
    assert_eq!(session(&world).job(), Some(&offer));

    runner.run_until(&mut world, 11 * ONE_SEC_MS - 1);
    assert_eq!(session(&world).phase(), DriverPhase::Accepted);
    runner.run_until(&mut world, 11 * ONE_SEC_MS);
    assert_eq!(session(&world).phase(), DriverPhase::Arrived);
    assert!(world.resource::<SimulationClock>().is_empty());

    runner.run_until(&mut world, 120 * ONE_SEC_MS);
    assert_eq!(session(&world).phase(), DriverPhase::Arrived, "arrived has no timeout");

    start_ride(&mut world).expect("start ride");
    runner.run_until(&mut world, 125 * ONE_SEC_MS);
    let driver = session(&world);
    assert_eq!(driver.phase(), DriverPhase::Completed);
    let expected = driver_earnings(offer.fare, offer.is_peak_bonus);
    assert_eq!(driver.earnings(), Some(expected));
    assert_eq!(
        driver.trace(),
        [
            DriverPhase::Searching,
            DriverPhase::Request,
            DriverPhase::Accepted,
            DriverPhase::Arrived,
            DriverPhase::InProgress,
            DriverPhase::Completed,
        ]
    );
    assert_eq!(
        world.resource::<Signals>().notifications.len(),
        driver.trace().len(),
        "one notification for going online and one per transition"
    );

    let earnings = finish_ride(&mut world).expect("done");
    assert_eq!(earnings, expected);
    assert!(!world.contains_resource::<DriverSession>());
    assert!(world.resource::<SimulationClock>().is_empty());
    assert_eq!(
        world.resource::<Signals>().last_navigation(),
        Some(Navigation::DriverDashboard)
    );
    assert!(driver_online_status(&world));
    assert!(take_active_ride_handoff(&mut world));
    assert!(!take_active_ride_handoff(&mut world), "handoff flag is one-shot");

    let stats = world.resource::<DriverShiftStats>();
    assert_eq!(stats.requests_accepted, 1);
    assert_eq!(stats.rides_completed, 1);
    assert_eq!(stats.total_earnings, expected.total);
}

#[test]
fn peak_requests_show_the_bonus_on_accept() {
    let peak = DriverSimConfig::default()
        .with_seed(4)
        .with_peak_bonus_probability(1.0);
    let (mut world, _) = online_with_request(peak);
    assert!(session(&world).offer().expect("offer").is_peak_bonus);
    accept_request(&mut world).expect("accept");
    assert_eq!(session(&world).peak_bonus_display(), Some(PEAK_BONUS));

    let calm = DriverSimConfig::default()
        .with_seed(4)
        .with_peak_bonus_probability(0.0);
    let (mut world, _) = online_with_request(calm);
    accept_request(&mut world).expect("accept");
    assert_eq!(session(&world).peak_bonus_display(), None);
}

#[test]
fn driver_never_holds_more_than_one_timer() {
    let mut world = TestWorldBuilder::new().build();
    go_online(&mut world).expect("online");
    let mut runner = ScheduleRunner::new();

    let mut accepted = false;
    let mut started = false;
    for _ in 0..200 {
        if !runner.run_one(&mut world) {
            match session(&world).phase() {
                DriverPhase::Arrived if !started => {
                    start_ride(&mut world).expect("start");
                    started = true;
                    continue;
                }
                _ => break,
            }
        }
        if session(&world).phase() == DriverPhase::Request && !accepted {
            accept_request(&mut world).expect("accept");
            accepted = true;
        }
        assert!(session(&world).armed_timers() <= 1);
        assert!(world.resource::<SimulationClock>().pending_count() <= 1);
        let marker = session(&world).marker();
        assert!((0.0..=100.0).contains(&marker.top));
        assert!((0.0..=100.0).contains(&marker.left));
    }
    assert_eq!(session(&world).phase(), DriverPhase::Completed);
}

#[test]
fn drive_to_pickup_ends_inside_the_pickup_zone() {
    let (mut world, mut runner) = online_with_request(DriverSimConfig::default().with_seed(5));
    accept_request(&mut world).expect("accept");
    assert_eq!(session(&world).marker(), DRIVER_START_POSITION);
    runner.run_until(&mut world, 11 * ONE_SEC_MS);

    let marker = session(&world).marker();
    assert!(marker.top < DRIVER_START_POSITION.top && marker.top >= 40.0);
    assert!(marker.left > DRIVER_START_POSITION.left && marker.left <= 55.0);
}

#[test]
fn offline_is_refused_mid_ride() {
    let (mut world, _) = online_with_request(DriverSimConfig::default().with_seed(6));
    accept_request(&mut world).expect("accept");
    assert!(matches!(
        go_offline(&mut world),
        Err(OrchestratorError::InvalidAction { .. })
    ));
    assert_eq!(session(&world).phase(), DriverPhase::Accepted);
    assert_eq!(session(&world).armed_timers(), 1);
}

#[test]
fn offline_with_open_request_drops_it() {
    let (mut world, mut runner) = online_with_request(DriverSimConfig::default().with_seed(7));
    go_offline(&mut world).expect("offline");

    assert!(!world.contains_resource::<DriverSession>());
    assert!(!driver_online_status(&world));
    assert_eq!(runner.run_until(&mut world, 60 * ONE_SEC_MS), 0);
    assert!(matches!(
        accept_request(&mut world),
        Err(OrchestratorError::NotRunning(_))
    ));
}

#[test]
fn teardown_keeps_online_status() {
    let (mut world, _) = online_with_request(DriverSimConfig::default().with_seed(8));
    teardown_driver_session(&mut world);

    assert!(!world.contains_resource::<DriverSession>());
    assert!(world.resource::<SimulationClock>().is_empty());
    assert!(driver_online_status(&world));
    assert!(!take_active_ride_handoff(&mut world));
}
