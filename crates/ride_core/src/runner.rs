//! Orchestrator runner: advances the clock and routes events into the ECS.
//!
//! Each step pops the next event from [SimulationClock], inserts it as
//! [CurrentEvent], then runs the schedule. User actions (accept, cancel, force
//! complete) are applied to the world between steps.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::systems::{
    driver_countdown::driver_countdown_system, driver_drive::driver_drive_system,
    driver_search::driver_search_system, rider_deadline::rider_deadline_system,
    rider_tick::rider_tick_system,
};

fn is_event(event: Option<Res<CurrentEvent>>, kind: EventKind) -> bool {
    event.map(|e| e.0.kind == kind).unwrap_or(false)
}

fn is_rider_tick(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(event, EventKind::RiderTick)
}

fn is_rider_phase_deadline(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(event, EventKind::RiderPhaseDeadline)
}

fn is_driver_search_deadline(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(event, EventKind::DriverSearchDeadline)
}

fn is_driver_request_countdown(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(event, EventKind::DriverRequestCountdown)
}

fn is_driver_drive_step(event: Option<Res<CurrentEvent>>) -> bool {
    is_event(event, EventKind::DriverDriveStep)
}

/// Runs one step. Returns `false` if the clock was empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs one step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    hook(world, &event);
    true
}

/// Runs steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Processes every event due at or before `end_ms`, then moves the clock to
/// `end_ms`. Returns the number of steps executed.
pub fn run_until(world: &mut World, schedule: &mut Schedule, end_ms: u64) -> usize {
    let mut steps = 0;
    while world
        .resource::<SimulationClock>()
        .next_event_time()
        .is_some_and(|ts| ts <= end_ms)
    {
        run_next_event(world, schedule);
        steps += 1;
    }
    world.resource_mut::<SimulationClock>().advance_to(end_ms);
    steps
}

/// Builds the orchestrator schedule: one system per event kind, each gated on
/// the current event.
pub fn orchestrator_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        rider_tick_system.run_if(is_rider_tick),
        rider_deadline_system.run_if(is_rider_phase_deadline),
        driver_search_system.run_if(is_driver_search_deadline),
        driver_countdown_system.run_if(is_driver_request_countdown),
        driver_drive_system.run_if(is_driver_drive_step),
        apply_deferred,
    ));
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ONE_SEC_MS;
    use crate::ride::RideContext;
    use crate::rider::{start_rider_tracking, RiderPhase, RiderTracking};
    use crate::test_helpers::{create_test_world, in_progress_ride};

    #[test]
    fn empty_clock_runs_nothing() {
        let mut world = create_test_world();
        let mut schedule = orchestrator_schedule();
        assert!(!run_next_event(&mut world, &mut schedule));
        assert_eq!(run_until_empty(&mut world, &mut schedule, 10), 0);
    }

    #[test]
    fn run_until_stops_at_the_requested_time() {
        let mut world = create_test_world();
        world
            .resource_mut::<RideContext>()
            .set_current_ride(Some(in_progress_ride()));
        start_rider_tracking(&mut world).expect("mount");

        let mut schedule = orchestrator_schedule();
        let steps = run_until(&mut world, &mut schedule, 5 * ONE_SEC_MS + 500);
        assert_eq!(steps, 5);
        assert_eq!(world.resource::<SimulationClock>().now(), 5500);
        let tracking = world.resource::<RiderTracking>();
        assert_eq!(tracking.phase(), RiderPhase::Arriving);
        assert_eq!(tracking.seconds_left(), 25);
    }

    #[test]
    fn hook_sees_every_processed_event() {
        let mut world = create_test_world();
        world
            .resource_mut::<RideContext>()
            .set_current_ride(Some(in_progress_ride()));
        start_rider_tracking(&mut world).expect("mount");

        let mut schedule = orchestrator_schedule();
        let mut kinds = Vec::new();
        for _ in 0..3 {
            run_next_event_with_hook(&mut world, &mut schedule, |_, event| kinds.push(event.kind));
        }
        assert_eq!(kinds, vec![EventKind::RiderTick; 3]);
    }
}
