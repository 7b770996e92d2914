use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use ride_core::runner::{orchestrator_schedule, run_next_event, run_until, run_until_empty};

/// Helper that owns a reusable `Schedule` so tests can step or drain the event queue.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    pub fn new() -> Self {
        Self {
            schedule: orchestrator_schedule(),
        }
    }

    /// Run a single event (returns `true` if an event was processed).
    pub fn run_one(&mut self, world: &mut World) -> bool {
        run_next_event(world, &mut self.schedule)
    }

    /// Process every event due at or before `end_ms`.
    pub fn run_until(&mut self, world: &mut World, end_ms: u64) -> usize {
        run_until(world, &mut self.schedule, end_ms)
    }

    /// Drain the event queue, bounded so a runaway re-arm fails the test instead of hanging.
    pub fn run_full(&mut self, world: &mut World) -> usize {
        let steps = run_until_empty(world, &mut self.schedule, 10_000);
        assert!(steps < 10_000, "event queue did not drain");
        steps
    }
}
