use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::driver::{DriverEnv, DriverSession, DriverShiftStats};
use crate::signals::Signals;
use crate::storage::SessionStorage;

/// One second off the request countdown; at zero the request expires.
pub fn driver_countdown_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut storage: ResMut<SessionStorage>,
    mut signals: ResMut<Signals>,
    mut stats: ResMut<DriverShiftStats>,
    session: Option<ResMut<DriverSession>>,
) {
    if event.0.kind != EventKind::DriverRequestCountdown {
        return;
    }
    let Some(mut session) = session else {
        return;
    };

    let mut env = DriverEnv {
        clock: &mut clock,
        storage: &mut storage,
        signals: &mut signals,
        stats: &mut stats,
    };
    session.on_countdown_tick(&event.0, &mut env);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::Schedule;

    use crate::driver::{go_online, DriverPhase};
    use crate::systems::driver_search::driver_search_system;
    use crate::test_helpers::create_test_world;

    fn step(world: &mut bevy_ecs::prelude::World, schedule: &mut Schedule) {
        let event = world
            .resource_mut::<SimulationClock>()
            .pop_next()
            .expect("event");
        world.insert_resource(CurrentEvent(event));
        schedule.run(world);
    }

    #[test]
    fn countdown_ticks_down_once_per_second() {
        let mut world = create_test_world();
        go_online(&mut world).expect("online");

        let mut schedule = Schedule::default();
        schedule.add_systems((driver_search_system, driver_countdown_system));
        step(&mut world, &mut schedule);
        step(&mut world, &mut schedule);

        let session = world.resource::<DriverSession>();
        assert_eq!(session.phase(), DriverPhase::Request);
        assert_eq!(session.countdown(), 14);
        assert_eq!(world.resource::<SimulationClock>().now(), 9000);
        assert_eq!(
            world.resource::<SimulationClock>().next_event_time(),
            Some(10_000)
        );
    }
}
