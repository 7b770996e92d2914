use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::driver::{DriverEnv, DriverSession, DriverShiftStats};
use crate::signals::Signals;
use crate::storage::SessionStorage;

/// Search delay elapsed: synthesize a request and show it to the driver.
pub fn driver_search_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut storage: ResMut<SessionStorage>,
    mut signals: ResMut<Signals>,
    mut stats: ResMut<DriverShiftStats>,
    session: Option<ResMut<DriverSession>>,
) {
    if event.0.kind != EventKind::DriverSearchDeadline {
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
    session.on_search_deadline(&event.0, &mut env);
}
