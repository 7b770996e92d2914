use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::driver::{DriverEnv, DriverSession, DriverShiftStats};
use crate::signals::Signals;
use crate::storage::SessionStorage;

/// Simulated drive toward the pickup or the dropoff, one step per event.
pub fn driver_drive_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut storage: ResMut<SessionStorage>,
    mut signals: ResMut<Signals>,
    mut stats: ResMut<DriverShiftStats>,
    session: Option<ResMut<DriverSession>>,
) {
    if event.0.kind != EventKind::DriverDriveStep {
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
    session.on_drive_step(&event.0, &mut env);
}
