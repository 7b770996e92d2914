use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::ride::RideContext;
use crate::rider::{RiderEnv, RiderTracking};
use crate::signals::Signals;
use crate::storage::SessionStorage;

pub fn rider_deadline_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut storage: ResMut<SessionStorage>,
    mut signals: ResMut<Signals>,
    mut rides: ResMut<RideContext>,
    tracking: Option<ResMut<RiderTracking>>,
) {
    if event.0.kind != EventKind::RiderPhaseDeadline {
        return;
    }
    let Some(mut tracking) = tracking else {
        return;
    };

    let mut env = RiderEnv {
        clock: &mut clock,
        storage: &mut storage,
        signals: &mut signals,
        rides: &mut rides,
    };
    tracking.on_deadline(&event.0, &mut env);
}
