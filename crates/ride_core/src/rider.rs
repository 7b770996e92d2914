//! Rider-side ride tracking.
//!
//! Phases run strictly in order:
//!
//! | Phase | Timers | Leaves when |
//! |---|---|---|
//! | arriving | tick (countdown, marker toward pickup) | countdown hits 0 |
//! | arrived | deadline (dwell) | deadline |
//! | in_progress | tick (marker, minutes floor 5) + deadline | deadline |
//! | approaching | tick (minutes floor 2) + deadline | deadline |
//! | almost_there | tick (minutes floor 0) + deadline | deadline |
//! | completed | none | terminal |
//!
//! The only jump is [force_complete_ride], which goes straight to completed.
//! Every change of phase, countdown, minutes or marker is written through to
//! [SessionStorage] so a remount resumes where the last mount stopped.

use std::fmt;

use bevy_ecs::prelude::{Res, ResMut, Resource, World};
use bevy_ecs::system::SystemState;
use serde::{Deserialize, Serialize};

use crate::clock::{Event, EventKind, EventSubject, SimulationClock, TimerSlots};
use crate::config::RiderTrackingConfig;
use crate::error::OrchestratorError;
use crate::position::{
    MarkerPath, Position, DEFAULT_DRIVER_POSITION, RIDER_TOWARD_DROPOFF, RIDER_TOWARD_PICKUP,
};
use crate::ride::{Ride, RideContext, RideId, RideStatus};
use crate::signals::{Navigation, NotificationLevel, Signals};
use crate::storage::{
    SessionStorage, COMPLETED_RIDE_KEY, RIDER_DRIVER_POSITION_KEY, RIDER_MINUTES_KEY,
    RIDER_PHASE_KEY, RIDER_PHASE_RECORD_KEYS, RIDER_SECONDS_LEFT_KEY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderPhase {
    Arriving,
    Arrived,
    InProgress,
    Approaching,
    AlmostThere,
    Completed,
}

impl RiderPhase {
    pub const SEQUENCE: [RiderPhase; 6] = [
        RiderPhase::Arriving,
        RiderPhase::Arrived,
        RiderPhase::InProgress,
        RiderPhase::Approaching,
        RiderPhase::AlmostThere,
        RiderPhase::Completed,
    ];

    pub fn next(self) -> Option<RiderPhase> {
        match self {
            RiderPhase::Arriving => Some(RiderPhase::Arrived),
            RiderPhase::Arrived => Some(RiderPhase::InProgress),
            RiderPhase::InProgress => Some(RiderPhase::Approaching),
            RiderPhase::Approaching => Some(RiderPhase::AlmostThere),
            RiderPhase::AlmostThere => Some(RiderPhase::Completed),
            RiderPhase::Completed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == RiderPhase::Completed
    }

    /// Lowest minutes-to-destination value shown while in this phase.
    fn minutes_floor(self) -> Option<u32> {
        match self {
            RiderPhase::InProgress => Some(5),
            RiderPhase::Approaching => Some(2),
            RiderPhase::AlmostThere => Some(0),
            _ => None,
        }
    }

    fn marker_path(self) -> Option<MarkerPath> {
        match self {
            RiderPhase::Arriving => Some(RIDER_TOWARD_PICKUP),
            RiderPhase::InProgress | RiderPhase::Approaching | RiderPhase::AlmostThere => {
                Some(RIDER_TOWARD_DROPOFF)
            }
            RiderPhase::Arrived | RiderPhase::Completed => None,
        }
    }

    fn deadline_ms(self, config: &RiderTrackingConfig) -> Option<u64> {
        match self {
            RiderPhase::Arrived => Some(config.arrived_dwell_ms),
            RiderPhase::InProgress => Some(config.in_progress_ms),
            RiderPhase::Approaching => Some(config.approaching_ms),
            RiderPhase::AlmostThere => Some(config.almost_there_ms),
            RiderPhase::Arriving | RiderPhase::Completed => None,
        }
    }

    fn entry_notification(self) -> (NotificationLevel, &'static str) {
        match self {
            RiderPhase::Arriving => (NotificationLevel::Info, "Your driver is on the way"),
            RiderPhase::Arrived => (NotificationLevel::Success, "Your driver has arrived!"),
            RiderPhase::InProgress => (NotificationLevel::Info, "Your ride has started"),
            RiderPhase::Approaching => (NotificationLevel::Info, "Approaching your destination"),
            RiderPhase::AlmostThere => (NotificationLevel::Info, "Almost there!"),
            RiderPhase::Completed => (
                NotificationLevel::Success,
                "You have arrived at your destination",
            ),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiderPhase::Arriving => "arriving",
            RiderPhase::Arrived => "arrived",
            RiderPhase::InProgress => "in_progress",
            RiderPhase::Approaching => "approaching",
            RiderPhase::AlmostThere => "almost_there",
            RiderPhase::Completed => "completed",
        }
    }
}

impl fmt::Display for RiderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared resources a tracking step may touch.
pub(crate) struct RiderEnv<'a> {
    pub clock: &'a mut SimulationClock,
    pub storage: &'a mut SessionStorage,
    pub signals: &'a mut Signals,
    pub rides: &'a mut RideContext,
}

/// The mounted rider tracking machine. Present in the world only while the
/// tracking screen is mounted.
#[derive(Debug, Resource)]
pub struct RiderTracking {
    ride_id: RideId,
    phase: RiderPhase,
    seconds_left: u32,
    minutes_to_destination: u32,
    driver_position: Position,
    timers: TimerSlots,
    trace: Vec<RiderPhase>,
    config: RiderTrackingConfig,
}

impl RiderTracking {
    pub fn ride_id(&self) -> RideId {
        self.ride_id
    }

    pub fn phase(&self) -> RiderPhase {
        self.phase
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn minutes_to_destination(&self) -> u32 {
        self.minutes_to_destination
    }

    pub fn driver_position(&self) -> Position {
        self.driver_position
    }

    /// Phases observed by this mount, starting with the one it resumed into.
    pub fn trace(&self) -> &[RiderPhase] {
        &self.trace
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.armed_count()
    }

    fn mount(env: &mut RiderEnv<'_>, config: RiderTrackingConfig) -> Result<Self, OrchestratorError> {
        let ride = env.rides.current_ride().ok_or(OrchestratorError::MissingRide)?;
        if ride.status != RideStatus::InProgress {
            return Err(OrchestratorError::RideNotInProgress {
                status: ride.status,
            });
        }
        if ride.driver.is_none() {
            return Err(OrchestratorError::MissingDriver);
        }

        let phase = env.storage.load(RIDER_PHASE_KEY, RiderPhase::Arriving);
        let mut tracking = Self {
            ride_id: ride.id,
            phase,
            seconds_left: env
                .storage
                .load(RIDER_SECONDS_LEFT_KEY, config.countdown_start_secs),
            minutes_to_destination: env
                .storage
                .load(RIDER_MINUTES_KEY, config.full_minutes_to_destination),
            driver_position: env
                .storage
                .load(RIDER_DRIVER_POSITION_KEY, DEFAULT_DRIVER_POSITION),
            timers: TimerSlots::default(),
            trace: vec![phase],
            config,
        };
        tracing::info!(
            ride_id = %tracking.ride_id.0,
            phase = %tracking.phase,
            seconds_left = tracking.seconds_left,
            "rider tracking mounted"
        );

        tracking.persist(env.storage);
        if tracking.phase.is_terminal() {
            // Stale record from a completion that never finished; finish it now.
            let (level, message) = tracking.phase.entry_notification();
            env.signals.notify(env.clock.now(), level, message);
            tracking.complete(env);
        } else {
            tracking.arm_phase_timers(env.clock);
        }
        Ok(tracking)
    }

    fn subject(&self) -> EventSubject {
        EventSubject::Rider(self.phase)
    }

    fn arm_phase_timers(&mut self, clock: &mut SimulationClock) {
        let subject = self.subject();
        if self.phase.marker_path().is_some() {
            self.timers
                .arm_tick(clock, self.config.tick_ms, EventKind::RiderTick, subject);
        }
        if let Some(delay) = self.phase.deadline_ms(&self.config) {
            self.timers
                .arm_deadline(clock, delay, EventKind::RiderPhaseDeadline, subject);
        }
    }

    fn persist(&self, storage: &mut SessionStorage) {
        storage.save_or_warn(RIDER_PHASE_KEY, &self.phase);
        storage.save_or_warn(RIDER_SECONDS_LEFT_KEY, &self.seconds_left);
        storage.save_or_warn(RIDER_MINUTES_KEY, &self.minutes_to_destination);
        storage.save_or_warn(RIDER_DRIVER_POSITION_KEY, &self.driver_position);
    }

    /// Stale-timer guard: the event must have been armed by the current phase.
    fn owns(&self, event: &Event) -> bool {
        event.subject == Some(self.subject())
    }

    fn enter(&mut self, next: RiderPhase, env: &mut RiderEnv<'_>) {
        self.timers.cancel_all(env.clock);
        let previous = self.phase;
        self.phase = next;
        self.trace.push(next);
        if next == RiderPhase::InProgress {
            self.minutes_to_destination = self.config.full_minutes_to_destination;
        }
        self.persist(env.storage);

        let (level, message) = next.entry_notification();
        env.signals.notify(env.clock.now(), level, message);
        tracing::info!(
            ride_id = %self.ride_id.0,
            from = %previous,
            to = %next,
            at_ms = env.clock.now(),
            "rider phase changed"
        );

        if next.is_terminal() {
            self.complete(env);
        } else {
            self.arm_phase_timers(env.clock);
        }
    }

    fn complete(&mut self, env: &mut RiderEnv<'_>) {
        self.timers.cancel_all(env.clock);
        match env.rides.finish_current(RideStatus::Completed) {
            Ok(ride) => {
                env.storage.save_or_warn(COMPLETED_RIDE_KEY, &ride);
                env.signals.navigate(Navigation::RideCompleted(ride.id));
            }
            Err(error) => {
                tracing::warn!(%error, "ride could not be marked completed");
                env.signals.navigate(Navigation::NoActiveRide);
            }
        }
        for key in RIDER_PHASE_RECORD_KEYS {
            env.storage.clear(key);
        }
    }

    pub(crate) fn on_tick(&mut self, event: &Event, env: &mut RiderEnv<'_>) {
        if !self.owns(event) || self.timers.tick() != Some(event.id) {
            tracing::debug!(?event, phase = %self.phase, "dropping stale rider tick");
            return;
        }
        self.timers.fired(event.id);

        if let Some(path) = self.phase.marker_path() {
            self.driver_position = path.step(self.driver_position);
        }
        if self.phase == RiderPhase::Arriving {
            self.seconds_left = self.seconds_left.saturating_sub(1);
        }
        if let Some(floor) = self.phase.minutes_floor() {
            self.minutes_to_destination = self.minutes_to_destination.saturating_sub(1).max(floor);
        }
        self.persist(env.storage);

        if self.phase == RiderPhase::Arriving && self.seconds_left == 0 {
            self.enter(RiderPhase::Arrived, env);
            return;
        }
        self.timers.arm_tick(
            env.clock,
            self.config.tick_ms,
            EventKind::RiderTick,
            self.subject(),
        );
    }

    pub(crate) fn on_deadline(&mut self, event: &Event, env: &mut RiderEnv<'_>) {
        if !self.owns(event) || self.timers.deadline() != Some(event.id) {
            tracing::debug!(?event, phase = %self.phase, "dropping stale rider deadline");
            return;
        }
        self.timers.fired(event.id);
        if let Some(next) = self.phase.next() {
            self.enter(next, env);
        }
    }

    fn force_complete(&mut self, env: &mut RiderEnv<'_>) -> Result<(), OrchestratorError> {
        if self.phase.is_terminal() {
            return Err(OrchestratorError::InvalidAction {
                action: "force complete",
                phase: self.phase.to_string(),
            });
        }
        tracing::info!(ride_id = %self.ride_id.0, phase = %self.phase, "force completing ride");
        self.enter(RiderPhase::Completed, env);
        Ok(())
    }

    fn cancel(&mut self, env: &mut RiderEnv<'_>) -> Result<Ride, OrchestratorError> {
        if self.phase.is_terminal() {
            return Err(OrchestratorError::InvalidAction {
                action: "cancel",
                phase: self.phase.to_string(),
            });
        }
        let ride = env.rides.finish_current(RideStatus::Cancelled)?;
        self.timers.cancel_all(env.clock);
        for key in RIDER_PHASE_RECORD_KEYS {
            env.storage.clear(key);
        }
        env.signals.notify(
            env.clock.now(),
            NotificationLevel::Warning,
            "Your ride has been cancelled",
        );
        env.signals.navigate(Navigation::RideCancelled(ride.id));
        tracing::info!(ride_id = %ride.id.0, phase = %self.phase, "ride cancelled");
        Ok(ride)
    }

    fn teardown(&mut self, clock: &mut SimulationClock) {
        self.timers.cancel_all(clock);
    }
}

type RiderParams = (
    ResMut<'static, SimulationClock>,
    ResMut<'static, SessionStorage>,
    ResMut<'static, Signals>,
    ResMut<'static, RideContext>,
    Option<ResMut<'static, RiderTracking>>,
    Option<Res<'static, RiderTrackingConfig>>,
);

fn with_rider_env<R>(
    world: &mut World,
    f: impl FnOnce(&mut RiderEnv<'_>, Option<&mut RiderTracking>, RiderTrackingConfig) -> R,
) -> R {
    let mut state: SystemState<RiderParams> = SystemState::new(world);
    let (mut clock, mut storage, mut signals, mut rides, mut tracking, config) =
        state.get_mut(world);
    let config = config.map(|config| *config).unwrap_or_default();
    let mut env = RiderEnv {
        clock: &mut clock,
        storage: &mut storage,
        signals: &mut signals,
        rides: &mut rides,
    };
    f(&mut env, tracking.as_deref_mut(), config)
}

/// Mount the tracking screen for the current ride.
///
/// Resumes from persisted state when present. Mounting while already mounted is
/// a no-op, so a re-render never schedules duplicate timers. Without an
/// in-progress ride that has a driver, nothing is armed and the shell is told to
/// leave via [Navigation::NoActiveRide].
pub fn start_rider_tracking(world: &mut World) -> Result<(), OrchestratorError> {
    if world.contains_resource::<RiderTracking>() {
        return Ok(());
    }
    let mounted = with_rider_env(world, |env, _, config| {
        let result = RiderTracking::mount(env, config);
        if let Err(error) = &result {
            tracing::warn!(%error, "rider tracking opened without an active ride");
            env.signals.navigate(Navigation::NoActiveRide);
        }
        result
    })?;
    world.insert_resource(mounted);
    Ok(())
}

/// Unmount the tracking screen. Every live timer is cancelled; the persisted
/// record stays so the next mount resumes.
pub fn teardown_rider_tracking(world: &mut World) {
    let Some(mut tracking) = world.remove_resource::<RiderTracking>() else {
        return;
    };
    tracking.teardown(&mut world.resource_mut::<SimulationClock>());
    tracing::info!(ride_id = %tracking.ride_id.0, phase = %tracking.phase, "rider tracking torn down");
}

/// Operator override: jump straight to completed from any phase.
pub fn force_complete_ride(world: &mut World) -> Result<(), OrchestratorError> {
    with_rider_env(world, |env, tracking, _| {
        tracking
            .ok_or(OrchestratorError::NotRunning("rider tracking"))?
            .force_complete(env)
    })
}

/// Cancel the tracked ride. The machine unmounts afterwards.
pub fn cancel_tracked_ride(world: &mut World) -> Result<Ride, OrchestratorError> {
    let ride = with_rider_env(world, |env, tracking, _| {
        tracking
            .ok_or(OrchestratorError::NotRunning("rider tracking"))?
            .cancel(env)
    })?;
    world.remove_resource::<RiderTracking>();
    Ok(ride)
}

/// Tab visibility changed. Only logged: running timers keep running and nothing
/// is re-armed on refocus.
pub fn rider_visibility_changed(world: &World, visible: bool) {
    match world.get_resource::<RiderTracking>() {
        Some(tracking) => tracing::info!(
            visible,
            phase = %tracking.phase,
            seconds_left = tracking.seconds_left,
            minutes_to_destination = tracking.minutes_to_destination,
            "rider tracking visibility changed"
        ),
        None => tracing::debug!(visible, "visibility changed with no tracking mounted"),
    }
}
