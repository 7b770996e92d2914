//! Driver-side ride screen: search, request, pickup, drop-off, earnings.
//!
//! ```text
//! searching --(search delay)--> request --accept--> accepted --(drive ticks)--> arrived
//!     ^                            |                                               |
//!     +----(decline / timeout)-----+                                          start ride
//!                                                                                  v
//!                              dashboard <--done-- completed <--(drive ticks)-- inProgress
//! ```
//!
//! Only the request countdown has a user-visible timeout, and it is treated as
//! a decline. Exactly one timer is armed at any instant while the screen is
//! mounted, except in arrived and completed, which wait on the driver.

use std::fmt;

use bevy_ecs::prelude::{Res, ResMut, Resource, World};
use bevy_ecs::system::SystemState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{Event, EventKind, EventSubject, SimulationClock, TimerSlots, ONE_SEC_MS};
use crate::config::DriverSimConfig;
use crate::error::OrchestratorError;
use crate::position::{
    MarkerPath, Position, DRIVER_START_POSITION, DRIVER_TOWARD_DROPOFF, DRIVER_TOWARD_PICKUP,
};
use crate::pricing::{
    compute_fare, driver_earnings, round_to_cents, CapacityOption, EarningsBreakdown, RideOption,
    PEAK_BONUS,
};
use crate::signals::{Navigation, NotificationLevel, Signals};
use crate::storage::{SessionStorage, DRIVER_FROM_ACTIVE_RIDE_KEY, DRIVER_ONLINE_STATUS_KEY};

const RIDER_NAMES: [&str; 6] = [
    "Alex Johnson",
    "Maria Garcia",
    "Sam Lee",
    "Priya Patel",
    "Jordan Smith",
    "Chen Wei",
];

const PLACES: [&str; 8] = [
    "Central Station",
    "Riverside Mall",
    "City Airport, Terminal 2",
    "Oak Street 14",
    "University Campus",
    "Harbor View Hotel",
    "Grand Arena",
    "Maple Avenue 221",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DriverPhase {
    Searching,
    Request,
    Accepted,
    Arrived,
    InProgress,
    Completed,
}

impl DriverPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverPhase::Searching => "searching",
            DriverPhase::Request => "request",
            DriverPhase::Accepted => "accepted",
            DriverPhase::Arrived => "arrived",
            DriverPhase::InProgress => "inProgress",
            DriverPhase::Completed => "completed",
        }
    }

    fn marker_path(self) -> Option<MarkerPath> {
        match self {
            DriverPhase::Accepted => Some(DRIVER_TOWARD_PICKUP),
            DriverPhase::InProgress => Some(DRIVER_TOWARD_DROPOFF),
            _ => None,
        }
    }

    /// Searching and an open request are the only phases a driver may leave
    /// by going offline.
    fn allows_offline(self) -> bool {
        matches!(self, DriverPhase::Searching | DriverPhase::Request)
    }
}

impl fmt::Display for DriverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A synthesized ride offer shown to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    pub id: Uuid,
    pub rider_name: String,
    pub pickup: String,
    pub dropoff: String,
    /// Miles.
    pub distance: f64,
    pub fare: f64,
    pub ride_type: RideOption,
    pub is_premium: bool,
    pub is_peak_bonus: bool,
}

impl RideRequest {
    fn synthesize(rng: &mut StdRng, config: &DriverSimConfig) -> Self {
        let rider_name = RIDER_NAMES[rng.gen_range(0..RIDER_NAMES.len())];
        let pickup_index = rng.gen_range(0..PLACES.len());
        let dropoff_index =
            (pickup_index + rng.gen_range(1..PLACES.len())) % PLACES.len();
        let distance = (rng.gen_range(1.0..15.0_f64) * 10.0).round() / 10.0;
        let is_premium = rng.gen_bool(config.premium_probability.clamp(0.0, 1.0));
        let ride_type = if is_premium {
            RideOption::Premium
        } else {
            RideOption::Standard
        };
        Self {
            id: Uuid::from_u128(rng.gen()),
            rider_name: rider_name.to_string(),
            pickup: PLACES[pickup_index].to_string(),
            dropoff: PLACES[dropoff_index].to_string(),
            distance,
            fare: compute_fare(distance, ride_type, CapacityOption::Regular, false),
            ride_type,
            is_premium,
            is_peak_bonus: rng.gen_bool(config.peak_bonus_probability.clamp(0.0, 1.0)),
        }
    }
}

/// Counters kept across driver screen mounts for the whole session.
///
/// Timeouts are counted on their own and never folded into an acceptance figure.
#[derive(Debug, Clone, Default, PartialEq, Resource)]
pub struct DriverShiftStats {
    pub requests_offered: u32,
    pub requests_accepted: u32,
    pub requests_declined: u32,
    pub requests_timed_out: u32,
    pub rides_completed: u32,
    pub total_earnings: f64,
}

pub(crate) struct DriverEnv<'a> {
    pub clock: &'a mut SimulationClock,
    pub storage: &'a mut SessionStorage,
    pub signals: &'a mut Signals,
    pub stats: &'a mut DriverShiftStats,
}

/// The mounted driver ride screen.
#[derive(Debug, Resource)]
pub struct DriverSession {
    phase: DriverPhase,
    countdown: u32,
    offer: Option<RideRequest>,
    job: Option<RideRequest>,
    marker: Position,
    drive_ticks_remaining: u32,
    peak_bonus_display: Option<f64>,
    earnings: Option<EarningsBreakdown>,
    timers: TimerSlots,
    trace: Vec<DriverPhase>,
    rng: StdRng,
    config: DriverSimConfig,
}

impl DriverSession {
    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    /// Seconds left to answer the open request.
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// The request awaiting an answer, only during [DriverPhase::Request].
    pub fn offer(&self) -> Option<&RideRequest> {
        self.offer.as_ref()
    }

    /// The accepted ride being driven.
    pub fn job(&self) -> Option<&RideRequest> {
        self.job.as_ref()
    }

    pub fn marker(&self) -> Position {
        self.marker
    }

    pub fn drive_ticks_remaining(&self) -> u32 {
        self.drive_ticks_remaining
    }

    /// Bonus amount animated on accept for peak requests.
    pub fn peak_bonus_display(&self) -> Option<f64> {
        self.peak_bonus_display
    }

    pub fn earnings(&self) -> Option<EarningsBreakdown> {
        self.earnings
    }

    pub fn trace(&self) -> &[DriverPhase] {
        &self.trace
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.armed_count()
    }

    fn new(config: DriverSimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            phase: DriverPhase::Searching,
            countdown: config.request_timeout_secs,
            offer: None,
            job: None,
            marker: DRIVER_START_POSITION,
            drive_ticks_remaining: 0,
            peak_bonus_display: None,
            earnings: None,
            timers: TimerSlots::default(),
            trace: vec![DriverPhase::Searching],
            rng,
            config,
        }
    }

    fn subject(&self) -> EventSubject {
        EventSubject::Driver(self.phase)
    }

    fn owns(&self, event: &Event) -> bool {
        event.subject == Some(self.subject())
    }

    fn arm_phase_timer(&mut self, clock: &mut SimulationClock) {
        let subject = self.subject();
        match self.phase {
            DriverPhase::Searching => self.timers.arm_deadline(
                clock,
                self.config.search_delay_ms,
                EventKind::DriverSearchDeadline,
                subject,
            ),
            DriverPhase::Request => self.timers.arm_tick(
                clock,
                ONE_SEC_MS,
                EventKind::DriverRequestCountdown,
                subject,
            ),
            DriverPhase::Accepted => self.timers.arm_tick(
                clock,
                self.config.pickup_tick_ms,
                EventKind::DriverDriveStep,
                subject,
            ),
            DriverPhase::InProgress => self.timers.arm_tick(
                clock,
                self.config.dropoff_tick_ms,
                EventKind::DriverDriveStep,
                subject,
            ),
            DriverPhase::Arrived | DriverPhase::Completed => {}
        }
    }

    fn enter(
        &mut self,
        next: DriverPhase,
        env: &mut DriverEnv<'_>,
        level: NotificationLevel,
        message: String,
    ) {
        self.timers.cancel_all(env.clock);
        let previous = self.phase;
        self.phase = next;
        self.trace.push(next);

        match next {
            DriverPhase::Searching => {
                self.offer = None;
                self.countdown = self.config.request_timeout_secs;
            }
            DriverPhase::Request => {
                self.countdown = self.config.request_timeout_secs;
            }
            DriverPhase::Accepted => {
                self.marker = DRIVER_START_POSITION;
                self.drive_ticks_remaining = self.config.pickup_drive_ticks.max(1);
            }
            DriverPhase::InProgress => {
                self.drive_ticks_remaining = self.config.dropoff_drive_ticks.max(1);
            }
            DriverPhase::Arrived | DriverPhase::Completed => {}
        }

        env.signals.notify(env.clock.now(), level, message);
        tracing::info!(
            from = %previous,
            to = %next,
            at_ms = env.clock.now(),
            "driver phase changed"
        );
        self.arm_phase_timer(env.clock);
    }

    pub(crate) fn on_search_deadline(&mut self, event: &Event, env: &mut DriverEnv<'_>) {
        if !self.owns(event) || self.timers.deadline() != Some(event.id) {
            tracing::debug!(?event, phase = %self.phase, "dropping stale search deadline");
            return;
        }
        self.timers.fired(event.id);

        let request = RideRequest::synthesize(&mut self.rng, &self.config);
        env.stats.requests_offered += 1;
        let message = format!(
            "New ride request from {}: ${:.2}",
            request.rider_name, request.fare
        );
        tracing::info!(
            request_id = %request.id,
            fare = request.fare,
            peak = request.is_peak_bonus,
            "ride request found"
        );
        self.offer = Some(request);
        self.enter(DriverPhase::Request, env, NotificationLevel::Info, message);
    }

    pub(crate) fn on_countdown_tick(&mut self, event: &Event, env: &mut DriverEnv<'_>) {
        if !self.owns(event) || self.timers.tick() != Some(event.id) {
            tracing::debug!(?event, phase = %self.phase, "dropping stale countdown tick");
            return;
        }
        self.timers.fired(event.id);

        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            env.stats.requests_timed_out += 1;
            self.enter(
                DriverPhase::Searching,
                env,
                NotificationLevel::Warning,
                "Request expired".to_string(),
            );
            return;
        }
        self.arm_phase_timer(env.clock);
    }

    pub(crate) fn on_drive_step(&mut self, event: &Event, env: &mut DriverEnv<'_>) {
        if !self.owns(event) || self.timers.tick() != Some(event.id) {
            tracing::debug!(?event, phase = %self.phase, "dropping stale drive step");
            return;
        }
        self.timers.fired(event.id);

        if let Some(path) = self.phase.marker_path() {
            self.marker = path.step(self.marker);
        }
        self.drive_ticks_remaining = self.drive_ticks_remaining.saturating_sub(1);
        if self.drive_ticks_remaining > 0 {
            self.arm_phase_timer(env.clock);
            return;
        }

        match self.phase {
            DriverPhase::Accepted => self.enter(
                DriverPhase::Arrived,
                env,
                NotificationLevel::Success,
                "You have arrived at the pickup".to_string(),
            ),
            DriverPhase::InProgress => self.complete(env),
            _ => {}
        }
    }

    fn complete(&mut self, env: &mut DriverEnv<'_>) {
        let Some(job) = self.job.as_ref() else {
            tracing::warn!("drive finished without an accepted job");
            return;
        };
        let earnings = driver_earnings(job.fare, job.is_peak_bonus);
        self.earnings = Some(earnings);
        env.stats.rides_completed += 1;
        env.stats.total_earnings = round_to_cents(env.stats.total_earnings + earnings.total);
        self.enter(
            DriverPhase::Completed,
            env,
            NotificationLevel::Success,
            format!("Ride completed! You earned ${:.2}", earnings.total),
        );
    }

    fn invalid(&self, action: &'static str) -> OrchestratorError {
        OrchestratorError::InvalidAction {
            action,
            phase: self.phase.to_string(),
        }
    }

    fn accept(&mut self, env: &mut DriverEnv<'_>) -> Result<(), OrchestratorError> {
        if self.phase != DriverPhase::Request {
            return Err(self.invalid("accept a request"));
        }
        let Some(request) = self.offer.take() else {
            return Err(self.invalid("accept a request"));
        };
        env.stats.requests_accepted += 1;
        self.peak_bonus_display = request.is_peak_bonus.then_some(PEAK_BONUS);
        let message = format!("Ride accepted. Head to {}", request.pickup);
        self.job = Some(request);
        self.enter(DriverPhase::Accepted, env, NotificationLevel::Success, message);
        Ok(())
    }

    fn decline(&mut self, env: &mut DriverEnv<'_>) -> Result<(), OrchestratorError> {
        if self.phase != DriverPhase::Request {
            return Err(self.invalid("decline a request"));
        }
        env.stats.requests_declined += 1;
        self.enter(
            DriverPhase::Searching,
            env,
            NotificationLevel::Info,
            "Ride declined".to_string(),
        );
        Ok(())
    }

    fn start_ride(&mut self, env: &mut DriverEnv<'_>) -> Result<(), OrchestratorError> {
        if self.phase != DriverPhase::Arrived {
            return Err(self.invalid("start the ride"));
        }
        self.enter(
            DriverPhase::InProgress,
            env,
            NotificationLevel::Info,
            "Ride started".to_string(),
        );
        Ok(())
    }

    fn teardown(&mut self, clock: &mut SimulationClock) {
        self.timers.cancel_all(clock);
    }
}

type DriverParams = (
    ResMut<'static, SimulationClock>,
    ResMut<'static, SessionStorage>,
    ResMut<'static, Signals>,
    ResMut<'static, DriverShiftStats>,
    Option<ResMut<'static, DriverSession>>,
    Option<Res<'static, DriverSimConfig>>,
);

fn with_driver_env<R>(
    world: &mut World,
    f: impl FnOnce(&mut DriverEnv<'_>, Option<&mut DriverSession>, DriverSimConfig) -> R,
) -> R {
    world.init_resource::<DriverShiftStats>();
    let mut state: SystemState<DriverParams> = SystemState::new(world);
    let (mut clock, mut storage, mut signals, mut stats, mut session, config) =
        state.get_mut(world);
    let config = config.map(|config| *config).unwrap_or_default();
    let mut env = DriverEnv {
        clock: &mut clock,
        storage: &mut storage,
        signals: &mut signals,
        stats: &mut stats,
    };
    f(&mut env, session.as_deref_mut(), config)
}

fn with_session<R>(
    world: &mut World,
    f: impl FnOnce(&mut DriverSession, &mut DriverEnv<'_>) -> Result<R, OrchestratorError>,
) -> Result<R, OrchestratorError> {
    with_driver_env(world, |env, session, _| {
        let session = session.ok_or(OrchestratorError::NotRunning("driver session"))?;
        f(session, env)
    })
}

/// Go online: mount the driver ride screen and start searching. A no-op when the
/// screen is already mounted.
pub fn go_online(world: &mut World) -> Result<(), OrchestratorError> {
    if world.contains_resource::<DriverSession>() {
        return Ok(());
    }
    let session = with_driver_env(world, |env, _, config| {
        env.storage.save_raw(DRIVER_ONLINE_STATUS_KEY, "online");
        let mut session = DriverSession::new(config);
        env.signals.notify(
            env.clock.now(),
            NotificationLevel::Info,
            "You're online. Searching for rides...",
        );
        tracing::info!(at_ms = env.clock.now(), "driver online");
        session.arm_phase_timer(env.clock);
        session
    });
    world.insert_resource(session);
    Ok(())
}

/// Go offline from searching or an unanswered request. Not allowed mid-ride.
pub fn go_offline(world: &mut World) -> Result<(), OrchestratorError> {
    with_session(world, |session, env| {
        if !session.phase.allows_offline() {
            return Err(session.invalid("go offline"));
        }
        session.teardown(env.clock);
        env.storage.save_raw(DRIVER_ONLINE_STATUS_KEY, "offline");
        env.signals
            .notify(env.clock.now(), NotificationLevel::Info, "You're offline");
        tracing::info!(at_ms = env.clock.now(), "driver offline");
        Ok(())
    })?;
    world.remove_resource::<DriverSession>();
    Ok(())
}

pub fn accept_request(world: &mut World) -> Result<(), OrchestratorError> {
    with_session(world, |session, env| session.accept(env))
}

pub fn decline_request(world: &mut World) -> Result<(), OrchestratorError> {
    with_session(world, |session, env| session.decline(env))
}

/// Driver is at the pickup and the rider is aboard.
pub fn start_ride(world: &mut World) -> Result<(), OrchestratorError> {
    with_session(world, |session, env| session.start_ride(env))
}

/// "Done" on the earnings screen: back to the dashboard, still online.
pub fn finish_ride(world: &mut World) -> Result<EarningsBreakdown, OrchestratorError> {
    let earnings = with_session(world, |session, env| {
        if session.phase != DriverPhase::Completed {
            return Err(session.invalid("finish the ride"));
        }
        let earnings = session
            .earnings
            .ok_or_else(|| session.invalid("finish the ride"))?;
        session.teardown(env.clock);
        env.storage.save_raw(DRIVER_ONLINE_STATUS_KEY, "online");
        env.storage.save_raw(DRIVER_FROM_ACTIVE_RIDE_KEY, "true");
        env.signals
            .notify(env.clock.now(), NotificationLevel::Info, "Back online");
        env.signals.navigate(Navigation::DriverDashboard);
        Ok(earnings)
    })?;
    world.remove_resource::<DriverSession>();
    Ok(earnings)
}

/// Unmount the driver screen without changing the online status.
pub fn teardown_driver_session(world: &mut World) {
    let Some(mut session) = world.remove_resource::<DriverSession>() else {
        return;
    };
    session.teardown(&mut world.resource_mut::<SimulationClock>());
    tracing::info!(phase = %session.phase, "driver session torn down");
}

/// Online status as last persisted; offline when never set.
pub fn driver_online_status(world: &World) -> bool {
    world
        .get_resource::<SessionStorage>()
        .and_then(|storage| storage.load_raw(DRIVER_ONLINE_STATUS_KEY))
        .is_some_and(|status| status == "online")
}

/// Whether the dashboard was just reached from an active ride. Reading clears it.
pub fn take_active_ride_handoff(world: &mut World) -> bool {
    world
        .get_resource_mut::<SessionStorage>()
        .is_some_and(|mut storage| storage.take_flag(DRIVER_FROM_ACTIVE_RIDE_KEY))
}
