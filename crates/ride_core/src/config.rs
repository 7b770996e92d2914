//! Orchestrator configuration and world setup.
//!
//! Defaults reproduce the demo timings. A config can also be read from JSON;
//! any field left out keeps its default.

use bevy_ecs::prelude::{Resource, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{SimulationClock, ONE_SEC_MS};
use crate::driver::DriverShiftStats;
use crate::ride::RideContext;
use crate::signals::Signals;
use crate::storage::SessionStorage;

/// Timings for the rider's ride-tracking screen.
#[derive(Debug, Clone, Copy, PartialEq, Resource, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiderTrackingConfig {
    /// Seconds until the driver reaches the pickup on a fresh start.
    pub countdown_start_secs: u32,
    /// Cadence of the tracking tick.
    pub tick_ms: u64,
    /// How long the "driver arrived" screen holds before the trip starts.
    pub arrived_dwell_ms: u64,
    pub in_progress_ms: u64,
    pub approaching_ms: u64,
    pub almost_there_ms: u64,
    /// Minutes to destination shown when the trip starts.
    pub full_minutes_to_destination: u32,
}

impl Default for RiderTrackingConfig {
    fn default() -> Self {
        Self {
            countdown_start_secs: 30,
            tick_ms: ONE_SEC_MS,
            arrived_dwell_ms: 3 * ONE_SEC_MS,
            in_progress_ms: 10 * ONE_SEC_MS,
            approaching_ms: 5 * ONE_SEC_MS,
            almost_there_ms: 5 * ONE_SEC_MS,
            full_minutes_to_destination: 10,
        }
    }
}

impl RiderTrackingConfig {
    pub fn with_countdown_secs(mut self, secs: u32) -> Self {
        self.countdown_start_secs = secs;
        self
    }

    /// Total simulated time of an uninterrupted ride from a fresh start.
    pub fn total_ride_ms(&self) -> u64 {
        u64::from(self.countdown_start_secs) * self.tick_ms
            + self.arrived_dwell_ms
            + self.in_progress_ms
            + self.approaching_ms
            + self.almost_there_ms
    }
}

/// Timings and randomness for the driver's ride screen.
#[derive(Debug, Clone, Copy, PartialEq, Resource, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverSimConfig {
    /// Delay between going online (or a decline) and the next request.
    pub search_delay_ms: u64,
    /// Seconds the driver has to answer a request.
    pub request_timeout_secs: u32,
    pub pickup_drive_ticks: u32,
    pub pickup_tick_ms: u64,
    pub dropoff_drive_ticks: u32,
    pub dropoff_tick_ms: u64,
    /// Chance a synthesized request carries the peak bonus.
    pub peak_bonus_probability: f64,
    /// Chance a synthesized request is a premium ride.
    pub premium_probability: f64,
    /// Seed for request synthesis; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for DriverSimConfig {
    fn default() -> Self {
        Self {
            search_delay_ms: 8 * ONE_SEC_MS,
            request_timeout_secs: 15,
            pickup_drive_ticks: 20,
            pickup_tick_ms: 150,
            dropoff_drive_ticks: 25,
            dropoff_tick_ms: 200,
            peak_bonus_probability: 0.3,
            premium_probability: 0.25,
            seed: None,
        }
    }
}

impl DriverSimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_peak_bonus_probability(mut self, probability: f64) -> Self {
        self.peak_bonus_probability = probability;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    pub rider: RiderTrackingConfig,
    pub driver: DriverSimConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl OrchestratorConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_rider(mut self, rider: RiderTrackingConfig) -> Self {
        self.rider = rider;
        self
    }

    pub fn with_driver(mut self, driver: DriverSimConfig) -> Self {
        self.driver = driver;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rider = &self.rider;
        if rider.tick_ms == 0 {
            return Err(ConfigError::Invalid("rider.tick_ms must be positive".into()));
        }
        if rider.countdown_start_secs == 0 {
            return Err(ConfigError::Invalid(
                "rider.countdown_start_secs must be positive".into(),
            ));
        }
        let driver = &self.driver;
        if driver.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "driver.request_timeout_secs must be positive".into(),
            ));
        }
        if driver.pickup_tick_ms == 0 || driver.dropoff_tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "driver drive tick intervals must be positive".into(),
            ));
        }
        for (name, probability) in [
            ("peak_bonus_probability", driver.peak_bonus_probability),
            ("premium_probability", driver.premium_probability),
        ] {
            if !(0.0..=1.0).contains(&probability) {
                return Err(ConfigError::Invalid(format!(
                    "driver.{name} must be within 0..=1, got {probability}"
                )));
            }
        }
        Ok(())
    }
}

/// Populates `world` with the clock, ride context, signals, configs and the given
/// session storage. Machines are mounted separately.
pub fn build_orchestrator_with_storage(
    world: &mut World,
    config: OrchestratorConfig,
    storage: SessionStorage,
) {
    world.insert_resource(SimulationClock::default());
    world.insert_resource(RideContext::default());
    world.insert_resource(Signals::default());
    world.insert_resource(DriverShiftStats::default());
    world.insert_resource(storage);
    world.insert_resource(config.rider);
    world.insert_resource(config.driver);
}

/// [build_orchestrator_with_storage] with a fresh in-memory session store.
pub fn build_orchestrator(world: &mut World, config: OrchestratorConfig) {
    build_orchestrator_with_storage(world, config, SessionStorage::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_timings() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.rider.countdown_start_secs, 30);
        assert_eq!(config.rider.total_ride_ms(), 53 * ONE_SEC_MS);
        assert_eq!(config.driver.request_timeout_secs, 15);
        assert_eq!(config.driver.pickup_drive_ticks, 20);
        assert_eq!(config.driver.dropoff_tick_ms, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = OrchestratorConfig::from_json_str(
            r#"{"rider": {"countdown_start_secs": 5}, "driver": {"seed": 7}}"#,
        )
        .expect("config");
        assert_eq!(config.rider.countdown_start_secs, 5);
        assert_eq!(config.rider.tick_ms, ONE_SEC_MS);
        assert_eq!(config.driver.seed, Some(7));
        assert_eq!(config.driver.search_delay_ms, 8 * ONE_SEC_MS);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_values() {
        assert!(matches!(
            OrchestratorConfig::from_json_str(r#"{"rider": {"speed": 3}}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            OrchestratorConfig::from_json_str(r#"{"driver": {"request_timeout_secs": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            OrchestratorConfig::from_json_str(r#"{"driver": {"peak_bonus_probability": 1.5}}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn build_inserts_shared_resources() {
        let mut world = World::new();
        build_orchestrator(&mut world, OrchestratorConfig::default());
        assert!(world.contains_resource::<SimulationClock>());
        assert!(world.contains_resource::<RideContext>());
        assert!(world.contains_resource::<Signals>());
        assert!(world.contains_resource::<SessionStorage>());
        assert!(world.contains_resource::<RiderTrackingConfig>());
        assert!(world.contains_resource::<DriverSimConfig>());
        assert!(world.contains_resource::<DriverShiftStats>());
    }
}
