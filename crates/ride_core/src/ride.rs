//! Ride entity and the ride context shared by both roles.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::pricing::{compute_fare, CapacityOption, RideOption};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideId(pub Uuid);

impl RideId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RideId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RideStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// One-directional: forward one step along pending → confirmed → in-progress →
    /// completed, or to cancelled from any non-terminal status.
    pub fn can_transition_to(self, next: RideStatus) -> bool {
        match (self, next) {
            (RideStatus::Pending, RideStatus::Confirmed)
            | (RideStatus::Confirmed, RideStatus::InProgress)
            | (RideStatus::InProgress, RideStatus::Completed) => true,
            (current, RideStatus::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

/// Pay-per-ride drivers are tier 1, prime subscribers tier 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DriverTier {
    PayPerRide,
    Prime,
}

impl From<DriverTier> for u8 {
    fn from(tier: DriverTier) -> Self {
        match tier {
            DriverTier::PayPerRide => 1,
            DriverTier::Prime => 2,
        }
    }
}

impl TryFrom<u8> for DriverTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DriverTier::PayPerRide),
            2 => Ok(DriverTier::Prime),
            other => Err(format!("unknown driver tier {other}")),
        }
    }
}

/// A driver as the rider sees them once matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub vehicle_type: String,
    pub license_plate: String,
    /// 0.0 to 5.0.
    pub rating: f64,
    pub tier: DriverTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: RideId,
    pub pickup_location: String,
    pub dropoff_location: String,
    /// Miles.
    pub distance: f64,
    /// Minutes.
    pub duration: u32,
    pub ride_option: RideOption,
    pub capacity_option: CapacityOption,
    pub fare: f64,
    pub driver: Option<Driver>,
    pub status: RideStatus,
    pub payment_method_id: Option<String>,
}

impl Ride {
    pub fn transition_to(&mut self, next: RideStatus) -> Result<(), OrchestratorError> {
        if !self.status.can_transition_to(next) {
            return Err(OrchestratorError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Everything the rider picks on the booking screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub pickup_location: String,
    pub dropoff_location: String,
    pub distance: f64,
    pub duration: u32,
    pub ride_option: RideOption,
    pub capacity_option: CapacityOption,
    pub is_subscribed: bool,
    pub payment_method_id: Option<String>,
}

impl BookingRequest {
    fn validate(&self) -> Result<(), OrchestratorError> {
        if !self.distance.is_finite() || self.distance <= 0.0 {
            return Err(OrchestratorError::InvalidBooking(format!(
                "distance must be positive, got {}",
                self.distance
            )));
        }
        if self.duration == 0 {
            return Err(OrchestratorError::InvalidBooking(
                "duration must be at least one minute".to_string(),
            ));
        }
        if self.pickup_location.trim().is_empty() || self.dropoff_location.trim().is_empty() {
            return Err(OrchestratorError::InvalidBooking(
                "pickup and dropoff are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Holds the active ride and the rides that have already finished.
///
/// While a state machine drives the active ride it is the only writer of its
/// status and driver.
#[derive(Debug, Default, Resource)]
pub struct RideContext {
    current: Option<Ride>,
    history: Vec<Ride>,
}

impl RideContext {
    pub fn current_ride(&self) -> Option<&Ride> {
        self.current.as_ref()
    }

    pub fn set_current_ride(&mut self, ride: Option<Ride>) {
        self.current = ride;
    }

    pub fn calculate_fare(
        &self,
        distance: f64,
        ride_option: RideOption,
        capacity_option: CapacityOption,
        is_subscribed: bool,
    ) -> f64 {
        compute_fare(distance, ride_option, capacity_option, is_subscribed)
    }

    /// Create a pending ride from a validated booking.
    pub fn book_ride(&mut self, booking: BookingRequest) -> Result<&Ride, OrchestratorError> {
        if self.current.as_ref().is_some_and(|ride| !ride.status.is_terminal()) {
            return Err(OrchestratorError::RideAlreadyActive);
        }
        booking.validate()?;

        let fare = self.calculate_fare(
            booking.distance,
            booking.ride_option,
            booking.capacity_option,
            booking.is_subscribed,
        );
        let ride = Ride {
            id: RideId::new(),
            pickup_location: booking.pickup_location,
            dropoff_location: booking.dropoff_location,
            distance: booking.distance,
            duration: booking.duration,
            ride_option: booking.ride_option,
            capacity_option: booking.capacity_option,
            fare,
            driver: None,
            status: RideStatus::Pending,
            payment_method_id: booking.payment_method_id,
        };
        tracing::info!(ride_id = %ride.id.0, fare, "ride booked");
        Ok(&*self.current.insert(ride))
    }

    /// Match a driver to the pending ride, confirming it.
    pub fn assign_driver(&mut self, driver: Driver) -> Result<(), OrchestratorError> {
        let ride = self.current.as_mut().ok_or(OrchestratorError::MissingRide)?;
        ride.transition_to(RideStatus::Confirmed)?;
        tracing::info!(ride_id = %ride.id.0, driver = %driver.name, "driver assigned");
        ride.driver = Some(driver);
        Ok(())
    }

    /// Mark the confirmed ride in-progress so tracking can start.
    pub fn begin_trip(&mut self) -> Result<(), OrchestratorError> {
        let ride = self.current.as_mut().ok_or(OrchestratorError::MissingRide)?;
        if ride.driver.is_none() {
            return Err(OrchestratorError::MissingDriver);
        }
        ride.transition_to(RideStatus::InProgress)
    }

    /// Terminate the active ride and hand it to history. Returns the final record.
    pub(crate) fn finish_current(&mut self, status: RideStatus) -> Result<Ride, OrchestratorError> {
        debug_assert!(status.is_terminal());
        let ride = self.current.as_mut().ok_or(OrchestratorError::MissingRide)?;
        ride.transition_to(status)?;
        let finished = ride.clone();
        self.current = None;
        self.history.push(finished.clone());
        Ok(finished)
    }

    /// Finished rides, oldest first. Display only.
    pub fn history(&self) -> &[Ride] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{sample_booking, sample_driver};

    #[test]
    fn booking_creates_pending_ride_with_fare() {
        let mut context = RideContext::default();
        let ride = context.book_ride(sample_booking()).expect("booking");
        assert_eq!(ride.status, RideStatus::Pending);
        assert_eq!(ride.fare, 14.00);
        assert!(ride.driver.is_none());
    }

    #[test]
    fn booking_rejects_non_positive_distance() {
        let mut context = RideContext::default();
        let booking = BookingRequest {
            distance: -2.0,
            ..sample_booking()
        };
        assert!(matches!(
            context.book_ride(booking),
            Err(OrchestratorError::InvalidBooking(_))
        ));
        assert!(context.current_ride().is_none());
    }

    #[test]
    fn only_one_active_ride() {
        let mut context = RideContext::default();
        context.book_ride(sample_booking()).expect("first booking");
        assert!(matches!(
            context.book_ride(sample_booking()),
            Err(OrchestratorError::RideAlreadyActive)
        ));
    }

    #[test]
    fn status_moves_forward_only() {
        let mut context = RideContext::default();
        context.book_ride(sample_booking()).expect("booking");
        assert!(matches!(
            context.begin_trip(),
            Err(OrchestratorError::MissingDriver)
        ));

        context.assign_driver(sample_driver()).expect("assign");
        context.begin_trip().expect("begin");
        let ride = context.current_ride().expect("ride");
        assert_eq!(ride.status, RideStatus::InProgress);

        let mut copy = ride.clone();
        assert!(copy.transition_to(RideStatus::Confirmed).is_err());
        assert_eq!(copy.status, RideStatus::InProgress);
    }

    #[test]
    fn finishing_moves_ride_to_history() {
        let mut context = RideContext::default();
        context.book_ride(sample_booking()).expect("booking");
        let finished = context
            .finish_current(RideStatus::Cancelled)
            .expect("cancel pending ride");

        assert_eq!(finished.status, RideStatus::Cancelled);
        assert!(context.current_ride().is_none());
        assert_eq!(context.history().len(), 1);
        assert!(matches!(
            context.finish_current(RideStatus::Completed),
            Err(OrchestratorError::MissingRide)
        ));
    }

    #[test]
    fn status_and_tier_serialize_like_the_display_layer() {
        assert_eq!(
            serde_json::to_string(&RideStatus::InProgress).expect("status"),
            r#""in-progress""#
        );
        assert_eq!(serde_json::to_string(&DriverTier::Prime).expect("tier"), "2");
        assert!(serde_json::from_str::<DriverTier>("3").is_err());
    }
}
