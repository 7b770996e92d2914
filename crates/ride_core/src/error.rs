//! Error types for orchestrator operations.

use thiserror::Error;

use crate::ride::RideStatus;
use crate::storage::StoreError;

/// Errors returned by ride context and state machine operations.
///
/// None of these leave a ride in an undefined status: a failed operation
/// changes nothing.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// No ride in context when one is required.
    #[error("no active ride")]
    MissingRide,

    /// The ride has no assigned driver.
    #[error("ride has no assigned driver")]
    MissingDriver,

    /// Tracking can only start for an in-progress ride.
    #[error("ride is {status:?}, expected in-progress")]
    RideNotInProgress {
        /// Status found on the ride
        status: RideStatus,
    },

    /// Booking while another ride is still active.
    #[error("a ride is already active")]
    RideAlreadyActive,

    /// Booking input failed validation.
    #[error("invalid booking: {0}")]
    InvalidBooking(String),

    /// Status transitions are one-directional.
    #[error("cannot move ride from {from:?} to {to:?}")]
    InvalidStatusTransition {
        /// Current status
        from: RideStatus,
        /// Requested status
        to: RideStatus,
    },

    /// A user action that the current phase does not accept.
    #[error("cannot {action} while {phase}")]
    InvalidAction {
        /// Attempted action
        action: &'static str,
        /// Phase name at the time of the attempt
        phase: String,
    },

    /// The machine the action targets is not mounted.
    #[error("{0} is not running")]
    NotRunning(&'static str),

    /// Persistence failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
}
