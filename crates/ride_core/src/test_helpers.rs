//! Test helpers for common test setup and utilities.
//!
//! Shared by unit tests, integration tests and benches.

use bevy_ecs::prelude::World;

use crate::config::{build_orchestrator, DriverSimConfig, OrchestratorConfig};
use crate::pricing::{CapacityOption, RideOption};
use crate::ride::{BookingRequest, Driver, DriverTier, Ride, RideContext, RideId, RideStatus};

/// Seed used for driver request synthesis in tests.
pub const TEST_SEED: u64 = 42;

/// Default configuration with a fixed driver seed.
pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig::default().with_driver(DriverSimConfig::default().with_seed(TEST_SEED))
}

/// Create a world with every shared resource and no mounted machine.
pub fn create_test_world() -> World {
    create_world_with_config(test_config())
}

pub fn create_world_with_config(config: OrchestratorConfig) -> World {
    let mut world = World::new();
    build_orchestrator(&mut world, config);
    world
}

/// Six miles, standard, regular, no subscription: fare 14.00.
pub fn sample_booking() -> BookingRequest {
    BookingRequest {
        pickup_location: "123 Main St".to_string(),
        dropoff_location: "456 Oak Ave".to_string(),
        distance: 6.0,
        duration: 18,
        ride_option: RideOption::Standard,
        capacity_option: CapacityOption::Regular,
        is_subscribed: false,
        payment_method_id: Some("card_visa_4242".to_string()),
    }
}

pub fn sample_driver() -> Driver {
    Driver {
        id: "driver-1".to_string(),
        name: "Sam Rivera".to_string(),
        vehicle_type: "Toyota Prius".to_string(),
        license_plate: "ABC-1234".to_string(),
        rating: 4.8,
        tier: DriverTier::Prime,
    }
}

/// A ride ready for tracking: in progress with a driver assigned.
pub fn in_progress_ride() -> Ride {
    Ride {
        id: RideId::new(),
        pickup_location: "123 Main St".to_string(),
        dropoff_location: "456 Oak Ave".to_string(),
        distance: 6.0,
        duration: 18,
        ride_option: RideOption::Standard,
        capacity_option: CapacityOption::Regular,
        fare: 14.00,
        driver: Some(sample_driver()),
        status: RideStatus::InProgress,
        payment_method_id: None,
    }
}

/// Book, match and start a ride through the ride context, the way the shell does.
///
/// # Panics
///
/// Panics if a ride is already active in `world`.
pub fn start_sample_trip(world: &mut World) -> RideId {
    let mut rides = world.resource_mut::<RideContext>();
    let id = rides.book_ride(sample_booking()).expect("sample booking").id;
    rides
        .assign_driver(sample_driver())
        .expect("driver assignment");
    rides.begin_trip().expect("trip start");
    id
}
