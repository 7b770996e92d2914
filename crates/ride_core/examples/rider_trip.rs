//! Book a ride, track it to completion and print every notification.
//!
//! Run with: cargo run -p ride_core --example rider_trip
//! Set RUST_LOG=ride_core=debug to see phase changes and timer drops.

use bevy_ecs::prelude::World;
use ride_core::clock::{SimulationClock, ONE_SEC_MS};
use ride_core::config::{build_orchestrator, OrchestratorConfig};
use ride_core::pricing::{CapacityOption, RideOption};
use ride_core::ride::{BookingRequest, Driver, DriverTier, RideContext};
use ride_core::rider::{start_rider_tracking, RiderTracking};
use ride_core::runner::{orchestrator_schedule, run_next_event_with_hook};
use ride_core::signals::Signals;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut world = World::new();
    build_orchestrator(&mut world, OrchestratorConfig::default());

    {
        let mut rides = world.resource_mut::<RideContext>();
        let ride = rides.book_ride(BookingRequest {
            pickup_location: "Central Station".to_string(),
            dropoff_location: "City Airport, Terminal 2".to_string(),
            distance: 6.0,
            duration: 18,
            ride_option: RideOption::Standard,
            capacity_option: CapacityOption::Regular,
            is_subscribed: true,
            payment_method_id: None,
        })?;
        println!(
            "Booked {} -> {} for ${:.2}",
            ride.pickup_location, ride.dropoff_location, ride.fare
        );
        rides.assign_driver(Driver {
            id: "drv-17".to_string(),
            name: "Dana Kim".to_string(),
            vehicle_type: "Honda Civic".to_string(),
            license_plate: "XYZ-9876".to_string(),
            rating: 4.9,
            tier: DriverTier::PayPerRide,
        })?;
        rides.begin_trip()?;
    }

    start_rider_tracking(&mut world)?;
    let mut schedule = orchestrator_schedule();
    let mut steps = 0;
    while run_next_event_with_hook(&mut world, &mut schedule, |world, _| {
        let signals = world.resource::<Signals>();
        if let Some(latest) = signals.notifications.last() {
            if latest.at_ms == world.resource::<SimulationClock>().now() {
                let tracking = world.resource::<RiderTracking>();
                println!(
                    "[{:>3} s] {:<13} {}  (marker {}/{}, {} min left)",
                    latest.at_ms / ONE_SEC_MS,
                    tracking.phase().to_string(),
                    latest.message,
                    tracking.driver_position().top_css(),
                    tracking.driver_position().left_css(),
                    tracking.minutes_to_destination(),
                );
            }
        }
    }) {
        steps += 1;
    }

    let mut signals = world.resource_mut::<Signals>();
    println!("--- Ride finished after {} events ---", steps);
    println!("Notifications: {}", signals.notifications.len());
    for target in signals.drain_navigations() {
        println!("Navigation: {:?}", target);
    }
    Ok(())
}
