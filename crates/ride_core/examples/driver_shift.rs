//! Simulate a short driver shift: go online, let one request expire, decline
//! the next, accept the third and drive it to completion.
//!
//! Run with: cargo run -p ride_core --example driver_shift

use bevy_ecs::prelude::{Schedule, World};
use ride_core::clock::{SimulationClock, ONE_SEC_MS};
use ride_core::config::{build_orchestrator, DriverSimConfig, OrchestratorConfig};
use ride_core::driver::{
    accept_request, decline_request, driver_online_status, finish_ride, go_online, start_ride,
    take_active_ride_handoff, DriverPhase, DriverSession, DriverShiftStats,
};
use ride_core::runner::{orchestrator_schedule, run_next_event};
use ride_core::signals::Signals;
use tracing_subscriber::EnvFilter;

/// Process events until the driver reaches `phase` or the queue drains.
fn run_to_phase(world: &mut World, schedule: &mut Schedule, phase: DriverPhase) {
    while world.resource::<DriverSession>().phase() != phase {
        if !run_next_event(world, schedule) {
            break;
        }
    }
}

fn print_notifications(world: &mut World) {
    for notification in world.resource_mut::<Signals>().drain_notifications() {
        println!(
            "[{:>5.1} s] {:?}: {}",
            notification.at_ms as f64 / ONE_SEC_MS as f64,
            notification.level,
            notification.message
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut world = World::new();
    let config =
        OrchestratorConfig::default().with_driver(DriverSimConfig::default().with_seed(2024));
    build_orchestrator(&mut world, config);
    let mut schedule = orchestrator_schedule();

    go_online(&mut world)?;

    // First request: ignore it until it expires.
    run_to_phase(&mut world, &mut schedule, DriverPhase::Request);
    run_to_phase(&mut world, &mut schedule, DriverPhase::Searching);
    print_notifications(&mut world);

    // Second request: decline.
    run_to_phase(&mut world, &mut schedule, DriverPhase::Request);
    decline_request(&mut world)?;
    print_notifications(&mut world);

    // Third request: accept and drive.
    run_to_phase(&mut world, &mut schedule, DriverPhase::Request);
    if let Some(offer) = world.resource::<DriverSession>().offer() {
        println!(
            "Accepting {} from {} to {} ({:.1} mi, ${:.2}{})",
            offer.rider_name,
            offer.pickup,
            offer.dropoff,
            offer.distance,
            offer.fare,
            if offer.is_peak_bonus { ", peak" } else { "" }
        );
    }
    accept_request(&mut world)?;
    run_to_phase(&mut world, &mut schedule, DriverPhase::Arrived);
    start_ride(&mut world)?;
    run_to_phase(&mut world, &mut schedule, DriverPhase::Completed);
    print_notifications(&mut world);

    let earnings = finish_ride(&mut world)?;
    print_notifications(&mut world);
    println!(
        "Earnings: fare ${:.2} - platform fee ${:.2} + peak bonus ${:.2} = ${:.2}",
        earnings.fare, earnings.platform_fee, earnings.peak_bonus, earnings.total
    );

    let stats = world.resource::<DriverShiftStats>().clone();
    println!("--- Shift summary at {} s ---", world.resource::<SimulationClock>().now() / ONE_SEC_MS);
    println!("Requests offered: {}", stats.requests_offered);
    println!("Accepted: {}", stats.requests_accepted);
    println!("Declined: {}", stats.requests_declined);
    println!("Timed out: {}", stats.requests_timed_out);
    println!("Completed rides: {}", stats.rides_completed);
    println!("Total earnings: ${:.2}", stats.total_earnings);
    println!("Still online: {}", driver_online_status(&world));
    println!("Came from active ride: {}", take_active_ride_handoff(&mut world));
    Ok(())
}
