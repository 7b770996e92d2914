use bevy_ecs::prelude::World;
use ride_core::config::{
    build_orchestrator_with_storage, DriverSimConfig, OrchestratorConfig, RiderTrackingConfig,
};
use ride_core::ride::RideId;
use ride_core::storage::SessionStorage;
use ride_core::test_helpers::start_sample_trip;

/// Builder for reproducible test worlds.
#[derive(Default)]
pub struct TestWorldBuilder {
    rider: RiderTrackingConfig,
    driver: DriverSimConfig,
    storage: Option<SessionStorage>,
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self {
            driver: DriverSimConfig::default().with_seed(42),
            ..Self::default()
        }
    }

    pub fn with_rider(mut self, rider: RiderTrackingConfig) -> Self {
        self.rider = rider;
        self
    }

    pub fn with_driver(mut self, driver: DriverSimConfig) -> Self {
        self.driver = driver;
        self
    }

    /// Start from an existing session store, as a remount after navigation would.
    pub fn with_storage(mut self, storage: SessionStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn build(self) -> World {
        let mut world = World::new();
        let config = OrchestratorConfig::default()
            .with_rider(self.rider)
            .with_driver(self.driver);
        build_orchestrator_with_storage(&mut world, config, self.storage.unwrap_or_default());
        world
    }

    /// World with a booked, matched and started ride.
    pub fn build_with_trip(self) -> (World, RideId) {
        let mut world = self.build();
        let id = start_sample_trip(&mut world);
        (world, id)
    }
}
