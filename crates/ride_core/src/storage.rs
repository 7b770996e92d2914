//! Session-scoped key/value persistence.
//!
//! The orchestrator never touches a concrete store: it talks to whatever
//! [KeyValueStore] was injected as the [SessionStorage] resource. Values are
//! JSON text. Loads never fail: a missing key yields the caller's default, and a
//! value that no longer parses is discarded and replaced by the default.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Rider tracking: current phase.
pub const RIDER_PHASE_KEY: &str = "rideTracking.phase";
/// Rider tracking: seconds until the driver reaches the pickup.
pub const RIDER_SECONDS_LEFT_KEY: &str = "rideTracking.secondsLeft";
/// Rider tracking: minutes until the dropoff.
pub const RIDER_MINUTES_KEY: &str = "rideTracking.minutesToDestination";
/// Rider tracking: driver marker position.
pub const RIDER_DRIVER_POSITION_KEY: &str = "rideTracking.driverPosition";
/// Snapshot of the just-completed ride, read by the completion screen.
pub const COMPLETED_RIDE_KEY: &str = "rideTracking.completedRide";
/// Driver dashboard: `"online"` or `"offline"`.
pub const DRIVER_ONLINE_STATUS_KEY: &str = "driver.onlineStatus";
/// One-shot marker set when a driver leaves an active ride for the dashboard.
pub const DRIVER_FROM_ACTIVE_RIDE_KEY: &str = "driver.fromActiveRide";

/// Every key that makes up the rider's resumable phase record.
pub const RIDER_PHASE_RECORD_KEYS: [&str; 4] = [
    RIDER_PHASE_KEY,
    RIDER_SECONDS_LEFT_KEY,
    RIDER_MINUTES_KEY,
    RIDER_DRIVER_POSITION_KEY,
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode value for key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw string storage with per-session lifetime.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
    fn remove(&mut self, key: &str);
}

/// In-memory store: lives exactly as long as the world that owns it.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// The injected persistence capability.
#[derive(Resource)]
pub struct SessionStorage {
    store: Box<dyn KeyValueStore>,
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl SessionStorage {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, encoded);
        Ok(())
    }

    /// Decode a stored value. `Ok(None)` when absent.
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.store.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            })
    }

    /// Decode a stored value, falling back to `default` when absent or corrupt.
    /// Corrupt values are removed so they are not re-read on the next mount.
    pub fn load<T: DeserializeOwned>(&mut self, key: &str, default: T) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(error) => {
                tracing::warn!(%error, "discarding corrupt persisted value");
                self.store.remove(key);
                default
            }
        }
    }

    pub fn clear(&mut self, key: &str) {
        self.store.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.get(key).is_some()
    }

    /// Plain (non-JSON) string value, for keys the dashboard writes verbatim.
    pub fn load_raw(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    pub fn save_raw(&mut self, key: &str, value: &str) {
        self.store.set(key, value.to_string());
    }

    /// Read a one-shot flag and clear it in the same step.
    pub fn take_flag(&mut self, key: &str) -> bool {
        let set = matches!(self.store.get(key).as_deref(), Some("true"));
        self.store.remove(key);
        set
    }

    /// Save and log instead of propagating: used from systems, which have no
    /// caller to hand an error to.
    pub(crate) fn save_or_warn<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        if let Err(error) = self.save(key, value) {
            tracing::warn!(%error, "failed to persist value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn save_then_load_round_trips() {
        let mut storage = SessionStorage::default();
        storage.save(RIDER_SECONDS_LEFT_KEY, &17u32).expect("save");
        storage
            .save(RIDER_DRIVER_POSITION_KEY, &Position::new(51.5, 40.0))
            .expect("save");

        assert_eq!(storage.load(RIDER_SECONDS_LEFT_KEY, 30u32), 17);
        assert_eq!(
            storage.load(RIDER_DRIVER_POSITION_KEY, Position::new(0.0, 0.0)),
            Position::new(51.5, 40.0)
        );
    }

    #[test]
    fn missing_key_yields_default() {
        let mut storage = SessionStorage::default();
        assert_eq!(storage.load(RIDER_MINUTES_KEY, 10u32), 10);
        assert!(!storage.contains(RIDER_MINUTES_KEY));
    }

    #[test]
    fn corrupt_value_is_discarded() {
        let mut store = MemoryStore::default();
        store.set(RIDER_SECONDS_LEFT_KEY, "{not json".to_string());
        let mut storage = SessionStorage::new(store);

        assert!(storage.try_load::<u32>(RIDER_SECONDS_LEFT_KEY).is_err());
        assert_eq!(storage.load(RIDER_SECONDS_LEFT_KEY, 30u32), 30);
        assert!(!storage.contains(RIDER_SECONDS_LEFT_KEY));
    }

    #[test]
    fn clear_removes_key() {
        let mut storage = SessionStorage::default();
        storage.save(RIDER_PHASE_KEY, "arrived").expect("save");
        storage.clear(RIDER_PHASE_KEY);
        assert!(!storage.contains(RIDER_PHASE_KEY));
    }

    #[test]
    fn flags_are_read_once() {
        let mut storage = SessionStorage::default();
        storage.save_raw(DRIVER_FROM_ACTIVE_RIDE_KEY, "true");
        assert!(storage.take_flag(DRIVER_FROM_ACTIVE_RIDE_KEY));
        assert!(!storage.take_flag(DRIVER_FROM_ACTIVE_RIDE_KEY));
    }
}
