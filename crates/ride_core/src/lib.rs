pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod position;
pub mod pricing;
pub mod ride;
pub mod rider;
pub mod runner;
pub mod signals;
pub mod storage;
pub mod systems;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
