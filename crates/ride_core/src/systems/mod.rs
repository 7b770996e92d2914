pub mod driver_countdown;
pub mod driver_drive;
pub mod driver_search;
pub mod rider_deadline;
pub mod rider_tick;
