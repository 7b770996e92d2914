//! Fare and driver earnings calculation.

use serde::{Deserialize, Serialize};

/// Flat platform fee deducted from every completed ride's fare.
pub const PLATFORM_FEE: f64 = 1.00;

/// Bonus credited to the driver for rides flagged as peak.
pub const PEAK_BONUS: f64 = 0.50;

/// Multiplier applied to the fare for subscribed riders.
pub const SUBSCRIBER_DISCOUNT: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideOption {
    #[default]
    Standard,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityOption {
    #[default]
    Regular,
    Xl,
}

/// Base fare and per-mile rate for one (ride option, capacity) cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareRate {
    pub base: f64,
    pub per_mile: f64,
}

pub fn fare_rate(ride_option: RideOption, capacity_option: CapacityOption) -> FareRate {
    match (ride_option, capacity_option) {
        (RideOption::Standard, CapacityOption::Regular) => FareRate {
            base: 5.00,
            per_mile: 1.50,
        },
        (RideOption::Standard, CapacityOption::Xl) => FareRate {
            base: 8.00,
            per_mile: 2.25,
        },
        (RideOption::Premium, CapacityOption::Regular) => FareRate {
            base: 6.00,
            per_mile: 1.75,
        },
        (RideOption::Premium, CapacityOption::Xl) => FareRate {
            base: 9.00,
            per_mile: 2.50,
        },
    }
}

/// Round half-up to two decimal places.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Calculate the fare for a trip.
///
/// Formula: `fare = base + distance_miles * per_mile`, rounded to cents. Subscribers
/// pay 90% of that rounded price, rounded again.
///
/// Distance is not validated; booking rejects non-positive distances before a
/// fare is ever shown.
pub fn compute_fare(
    distance_miles: f64,
    ride_option: RideOption,
    capacity_option: CapacityOption,
    is_subscribed: bool,
) -> f64 {
    let rate = fare_rate(ride_option, capacity_option);
    let list_price = round_to_cents(rate.base + rate.per_mile * distance_miles);
    if is_subscribed {
        round_to_cents(list_price * SUBSCRIBER_DISCOUNT)
    } else {
        list_price
    }
}

/// What the driver takes home from one completed ride.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsBreakdown {
    pub fare: f64,
    pub platform_fee: f64,
    pub peak_bonus: f64,
    pub total: f64,
}

pub fn driver_earnings(fare: f64, is_peak_bonus: bool) -> EarningsBreakdown {
    let peak_bonus = if is_peak_bonus { PEAK_BONUS } else { 0.0 };
    EarningsBreakdown {
        fare,
        platform_fee: PLATFORM_FEE,
        peak_bonus,
        total: round_to_cents(fare - PLATFORM_FEE + peak_bonus),
    }
}
