//! Marker positions and per-tick interpolation.
//!
//! A [Position] is a point in a normalized container (percent of width and
//! height), used only to animate a marker between a start zone and a target
//! zone. Nothing here is geographic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point inside the container, each axis in `0.0..=100.0` percent.
///
/// Serialized the way the display layer consumes it: `{"top":"60%","left":"30%"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PositionRepr", into = "PositionRepr")]
pub struct Position {
    pub top: f64,
    pub left: f64,
}

impl Position {
    pub const fn new(top: f64, left: f64) -> Self {
        Self { top, left }
    }

    /// Parse a pair of percentage strings such as `"60%"` and `"30.5%"`.
    pub fn parse(top: &str, left: &str) -> Result<Self, PositionParseError> {
        Ok(Self {
            top: parse_percent(top)?,
            left: parse_percent(left)?,
        })
    }

    pub fn top_css(&self) -> String {
        format_percent(self.top)
    }

    pub fn left_css(&self) -> String {
        format_percent(self.left)
    }
}

/// Default driver marker position on the rider's tracking screen.
pub const DEFAULT_DRIVER_POSITION: Position = Position::new(60.0, 30.0);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionParseError {
    #[error("position value {0:?} is not a percentage")]
    NotPercent(String),
    #[error("position value {0:?} is outside 0-100%")]
    OutOfRange(String),
}

#[derive(Serialize, Deserialize)]
struct PositionRepr {
    top: String,
    left: String,
}

impl From<Position> for PositionRepr {
    fn from(position: Position) -> Self {
        Self {
            top: position.top_css(),
            left: position.left_css(),
        }
    }
}

impl TryFrom<PositionRepr> for Position {
    type Error = PositionParseError;

    fn try_from(repr: PositionRepr) -> Result<Self, Self::Error> {
        Position::parse(&repr.top, &repr.left)
    }
}

fn parse_percent(raw: &str) -> Result<f64, PositionParseError> {
    let value: f64 = raw
        .trim()
        .strip_suffix('%')
        .and_then(|number| number.trim().parse().ok())
        .ok_or_else(|| PositionParseError::NotPercent(raw.to_string()))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(PositionParseError::OutOfRange(raw.to_string()));
    }
    Ok(value)
}

/// Two decimals is finer than any on-screen step.
fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn format_percent(value: f64) -> String {
    format!("{}%", round_to_hundredths(value))
}

/// Inclusive per-axis limits for a marker moving along one leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_top: f64,
    pub max_top: f64,
    pub min_left: f64,
    pub max_left: f64,
}

impl Bounds {
    pub fn clamp(&self, position: Position) -> Position {
        Position {
            top: position.top.clamp(self.min_top, self.max_top).clamp(0.0, 100.0),
            left: position
                .left
                .clamp(self.min_left, self.max_left)
                .clamp(0.0, 100.0),
        }
    }
}

/// Direction and per-tick magnitude of movement along one leg, plus the zone the
/// marker must stay within so it never overshoots its destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerPath {
    pub delta_top: f64,
    pub delta_left: f64,
    pub bounds: Bounds,
}

impl MarkerPath {
    /// Position after `ticks` further steps from `from`, snapped to the
    /// hundredths its stored form keeps, so a saved marker reloads unchanged.
    pub fn advance(&self, from: Position, ticks: u32) -> Position {
        let ticks = f64::from(ticks);
        let moved = self.bounds.clamp(Position {
            top: from.top + self.delta_top * ticks,
            left: from.left + self.delta_left * ticks,
        });
        Position {
            top: round_to_hundredths(moved.top),
            left: round_to_hundredths(moved.left),
        }
    }

    pub fn step(&self, from: Position) -> Position {
        self.advance(from, 1)
    }
}

/// Rider screen: driver marker heading up and right toward the pickup pin.
pub const RIDER_TOWARD_PICKUP: MarkerPath = MarkerPath {
    delta_top: -0.5,
    delta_left: 0.7,
    bounds: Bounds {
        min_top: 45.0,
        max_top: 100.0,
        min_left: 0.0,
        max_left: 50.0,
    },
};

/// Rider screen: shared marker heading toward the dropoff pin.
pub const RIDER_TOWARD_DROPOFF: MarkerPath = MarkerPath {
    delta_top: -0.6,
    delta_left: 0.5,
    bounds: Bounds {
        min_top: 20.0,
        max_top: 100.0,
        min_left: 0.0,
        max_left: 75.0,
    },
};

/// Driver screen: own marker heading to the pickup zone.
pub const DRIVER_TOWARD_PICKUP: MarkerPath = MarkerPath {
    delta_top: -1.0,
    delta_left: 0.8,
    bounds: Bounds {
        min_top: 40.0,
        max_top: 100.0,
        min_left: 0.0,
        max_left: 55.0,
    },
};

/// Driver screen: own marker heading to the dropoff zone.
pub const DRIVER_TOWARD_DROPOFF: MarkerPath = MarkerPath {
    delta_top: -0.8,
    delta_left: 1.0,
    bounds: Bounds {
        min_top: 15.0,
        max_top: 100.0,
        min_left: 0.0,
        max_left: 80.0,
    },
};

/// Where the driver marker starts on the driver screen.
pub const DRIVER_START_POSITION: Position = Position::new(70.0, 25.0);
