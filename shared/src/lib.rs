use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

pub mod protocol;
pub mod snapshot;

pub use protocol::{ClientCommand, ParseError, ServerMessage};
pub use snapshot::{BikeSnapshot, TrailSnapshot, VertexSnapshot, WorldSnapshot};

pub const GRID_WIDTH: f64 = 560.0;
pub const GRID_HEIGHT: f64 = 560.0;
pub const BIKE_SPEED: f64 = 120.0;
pub const TRAIL_EPSILON: f64 = 1.0;
pub const TRAIL_GRACE_SECS: f64 = 3.0;
pub const DEFAULT_MAX_PLAYERS: usize = 8;
pub const FIELD_DELIMITER: char = ':';

/// Lifecycle of a bike. Once `Dead`, nothing about the bike changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleState {
    #[serde(rename = "spawn")]
    Spawning,
    #[serde(rename = "move")]
    Moving,
    #[serde(rename = "turn")]
    Turning,
    #[serde(rename = "dead")]
    Dead,
}

impl VehicleState {
    pub fn is_alive(self) -> bool {
        self != VehicleState::Dead
    }
}

/// Whether a trail still takes part in collision checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailState {
    Active,
    Inactive,
}

/// One of the four axis-aligned headings a bike can travel along.
///
/// `Up` is the +y direction, so headings map onto the usual
/// counter-clockwise angle: Right = 0, Up = π/2, Left = π, Down = 3π/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Right,
    Up,
    Left,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Up,
        Direction::Left,
        Direction::Down,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Left => Direction::Right,
            Direction::Down => Direction::Up,
        }
    }

    /// Heading in radians.
    pub fn heading(self) -> f64 {
        match self {
            Direction::Right => 0.0,
            Direction::Up => FRAC_PI_2,
            Direction::Left => PI,
            Direction::Down => 3.0 * FRAC_PI_2,
        }
    }

    /// Exact unit vector for this heading. Avoids the rounding that
    /// `cos`/`sin` would leave on the off-axis component.
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::Right => (1.0, 0.0),
            Direction::Up => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Down => (0.0, -1.0),
        }
    }

    pub fn from_token(token: &str) -> Option<Direction> {
        match token {
            "RIGHT" => Some(Direction::Right),
            "UP" => Some(Direction::Up),
            "LEFT" => Some(Direction::Left),
            "DOWN" => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Direction::Right => "RIGHT",
            Direction::Up => "UP",
            Direction::Left => "LEFT",
            Direction::Down => "DOWN",
        }
    }
}
