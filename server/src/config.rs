use shared::{BIKE_SPEED, DEFAULT_MAX_PLAYERS, GRID_HEIGHT, GRID_WIDTH, TRAIL_GRACE_SECS};
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Arena width in world units
    pub grid_width: f64,
    /// Arena height in world units
    pub grid_height: f64,
    /// Number of player slots
    pub max_players: usize,
    /// Simulation ticks per second while any bike is alive
    pub tick_rate: u32,
    /// Speed given to every newly spawned bike
    pub bike_speed: f64,
    /// Seconds a dead bike's trail stays collidable
    pub trail_grace: f64,
    /// Random placement attempts before a spawn is refused
    pub spawn_attempts: u32,
    /// Capacity of each session's outbound queue
    pub outbound_queue: usize,
    /// Upper bound on the delta fed into a single tick, in seconds
    pub max_delta: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grid_width: GRID_WIDTH,
            grid_height: GRID_HEIGHT,
            max_players: DEFAULT_MAX_PLAYERS,
            tick_rate: 60,
            bike_speed: BIKE_SPEED,
            trail_grace: TRAIL_GRACE_SECS,
            spawn_attempts: 64,
            outbound_queue: 64,
            max_delta: 1.0 / 20.0,
        }
    }
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_arena_is_560_square() {
        let config = ServerConfig::default();
        assert_eq!(config.grid_width, 560.0);
        assert_eq!(config.grid_height, 560.0);
        assert_eq!(config.bike_speed, 120.0);
        assert_eq!(config.trail_grace, 3.0);
    }

    #[test]
    fn test_tick_duration() {
        let config = ServerConfig {
            tick_rate: 50,
            ..ServerConfig::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_millis(20));

        let zero = ServerConfig {
            tick_rate: 0,
            ..ServerConfig::default()
        };
        assert_eq!(zero.tick_duration(), Duration::from_secs(1));
    }
}
