//! Authoritative arena simulation.
//!
//! `Simulation` owns every bike and its trail and is not synchronised on its
//! own; the [`Arena`](crate::arena::Arena) keeps it behind a lock and drives
//! the tick loop.

use crate::config::ServerConfig;
use crate::error::SpawnError;
use crate::trail::{Point, Trail};
use crate::vehicle::{Identity, Vehicle, VehicleId};
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Direction, VehicleState, WorldSnapshot};
use std::fmt;
use std::sync::Arc;

/// What a bike ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Wall,
    Trail(VehicleId),
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collision::Wall => f.write_str("arena wall"),
            Collision::Trail(owner) => write!(f, "trail #{}", owner.index()),
        }
    }
}

pub struct Simulation {
    width: f64,
    height: f64,
    speed: f64,
    grace: f64,
    spawn_attempts: u32,

    /// Spawn order, never reordered. `trails[i]` belongs to `vehicles[i]`.
    vehicles: Vec<Vehicle>,
    trails: Vec<Trail>,
    active: usize,

    rng: StdRng,
    latest: Arc<str>,
}

impl Simulation {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic spawn placement, for tests and replays.
    pub fn with_seed(config: &ServerConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &ServerConfig, rng: StdRng) -> Self {
        let mut sim = Self {
            width: config.grid_width,
            height: config.grid_height,
            speed: config.bike_speed,
            grace: config.trail_grace,
            spawn_attempts: config.spawn_attempts,
            vehicles: Vec::new(),
            trails: Vec::new(),
            active: 0,
            rng,
            latest: Arc::from(""),
        };
        sim.refresh_snapshot();
        sim
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Number of bikes that are not dead.
    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn trails(&self) -> &[Trail] {
        &self.trails
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id.0)
    }

    pub fn trail(&self, id: VehicleId) -> Option<&Trail> {
        self.trails.get(id.0)
    }

    pub fn is_alive(&self, id: VehicleId) -> bool {
        self.vehicle(id).is_some_and(Vehicle::is_alive)
    }

    /// JSON snapshot as of the last tick (or spawn).
    pub fn latest_snapshot(&self) -> Arc<str> {
        Arc::clone(&self.latest)
    }

    /// Spawns a bike at `hint` if that point is inside the arena and clear,
    /// otherwise at a random clear point. The heading points away from the
    /// nearest wall.
    pub fn spawn_vehicle(
        &mut self,
        identity: Identity,
        hint: Option<Point>,
    ) -> Result<VehicleId, SpawnError> {
        let position = match hint.filter(|p| self.check_collision(*p).is_none()) {
            Some(point) => point,
            None => self.random_spawn_point()?,
        };
        let heading = self.nearest_edge_heading(position);
        Ok(self.spawn_at(identity, position, heading))
    }

    /// Spawns a bike at an exact position and heading, without checking
    /// whether the spot is clear.
    pub fn spawn_at(&mut self, identity: Identity, position: Point, heading: Direction) -> VehicleId {
        info!(
            "Spawning {} ({}) at ({:.1}, {:.1}) heading {}",
            identity.name,
            identity.colour,
            position.x,
            position.y,
            heading.token()
        );

        let trail = Trail::new(position, identity.colour.clone());
        let vehicle = Vehicle::new(identity, position, heading, self.speed);

        self.trails.push(trail);
        self.vehicles.push(vehicle);
        self.active += 1;
        self.refresh_snapshot();

        VehicleId(self.vehicles.len() - 1)
    }

    /// Queues a turn for the bike. Returns false if it was not accepted.
    pub fn turn(&mut self, id: VehicleId, direction: Direction) -> bool {
        match self.vehicles.get_mut(id.0) {
            Some(vehicle) => vehicle.request_turn(direction),
            None => false,
        }
    }

    /// Runs one tick: turn and move every bike, count down trail grace
    /// windows, resolve collisions, then rebuild the snapshot.
    pub fn simulate(&mut self, dt: f64) {
        for (vehicle, trail) in self.vehicles.iter_mut().zip(self.trails.iter_mut()) {
            match vehicle.state() {
                VehicleState::Turning => {
                    vehicle.apply_turn(trail);
                    vehicle.advance(trail, dt);
                }
                VehicleState::Spawning | VehicleState::Moving => vehicle.advance(trail, dt),
                VehicleState::Dead => {}
            }
        }

        self.count_down_trails(dt);

        // Every bike is tested against the same geometry before anyone dies.
        // The whole stretch up to the projected point is checked, so a long
        // tick cannot carry a bike over a trail.
        let crashes: Vec<(usize, Collision)> = self
            .vehicles
            .iter()
            .enumerate()
            .filter(|(_, vehicle)| vehicle.is_alive())
            .filter_map(|(index, vehicle)| {
                self.check_path(vehicle.position(), vehicle.projected(dt))
                    .map(|collision| (index, collision))
            })
            .collect();

        for (index, collision) in crashes {
            self.kill(index, collision);
        }

        debug_assert_eq!(
            self.active,
            self.vehicles.iter().filter(|v| v.is_alive()).count()
        );

        self.refresh_snapshot();
    }

    /// Returns what `point` would collide with, if anything.
    pub fn check_collision(&self, point: Point) -> Option<Collision> {
        self.check_path(point, point)
    }

    /// Returns what a bike moving straight from `from` to `to` would hit.
    /// Walls are judged at `to`.
    pub fn check_path(&self, from: Point, to: Point) -> Option<Collision> {
        if !self.in_bounds(to) {
            return Some(Collision::Wall);
        }
        self.trails
            .iter()
            .position(|trail| trail.is_active() && trail.crossed_by(from, to))
            .map(|index| Collision::Trail(VehicleId(index)))
    }

    /// Counts grace windows down by time that passed without a tick, e.g.
    /// while the tick loop was stopped. Returns how many trails retired.
    pub fn elapse_grace(&mut self, seconds: f64) -> usize {
        let retired = self.count_down_trails(seconds);
        if retired > 0 {
            self.refresh_snapshot();
        }
        retired
    }

    /// Shortest grace window still running, in seconds.
    pub fn next_retirement(&self) -> Option<f64> {
        self.trails
            .iter()
            .filter_map(Trail::retire_in)
            .reduce(f64::min)
    }

    fn count_down_trails(&mut self, dt: f64) -> usize {
        let mut retired = 0;
        for trail in &mut self.trails {
            if trail.elapse(dt) {
                debug!("Trail of {} is now inactive", trail.colour());
                retired += 1;
            }
        }
        retired
    }

    fn in_bounds(&self, point: Point) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            bikes: self.vehicles.iter().map(Vehicle::snapshot).collect(),
            trails: self.trails.iter().map(Trail::snapshot).collect(),
        }
    }

    fn kill(&mut self, index: usize, collision: Collision) {
        let vehicle = &mut self.vehicles[index];
        if !vehicle.kill() {
            return;
        }
        let at = vehicle.position();
        debug!(
            "{} crashed into {} at ({:.1}, {:.1})",
            vehicle.identity().name,
            collision,
            at.x,
            at.y
        );

        self.active -= 1;
        self.trails[index].schedule_retirement(self.grace);
    }

    fn random_spawn_point(&mut self) -> Result<Point, SpawnError> {
        for _ in 0..self.spawn_attempts {
            let point = Point::new(
                self.rng.gen::<f64>() * self.width,
                self.rng.gen::<f64>() * self.height,
            );
            if self.check_collision(point).is_none() {
                return Ok(point);
            }
        }
        Err(SpawnError::NoSafeSpawnPoint {
            attempts: self.spawn_attempts,
        })
    }

    /// Picks the heading for a fresh spawn from the quadrant the point is in:
    /// of that quadrant's two walls, the bike drives away from the closer one.
    pub fn nearest_edge_heading(&self, point: Point) -> Direction {
        let to_left = point.x;
        let to_right = self.width - point.x;
        let to_bottom = point.y;
        let to_top = self.height - point.y;

        let left_half = point.x < self.width / 2.0;
        let bottom_half = point.y < self.height / 2.0;

        match (left_half, bottom_half) {
            (true, true) if to_left < to_bottom => Direction::Right,
            (true, true) => Direction::Up,
            (true, false) if to_left < to_top => Direction::Right,
            (true, false) => Direction::Down,
            (false, true) if to_right < to_bottom => Direction::Left,
            (false, true) => Direction::Up,
            (false, false) if to_right < to_top => Direction::Left,
            (false, false) => Direction::Down,
        }
    }

    fn refresh_snapshot(&mut self) {
        match self.snapshot().to_json() {
            Ok(json) => self.latest = Arc::from(json),
            Err(e) => error!("Failed to serialize snapshot: {}", e),
        }
    }
}
