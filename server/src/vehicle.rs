use crate::trail::{Point, Trail};
use log::debug;
use shared::{BikeSnapshot, Direction, VehicleState};

/// Index of a bike inside its simulation. Bikes are never removed, so an id
/// stays valid for the simulation's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleId(pub(crate) usize);

impl VehicleId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Who rides a bike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub colour: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, colour: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            colour: colour.into(),
        }
    }
}

/// What the turn step did on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Turned,
    Reversal,
    SameHeading,
}

/// A player's bike. Owned by the simulation together with its trail, which
/// lives at the same index.
#[derive(Debug, Clone)]
pub struct Vehicle {
    identity: Identity,
    state: VehicleState,
    position: Point,
    heading: Direction,
    pending: Direction,
    speed: f64,
}

impl Vehicle {
    pub fn new(identity: Identity, position: Point, heading: Direction, speed: f64) -> Self {
        Self {
            identity,
            state: VehicleState::Spawning,
            position,
            heading,
            pending: heading,
            speed,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state.is_alive()
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn pending_heading(&self) -> Direction {
        self.pending
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Queues a turn for the next tick. Only a bike that is going straight
    /// takes a new turn; a pending turn or a dead bike ignores it.
    pub fn request_turn(&mut self, direction: Direction) -> bool {
        match self.state {
            VehicleState::Spawning | VehicleState::Moving => {
                self.pending = direction;
                self.state = VehicleState::Turning;
                true
            }
            VehicleState::Turning | VehicleState::Dead => false,
        }
    }

    /// Applies the pending heading. A reversal is vetoed, and a turn onto the
    /// current heading leaves no corner. Only a real turn adds a vertex to
    /// the trail, at the pre-turn position.
    pub(crate) fn apply_turn(&mut self, trail: &mut Trail) -> TurnOutcome {
        let outcome = if self.pending == self.heading.opposite() {
            debug!(
                "{} can't turn 180° at ({:.1}, {:.1})",
                self.identity.name, self.position.x, self.position.y
            );
            self.pending = self.heading;
            TurnOutcome::Reversal
        } else if self.pending == self.heading {
            TurnOutcome::SameHeading
        } else {
            debug!(
                "{} turned {} at ({:.1}, {:.1})",
                self.identity.name,
                self.pending.token(),
                self.position.x,
                self.position.y
            );
            trail.push_vertex(self.position);
            self.heading = self.pending;
            TurnOutcome::Turned
        };
        self.state = VehicleState::Moving;
        outcome
    }

    /// Advances the bike by `speed * dt` along its heading. The trail's open
    /// end is left at the position the bike moved from.
    pub(crate) fn advance(&mut self, trail: &mut Trail, dt: f64) {
        if !self.is_alive() {
            return;
        }
        trail.set_end(self.position);
        self.position = self.position.offset(self.heading.unit(), self.speed * dt);
        if self.state == VehicleState::Spawning {
            self.state = VehicleState::Moving;
        }
    }

    /// Where the bike will be after another `dt` at its current heading.
    pub fn projected(&self, dt: f64) -> Point {
        self.position.offset(self.heading.unit(), self.speed * dt)
    }

    /// Marks the bike dead. Returns false if it already was.
    pub(crate) fn kill(&mut self) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state = VehicleState::Dead;
        true
    }

    pub fn snapshot(&self) -> BikeSnapshot {
        BikeSnapshot {
            state: self.state,
            name: self.identity.name.clone(),
            colour: self.identity.colour.clone(),
            x: self.position.x,
            y: self.position.y,
            rot: self.heading.heading(),
        }
    }
}
