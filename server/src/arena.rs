//! Shared handle to one arena's simulation.
//!
//! The simulation sits behind a single lock that only this module touches.
//! Every tick publishes the fresh snapshot on a `watch` channel so readers
//! never need that lock. The tick loop is started by the first spawn into an
//! empty arena and ends by itself once every bike is dead.

use crate::config::ServerConfig;
use crate::error::SpawnError;
use crate::simulation::Simulation;
use crate::trail::Point;
use crate::vehicle::{Identity, VehicleId};
use log::{debug, info, warn};
use shared::Direction;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

struct ArenaState {
    sim: Simulation,
    /// True while a tick loop task is running.
    ticking: bool,
    /// Bumped every time a tick loop is started.
    epoch: u64,
    /// Last time the grace windows were counted down while no loop ran.
    idle_since: Option<Instant>,
}

impl ArenaState {
    /// Credits the time since the loop stopped to every running grace
    /// window. Returns how many trails retired.
    fn credit_idle_time(&mut self) -> usize {
        let Some(since) = self.idle_since else {
            return 0;
        };
        let now = Instant::now();
        self.idle_since = Some(now);
        self.sim.elapse_grace((now - since).as_secs_f64())
    }
}

struct Inner {
    state: Mutex<ArenaState>,
    snapshot: watch::Sender<Arc<str>>,
    tick_duration: Duration,
    max_delta: f64,
}

#[derive(Clone)]
pub struct Arena {
    inner: Arc<Inner>,
}

impl Arena {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_simulation(config, Simulation::new(config))
    }

    pub fn with_simulation(config: &ServerConfig, sim: Simulation) -> Self {
        let (snapshot, _) = watch::channel(sim.latest_snapshot());
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ArenaState {
                    sim,
                    ticking: false,
                    epoch: 0,
                    idle_since: None,
                }),
                snapshot,
                tick_duration: config.tick_duration(),
                max_delta: config.max_delta,
            }),
        }
    }

    /// Spawns a bike and starts the tick loop if it is not already running.
    pub async fn spawn(
        &self,
        identity: Identity,
        hint: Option<Point>,
    ) -> Result<VehicleId, SpawnError> {
        let mut state = self.inner.state.lock().await;
        if !state.ticking {
            // Trails of bikes that died before the loop stopped may be
            // free again, so count the idle gap before placing the bike
            state.credit_idle_time();
        }
        let spawned = state.sim.spawn_vehicle(identity, hint);
        self.inner.snapshot.send_replace(state.sim.latest_snapshot());
        let id = spawned?;

        if !state.ticking {
            state.ticking = true;
            state.idle_since = None;
            state.epoch += 1;
            tokio::spawn(run_tick_loop(Arc::clone(&self.inner), state.epoch));
        }

        Ok(id)
    }

    pub async fn turn(&self, id: VehicleId, direction: Direction) -> bool {
        self.inner.state.lock().await.sim.turn(id, direction)
    }

    pub async fn is_alive(&self, id: VehicleId) -> bool {
        self.inner.state.lock().await.sim.is_alive(id)
    }

    pub async fn active_count(&self) -> usize {
        self.inner.state.lock().await.sim.active_count()
    }

    pub async fn is_ticking(&self) -> bool {
        self.inner.state.lock().await.ticking
    }

    /// Runs `f` against the simulation while holding the arena lock.
    pub async fn inspect<R>(&self, f: impl FnOnce(&Simulation) -> R) -> R {
        let state = self.inner.state.lock().await;
        f(&state.sim)
    }

    /// Latest published snapshot. Does not take the simulation lock.
    pub fn latest_snapshot(&self) -> Arc<str> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<str>> {
        self.inner.snapshot.subscribe()
    }
}

/// Ticks the simulation at a fixed rate until no bike is alive, then keeps
/// counting the remaining trail grace windows down in wall-clock time until
/// they have all run out or a newer loop takes over.
async fn run_tick_loop(inner: Arc<Inner>, epoch: u64) {
    let mut interval_timer = interval(inner.tick_duration);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    interval_timer.tick().await;
    let mut last_update = Instant::now();
    let mut tick: u64 = 0;

    info!("Tick loop #{} started", epoch);

    loop {
        interval_timer.tick().await;

        let current_time = Instant::now();
        let mut delta_time = (current_time - last_update).as_secs_f64();
        last_update = current_time;

        if delta_time > inner.max_delta {
            warn!(
                "Large delta time detected ({:.3}s), capping to {:.3}s",
                delta_time, inner.max_delta
            );
            delta_time = inner.max_delta;
        }

        let mut state = inner.state.lock().await;
        state.sim.simulate(delta_time);
        inner.snapshot.send_replace(state.sim.latest_snapshot());
        tick += 1;

        let active = state.sim.active_count();
        if tick % 60 == 0 {
            debug!(
                "Tick {}: {} active bikes, {:.1}Hz",
                tick,
                active,
                1.0 / delta_time
            );
        }

        if active == 0 {
            state.ticking = false;
            state.idle_since = Some(Instant::now());
            break;
        }
    }

    info!("Tick loop #{} stopped after {} ticks", epoch, tick);

    loop {
        let wait = {
            let mut state = inner.state.lock().await;
            if state.ticking || state.epoch != epoch {
                return;
            }
            let retired = state.credit_idle_time();
            if retired > 0 {
                debug!("Retired {} trails while idle", retired);
                inner.snapshot.send_replace(state.sim.latest_snapshot());
            }
            match state.sim.next_retirement() {
                Some(seconds) => seconds,
                None => return,
            }
        };
        sleep(Duration::try_from_secs_f64(wait).unwrap_or_default()).await;
    }
}
