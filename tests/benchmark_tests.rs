//! Performance benchmarks for the hot paths of the arena

use server::config::ServerConfig;
use server::simulation::Simulation;
use server::trail::Point;
use server::vehicle::{Identity, VehicleId};
use shared::{ClientCommand, Direction, ServerMessage};
use std::sync::Arc;
use std::time::Instant;

/// A simulation with `riders` bikes that have each made a few turns
fn busy_arena(riders: usize) -> Simulation {
    let config = ServerConfig::default();
    let mut sim = Simulation::with_seed(&config, 99);

    let ids: Vec<VehicleId> = (0..riders)
        .map(|i| {
            let y = 20.0 + (i as f64) * (520.0 / riders as f64);
            sim.spawn_at(
                Identity::new(format!("player{}", i + 1), "blue"),
                Point::new(20.0, y),
                Direction::Right,
            )
        })
        .collect();

    // Zig-zag everybody so trails have corners
    let turns = [Direction::Up, Direction::Right, Direction::Down, Direction::Right];
    for turn in turns.iter().cycle().take(8) {
        for &id in &ids {
            sim.turn(id, *turn);
        }
        for _ in 0..3 {
            sim.simulate(0.01);
        }
    }
    sim
}

/// Benchmarks the point-on-trail test
#[test]
fn benchmark_on_trail() {
    let sim = busy_arena(8);
    let trail = &sim.trails()[0];

    let iterations = 100_000;
    let start = Instant::now();

    let mut hits = 0;
    for i in 0..iterations {
        let point = Point::new((i % 560) as f64, 20.0);
        if trail.on_trail(point) {
            hits += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "On-trail test: {} iterations in {:?} ({:.2} ns/iter, {} hits)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64,
        hits
    );

    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks a full tick with every slot riding
#[test]
fn benchmark_simulation_tick() {
    let mut sim = busy_arena(8);

    let iterations = 1000;
    let start = Instant::now();

    for _ in 0..iterations {
        sim.simulate(0.0001);
    }

    let duration = start.elapsed();
    println!(
        "Simulation tick: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // A 60Hz tick has 16ms to spare; 1000 of them should fit in a second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks snapshot serialization
#[test]
fn benchmark_snapshot_serialization() {
    let sim = busy_arena(8);

    let iterations = 1000;
    let start = Instant::now();

    let mut bytes = 0;
    for _ in 0..iterations {
        let json = sim.snapshot().to_json().unwrap();
        bytes += json.len();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot serialization: {} iterations in {:?} ({:.2} μs/iter, {} bytes each)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        bytes / iterations
    );

    assert!(duration.as_millis() < 1000);
}

/// Benchmarks command parsing and reply rendering
#[test]
fn benchmark_protocol_codec() {
    let commands = ["REQUEST_STATE", "SPAWN:120.5:300", "TURN:LEFT", "HELLO"];
    let snapshot = busy_arena(4).latest_snapshot();

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let command = ClientCommand::parse(commands[i % commands.len()]).unwrap();
        if command == ClientCommand::RequestState {
            let _ = ServerMessage::NewState(Arc::clone(&snapshot)).to_string();
        }
    }

    let duration = start.elapsed();
    println!(
        "Protocol codec: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 1000);
}
