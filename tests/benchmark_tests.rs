//! Performance benchmarks for the per-tick netcode paths

use client::prediction::PredictionController;
use client::reconciliation::ReconciliationEngine;
use server::authority::AuthorityServer;
use server::hit_validation::LagCompensatedHitValidator;
use shared::bus::drain;
use shared::movement::simulate;
use shared::{
    AlwaysOpen, CombatGate, CorrectionState, EntityRegistry, GroundSensor, InputSample, MoveCommand,
    MoveInput, NetcodeConfig, Outbox, PhysicalState, RingBuffer, Role, ShotRecord, StateSnapshot,
    TickClock, Vec3, World,
};
use std::sync::Arc;
use std::time::Instant;

fn forward() -> MoveCommand {
    MoveCommand {
        movement: MoveInput::new(1.0, 0.3),
        look_yaw: 0.4,
        jump: false,
    }
}

/// Benchmarks the shared movement step
#[test]
fn benchmark_movement_simulation() {
    let config = NetcodeConfig::default();
    let ground = GroundSensor {
        grounded: true,
        slope_normal: None,
    };
    let mut state = PhysicalState::default();

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        state = simulate(&config.movement, &state, &forward(), ground, config.fixed_delta());
    }

    let duration = start.elapsed();
    println!(
        "Movement simulation: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(state.position.z > 0.0);
    assert!(duration.as_millis() < 500);
}

/// Benchmarks ring buffer writes and reads across many wraps
#[test]
fn benchmark_ring_buffer() {
    let mut buffer: RingBuffer<StateSnapshot> = RingBuffer::new(1024);

    let iterations = 1_000_000u32;
    let start = Instant::now();

    for tick in 0..iterations {
        buffer.put(
            tick,
            StateSnapshot {
                tick,
                ..Default::default()
            },
        );
        assert_eq!(buffer.get(tick).tick, tick);
    }

    let duration = start.elapsed();
    println!(
        "Ring buffer: {} put/get pairs in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 1000);
}

/// Benchmarks the fixed-step clock under jittery frame times
#[test]
fn benchmark_tick_clock() {
    let mut clock = TickClock::new(60.0);
    let frames = [0.010f32, 0.016, 0.023, 0.033, 0.008];

    let iterations = 100_000;
    let start = Instant::now();
    let mut ticks = 0u32;

    for i in 0..iterations {
        clock.advance(frames[i % frames.len()]);
        while clock.consume_tick() {
            ticks += 1;
        }
    }

    let duration = start.elapsed();
    println!("Tick clock: {} frames, {} ticks in {:?}", iterations, ticks, duration);

    assert_eq!(ticks, clock.current_tick());
    assert!(clock.accumulated() < f64::from(clock.interval()));
    assert!(duration.as_millis() < 200);
}

/// Benchmarks a full snap with replay over a long input history
#[test]
fn benchmark_reconciliation_replay() {
    let config = NetcodeConfig::default();
    let world = Arc::new(World::default());
    let gate = AlwaysOpen;
    let (outbox, mut rx) = Outbox::channel(Role::Client(1));
    let mut prediction = PredictionController::new(1, Vec3::new(0.0, 1.0, 0.0), config.clone(), world);

    let mut correction = CorrectionState::new(0.0, config.extrapolation_limit);
    for tick in 1..=600 {
        prediction.tick(tick, forward(), &correction, &gate, 0, &outbox);
    }
    drain(&mut rx);

    let iterations = 200;
    let start = Instant::now();
    let mut replayed = 0;

    for _ in 0..iterations {
        let mut engine = ReconciliationEngine::new(config.reconciliation_threshold);
        let mut displaced = *prediction.predicted(100);
        displaced.position += Vec3::new(50.0, 0.0, 0.0);
        engine.receive(displaced);
        if let client::reconciliation::ReconcileOutcome::Snapped { replayed: count, .. } =
            engine.reconcile(&mut prediction, &mut correction, 600, None)
        {
            replayed += count;
        }
        correction = CorrectionState::new(0.0, config.extrapolation_limit);
    }

    let duration = start.elapsed();
    println!(
        "Reconciliation: {} snaps replaying {} ticks in {:?} ({:.2} μs/snap)",
        iterations,
        replayed,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(replayed, iterations * 500);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks authoritative input processing for a full server
#[test]
fn benchmark_authority_tick() {
    let config = NetcodeConfig::default();
    let gate: Arc<dyn CombatGate> = Arc::new(AlwaysOpen);
    let mut authority = AuthorityServer::new(config, Arc::new(World::default()), gate);
    let mut registry = EntityRegistry::new();
    let (outbox, mut rx) = Outbox::channel(Role::Server);

    for id in 1..=32 {
        registry.spawn(id, id % 2, PhysicalState::at(Vec3::new(id as f32, 1.0, 0.0)));
        authority.track(id);
    }

    let iterations = 1000u32;
    let start = Instant::now();

    for tick in 1..=iterations {
        for id in 1..=32 {
            authority.enqueue(InputSample {
                tick,
                entity_id: id,
                movement: MoveInput::new(1.0, 0.0),
                ..Default::default()
            });
        }
        let results = authority.process_tick(0, &mut registry, &outbox);
        assert_eq!(results.len(), 32);
        drain(&mut rx);
    }

    let duration = start.elapsed();
    println!(
        "Authority: {} ticks x 32 entities in {:?} ({:.2} μs/tick)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks hitscan validation against a crowded arena
#[test]
fn benchmark_hit_validation() {
    let config = NetcodeConfig::default();
    let gate: Arc<dyn CombatGate> = Arc::new(AlwaysOpen);
    let validator = LagCompensatedHitValidator::new(
        config.combat.clone(),
        config.tick_rate,
        config.buffer_capacity,
        Arc::clone(&gate),
    );
    let authority = AuthorityServer::new(config, Arc::new(World::arena()), gate);
    let world = World::arena();
    let mut registry = EntityRegistry::new();
    let (outbox, mut rx) = Outbox::channel(Role::Server);

    for id in 1..=32 {
        let x = (id as f32 - 16.0) * 1.5;
        registry.spawn(id, id % 2, PhysicalState::at(Vec3::new(x, 1.0, 20.0)));
    }

    let iterations = 10_000u32;
    let start = Instant::now();
    let mut hits = 0;

    for i in 0..iterations {
        let shot = ShotRecord {
            tick: i,
            shooter_id: 1,
            origin: Vec3::new(0.0, 1.5, -20.0),
            direction: Vec3::new(((i % 7) as f32 - 3.0) * 0.02, 0.0, 1.0).normalize_or_zero(),
            sent_at: 0,
            weapon_index: 0,
        };
        if let Some(verdict) = validator.validate(&shot, 50, &mut registry, &world, &authority, &outbox) {
            hits += verdict.hit.is_some() as u32;
        }
        if i % 100 == 0 {
            drain(&mut rx);
        }
    }

    let duration = start.elapsed();
    println!(
        "Hit validation: {} shots, {} hits in {:?} ({:.2} μs/shot)",
        iterations,
        hits,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(hits > 0);
    assert!(duration.as_millis() < 2000);
}
