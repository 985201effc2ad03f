//! Headless duel over simulated links -- a predicted player against a
//! scripted opponent, with latency, jitter and loss in both directions.
//!
//! Run with:
//!   RUST_LOG=skirmish_net=debug cargo run --example duel_loopback -p skirmish-net
//!
//! Prints the session counters as JSON, then verifies the authority's
//! recorded run of the player by replaying it.

use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use skirmish_net::prelude::*;
use tracing_subscriber::EnvFilter;

const SECONDS: u64 = 20;

// ---------------------------------------------------------------------------
// Scripted players
// ---------------------------------------------------------------------------

/// Wanders toward a random heading that changes every half second and
/// presses abilities at random.
struct Script {
    rng: Pcg64Mcg,
    heading: Vec2,
}

impl Script {
    fn new(seed: u64) -> Self {
        Self {
            rng: Pcg64Mcg::seed_from_u64(seed),
            heading: Vec2::ZERO,
        }
    }

    fn input(&mut self, tick: u64, target: Vec2) -> Input {
        if tick % 30 == 0 {
            let angle = self.rng.gen_range(0.0..std::f64::consts::TAU);
            self.heading = Vec2::new(angle.cos(), angle.sin());
        }
        let mut input = Input::neutral(tick, target).with_movement(self.heading);
        match self.rng.gen_range(0..60) {
            0 => input.actions.dash = true,
            1..=3 => input.actions.melee = true,
            4 => input.actions.primary = true,
            5 => input.actions.signature = true,
            6..=9 => input.actions.projectile = true,
            _ => {}
        }
        input
    }
}

/// Prints every cue as it happens.
struct CuePrinter;

impl CueSink for CuePrinter {
    fn on_cue(&mut self, entity: EntityId, cue: &AbilityCue) {
        println!("  {entity} {:?} at tick {}", cue.slot, cue.tick);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = NetConfig::default();
    let loadout = Arc::new(Kit::brawler().bind(config.tick.fixed_dt)?);
    let mut session = DuelSession::new(
        loadout,
        &config,
        LinkConfig {
            ordered: true,
            ..LinkConfig::lossy(4, 2, 0.05, 1)
        },
        LinkConfig::lossy(4, 3, 0.1, 2),
        Vec2::new(-2.0, 0.0),
        Vec2::new(2.0, 0.0),
    );
    session.player_mut().start_recording(30);

    let mut player = Script::new(0xD0E1);
    let mut opponent = Script::new(0xD0E2);
    let mut scheduler = TickScheduler::new(config.tick);
    let frame = Duration::from_secs_f64(1.0 / 144.0);

    println!("cues:");
    while scheduler.current_tick() < SECONDS * 60 {
        scheduler.advance(frame, |tick| {
            let toward_opponent = session.opponent().state().position;
            let toward_player = session.player().state().position;
            let p = player.input(tick, toward_opponent);
            let o = opponent.input(tick, toward_player);
            session.tick(p, o, &mut CuePrinter);
        });
    }

    println!("stats: {}", serde_json::to_string_pretty(&session.stats())?);
    println!(
        "health: player {:.1}, opponent {:.1}",
        session.player().health(),
        session.opponent().health()
    );

    if let Some(log) = session.player_mut().finish_recording() {
        let result = replay(&log)?;
        match result.first_divergence {
            None => println!("replay: {} ticks verified", result.ticks_replayed),
            // damage and stuns are applied outside the step
            Some(d) => println!("replay: diverged at tick {} (authority-side event)", d.tick),
        }
    }
    Ok(())
}
