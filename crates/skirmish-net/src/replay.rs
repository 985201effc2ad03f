//! Input recording and deterministic replay verification.
//!
//! A [`ReplayRecorder`] captures the inputs an entity was simulated with and
//! periodic BLAKE3 hashes of its state. [`replay`] re-binds the recorded kit,
//! re-runs the step from the initial state and reports the first checkpoint
//! whose hash does not match.
//!
//! Inputs are stored only when they differ from what
//! [`GapPolicy::HoldLast`] would reconstruct from the previous one, so long
//! stretches of held movement cost nothing. Anything that changed the state
//! outside the step (damage, stuns) shows up as a divergence.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use skirmish_sim::cooldown::Role;
use skirmish_sim::input::Input;
use skirmish_sim::kit::Kit;
use skirmish_sim::state::EntityState;
use skirmish_sim::step::{simulate_tick, AbilityContext};

use crate::config::GapPolicy;

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A recorded run: everything needed to re-simulate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub kit: Kit,
    pub tick_dt: f64,
    pub role: Role,
    /// State before `start_tick` was simulated.
    pub initial_state: EntityState,
    pub start_tick: u64,
    pub total_ticks: u64,
    pub entries: Vec<ReplayEntry>,
}

/// One entry in a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayEntry {
    Input { tick: u64, input: Input },
    /// Hash of the state before `tick` was simulated.
    Checkpoint { tick: u64, state_hash: String },
}

/// Outcome of [`replay`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub completed: bool,
    pub ticks_replayed: u64,
    pub first_divergence: Option<ReplayDivergence>,
}

/// The first checkpoint that did not match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub tick: u64,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Builds a [`ReplayLog`] one tick at a time.
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    log: ReplayLog,
    checkpoint_interval: u64,
    last: Option<Input>,
}

impl ReplayRecorder {
    /// Start recording an entity whose state before `start_tick` is
    /// `initial_state`.
    ///
    /// A `checkpoint_interval` of 10 checkpoints ticks 0, 10, 20 and so on;
    /// 0 checkpoints every tick.
    pub fn new(
        kit: Kit,
        tick_dt: f64,
        role: Role,
        initial_state: EntityState,
        start_tick: u64,
        checkpoint_interval: u64,
    ) -> Self {
        Self {
            log: ReplayLog {
                kit,
                tick_dt,
                role,
                initial_state,
                start_tick,
                total_ticks: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
            last: None,
        }
    }

    /// Record one tick before it is simulated. `state` is the state the
    /// tick starts from.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is not the tick following the previous call.
    pub fn record_tick(&mut self, tick: u64, input: &Input, state: &EntityState) {
        let expected = self.log.start_tick + self.log.total_ticks;
        assert_eq!(
            tick, expected,
            "ReplayRecorder::record_tick: expected tick {expected}, got {tick}"
        );

        if GapPolicy::HoldLast.fill(self.last.as_ref(), tick) != *input {
            self.log.entries.push(ReplayEntry::Input { tick, input: *input });
        }
        self.last = Some(*input);

        if self.checkpoint_interval == 0 || tick % self.checkpoint_interval == 0 {
            self.log.entries.push(ReplayEntry::Checkpoint {
                tick,
                state_hash: state.state_hash(),
            });
        }
        self.log.total_ticks += 1;
    }

    pub fn ticks_recorded(&self) -> u64 {
        self.log.total_ticks
    }

    pub fn finish(self) -> ReplayLog {
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Re-simulate `log` and compare every checkpoint.
///
/// # Errors
///
/// Returns an error if the log has duplicate entries, entries outside its
/// tick range, a tick range that overflows, or a kit that no longer binds.
pub fn replay(log: &ReplayLog) -> anyhow::Result<ReplayResult> {
    let start = log.start_tick;
    let end = start.checked_add(log.total_ticks).ok_or_else(|| {
        anyhow!(
            "tick range overflow: start_tick ({start}) + total_ticks ({}) exceeds u64::MAX",
            log.total_ticks
        )
    })?;

    let mut inputs: BTreeMap<u64, Input> = BTreeMap::new();
    let mut checkpoints: BTreeMap<u64, &str> = BTreeMap::new();
    for entry in &log.entries {
        let tick = match entry {
            ReplayEntry::Input { tick, input } => {
                if inputs.insert(*tick, *input).is_some() {
                    bail!("replay log contains duplicate Input entry at tick {tick}");
                }
                *tick
            }
            ReplayEntry::Checkpoint { tick, state_hash } => {
                if checkpoints.insert(*tick, state_hash).is_some() {
                    bail!("replay log contains duplicate Checkpoint entry at tick {tick}");
                }
                *tick
            }
        };
        if !(start..end).contains(&tick) {
            bail!("replay entry at tick {tick} is outside the recorded range {start}..{end}");
        }
    }

    let loadout = log
        .kit
        .bind(log.tick_dt)
        .with_context(|| format!("failed to bind kit '{}' for replay", log.kit.name))?;

    let mut state = log.initial_state;
    let mut last: Option<Input> = None;
    let mut ticks_replayed = 0;
    for tick in start..end {
        if let Some(expected) = checkpoints.get(&tick) {
            let actual = state.state_hash();
            if actual != *expected {
                return Ok(ReplayResult {
                    completed: false,
                    ticks_replayed,
                    first_divergence: Some(ReplayDivergence {
                        tick,
                        expected_hash: (*expected).to_owned(),
                        actual_hash: actual,
                    }),
                });
            }
        }

        let input = match inputs.get(&tick) {
            Some(input) => *input,
            None => GapPolicy::HoldLast.fill(last.as_ref(), tick),
        };
        let ctx = AbilityContext::new(tick, log.role, &loadout);
        state = simulate_tick(&state, &input, &ctx).state;
        last = Some(input);
        ticks_replayed += 1;
    }

    Ok(ReplayResult {
        completed: true,
        ticks_replayed,
        first_divergence: None,
    })
}
