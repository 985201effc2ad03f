//! Reconciliation: correcting the predicted history with an authoritative
//! snapshot and replaying the inputs recorded since.
//!
//! The common case is a snapshot that agrees with the prediction. That path
//! is one history lookup and one comparison. Only when the position error
//! exceeds the tolerance (or the locomotion state differs) is the history
//! rewritten from the snapshot's tick up to the present.

use serde::Serialize;
use skirmish_sim::cooldown::Role;
use skirmish_sim::intent::Emissions;
use skirmish_sim::kit::Loadout;
use skirmish_sim::locomotion::LocomotionState;
use skirmish_sim::state::EntityState;
use skirmish_sim::step::{simulate_tick, AbilityContext};
use tracing::{debug, debug_span, warn};

use crate::config::{NetConfig, StatRestorePolicy};
use crate::history::PredictionHistory;
use crate::snapshot::AuthoritativeSnapshot;

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Positional error allowed before a correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub base: f64,
    /// Applied when either side is dashing.
    pub fast_multiplier: f64,
}

impl Tolerance {
    pub fn from_config(config: &NetConfig) -> Self {
        Self {
            base: config.position_tolerance,
            fast_multiplier: config.fast_tolerance_multiplier,
        }
    }

    /// The tolerance to compare against for this pair of states.
    pub fn effective(&self, predicted: LocomotionState, authoritative: LocomotionState) -> f64 {
        if predicted == LocomotionState::Dashing || authoritative == LocomotionState::Dashing {
            self.base * self.fast_multiplier
        } else {
            self.base
        }
    }
}

/// How far a prediction is from the authority's result for the same tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divergence {
    pub position_error: f64,
    pub state_mismatch: bool,
    pub tolerance: f64,
}

impl Divergence {
    pub fn measure(predicted: &EntityState, authoritative: &EntityState, tolerance: &Tolerance) -> Self {
        Self {
            position_error: predicted.position.distance(authoritative.position),
            state_mismatch: predicted.locomotion != authoritative.locomotion,
            tolerance: tolerance.effective(predicted.locomotion, authoritative.locomotion),
        }
    }

    pub fn needs_correction(&self) -> bool {
        self.state_mismatch || self.position_error > self.tolerance
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What happened to one received snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ReconcileOutcome {
    /// Older than the newest snapshot already applied; ignored.
    Stale { tick: u64 },
    /// For a tick the client has not predicted yet; ignored.
    Future { tick: u64 },
    /// Prediction agreed within tolerance.
    InSync { tick: u64, error: f64 },
    /// History rewritten from `tick` and `replayed` ticks re-simulated.
    Corrected { tick: u64, error: f64, replayed: u64 },
    /// The history needed for a replay was gone; the authoritative state was
    /// adopted as the present state without replay.
    HardSnap { tick: u64 },
}

impl ReconcileOutcome {
    /// Whether the predicted state changed.
    pub fn corrected(&self) -> bool {
        matches!(self, ReconcileOutcome::Corrected { .. } | ReconcileOutcome::HardSnap { .. })
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Per-entity reconciliation state on the client.
#[derive(Debug, Clone)]
pub struct Reconciler {
    tolerance: Tolerance,
    stat_restore: StatRestorePolicy,
    last_applied: Option<u64>,
    corrections: u64,
    hard_snaps: u64,
}

impl Reconciler {
    pub fn new(tolerance: Tolerance, stat_restore: StatRestorePolicy) -> Self {
        Self {
            tolerance,
            stat_restore,
            last_applied: None,
            corrections: 0,
            hard_snaps: 0,
        }
    }

    pub fn from_config(config: &NetConfig) -> Self {
        Self::new(Tolerance::from_config(config), config.stat_restore)
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Tick of the newest snapshot that was compared against the history.
    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }

    /// Number of corrections with replay so far.
    pub fn corrections(&self) -> u64 {
        self.corrections
    }

    /// Number of hard snaps so far.
    pub fn hard_snaps(&self) -> u64 {
        self.hard_snaps
    }

    /// Reconcile `history` with `snapshot`.
    ///
    /// `current_tick` is the next tick the client will predict; the history
    /// holds states up to `current_tick - 1`. On return the entry at
    /// `current_tick - 1` is the state the client should continue from.
    ///
    /// Nothing is mutated unless the snapshot is applied, and the replay is
    /// only started once every input it needs is known to be present.
    pub fn reconcile(
        &mut self,
        snapshot: &AuthoritativeSnapshot,
        history: &mut PredictionHistory,
        current_tick: u64,
        loadout: &Loadout,
    ) -> ReconcileOutcome {
        self.reconcile_with(snapshot, history, current_tick, loadout, &mut |_, _| {})
    }

    /// [`reconcile`](Self::reconcile), handing each replayed tick's
    /// emissions to `on_replayed` instead of dropping them.
    ///
    /// Those emissions repeat events that were already presented when the
    /// tick was first predicted; `on_replayed` must not execute them again.
    pub fn reconcile_with(
        &mut self,
        snapshot: &AuthoritativeSnapshot,
        history: &mut PredictionHistory,
        current_tick: u64,
        loadout: &Loadout,
        on_replayed: &mut dyn FnMut(u64, &Emissions),
    ) -> ReconcileOutcome {
        let tick = snapshot.tick;
        if self.last_applied.is_some_and(|last| tick < last) {
            debug!(tick, last = ?self.last_applied, "discarding stale snapshot");
            return ReconcileOutcome::Stale { tick };
        }
        if tick >= current_tick {
            debug!(tick, current_tick, "discarding snapshot from the future");
            return ReconcileOutcome::Future { tick };
        }

        let predicted = match history.states.get(tick) {
            Some(state) if history.inputs.contains_range(tick + 1..current_tick) => *state,
            _ => return self.hard_snap(snapshot, history, current_tick),
        };
        self.last_applied = Some(tick);

        let divergence = Divergence::measure(&predicted, &snapshot.state, &self.tolerance);
        if !divergence.needs_correction() {
            return ReconcileOutcome::InSync {
                tick,
                error: divergence.position_error,
            };
        }

        let mut seed = snapshot.state;
        // The waits name the modifiers in this ledger; they travel together.
        if self.stat_restore == StatRestorePolicy::Local {
            seed.stats = predicted.stats;
            seed.stat_waits = predicted.stat_waits;
        }
        history.states.insert(tick, seed);
        let replayed = resimulate(history, seed, tick + 1..current_tick, loadout, on_replayed);
        self.corrections += 1;

        debug!(
            tick,
            error = divergence.position_error,
            tolerance = divergence.tolerance,
            state_mismatch = divergence.state_mismatch,
            replayed,
            "corrected prediction"
        );
        ReconcileOutcome::Corrected {
            tick,
            error: divergence.position_error,
            replayed,
        }
    }

    fn hard_snap(
        &mut self,
        snapshot: &AuthoritativeSnapshot,
        history: &mut PredictionHistory,
        current_tick: u64,
    ) -> ReconcileOutcome {
        warn!(
            tick = snapshot.tick,
            current_tick,
            "history no longer covers snapshot, snapping without replay"
        );
        history.states.insert(current_tick - 1, snapshot.state);
        self.last_applied = Some(snapshot.tick);
        self.hard_snaps += 1;
        ReconcileOutcome::HardSnap { tick: snapshot.tick }
    }
}

/// Re-run the recorded inputs for `ticks` starting from `seed`, overwriting
/// the stored states. Emissions go to `on_replayed` only. Returns the number
/// of ticks run.
///
/// Every input in `ticks` must be present in `history`.
fn resimulate(
    history: &mut PredictionHistory,
    seed: EntityState,
    ticks: std::ops::Range<u64>,
    loadout: &Loadout,
    on_replayed: &mut dyn FnMut(u64, &Emissions),
) -> u64 {
    let _span = debug_span!("rollback", from = ticks.start, to = ticks.end).entered();
    let mut state = seed;
    let mut replayed = 0;
    for t in ticks {
        let Some(input) = history.inputs.get(t).copied() else {
            break;
        };
        let ctx = AbilityContext::new(t, Role::Predicting, loadout);
        let out = simulate_tick(&state, &input, &ctx);
        on_replayed(t, &out.emissions);
        state = out.state;
        history.states.insert(t, state);
        replayed += 1;
    }
    replayed
}
