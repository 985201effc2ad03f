//! Skirmish Sim -- deterministic single-entity combat simulation.
//!
//! This crate is the pure core shared by the predicting client and the
//! authoritative server. A tick is one call to [`step::simulate_tick`]:
//! `(EntityState, Input, AbilityContext) -> EntityState` plus any
//! side-effect intents for the outside world. There is no I/O, no clock and
//! no global state, so the same arguments always produce the same result and
//! any stretch of history can be replayed from a stored state.
//!
//! # Quick Start
//!
//! ```
//! use skirmish_sim::prelude::*;
//!
//! let loadout = Kit::brawler().bind(1.0 / 60.0).unwrap();
//! let mut state = EntityState::spawn(Vec2::ZERO, &loadout);
//!
//! for tick in 0..60 {
//!     let input = Input::neutral(tick, Vec2::new(10.0, 0.0)).with_movement(Vec2::new(1.0, 0.0));
//!     let ctx = AbilityContext::new(tick, Role::Predicting, &loadout);
//!     state = simulate_tick(&state, &input, &ctx).state;
//! }
//! assert!(state.position.x > 4.5);
//! ```

#![deny(unsafe_code)]

pub mod ability;
pub mod catalog;
pub mod cooldown;
pub mod input;
pub mod intent;
pub mod kit;
pub mod locomotion;
pub mod math;
pub mod movement;
pub mod state;
pub mod stats;
pub mod step;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating simulation data.
///
/// Gameplay rejections (cooldowns, illegal transitions, a full modifier
/// list) are not errors; they are reported as `false` by the operation that
/// was refused.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A kit or one of its ability descriptors is out of range.
    #[error("invalid kit '{kit}': {reason}")]
    InvalidKit { kit: String, reason: String },

    /// Kit JSON could not be parsed.
    #[error("failed to parse kit JSON: {0}")]
    KitParse(#[from] serde_json::Error),

    /// A stat snapshot violates the ledger's capacity or value rules.
    #[error("malformed stat snapshot: {0}")]
    MalformedStatSnapshot(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::ability::{AbilityDescriptor, AbilityKind, AbilitySlot};
    pub use crate::catalog::activation_allowed;
    pub use crate::cooldown::{CooldownTable, Role};
    pub use crate::input::{ActionFlags, Input};
    pub use crate::intent::{AbilityCue, Emissions, SideEffect, SideEffectIntent};
    pub use crate::kit::{Kit, Loadout, SlotTicks};
    pub use crate::locomotion::{can_transition, LocomotionState};
    pub use crate::math::Vec2;
    pub use crate::state::{Activity, EntityState, Resources};
    pub use crate::stats::{Budget, StatKind, StatLedger, StatModifier, StatSnapshot, MAX_MODIFIERS};
    pub use crate::step::{
        apply_stun, force_end_state, simulate_tick, step, AbilityContext, StepOutput,
    };
    pub use crate::SimError;
}
