//! The rollback-relevant snapshot of one simulated actor.
//!
//! [`EntityState`] is a plain `Copy` value: everything the simulation step
//! reads from the previous tick and writes for the next one, and nothing
//! else. It fits a constant-size history slot and hashes deterministically.

use serde::{Deserialize, Serialize};

use crate::ability::AbilitySlot;
use crate::cooldown::CooldownTable;
use crate::kit::Loadout;
use crate::locomotion::LocomotionState;
use crate::math::Vec2;
use crate::stats::{StatKind, StatSnapshot};

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// Progress of the ability currently driving the locomotion state.
///
/// Multi-tick abilities advance by comparing `tick - started_tick` against
/// their tick-domain duration; there is no hidden suspension state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// The slot whose ability is running.
    pub slot: AbilitySlot,
    /// Tick on which the ability activated.
    pub started_tick: u64,
    /// Shots emitted so far (burst abilities).
    pub shots_fired: u32,
}

impl Activity {
    /// Ticks elapsed since activation, as seen at `tick`.
    pub fn elapsed(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.started_tick)
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Resource pools that gate abilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// Remaining block charge.
    pub block_charge: f64,
    /// False after the block charge hit zero, until it is fully recharged.
    pub block_available: bool,
    /// Signature charge; the signature ability needs it full.
    pub signature_charge: f64,
}

impl Resources {
    /// Full block charge, empty signature charge.
    pub fn fresh(loadout: &Loadout) -> Self {
        Self {
            block_charge: loadout.kit().resources.block.max_charge,
            block_available: true,
            signature_charge: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// EntityState
// ---------------------------------------------------------------------------

/// Everything about one entity that must be rolled back on correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Unit facing direction (the entity's "up").
    pub facing: Vec2,
    pub locomotion: LocomotionState,
    /// The ability driving `locomotion`, if any.
    pub activity: Option<Activity>,
    /// Tick at which an active stun wears off.
    pub stun_until: Option<u64>,
    /// Movement direction captured when a dash started.
    pub dash_direction: Vec2,
    pub cooldowns: CooldownTable,
    /// Stat-gated abilities waiting for their modifier to expire, by stat.
    pub stat_waits: [Option<AbilitySlot>; StatKind::COUNT],
    pub resources: Resources,
    pub stats: StatSnapshot,
}

impl EntityState {
    /// A fresh entity at `position`, idle, facing up, with full block charge.
    pub fn spawn(position: Vec2, loadout: &Loadout) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            facing: Vec2::UP,
            locomotion: LocomotionState::Normal,
            activity: None,
            stun_until: None,
            dash_direction: Vec2::ZERO,
            cooldowns: CooldownTable::new(),
            stat_waits: [None; StatKind::COUNT],
            resources: Resources::fresh(loadout),
            stats: StatSnapshot::default(),
        }
    }

    /// Move `position` by `velocity` over one tick of `tick_dt` seconds.
    pub fn integrate_position(&mut self, tick_dt: f64) {
        self.position += self.velocity * tick_dt;
    }

    /// BLAKE3 hex digest of the serialized state.
    ///
    /// Two states hash equal iff every rollback-relevant field is bit-equal.
    pub fn state_hash(&self) -> String {
        let bytes =
            serde_json::to_vec(self).expect("EntityState should always be JSON-serializable");
        blake3::hash(&bytes).to_hex().to_string()
    }
}
