//! Authoritative snapshots sent from the authority to the owning client.
//!
//! A snapshot is the authority's full [`EntityState`] after simulating
//! `tick`, plus a BLAKE3 hash for diagnostics. Snapshots travel best-effort:
//! they may arrive late, duplicated or out of order.

use serde::{Deserialize, Serialize};
use skirmish_sim::locomotion::LocomotionState;
use skirmish_sim::math::Vec2;
use skirmish_sim::state::EntityState;
use skirmish_sim::stats::StatSnapshot;

use crate::registry::EntityId;

/// The authority's state of one entity after simulating `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuthoritativeSnapshot {
    pub entity: EntityId,
    pub tick: u64,
    pub state: EntityState,
}

impl AuthoritativeSnapshot {
    pub fn new(entity: EntityId, tick: u64, state: EntityState) -> Self {
        Self {
            entity,
            tick,
            state,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.state.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.state.velocity
    }

    pub fn locomotion(&self) -> LocomotionState {
        self.state.locomotion
    }

    pub fn stats(&self) -> &StatSnapshot {
        &self.state.stats
    }

    /// BLAKE3 hex digest of the carried state.
    pub fn state_hash(&self) -> String {
        self.state.state_hash()
    }
}
