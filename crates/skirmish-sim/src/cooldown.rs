//! Cooldown Table: per-entity "earliest usable tick" per ability slot.
//!
//! Cooldowns are stored in ticks so replay under integer arithmetic is exact.
//! An absent entry means the ability is ready.

use serde::{Deserialize, Serialize};

use crate::ability::AbilitySlot;

/// Which side of the network is running the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The owning client, running ahead of confirmation.
    Predicting,
    /// The server's authoritative recomputation.
    Authoritative,
}

impl Role {
    /// Offset added to the current tick before comparing against a cooldown.
    ///
    /// The authority validates input for tick `t` while its own tick is
    /// already `t + 1`; the extra tick keeps it from rejecting an activation
    /// the predicting side accepted.
    pub const fn cooldown_slack(self) -> u64 {
        match self {
            Role::Predicting => 0,
            Role::Authoritative => 1,
        }
    }
}

/// Earliest usable tick per ability slot. At most one entry per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CooldownTable {
    ready_at: [Option<u64>; AbilitySlot::COUNT],
}

impl CooldownTable {
    /// An empty table (every ability ready).
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `slot` is still cooling down at `tick` for `role`.
    pub fn is_on_cooldown(&self, slot: AbilitySlot, tick: u64, role: Role) -> bool {
        match self.ready_at[slot.index()] {
            Some(ready) => tick + role.cooldown_slack() < ready,
            None => false,
        }
    }

    /// Start (or restart) the cooldown of `slot` at `tick` for `duration`
    /// ticks. Overwrites any existing entry.
    pub fn set(&mut self, slot: AbilitySlot, tick: u64, duration: u64) {
        self.ready_at[slot.index()] = Some(tick + duration);
    }

    /// Drop the entry for `slot`, making it ready.
    pub fn clear(&mut self, slot: AbilitySlot) {
        self.ready_at[slot.index()] = None;
    }

    /// The earliest usable tick for `slot`, if an entry exists.
    pub fn ready_at(&self, slot: AbilitySlot) -> Option<u64> {
        self.ready_at[slot.index()]
    }

    /// Ticks left before `slot` is usable at `tick` (zero when ready).
    pub fn remaining(&self, slot: AbilitySlot, tick: u64) -> u64 {
        self.ready_at[slot.index()]
            .map(|ready| ready.saturating_sub(tick))
            .unwrap_or(0)
    }
}
