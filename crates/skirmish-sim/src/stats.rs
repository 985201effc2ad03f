//! Stat Ledger: bounded multiplicative buffs and debuffs.
//!
//! Each entity carries at most [`MAX_MODIFIERS`] active [`StatModifier`]s.
//! Modifiers of the same [`StatKind`] compose multiplicatively over a base
//! value. A modifier expires when its tick budget runs out (see
//! [`StatLedger::tick`]) or when its charges are consumed (see
//! [`StatLedger::consume_charge`]); both operations report which kinds
//! expired so that stat-gated abilities can start their cooldown.
//!
//! The ledger round-trips through a fixed-width [`StatSnapshot`] so it can be
//! stored in a constant-size history slot and rolled back exactly.

use serde::{Deserialize, Serialize};

use crate::SimError;

/// Maximum number of simultaneously active modifiers per entity.
pub const MAX_MODIFIERS: usize = 4;

// ---------------------------------------------------------------------------
// StatKind
// ---------------------------------------------------------------------------

/// The stats a modifier can scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatKind {
    MoveSpeed,
    Damage,
    RangedDamage,
    Defense,
}

impl StatKind {
    /// Number of stat kinds.
    pub const COUNT: usize = 4;

    /// All stat kinds in declaration order.
    pub const ALL: [StatKind; StatKind::COUNT] = [
        StatKind::MoveSpeed,
        StatKind::Damage,
        StatKind::RangedDamage,
        StatKind::Defense,
    ];

    /// Dense index for table lookups.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether the step spends charges of this kind: one per melee swing
    /// for `Damage`, one per shot for `RangedDamage`.
    pub const fn spends_charges(self) -> bool {
        matches!(self, StatKind::Damage | StatKind::RangedDamage)
    }
}

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

/// A countdown that is either unbounded or a finite number of units.
///
/// Used for both the tick budget and the charge budget of a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Budget {
    Infinite,
    Finite(u32),
}

impl Budget {
    /// Whether this budget is a finite count that has run out.
    pub fn is_exhausted(self) -> bool {
        matches!(self, Budget::Finite(0))
    }

    /// Decrement a finite budget by one. Infinite budgets are unchanged.
    fn decrement(&mut self) {
        if let Budget::Finite(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

// ---------------------------------------------------------------------------
// StatModifier
// ---------------------------------------------------------------------------

/// A single multiplicative modifier on one stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatModifier {
    /// Which stat this modifier scales.
    pub kind: StatKind,
    /// Multiplicative factor applied to the base value.
    pub multiplier: f64,
    /// Ticks until expiry.
    pub ticks_remaining: Budget,
    /// Charges until expiry (consumed by explicit events such as a shot).
    pub charges: Budget,
}

impl StatModifier {
    /// Filler used for unoccupied snapshot slots.
    pub const EMPTY: StatModifier = StatModifier {
        kind: StatKind::MoveSpeed,
        multiplier: 1.0,
        ticks_remaining: Budget::Finite(0),
        charges: Budget::Finite(0),
    };

    fn is_valid(&self) -> bool {
        self.multiplier.is_finite()
            && !self.ticks_remaining.is_exhausted()
            && !self.charges.is_exhausted()
    }
}

// ---------------------------------------------------------------------------
// StatSnapshot
// ---------------------------------------------------------------------------

/// Fixed-width capture of a [`StatLedger`]: an active count plus
/// [`MAX_MODIFIERS`] slots.
///
/// Unoccupied slots always hold [`StatModifier::EMPTY`], so two snapshots of
/// the same composition compare (and hash) equal. Deserialization validates
/// the count and every occupied slot; a malformed snapshot cannot be
/// constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStatSnapshot")]
pub struct StatSnapshot {
    count: u8,
    slots: [StatModifier; MAX_MODIFIERS],
}

/// Unvalidated wire form of [`StatSnapshot`].
#[derive(Deserialize)]
struct RawStatSnapshot {
    count: u8,
    slots: [StatModifier; MAX_MODIFIERS],
}

impl TryFrom<RawStatSnapshot> for StatSnapshot {
    type Error = SimError;

    fn try_from(raw: RawStatSnapshot) -> Result<Self, Self::Error> {
        let count = raw.count as usize;
        if count > MAX_MODIFIERS {
            return Err(SimError::MalformedStatSnapshot(format!(
                "active count {count} exceeds capacity {MAX_MODIFIERS}"
            )));
        }
        if let Some((i, _)) = raw.slots[..count]
            .iter()
            .enumerate()
            .find(|(_, m)| !m.is_valid())
        {
            return Err(SimError::MalformedStatSnapshot(format!(
                "slot {i} holds an expired or non-finite modifier"
            )));
        }
        let mut slots = [StatModifier::EMPTY; MAX_MODIFIERS];
        slots[..count].copy_from_slice(&raw.slots[..count]);
        Ok(StatSnapshot {
            count: raw.count,
            slots,
        })
    }
}

impl Default for StatSnapshot {
    fn default() -> Self {
        Self {
            count: 0,
            slots: [StatModifier::EMPTY; MAX_MODIFIERS],
        }
    }
}

impl StatSnapshot {
    /// Number of active modifiers captured.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    /// Whether no modifier was active.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The occupied slots, in ledger order.
    pub fn modifiers(&self) -> &[StatModifier] {
        &self.slots[..self.count as usize]
    }
}

// ---------------------------------------------------------------------------
// StatLedger
// ---------------------------------------------------------------------------

/// Bounded, ordered list of active stat modifiers for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatLedger {
    snapshot: StatSnapshot,
}

impl StatLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from a snapshot.
    pub fn from_snapshot(snapshot: &StatSnapshot) -> Self {
        Self {
            snapshot: *snapshot,
        }
    }

    /// Number of active modifiers.
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// Whether no modifier is active.
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Whether the ledger is at capacity.
    pub fn is_full(&self) -> bool {
        self.len() >= MAX_MODIFIERS
    }

    /// Active modifiers in insertion order.
    pub fn modifiers(&self) -> &[StatModifier] {
        self.snapshot.modifiers()
    }

    /// Whether any active modifier scales `kind`.
    pub fn has_kind(&self, kind: StatKind) -> bool {
        self.modifiers().iter().any(|m| m.kind == kind)
    }

    /// Add a modifier.
    ///
    /// Returns `false` (and changes nothing) if the ledger is full, the
    /// multiplier is not finite, or either budget is already exhausted.
    pub fn add_modifier(
        &mut self,
        kind: StatKind,
        multiplier: f64,
        charges: Budget,
        duration: Budget,
    ) -> bool {
        let modifier = StatModifier {
            kind,
            multiplier,
            ticks_remaining: duration,
            charges,
        };
        if !modifier.is_valid() {
            tracing::warn!(?kind, multiplier, ?charges, ?duration, "invalid stat modifier ignored");
            return false;
        }
        if self.is_full() {
            tracing::warn!(?kind, capacity = MAX_MODIFIERS, "stat modifier list full, modifier ignored");
            return false;
        }
        let idx = self.len();
        self.snapshot.slots[idx] = modifier;
        self.snapshot.count += 1;
        true
    }

    /// Consume one charge from every finite-charge modifier of `kind`.
    ///
    /// Modifiers whose charges reach zero are removed; the returned list has
    /// one entry per removed modifier.
    pub fn consume_charge(&mut self, kind: StatKind) -> Vec<StatKind> {
        self.retain_after(|m| {
            if m.kind == kind {
                m.charges.decrement();
            }
            !m.charges.is_exhausted()
        })
    }

    /// Fold every active modifier of `kind` multiplicatively over `base`.
    pub fn get_stat(&self, kind: StatKind, base: f64) -> f64 {
        self.modifiers()
            .iter()
            .filter(|m| m.kind == kind)
            .fold(base, |acc, m| acc * m.multiplier)
    }

    /// Advance one tick: decrement finite durations and drop expired
    /// modifiers, reporting the kind of each one removed.
    pub fn tick(&mut self) -> Vec<StatKind> {
        self.retain_after(|m| {
            m.ticks_remaining.decrement();
            !m.ticks_remaining.is_exhausted()
        })
    }

    /// Capture the current composition.
    pub fn snapshot(&self) -> StatSnapshot {
        self.snapshot
    }

    /// Replace the current composition with `snapshot`.
    pub fn restore(&mut self, snapshot: &StatSnapshot) {
        self.snapshot = *snapshot;
    }

    /// Remove every modifier without notifying.
    pub fn clear(&mut self) {
        self.snapshot = StatSnapshot::default();
    }

    /// Apply `update` to every modifier, keep the ones it returns `true`
    /// for (preserving order) and report the kinds that were dropped.
    fn retain_after(&mut self, mut update: impl FnMut(&mut StatModifier) -> bool) -> Vec<StatKind> {
        let mut expired = Vec::new();
        let mut kept = [StatModifier::EMPTY; MAX_MODIFIERS];
        let mut kept_len = 0usize;
        for i in 0..self.len() {
            let mut m = self.snapshot.slots[i];
            if update(&mut m) {
                kept[kept_len] = m;
                kept_len += 1;
            } else {
                expired.push(m.kind);
            }
        }
        self.snapshot = StatSnapshot {
            count: kept_len as u8,
            slots: kept,
        };
        expired
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
