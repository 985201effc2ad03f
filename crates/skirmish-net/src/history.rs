//! Fixed-size ring buffers indexed by simulation tick.
//!
//! A [`HistoryBuffer`] always holds exactly `N` slots and stores a value for
//! tick `t` at `t % N`. Each slot remembers the tick it was written for, so
//! a lookup for a tick that has been overwritten (or never written) returns
//! `None` instead of silently yielding another tick's value.

use skirmish_sim::input::Input;
use skirmish_sim::state::EntityState;

/// Number of ticks of history kept per entity.
pub const BUFFER_SIZE: usize = 1024;

/// A ring buffer of per-tick values.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T, const N: usize = BUFFER_SIZE> {
    slots: Box<[Option<(u64, T)>]>,
}

impl<T: Copy, const N: usize> Default for HistoryBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> HistoryBuffer<T, N> {
    /// An empty buffer with `N` slots.
    pub fn new() -> Self {
        assert!(N > 0, "history buffer needs at least one slot");
        Self {
            slots: vec![None; N].into_boxed_slice(),
        }
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        N
    }

    fn index(tick: u64) -> usize {
        (tick % N as u64) as usize
    }

    /// Store `value` for `tick`, overwriting whatever shared its slot.
    pub fn insert(&mut self, tick: u64, value: T) {
        self.slots[Self::index(tick)] = Some((tick, value));
    }

    /// The value stored for exactly `tick`, if it is still retained.
    pub fn get(&self, tick: u64) -> Option<&T> {
        match &self.slots[Self::index(tick)] {
            Some((stored, value)) if *stored == tick => Some(value),
            _ => None,
        }
    }

    /// Whether a value for exactly `tick` is retained.
    pub fn contains(&self, tick: u64) -> bool {
        self.get(tick).is_some()
    }

    /// Whether every tick in `range` is retained.
    pub fn contains_range(&self, range: std::ops::Range<u64>) -> bool {
        range.end.saturating_sub(range.start) <= N as u64 && range.into_iter().all(|t| self.contains(t))
    }

    /// Empty every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }
}

/// The input and resulting-state histories of one predicted entity.
#[derive(Debug, Clone, Default)]
pub struct PredictionHistory {
    /// Input recorded for each tick.
    pub inputs: HistoryBuffer<Input>,
    /// State produced by simulating that tick's input.
    pub states: HistoryBuffer<EntityState>,
}

impl PredictionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one simulated tick.
    pub fn record(&mut self, tick: u64, input: Input, state: EntityState) {
        self.inputs.insert(tick, input);
        self.states.insert(tick, state);
    }
}
