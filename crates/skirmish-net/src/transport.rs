//! In-memory transport with simulated latency, jitter and loss.
//!
//! Time is measured in ticks. A message sent at tick `t` becomes available
//! to [`Channel::poll`] once the link's clock reaches
//! `t + latency + jitter`. Jitter and loss come from a seeded PCG generator,
//! so a given [`LinkConfig`] produces the same delivery schedule every run.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use crate::collab::Channel;

/// Delivery characteristics of a [`LoopbackLink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Fixed delay in ticks.
    pub latency_ticks: u64,
    /// Extra delay drawn uniformly from `0..=jitter_ticks`.
    pub jitter_ticks: u64,
    /// Probability in `[0, 1]` that a message is lost.
    pub drop_chance: f64,
    /// Never deliver a message before one sent earlier.
    pub ordered: bool,
    pub seed: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::reliable(0)
    }
}

impl LinkConfig {
    /// Lossless, ordered, constant latency.
    pub fn reliable(latency_ticks: u64) -> Self {
        Self {
            latency_ticks,
            jitter_ticks: 0,
            drop_chance: 0.0,
            ordered: true,
            seed: 0,
        }
    }

    /// Unordered with jitter and loss.
    pub fn lossy(latency_ticks: u64, jitter_ticks: u64, drop_chance: f64, seed: u64) -> Self {
        Self {
            latency_ticks,
            jitter_ticks,
            drop_chance,
            ordered: false,
            seed,
        }
    }
}

struct InFlight<T> {
    deliver_at: u64,
    seq: u64,
    msg: T,
}

/// A one-way in-memory link.
pub struct LoopbackLink<T> {
    config: LinkConfig,
    rng: Pcg64Mcg,
    now: u64,
    in_flight: Vec<InFlight<T>>,
    next_seq: u64,
    last_scheduled: u64,
    dropped: u64,
}

impl<T> LoopbackLink<T> {
    /// # Panics
    ///
    /// Panics if `drop_chance` is outside `[0, 1]`.
    pub fn new(config: LinkConfig) -> Self {
        assert!(
            (0.0..=1.0).contains(&config.drop_chance),
            "drop_chance must be within [0, 1], got {}",
            config.drop_chance
        );
        let rng = Pcg64Mcg::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            now: 0,
            in_flight: Vec::new(),
            next_seq: 0,
            last_scheduled: 0,
            dropped: 0,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Advance the link clock. Time never goes backwards.
    pub fn set_time(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    /// Messages sent but not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Messages lost so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl<T> Channel<T> for LoopbackLink<T> {
    fn send(&mut self, msg: T) {
        if self.config.drop_chance > 0.0 && self.rng.gen_bool(self.config.drop_chance) {
            self.dropped += 1;
            return;
        }
        let jitter = if self.config.jitter_ticks > 0 {
            self.rng.gen_range(0..=self.config.jitter_ticks)
        } else {
            0
        };
        let mut deliver_at = self.now + self.config.latency_ticks + jitter;
        if self.config.ordered {
            deliver_at = deliver_at.max(self.last_scheduled);
            self.last_scheduled = deliver_at;
        }
        self.in_flight.push(InFlight {
            deliver_at,
            seq: self.next_seq,
            msg,
        });
        self.next_seq += 1;
    }

    fn poll(&mut self) -> Vec<T> {
        self.in_flight.sort_by_key(|m| (m.deliver_at, m.seq));
        let now = self.now;
        let due = self.in_flight.partition_point(|m| m.deliver_at <= now);
        self.in_flight.drain(..due).map(|m| m.msg).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reliable_link_delays_by_latency() {
        let mut link = LoopbackLink::new(LinkConfig::reliable(3));
        link.send(1u32);
        link.set_time(1);
        link.send(2);
        link.set_time(2);
        assert!(link.poll().is_empty());
        link.set_time(3);
        assert_eq!(link.poll(), vec![1]);
        link.set_time(10);
        assert_eq!(link.poll(), vec![2]);
        assert_eq!(link.in_flight(), 0);
    }

    #[test]
    fn ordered_link_never_reorders_under_jitter() {
        let mut config = LinkConfig::lossy(2, 5, 0.0, 7);
        config.ordered = true;
        let mut link = LoopbackLink::new(config);
        let mut received = Vec::new();
        for t in 0..200u64 {
            link.set_time(t);
            link.send(t);
            received.extend(link.poll());
        }
        link.set_time(1_000);
        received.extend(link.poll());
        assert_eq!(received, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn lossy_link_drops_and_reorders_deterministically() {
        let run = || {
            let mut link = LoopbackLink::new(LinkConfig::lossy(1, 4, 0.2, 42));
            let mut received = Vec::new();
            for t in 0..300u64 {
                link.set_time(t);
                link.send(t);
                received.extend(link.poll());
            }
            link.set_time(1_000);
            received.extend(link.poll());
            (received, link.dropped())
        };
        let (a, dropped) = run();
        assert_eq!(run(), (a.clone(), dropped));
        assert!(dropped > 0);
        assert_eq!(a.len() as u64 + dropped, 300);
        assert!(a.windows(2).any(|w| w[0] > w[1]), "jitter should reorder something");
    }

    #[test]
    #[should_panic(expected = "drop_chance")]
    fn rejects_bad_drop_chance() {
        let _ = LoopbackLink::<u8>::new(LinkConfig::lossy(0, 0, 1.5, 0));
    }
}
