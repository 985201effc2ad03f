//! Network configuration: tick rate, reconciliation tolerance and the
//! policies for input gaps and stat restoration.
//!
//! Configuration is plain serde data. [`NetConfig::from_json_str`] and
//! [`NetConfig::load`] validate before returning, so a constructed config is
//! always usable.

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use skirmish_sim::input::Input;
use skirmish_sim::kit::Kit;
use skirmish_sim::math::Vec2;

use crate::tick::TickConfig;

/// How the authority fills a tick for which no input arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GapPolicy {
    /// Repeat the previous input's movement, aim and held buttons. One-shot
    /// presses are not repeated.
    #[default]
    HoldLast,
    /// No movement, no buttons; keep aiming where the previous input aimed.
    Neutral,
}

impl GapPolicy {
    /// The input to simulate at `tick` when none was received, given the
    /// last input that was.
    pub fn fill(self, previous: Option<&Input>, tick: u64) -> Input {
        let Some(prev) = previous else {
            return Input::neutral(tick, Vec2::ZERO);
        };
        match self {
            GapPolicy::HoldLast => prev.retick(tick).with_actions(prev.actions.held_only()),
            GapPolicy::Neutral => Input::neutral(tick, prev.aim),
        }
    }
}

/// Where the stat ledger comes from when a correction is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatRestorePolicy {
    /// Take the authority's ledger along with the rest of its state.
    #[default]
    Authoritative,
    /// Keep the ledger the client predicted for the corrected tick.
    Local,
}

/// Settings shared by the client and authority contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub tick: TickConfig,
    /// Positional error (world units) tolerated before correcting.
    pub position_tolerance: f64,
    /// Tolerance multiplier while either side is dashing.
    pub fast_tolerance_multiplier: f64,
    pub gap_policy: GapPolicy,
    pub stat_restore: StatRestorePolicy,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            position_tolerance: 0.1,
            fast_tolerance_multiplier: 2.0,
            gap_policy: GapPolicy::default(),
            stat_restore: StatRestorePolicy::default(),
        }
    }
}

impl NetConfig {
    /// Parse and validate a config from JSON. Missing fields take their
    /// defaults.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: NetConfig =
            serde_json::from_str(json).context("failed to parse network config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read network config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Check every value is in range.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.tick.is_valid() {
            bail!("tick.fixed_dt must be positive and finite, got {}", self.tick.fixed_dt);
        }
        if !(self.position_tolerance >= 0.0 && self.position_tolerance.is_finite()) {
            bail!(
                "position_tolerance must be non-negative and finite, got {}",
                self.position_tolerance
            );
        }
        if !(self.fast_tolerance_multiplier >= 1.0 && self.fast_tolerance_multiplier.is_finite()) {
            bail!(
                "fast_tolerance_multiplier must be at least 1 and finite, got {}",
                self.fast_tolerance_multiplier
            );
        }
        Ok(())
    }
}

/// Read and validate a kit file.
pub fn load_kit(path: impl AsRef<Path>) -> anyhow::Result<Kit> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read kit {}", path.display()))?;
    Kit::from_json_str(&json).with_context(|| format!("in {}", path.display()))
}
