//! Skirmish Net -- client prediction and server reconciliation on top of
//! [`skirmish_sim`].
//!
//! The client runs its own entity ahead of the network with
//! [`ClientSimulation`](prediction::ClientSimulation), recording every input
//! and resulting state in tick-indexed ring buffers. The authority re-runs
//! the same step from the received inputs with
//! [`AuthoritySimulation`](authority::AuthoritySimulation) and returns
//! snapshots. When a snapshot disagrees with the prediction for its tick,
//! the [`Reconciler`](reconcile::Reconciler) adopts it and replays the
//! recorded inputs up to the present.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use skirmish_net::prelude::*;
//!
//! let config = NetConfig::default();
//! let loadout = Arc::new(Kit::brawler().bind(config.tick.fixed_dt).unwrap());
//! let mut client = ClientSimulation::new(EntityId(0), Arc::clone(&loadout), Vec2::ZERO, &config);
//! let mut server = AuthoritySimulation::new(EntityId(0), loadout, Vec2::ZERO, config.gap_policy);
//!
//! for tick in 0..30 {
//!     let input = Input::neutral(tick, Vec2::new(10.0, 0.0)).with_movement(Vec2::new(1.0, 0.0));
//!     let sent = client.tick(input).input;
//!     for authoritative in server.receive_input(sent) {
//!         let outcome = client.apply_snapshot(&authoritative.snapshot);
//!         assert!(!outcome.corrected());
//!     }
//! }
//! assert_eq!(client.current_tick(), 30);
//! ```

#![deny(unsafe_code)]

pub mod authority;
pub mod collab;
pub mod config;
pub mod history;
pub mod prediction;
pub mod reconcile;
pub mod registry;
pub mod replay;
pub mod session;
pub mod snapshot;
pub mod tick;
pub mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the simulation crate for convenience.
pub use skirmish_sim;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use skirmish_sim::prelude::*;

    pub use crate::authority::{AuthoritySimulation, AuthorityTick};
    pub use crate::collab::{
        resolve_effects, Channel, CollisionQuery, CueSink, DamageSink, Hit, InputChannel,
        OrientedBox, Resolution, SnapshotChannel,
    };
    pub use crate::config::{load_kit, GapPolicy, NetConfig, StatRestorePolicy};
    pub use crate::history::{HistoryBuffer, PredictionHistory, BUFFER_SIZE};
    pub use crate::prediction::{ClientSimulation, ClientTick};
    pub use crate::reconcile::{Divergence, ReconcileOutcome, Reconciler, Tolerance};
    pub use crate::registry::{EntityId, EntityRegistry, RegistryEntry};
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayLog, ReplayRecorder, ReplayResult,
    };
    pub use crate::session::{DuelSession, SessionStats, BODY_RADIUS};
    pub use crate::snapshot::AuthoritativeSnapshot;
    pub use crate::tick::{TickConfig, TickScheduler};
    pub use crate::transport::{LinkConfig, LoopbackLink};
}
