//! A two-entity duel wired over loopback links.
//!
//! One entity is driven by a predicting client whose inputs travel to the
//! authority over an ordered uplink and whose corrections come back over a
//! best-effort downlink. The opponent exists only on the authority. Hits
//! are resolved against the entity registry on the authority side.

use std::sync::Arc;

use serde::Serialize;
use skirmish_sim::input::Input;
use skirmish_sim::kit::Loadout;
use skirmish_sim::math::Vec2;
use tracing::debug;

use crate::authority::{AuthoritySimulation, AuthorityTick};
use crate::collab::{resolve_effects, Channel, CueSink, DamageSink};
use crate::config::NetConfig;
use crate::prediction::ClientSimulation;
use crate::reconcile::ReconcileOutcome;
use crate::registry::{EntityId, EntityRegistry};
use crate::snapshot::AuthoritativeSnapshot;
use crate::transport::{LinkConfig, LoopbackLink};

/// Body radius used for every duelist.
pub const BODY_RADIUS: f64 = 0.5;

/// Counters collected over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub snapshots_received: u64,
    pub in_sync: u64,
    pub corrections: u64,
    pub hard_snaps: u64,
    pub discarded: u64,
    pub inputs_filled: u64,
    pub hits: u64,
}

impl SessionStats {
    fn count(&mut self, outcome: &ReconcileOutcome) {
        self.snapshots_received += 1;
        match outcome {
            ReconcileOutcome::InSync { .. } => self.in_sync += 1,
            ReconcileOutcome::Corrected { .. } => self.corrections += 1,
            ReconcileOutcome::HardSnap { .. } => self.hard_snaps += 1,
            ReconcileOutcome::Stale { .. } | ReconcileOutcome::Future { .. } => self.discarded += 1,
        }
    }
}

/// Routes damage between the two authoritative duelists.
struct Duelists<'a> {
    player: &'a mut AuthoritySimulation,
    opponent: &'a mut AuthoritySimulation,
}

impl Duelists<'_> {
    fn get(&mut self, id: EntityId) -> Option<&mut AuthoritySimulation> {
        if id == self.player.entity() {
            Some(&mut *self.player)
        } else if id == self.opponent.entity() {
            Some(&mut *self.opponent)
        } else {
            None
        }
    }
}

impl DamageSink for Duelists<'_> {
    fn take_damage(&mut self, target: EntityId, source: EntityId, amount: f64) {
        let taken = match self.get(target) {
            Some(entity) => entity.take_damage(amount),
            None => return,
        };
        if let Some(attacker) = self.get(source) {
            attacker.on_damage_dealt(taken);
        }
    }
}

/// A predicted player against a server-only opponent.
pub struct DuelSession {
    registry: EntityRegistry,
    client: ClientSimulation,
    player: AuthoritySimulation,
    opponent: AuthoritySimulation,
    uplink: LoopbackLink<Input>,
    downlink: LoopbackLink<AuthoritativeSnapshot>,
    now: u64,
    stats: SessionStats,
}

impl DuelSession {
    pub fn new(
        loadout: Arc<Loadout>,
        config: &NetConfig,
        uplink: LinkConfig,
        downlink: LinkConfig,
        player_spawn: Vec2,
        opponent_spawn: Vec2,
    ) -> Self {
        let mut registry = EntityRegistry::new();
        let player_id = registry.register(0, player_spawn, BODY_RADIUS);
        let opponent_id = registry.register(1, opponent_spawn, BODY_RADIUS);
        Self {
            registry,
            client: ClientSimulation::new(player_id, Arc::clone(&loadout), player_spawn, config),
            player: AuthoritySimulation::new(player_id, Arc::clone(&loadout), player_spawn, config.gap_policy),
            opponent: AuthoritySimulation::new(opponent_id, loadout, opponent_spawn, config.gap_policy),
            uplink: LoopbackLink::new(uplink),
            downlink: LoopbackLink::new(downlink),
            now: 0,
            stats: SessionStats::default(),
        }
    }

    pub fn client(&self) -> &ClientSimulation {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut ClientSimulation {
        &mut self.client
    }

    /// The authority's copy of the predicted player.
    pub fn player(&self) -> &AuthoritySimulation {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut AuthoritySimulation {
        &mut self.player
    }

    pub fn opponent(&self) -> &AuthoritySimulation {
        &self.opponent
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run one tick: predict, deliver what is due in both directions, run
    /// the authority, and reconcile.
    ///
    /// Predicted cues go to `cues` once, when they happen locally; cues a
    /// correction recomputes arrive as replays. The opponent's cues are
    /// forwarded as the authority produces them.
    pub fn tick(&mut self, player_input: Input, opponent_input: Input, cues: &mut dyn CueSink) {
        let now = self.now;
        let player_id = self.client.entity();

        let predicted = self.client.tick(player_input);
        for cue in &predicted.emissions.cues {
            cues.on_cue(player_id, cue);
        }
        self.uplink.set_time(now);
        self.uplink.send(predicted.input);

        let mut player_ticks = Vec::new();
        for input in self.uplink.poll() {
            player_ticks.extend(self.player.receive_input(input));
        }
        let opponent_ticks = self.opponent.receive_input(opponent_input.retick(now));

        self.resolve(&player_ticks);
        self.resolve(&opponent_ticks);
        for cue in opponent_ticks.iter().flat_map(|t| t.emissions.cues.iter()) {
            cues.on_cue(self.opponent.entity(), cue);
        }

        self.downlink.set_time(now);
        for t in &player_ticks {
            self.downlink.send(t.snapshot);
        }
        for snapshot in self.downlink.poll() {
            let outcome = self.client.apply_snapshot_with(&snapshot, cues);
            self.stats.count(&outcome);
        }

        self.stats.ticks += 1;
        self.now += 1;
    }

    /// Execute the side effects of authoritative ticks and refresh the
    /// registry.
    fn resolve(&mut self, ticks: &[AuthorityTick]) {
        for t in ticks {
            if t.filled {
                self.stats.inputs_filled += 1;
            }
            let mut duelists = Duelists {
                player: &mut self.player,
                opponent: &mut self.opponent,
            };
            let resolution = resolve_effects(t.snapshot.entity, &t.emissions.effects, &self.registry, &mut duelists);
            self.stats.hits += resolution.hits.len() as u64;
            if !resolution.spawns.is_empty() {
                debug!(entity = %t.snapshot.entity, tick = t.snapshot.tick, spawns = resolution.spawns.len(), "spawn requests");
            }
            self.sync_registry();
        }
    }

    fn sync_registry(&mut self) {
        for side in [&self.player, &self.opponent] {
            self.registry
                .update(side.entity(), side.state().position, side.is_alive());
        }
    }
}
