//! The authoritative server-side context for one entity.
//!
//! The authority re-runs the same step as the client, driven by the inputs
//! it receives, and answers each with a snapshot. It also owns the things
//! the client may only predict: health, damage mitigation and forcing
//! events such as stuns.

use std::sync::Arc;

use skirmish_sim::ability::{AbilityKind, AbilitySlot};
use skirmish_sim::cooldown::Role;
use skirmish_sim::input::Input;
use skirmish_sim::intent::Emissions;
use skirmish_sim::kit::Loadout;
use skirmish_sim::locomotion::LocomotionState;
use skirmish_sim::math::Vec2;
use skirmish_sim::state::EntityState;
use skirmish_sim::stats::{StatKind, StatLedger};
use skirmish_sim::step::{self, simulate_tick, AbilityContext};
use tracing::{debug, trace};

use crate::config::GapPolicy;
use crate::registry::EntityId;
use crate::replay::{ReplayLog, ReplayRecorder};
use crate::snapshot::AuthoritativeSnapshot;

/// Result of simulating one received (or gap-filled) tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorityTick {
    /// The input that was simulated.
    pub input: Input,
    pub snapshot: AuthoritativeSnapshot,
    pub emissions: Emissions,
    /// Whether the input was synthesized by the gap policy.
    pub filled: bool,
}

/// Server-side simulation of one entity.
#[derive(Debug, Clone)]
pub struct AuthoritySimulation {
    entity: EntityId,
    loadout: Arc<Loadout>,
    state: EntityState,
    next_tick: u64,
    last_input: Option<Input>,
    gap_policy: GapPolicy,
    health: f64,
    recorder: Option<ReplayRecorder>,
}

impl AuthoritySimulation {
    pub fn new(entity: EntityId, loadout: Arc<Loadout>, spawn: Vec2, gap_policy: GapPolicy) -> Self {
        let state = EntityState::spawn(spawn, &loadout);
        let health = loadout.kit().max_health;
        Self {
            entity,
            loadout,
            state,
            next_tick: 0,
            last_input: None,
            gap_policy,
            health,
            recorder: None,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn state(&self) -> &EntityState {
        &self.state
    }

    /// The next tick the authority expects input for.
    pub fn next_tick(&self) -> u64 {
        self.next_tick
    }

    pub fn locomotion(&self) -> LocomotionState {
        self.state.locomotion
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Simulate every tick up to and including `input.tick`.
    ///
    /// Inputs older than the next expected tick are duplicates and ignored.
    /// Ticks skipped by the transport are filled with the gap policy first.
    pub fn receive_input(&mut self, input: Input) -> Vec<AuthorityTick> {
        if input.tick < self.next_tick {
            debug!(entity = %self.entity, tick = input.tick, expected = self.next_tick, "duplicate input ignored");
            return Vec::new();
        }
        let mut ticks = Vec::new();
        while self.next_tick < input.tick {
            let filled = self.gap_policy.fill(self.last_input.as_ref(), self.next_tick);
            debug!(entity = %self.entity, tick = self.next_tick, policy = ?self.gap_policy, "filling input gap");
            ticks.push(self.run(filled, true));
        }
        ticks.push(self.run(input, false));
        ticks
    }

    /// Record every simulated tick from now on.
    pub fn start_recording(&mut self, checkpoint_interval: u64) {
        self.recorder = Some(ReplayRecorder::new(
            self.loadout.kit().clone(),
            self.loadout.tick_dt(),
            Role::Authoritative,
            self.state,
            self.next_tick,
            checkpoint_interval,
        ));
    }

    /// Stop recording and return the log, if recording was on.
    pub fn finish_recording(&mut self) -> Option<ReplayLog> {
        self.recorder.take().map(ReplayRecorder::finish)
    }

    fn run(&mut self, input: Input, filled: bool) -> AuthorityTick {
        let tick = self.next_tick;
        if let Some(recorder) = &mut self.recorder {
            recorder.record_tick(tick, &input, &self.state);
        }
        let ctx = AbilityContext::new(tick, Role::Authoritative, &self.loadout);
        let out = simulate_tick(&self.state, &input, &ctx);
        self.state = out.state;
        self.last_input = Some(input);
        self.next_tick += 1;
        trace!(entity = %self.entity, tick, "authoritative tick");
        AuthorityTick {
            input,
            snapshot: AuthoritativeSnapshot::new(self.entity, tick, self.state),
            emissions: out.emissions,
            filled,
        }
    }

    /// Apply incoming damage and return the amount actually taken.
    ///
    /// Damage is scaled by the Defense stat and, while blocking, by the
    /// block ability's multiplier. Taking damage builds signature charge.
    pub fn take_damage(&mut self, amount: f64) -> f64 {
        if !self.is_alive() || amount <= 0.0 {
            return 0.0;
        }
        let mut taken = StatLedger::from_snapshot(&self.state.stats).get_stat(StatKind::Defense, amount);
        if self.state.locomotion == LocomotionState::Blocking {
            if let Some(AbilityKind::Block { damage_multiplier }) =
                self.loadout.descriptor(AbilitySlot::Block).map(|d| &d.kind)
            {
                taken *= damage_multiplier;
            }
        }
        self.health = (self.health - taken).max(0.0);
        let per_damage = self.loadout.kit().resources.signature.charge_per_damage_taken;
        self.add_signature_charge(taken * per_damage);
        debug!(entity = %self.entity, amount, taken, health = self.health, "took damage");
        taken
    }

    /// Credit damage this entity dealt towards its signature charge.
    pub fn on_damage_dealt(&mut self, amount: f64) {
        let per_damage = self.loadout.kit().resources.signature.charge_per_damage_dealt;
        self.add_signature_charge(amount * per_damage);
    }

    fn add_signature_charge(&mut self, gain: f64) {
        let max = self.loadout.kit().resources.signature.max_charge;
        let charge = &mut self.state.resources.signature_charge;
        *charge = (*charge + gain).min(max);
    }

    /// Stun for `ticks`, starting at the next simulated tick.
    pub fn apply_stun(&mut self, ticks: u64) {
        let ctx = AbilityContext::new(self.next_tick, Role::Authoritative, &self.loadout);
        step::apply_stun(&mut self.state, ticks, &ctx);
    }

    /// Force-end `target` if the entity is currently in it.
    pub fn force_end_state(&mut self, target: LocomotionState) -> bool {
        let ctx = AbilityContext::new(self.next_tick, Role::Authoritative, &self.loadout);
        step::force_end_state(&mut self.state, target, &ctx)
    }
}
