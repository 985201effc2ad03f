//! The Simulation Step: `(EntityState, Input, AbilityContext) -> EntityState`.
//!
//! One step runs a fixed sequence of sub-systems over a [`TickFrame`], the
//! single working context they all read and write:
//!
//! 1. orient towards the aim point
//! 2. evaluate abilities (may change locomotion, cooldowns and emit intents)
//! 3. compute velocity
//! 4. advance the stat ledger
//! 5. update resource pools
//!
//! Position is not integrated here; [`simulate_tick`] does step plus
//! integration and is what every forward run and every replay calls.

use tracing::{debug, trace};

use crate::ability::{AbilityDescriptor, AbilityKind};
use crate::cooldown::Role;
use crate::input::Input;
use crate::intent::Emissions;
use crate::kit::Loadout;
use crate::locomotion::LocomotionState;
use crate::math::Vec2;
use crate::movement::{integrate_velocity, MovementMode, MovementParams};
use crate::state::EntityState;
use crate::stats::{StatKind, StatLedger};

/// Aim points closer than this to the entity do not turn it.
pub const ROTATION_DEAD_ZONE: f64 = 0.3;

/// Everything the step needs besides the previous state and the input.
#[derive(Debug, Clone, Copy)]
pub struct AbilityContext<'a> {
    /// The tick being simulated.
    pub tick: u64,
    pub role: Role,
    pub loadout: &'a Loadout,
}

impl<'a> AbilityContext<'a> {
    pub fn new(tick: u64, role: Role, loadout: &'a Loadout) -> Self {
        Self {
            tick,
            role,
            loadout,
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub state: EntityState,
    pub emissions: Emissions,
}

// ---------------------------------------------------------------------------
// TickFrame
// ---------------------------------------------------------------------------

/// Working context for one tick. Sub-systems receive it by `&mut` and touch
/// only their own fields.
pub(crate) struct TickFrame<'a> {
    pub(crate) ctx: AbilityContext<'a>,
    pub(crate) state: EntityState,
    pub(crate) ledger: StatLedger,
    pub(crate) out: Emissions,
}

impl<'a> TickFrame<'a> {
    pub(crate) fn new(prev: &EntityState, ctx: AbilityContext<'a>) -> Self {
        Self {
            ctx,
            state: *prev,
            ledger: StatLedger::from_snapshot(&prev.stats),
            out: Emissions::default(),
        }
    }

    pub(crate) fn finish(mut self) -> StepOutput {
        self.state.stats = self.ledger.snapshot();
        StepOutput {
            state: self.state,
            emissions: self.out,
        }
    }

    /// Descriptor of the ability currently running, if any.
    pub(crate) fn active_descriptor(&self) -> Option<&'a AbilityDescriptor> {
        let loadout = self.ctx.loadout;
        self.state
            .activity
            .and_then(|activity| loadout.descriptor(activity.slot))
    }

    /// Start the cooldown of every stat-gated ability waiting on one of
    /// the `expired` stats.
    pub(crate) fn on_stats_expired(&mut self, expired: &[StatKind]) {
        for kind in expired {
            if let Some(slot) = self.state.stat_waits[kind.index()].take() {
                let cooldown = self.ctx.loadout.ticks(slot).cooldown;
                self.state.cooldowns.set(slot, self.ctx.tick, cooldown);
                debug!(tick = self.ctx.tick, ?slot, ?kind, "stat expired, cooldown started");
            }
        }
    }

    fn orient(&mut self, aim: Vec2) {
        if self.state.locomotion.freezes_facing() {
            return;
        }
        if self.active_descriptor().is_some_and(|d| !d.allows_rotation) {
            return;
        }
        let to_aim = aim - self.state.position;
        if !to_aim.is_finite() || to_aim.length() <= ROTATION_DEAD_ZONE {
            return;
        }
        self.state.facing = to_aim.normalized();
    }

    fn update_velocity(&mut self, input: &Input) {
        let loadout = self.ctx.loadout;
        let kit = loadout.kit();
        let locomotion = self.state.locomotion;
        let active = self.active_descriptor();

        let mode = if locomotion.halts_movement() || active.is_some_and(|d| d.locks_movement) {
            MovementMode::Halt
        } else if locomotion == LocomotionState::Dashing {
            match (self.state.activity, active.map(|d| &d.kind)) {
                (Some(activity), Some(AbilityKind::Dash { speed })) => MovementMode::Dash {
                    direction: self.state.dash_direction,
                    speed: *speed,
                    elapsed: activity.elapsed(self.ctx.tick),
                    duration: loadout.ticks(activity.slot).duration,
                },
                _ => MovementMode::Halt,
            }
        } else {
            let ability_factor = active.map_or(1.0, |d| d.move_speed_multiplier);
            let speed_factor = kit.state_speed.for_state(locomotion)
                * ability_factor
                * self.ledger.get_stat(StatKind::MoveSpeed, 1.0);
            MovementMode::Walk { speed_factor }
        };

        let params = MovementParams {
            base_speed: kit.move_speed,
            acceleration: kit.acceleration,
        };
        self.state.velocity = integrate_velocity(
            self.state.velocity,
            mode,
            input.movement,
            params,
            loadout.tick_dt(),
        );
    }

    fn tick_stats(&mut self) {
        let expired = self.ledger.tick();
        if !expired.is_empty() {
            self.on_stats_expired(&expired);
        }
    }

    fn update_resources(&mut self) {
        let loadout = self.ctx.loadout;
        let config = &loadout.kit().resources;
        let res = &mut self.state.resources;

        if self.state.locomotion == LocomotionState::Blocking {
            res.block_charge = (res.block_charge - loadout.block_drain_per_tick()).max(0.0);
            if res.block_charge <= 0.0 {
                res.block_available = false;
                debug!(tick = self.ctx.tick, "block charge depleted");
                self.force_end(LocomotionState::Blocking);
            }
        } else {
            res.block_charge =
                (res.block_charge + loadout.block_recharge_per_tick()).min(config.block.max_charge);
            if !res.block_available && res.block_charge >= config.block.max_charge {
                res.block_available = true;
            }
        }

        let res = &mut self.state.resources;
        res.signature_charge = (res.signature_charge + loadout.signature_gain_per_tick())
            .min(config.signature.max_charge);
    }

    /// End the current state if it is `target`. Only non-`Normal` states
    /// can be force-ended.
    pub(crate) fn force_end(&mut self, target: LocomotionState) -> bool {
        if target == LocomotionState::Normal || self.state.locomotion != target {
            debug!(
                tick = self.ctx.tick,
                ?target,
                current = ?self.state.locomotion,
                "force end rejected"
            );
            return false;
        }
        self.end_current();
        true
    }
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Run one tick of the simulation without moving the entity.
///
/// The returned state carries the new velocity; its position is still the
/// previous one.
pub fn step(prev: &EntityState, input: &Input, ctx: &AbilityContext<'_>) -> StepOutput {
    let mut frame = TickFrame::new(prev, *ctx);
    frame.orient(input.aim);
    frame.evaluate_abilities(input);
    frame.update_velocity(input);
    frame.tick_stats();
    frame.update_resources();

    trace!(
        tick = ctx.tick,
        locomotion = ?frame.state.locomotion,
        vx = frame.state.velocity.x,
        vy = frame.state.velocity.y,
        "step"
    );
    frame.finish()
}

/// [`step`] followed by position integration over one tick.
pub fn simulate_tick(prev: &EntityState, input: &Input, ctx: &AbilityContext<'_>) -> StepOutput {
    let mut out = step(prev, input, ctx);
    out.state.integrate_position(ctx.loadout.tick_dt());
    out
}

/// End `target` on `state` from outside the step (e.g. a forcing event on
/// the authority).
///
/// Returns `false` and changes nothing unless the entity is currently in
/// `target`.
pub fn force_end_state(
    state: &mut EntityState,
    target: LocomotionState,
    ctx: &AbilityContext<'_>,
) -> bool {
    let mut frame = TickFrame::new(state, *ctx);
    let ended = frame.force_end(target);
    if ended {
        *state = frame.finish().state;
    }
    ended
}

/// Stun `state` for `duration` ticks starting at `ctx.tick`, ending whatever
/// ability was running.
pub fn apply_stun(state: &mut EntityState, duration: u64, ctx: &AbilityContext<'_>) {
    if duration == 0 {
        return;
    }
    let mut frame = TickFrame::new(state, *ctx);
    if frame.state.locomotion != LocomotionState::Normal {
        frame.end_current();
    }
    frame.state.locomotion = LocomotionState::Stunned;
    frame.state.stun_until = Some(ctx.tick + duration);
    debug!(tick = ctx.tick, duration, "stunned");
    *state = frame.finish().state;
}
