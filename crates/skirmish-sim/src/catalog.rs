//! Ability evaluation: activation gates, per-kind effects, multi-tick
//! progress and ability end.
//!
//! Every kind is a variant of [`AbilityKind`]; its behaviour is a match arm
//! here rather than an object with virtual hooks. Multi-tick abilities keep
//! their progress in [`Activity`] and are advanced once per tick.

use tracing::debug;

use crate::ability::{AbilityDescriptor, AbilityKind, AbilitySlot};
use crate::input::Input;
use crate::intent::{AbilityCue, SideEffect, SideEffectIntent};
use crate::locomotion::{can_transition, LocomotionState};
use crate::state::{Activity, EntityState};
use crate::step::{AbilityContext, TickFrame};
use crate::stats::{Budget, StatKind};

/// Whether `slot` would be accepted if its flag were pressed on the next
/// step from `state`.
///
/// Applies the same gates the step does: the slot must be reachable from
/// the current locomotion state, off cooldown, not waiting on a stat, and
/// (for the signature slot) fully charged.
pub fn activation_allowed(state: &EntityState, slot: AbilitySlot, ctx: &AbilityContext<'_>) -> bool {
    let reachable = match state.locomotion {
        LocomotionState::Normal => true,
        LocomotionState::Blocking | LocomotionState::Firing => slot == AbilitySlot::Dash,
        _ => false,
    };
    reachable && passes_gates(state, slot, ctx)
}

fn passes_gates(state: &EntityState, slot: AbilitySlot, ctx: &AbilityContext<'_>) -> bool {
    let Some(desc) = ctx.loadout.descriptor(slot) else {
        return false;
    };
    if !can_transition(
        state.locomotion,
        desc.target_state,
        state.resources.block_available,
    ) {
        return false;
    }
    if !desc.kind.bypasses_activation_cooldown()
        && state.cooldowns.is_on_cooldown(slot, ctx.tick, ctx.role)
    {
        return false;
    }
    if state.stat_waits.contains(&Some(slot)) {
        return false;
    }
    if slot == AbilitySlot::Signature
        && state.resources.signature_charge < ctx.loadout.kit().resources.signature.max_charge
    {
        return false;
    }
    true
}

impl<'a> TickFrame<'a> {
    /// Step phase 2.
    pub(crate) fn evaluate_abilities(&mut self, input: &Input) {
        let flags = input.actions;
        match self.state.locomotion {
            // Pressed slots are tried in priority order; the first accepted wins
            // and rejected presses leave no trace.
            LocomotionState::Normal => {
                for slot in AbilitySlot::ALL {
                    if flags.pressed(slot) && self.try_activate(slot, input) {
                        break;
                    }
                }
            }
            LocomotionState::Blocking => {
                if flags.dash && self.try_activate(AbilitySlot::Dash, input) {
                    return;
                }
                if !flags.block {
                    self.end_current();
                }
            }
            LocomotionState::Firing => {
                if flags.dash && self.try_activate(AbilitySlot::Dash, input) {
                    return;
                }
                match self.state.activity {
                    Some(activity) if flags.pressed(activity.slot) => self.fire_held(activity.slot),
                    _ => self.end_current(),
                }
            }
            LocomotionState::Stunned => {
                if self.state.stun_until.map_or(true, |until| self.ctx.tick >= until) {
                    self.end_current();
                }
            }
            LocomotionState::Attacking
            | LocomotionState::Dashing
            | LocomotionState::UsingPrimaryAbility
            | LocomotionState::UsingSignatureAbility => self.advance_timed(),
        }
    }

    /// Activate `slot` if every gate passes.
    fn try_activate(&mut self, slot: AbilitySlot, input: &Input) -> bool {
        let loadout = self.ctx.loadout;
        let tick = self.ctx.tick;
        if !passes_gates(&self.state, slot, &self.ctx) {
            debug!(tick, ?slot, state = ?self.state.locomotion, "activation rejected");
            return false;
        }
        let Some(desc) = loadout.descriptor(slot) else {
            return false;
        };
        let target = desc.target_state;

        if self.state.locomotion.is_holdable() && self.state.locomotion != target {
            self.end_current();
        }

        self.state.locomotion = target;
        self.state.activity = Some(Activity {
            slot,
            started_tick: tick,
            shots_fired: 0,
        });
        self.out.cues.push(AbilityCue {
            tick,
            slot,
            kind: desc.kind.label(),
            aim_direction: self.state.facing,
            cooldown_secs: desc.cooldown_secs,
        });
        debug!(tick, ?slot, kind = desc.kind.label(), ?target, "ability activated");

        self.apply_activation(slot, desc, input);

        if !desc.cooldown_on_end
            && !desc.kind.is_stat_gated()
            && !desc.kind.bypasses_activation_cooldown()
        {
            self.state.cooldowns.set(slot, tick, loadout.ticks(slot).cooldown);
        }

        if target == LocomotionState::Normal || (!target.is_holdable() && self.timed_finished()) {
            self.end_current();
        }
        true
    }

    /// Kind-specific effects on the activation tick.
    fn apply_activation(&mut self, slot: AbilitySlot, desc: &AbilityDescriptor, input: &Input) {
        let tick = self.ctx.tick;
        let position = self.state.position;
        let facing = self.state.facing;

        match desc.kind {
            AbilityKind::Dash { .. } => {
                self.state.dash_direction = if input.movement.is_zero() {
                    facing
                } else {
                    input.movement.normalized()
                };
            }
            AbilityKind::Block { .. } => {}
            AbilityKind::Melee {
                damage,
                offset,
                half_extents,
            } => {
                let damage = self.ledger.get_stat(StatKind::Damage, damage);
                self.emit(
                    slot,
                    SideEffectIntent::MeleeHitCheck {
                        center: position + facing * offset,
                        half_extents,
                        facing,
                        damage,
                    },
                );
                self.consume_charge(StatKind::Damage);
            }
            AbilityKind::RangedHold { .. } => self.fire_held(slot),
            AbilityKind::Projectile {
                projectile_speed,
                damage,
            } => self.fire_projectile(slot, projectile_speed, damage),
            AbilityKind::ProjectileBurst { .. } => self.fire_due_burst_shots(),
            AbilityKind::StatBoost {
                stat,
                multiplier,
                charges,
                ..
            } => {
                let duration = match self.ctx.loadout.ticks(slot).modifier_duration {
                    Some(ticks) => Budget::Finite(u32::try_from(ticks).unwrap_or(u32::MAX)),
                    None => Budget::Infinite,
                };
                if self.ledger.add_modifier(stat, multiplier, charges, duration) {
                    self.state.stat_waits[stat.index()] = Some(slot);
                } else {
                    // Nothing to wait on; fall back to a plain cooldown.
                    let cooldown = self.ctx.loadout.ticks(slot).cooldown;
                    self.state.cooldowns.set(slot, tick, cooldown);
                }
            }
            AbilityKind::SpawnZone {
                damage_per_interval,
                zone_duration_secs,
                damage_interval_secs,
                at_aim,
                max_range,
            } => {
                let center = if at_aim && input.aim.is_finite() {
                    position + (input.aim - position).clamp_length(max_range)
                } else {
                    position
                };
                self.emit(
                    slot,
                    SideEffectIntent::SpawnZone {
                        center,
                        facing,
                        damage_per_interval,
                        duration_secs: zone_duration_secs,
                        interval_secs: damage_interval_secs,
                    },
                );
            }
            AbilityKind::ColliderBurst { offset } => {
                self.emit(
                    slot,
                    SideEffectIntent::SpawnCollider {
                        center: position + facing * offset,
                        facing,
                    },
                );
            }
        }
    }

    /// Advance a locked, timed ability and end it once its duration has
    /// elapsed and every burst shot is out.
    fn advance_timed(&mut self) {
        if self.state.activity.is_none() {
            self.end_current();
            return;
        }
        self.fire_due_burst_shots();
        if self.timed_finished() {
            self.end_current();
        }
    }

    fn timed_finished(&self) -> bool {
        let Some(activity) = self.state.activity else {
            return true;
        };
        let Some(desc) = self.active_descriptor() else {
            return true;
        };
        let shots_done = match desc.kind {
            AbilityKind::ProjectileBurst { count, .. } => activity.shots_fired >= count,
            _ => true,
        };
        activity.elapsed(self.ctx.tick) >= self.ctx.loadout.ticks(activity.slot).duration && shots_done
    }

    fn fire_due_burst_shots(&mut self) {
        let Some(desc) = self.active_descriptor() else {
            return;
        };
        let AbilityKind::ProjectileBurst {
            projectile_speed,
            damage,
            count,
            ..
        } = desc.kind
        else {
            return;
        };
        while let Some(mut activity) = self.state.activity {
            let due = self.ctx.loadout.ticks(activity.slot).interval * u64::from(activity.shots_fired);
            if activity.shots_fired >= count || activity.elapsed(self.ctx.tick) < due {
                break;
            }
            activity.shots_fired += 1;
            self.state.activity = Some(activity);
            self.fire_projectile(activity.slot, projectile_speed, damage);
        }
    }

    /// Hold-to-fire: one shot whenever the shot interval has elapsed.
    ///
    /// Shot pacing compares against the stored ready tick directly, so both
    /// roles fire on the same ticks.
    fn fire_held(&mut self, slot: AbilitySlot) {
        let Some(AbilityKind::RangedHold {
            projectile_speed,
            damage,
        }) = self.ctx.loadout.descriptor(slot).map(|d| &d.kind)
        else {
            return;
        };
        let (projectile_speed, damage) = (*projectile_speed, *damage);
        let tick = self.ctx.tick;
        if self.state.cooldowns.remaining(slot, tick) > 0 {
            return;
        }
        self.state.cooldowns.set(slot, tick, self.ctx.loadout.ticks(slot).cooldown);
        self.fire_projectile(slot, projectile_speed, damage);
    }

    fn fire_projectile(&mut self, slot: AbilitySlot, speed: f64, damage: f64) {
        let damage = self.ledger.get_stat(StatKind::RangedDamage, damage);
        self.emit(
            slot,
            SideEffectIntent::SpawnProjectile {
                origin: self.state.position,
                direction: self.state.facing,
                speed,
                damage,
            },
        );
        self.consume_charge(StatKind::RangedDamage);
    }

    fn consume_charge(&mut self, kind: StatKind) {
        let expired = self.ledger.consume_charge(kind);
        if !expired.is_empty() {
            self.on_stats_expired(&expired);
        }
    }

    fn emit(&mut self, slot: AbilitySlot, intent: SideEffectIntent) {
        self.out.effects.push(SideEffect {
            tick: self.ctx.tick,
            slot,
            intent,
        });
    }

    /// End whatever is running and return to `Normal`.
    pub(crate) fn end_current(&mut self) {
        if let Some(activity) = self.state.activity.take() {
            if let Some(desc) = self.ctx.loadout.descriptor(activity.slot) {
                if desc.cooldown_on_end && !desc.kind.is_stat_gated() {
                    let cooldown = self.ctx.loadout.ticks(activity.slot).cooldown;
                    self.state.cooldowns.set(activity.slot, self.ctx.tick, cooldown);
                }
            }
            if activity.slot == AbilitySlot::Signature {
                self.state.resources.signature_charge = 0.0;
            }
            debug!(tick = self.ctx.tick, slot = ?activity.slot, "ability ended");
        }
        self.state.stun_until = None;
        self.state.locomotion = LocomotionState::Normal;
    }
}
