//! Per-tick player commands.
//!
//! An [`Input`] is everything the simulation step is allowed to know about the
//! player for one tick. Once recorded into a history buffer it is never
//! mutated; the authority receives exactly the same value over the transport.

use serde::{Deserialize, Serialize};

use crate::ability::AbilitySlot;
use crate::math::Vec2;

/// The fixed set of boolean action flags carried by every [`Input`].
///
/// `dash`, `melee`, `primary` and `signature` are one-shot presses (edge
/// triggered by the input collector). `block` and `projectile` are held
/// buttons that are re-sampled every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionFlags {
    pub dash: bool,
    pub melee: bool,
    pub primary: bool,
    pub signature: bool,
    /// Hold-to-fire projectile button.
    pub projectile: bool,
    pub block: bool,
}

impl ActionFlags {
    /// Whether no flag is set.
    pub fn is_empty(&self) -> bool {
        *self == ActionFlags::default()
    }

    /// The flag bound to `slot`.
    pub fn pressed(&self, slot: AbilitySlot) -> bool {
        match slot {
            AbilitySlot::Dash => self.dash,
            AbilitySlot::Block => self.block,
            AbilitySlot::Melee => self.melee,
            AbilitySlot::Projectile => self.projectile,
            AbilitySlot::Primary => self.primary,
            AbilitySlot::Signature => self.signature,
        }
    }

    /// Set the flag bound to `slot`.
    pub fn press(&mut self, slot: AbilitySlot) {
        match slot {
            AbilitySlot::Dash => self.dash = true,
            AbilitySlot::Block => self.block = true,
            AbilitySlot::Melee => self.melee = true,
            AbilitySlot::Projectile => self.projectile = true,
            AbilitySlot::Primary => self.primary = true,
            AbilitySlot::Signature => self.signature = true,
        }
    }

    /// Clear the flag bound to `slot`.
    pub fn release(&mut self, slot: AbilitySlot) {
        match slot {
            AbilitySlot::Dash => self.dash = false,
            AbilitySlot::Block => self.block = false,
            AbilitySlot::Melee => self.melee = false,
            AbilitySlot::Projectile => self.projectile = false,
            AbilitySlot::Primary => self.primary = false,
            AbilitySlot::Signature => self.signature = false,
        }
    }

    /// Clear every flag whose slot `keep` rejects.
    pub fn retain(&mut self, keep: impl Fn(AbilitySlot) -> bool) {
        for slot in AbilitySlot::ALL {
            if !keep(slot) {
                self.release(slot);
            }
        }
    }

    /// Keep only the held flags, dropping one-shot presses.
    ///
    /// Used when a missing tick is reconstructed from the previous input: a
    /// press that was already executed must not fire a second time.
    pub fn held_only(&self) -> ActionFlags {
        ActionFlags {
            block: self.block,
            projectile: self.projectile,
            ..ActionFlags::default()
        }
    }
}

/// One tick's command from a player.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Input {
    /// The tick this input was produced for.
    pub tick: u64,
    /// Desired movement direction. Normalized by convention; zero means idle.
    pub movement: Vec2,
    /// World-space aim point.
    pub aim: Vec2,
    /// Action buttons.
    pub actions: ActionFlags,
}

impl Input {
    /// A neutral input (no movement, no actions) for `tick`, aiming at `aim`.
    pub fn neutral(tick: u64, aim: Vec2) -> Self {
        Self {
            tick,
            movement: Vec2::ZERO,
            aim,
            actions: ActionFlags::default(),
        }
    }

    /// Builder-style helper: set the movement direction.
    pub fn with_movement(mut self, movement: Vec2) -> Self {
        self.movement = movement;
        self
    }

    /// Builder-style helper: set the aim point.
    pub fn with_aim(mut self, aim: Vec2) -> Self {
        self.aim = aim;
        self
    }

    /// Builder-style helper: replace the action flags.
    pub fn with_actions(mut self, actions: ActionFlags) -> Self {
        self.actions = actions;
        self
    }

    /// The same command re-stamped for another tick.
    pub fn retick(mut self, tick: u64) -> Self {
        self.tick = tick;
        self
    }
}
