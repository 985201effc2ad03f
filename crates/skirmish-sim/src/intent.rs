//! Side-effect intents and cosmetic cues emitted by the simulation step.
//!
//! The step never touches another entity. Anything that would mutate the
//! shared world is described as a [`SideEffectIntent`] and handed to an
//! external collaborator, which executes it exactly once. Replay recomputes
//! state only and drops whatever it emits.

use serde::{Deserialize, Serialize};

use crate::ability::AbilitySlot;
use crate::math::Vec2;

/// A world-mutating request for an external collaborator to execute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SideEffectIntent {
    /// Check for targets overlapping an oriented box and damage them.
    MeleeHitCheck {
        center: Vec2,
        half_extents: Vec2,
        /// The box's local "up" axis.
        facing: Vec2,
        damage: f64,
    },
    /// Spawn a projectile travelling along `direction`.
    SpawnProjectile {
        origin: Vec2,
        direction: Vec2,
        speed: f64,
        damage: f64,
    },
    /// Spawn a damage zone that ticks every `interval_secs`.
    SpawnZone {
        center: Vec2,
        facing: Vec2,
        damage_per_interval: f64,
        duration_secs: f64,
        interval_secs: f64,
    },
    /// Spawn a short-lived collider.
    SpawnCollider { center: Vec2, facing: Vec2 },
}

/// An intent tagged with the tick and ability that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideEffect {
    pub tick: u64,
    pub slot: AbilitySlot,
    pub intent: SideEffectIntent,
}

/// Cosmetic notification of an ability activation.
///
/// Consumed by visual/audio spawners; nothing ever flows back from a cue
/// into the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AbilityCue {
    pub tick: u64,
    pub slot: AbilitySlot,
    /// [`AbilityKind::label`](crate::ability::AbilityKind::label) of the ability.
    pub kind: &'static str,
    pub aim_direction: Vec2,
    pub cooldown_secs: f64,
}

/// Everything one step emitted, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Emissions {
    pub effects: Vec<SideEffect>,
    pub cues: Vec<AbilityCue>,
}

impl Emissions {
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.cues.is_empty()
    }

    /// Drop everything emitted so far.
    pub fn clear(&mut self) {
        self.effects.clear();
        self.cues.clear();
    }
}
