//! Ability Catalog: static, per-archetype ability configuration.
//!
//! Abilities are a closed set of tagged variants ([`AbilityKind`]) wrapped in
//! an [`AbilityDescriptor`] that carries the timing and movement rules common
//! to every kind. Descriptors are authored in seconds and immutable once a
//! [`Kit`](crate::kit::Kit) is loaded; their tick-domain counterparts live in
//! [`SlotTicks`](crate::kit::SlotTicks).

use serde::{Deserialize, Serialize};

use crate::locomotion::LocomotionState;
use crate::math::Vec2;
use crate::stats::{Budget, StatKind};

// ---------------------------------------------------------------------------
// AbilitySlot
// ---------------------------------------------------------------------------

/// The ability identifier within a kit. Each slot is bound to one input flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbilitySlot {
    Dash,
    Block,
    Melee,
    Projectile,
    Primary,
    Signature,
}

impl AbilitySlot {
    /// Number of slots.
    pub const COUNT: usize = 6;

    /// All slots, in the priority order used when several flags are pressed
    /// on the same tick from [`LocomotionState::Normal`].
    pub const ALL: [AbilitySlot; AbilitySlot::COUNT] = [
        AbilitySlot::Dash,
        AbilitySlot::Block,
        AbilitySlot::Melee,
        AbilitySlot::Projectile,
        AbilitySlot::Primary,
        AbilitySlot::Signature,
    ];

    /// Dense index for table lookups.
    pub const fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// AbilityKind
// ---------------------------------------------------------------------------

/// What an ability does when it activates (and, for multi-tick kinds, while
/// it runs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Burst of speed along the movement direction (or facing), decaying
    /// linearly to zero over the descriptor's duration.
    Dash { speed: f64 },
    /// Hold to block. Incoming damage is scaled by `damage_multiplier`.
    Block { damage_multiplier: f64 },
    /// Box hit-check in front of the entity.
    Melee {
        damage: f64,
        /// Distance from the entity centre to the hitbox centre along facing.
        offset: f64,
        /// Half-width / half-height of the hitbox.
        half_extents: Vec2,
    },
    /// Hold to fire. Each shot is gated by the descriptor cooldown (the fire
    /// interval) and consumes one [`StatKind::RangedDamage`] charge.
    RangedHold { projectile_speed: f64, damage: f64 },
    /// A single projectile fired on activation.
    Projectile { projectile_speed: f64, damage: f64 },
    /// `count` projectiles, one every `interval_secs`, starting on activation.
    ProjectileBurst {
        projectile_speed: f64,
        damage: f64,
        count: u32,
        interval_secs: f64,
    },
    /// Adds a stat modifier; the cooldown starts when the modifier expires.
    StatBoost {
        stat: StatKind,
        multiplier: f64,
        charges: Budget,
        /// Modifier lifetime in seconds; `None` lasts until charges run out.
        duration_secs: Option<f64>,
    },
    /// Requests a damage zone, optionally placed at the aim point.
    SpawnZone {
        damage_per_interval: f64,
        zone_duration_secs: f64,
        damage_interval_secs: f64,
        at_aim: bool,
        max_range: f64,
    },
    /// Requests a short-lived collider in front of the entity.
    ColliderBurst { offset: f64 },
}

impl AbilityKind {
    /// The locomotion state this kind must target, if it is fixed.
    pub fn required_state(&self) -> Option<LocomotionState> {
        match self {
            AbilityKind::Dash { .. } => Some(LocomotionState::Dashing),
            AbilityKind::Block { .. } => Some(LocomotionState::Blocking),
            AbilityKind::RangedHold { .. } => Some(LocomotionState::Firing),
            _ => None,
        }
    }

    /// Whether this kind's cooldown is driven by a stat modifier expiring.
    pub fn is_stat_gated(&self) -> bool {
        matches!(self, AbilityKind::StatBoost { .. })
    }

    /// Whether activation skips the cooldown check. Hold-to-fire abilities
    /// use their cooldown to pace shots, not to gate entering the state.
    pub fn bypasses_activation_cooldown(&self) -> bool {
        matches!(self, AbilityKind::RangedHold { .. })
    }

    /// Short label for logs and cues.
    pub fn label(&self) -> &'static str {
        match self {
            AbilityKind::Dash { .. } => "dash",
            AbilityKind::Block { .. } => "block",
            AbilityKind::Melee { .. } => "melee",
            AbilityKind::RangedHold { .. } => "ranged_hold",
            AbilityKind::Projectile { .. } => "projectile",
            AbilityKind::ProjectileBurst { .. } => "projectile_burst",
            AbilityKind::StatBoost { .. } => "stat_boost",
            AbilityKind::SpawnZone { .. } => "spawn_zone",
            AbilityKind::ColliderBurst { .. } => "collider_burst",
        }
    }
}

// ---------------------------------------------------------------------------
// AbilityDescriptor
// ---------------------------------------------------------------------------

/// Static configuration of one ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDescriptor {
    /// Cooldown in seconds (converted to ticks, rounding up).
    pub cooldown_secs: f64,
    /// How long the target state lasts. Zero ends the ability on the
    /// activation tick. Ignored by holdable abilities.
    #[serde(default)]
    pub duration_secs: f64,
    /// Brake to a halt while this ability is active.
    #[serde(default)]
    pub locks_movement: bool,
    /// Keep turning towards the aim point while active.
    #[serde(default = "default_true")]
    pub allows_rotation: bool,
    /// Extra movement-speed factor while active.
    #[serde(default = "default_one")]
    pub move_speed_multiplier: f64,
    /// Start the cooldown when the ability ends instead of on activation.
    #[serde(default)]
    pub cooldown_on_end: bool,
    /// Locomotion state entered on activation.
    pub target_state: LocomotionState,
    /// Behaviour.
    pub kind: AbilityKind,
}

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

impl AbilityDescriptor {
    /// A descriptor with neutral movement rules for `kind`, targeting
    /// `target_state`.
    pub fn new(kind: AbilityKind, target_state: LocomotionState, cooldown_secs: f64) -> Self {
        Self {
            cooldown_secs,
            duration_secs: 0.0,
            locks_movement: false,
            allows_rotation: true,
            move_speed_multiplier: 1.0,
            cooldown_on_end: false,
            target_state,
            kind,
        }
    }

    /// Builder-style helper: set the active duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Builder-style helper: brake to a halt while active.
    pub fn locking_movement(mut self) -> Self {
        self.locks_movement = true;
        self
    }

    /// Builder-style helper: forbid turning while active.
    pub fn without_rotation(mut self) -> Self {
        self.allows_rotation = false;
        self
    }

    /// Builder-style helper: start the cooldown when the ability ends.
    pub fn cooldown_from_end(mut self) -> Self {
        self.cooldown_on_end = true;
        self
    }

    /// Builder-style helper: movement-speed factor while active.
    pub fn with_move_multiplier(mut self, multiplier: f64) -> Self {
        self.move_speed_multiplier = multiplier;
        self
    }
}
