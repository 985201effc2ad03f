//! Kits (per-archetype loadouts) and their tick-rate binding.
//!
//! A [`Kit`] is authored data: speeds in units per second, durations in
//! seconds, one optional [`AbilityDescriptor`] per [`AbilitySlot`]. It is
//! validated once and then bound to a tick duration, producing a
//! [`Loadout`] whose timing is expressed in whole ticks. Loadouts are
//! immutable and shared by reference (`Arc<Loadout>`) between every entity of
//! the same archetype.
//!
//! ```
//! use skirmish_sim::kit::Kit;
//!
//! let kit = Kit::brawler();
//! let loadout = kit.bind(1.0 / 60.0).unwrap();
//! assert_eq!(loadout.ticks(skirmish_sim::ability::AbilitySlot::Melee).cooldown, 30);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ability::{AbilityDescriptor, AbilityKind, AbilitySlot};
use crate::locomotion::LocomotionState;
use crate::math::{secs_to_ticks, Vec2};
use crate::stats::{Budget, StatKind};
use crate::SimError;

// ---------------------------------------------------------------------------
// Authored data
// ---------------------------------------------------------------------------

/// Per-state movement-speed factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpeed {
    pub normal: f64,
    pub attacking: f64,
    pub blocking: f64,
    pub firing: f64,
}

impl Default for StateSpeed {
    fn default() -> Self {
        Self {
            normal: 1.0,
            attacking: 1.0,
            blocking: 0.5,
            firing: 0.7,
        }
    }
}

impl StateSpeed {
    /// Factor for `state`. States that halt movement report zero.
    pub fn for_state(&self, state: LocomotionState) -> f64 {
        match state {
            LocomotionState::Normal => self.normal,
            LocomotionState::Attacking => self.attacking,
            LocomotionState::Blocking => self.blocking,
            LocomotionState::Firing => self.firing,
            _ => 0.0,
        }
    }
}

/// Block resource: drains while blocking, recharges otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockCharge {
    pub max_charge: f64,
    pub charge_per_sec: f64,
    pub discharge_per_sec: f64,
}

/// Signature resource: the signature ability needs a full charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureCharge {
    pub max_charge: f64,
    pub charge_per_sec: f64,
    pub charge_per_damage_dealt: f64,
    pub charge_per_damage_taken: f64,
}

/// Resource pool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub block: BlockCharge,
    pub signature: SignatureCharge,
}

/// A per-archetype loadout as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kit {
    pub name: String,
    pub max_health: f64,
    /// Base movement speed in units per second.
    pub move_speed: f64,
    /// Acceleration towards the target velocity, in units per second squared.
    pub acceleration: f64,
    #[serde(default)]
    pub state_speed: StateSpeed,
    pub resources: ResourceConfig,
    pub abilities: BTreeMap<AbilitySlot, AbilityDescriptor>,
}

// ---------------------------------------------------------------------------
// Bound (tick-domain) data
// ---------------------------------------------------------------------------

/// Tick-domain timing of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotTicks {
    pub cooldown: u64,
    pub duration: u64,
    /// Ticks between burst shots (ProjectileBurst only).
    pub interval: u64,
    /// Lifetime of the modifier added by a StatBoost.
    pub modifier_duration: Option<u64>,
}

/// A [`Kit`] bound to a tick duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Loadout {
    kit: Kit,
    tick_dt: f64,
    slots: [Option<SlotTicks>; AbilitySlot::COUNT],
}

impl Loadout {
    /// The authored kit.
    pub fn kit(&self) -> &Kit {
        &self.kit
    }

    /// Tick duration in seconds this loadout was bound to.
    pub fn tick_dt(&self) -> f64 {
        self.tick_dt
    }

    /// The descriptor in `slot`, if the kit fills it.
    pub fn descriptor(&self, slot: AbilitySlot) -> Option<&AbilityDescriptor> {
        self.kit.abilities.get(&slot)
    }

    /// Tick timing for `slot`. Empty slots report all zeros.
    pub fn ticks(&self, slot: AbilitySlot) -> SlotTicks {
        self.slots[slot.index()].unwrap_or_default()
    }

    /// Per-tick block charge gain while not blocking.
    pub fn block_recharge_per_tick(&self) -> f64 {
        self.kit.resources.block.charge_per_sec * self.tick_dt
    }

    /// Per-tick block charge loss while blocking.
    pub fn block_drain_per_tick(&self) -> f64 {
        self.kit.resources.block.discharge_per_sec * self.tick_dt
    }

    /// Per-tick passive signature charge gain.
    pub fn signature_gain_per_tick(&self) -> f64 {
        self.kit.resources.signature.charge_per_sec * self.tick_dt
    }
}

// ---------------------------------------------------------------------------
// Kit impl
// ---------------------------------------------------------------------------

impl Kit {
    /// Parse and validate a kit from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::KitParse`] for malformed JSON and
    /// [`SimError::InvalidKit`] if the kit fails [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let kit: Kit = serde_json::from_str(json)?;
        kit.validate()?;
        Ok(kit)
    }

    /// Check that every number is finite and in range and that each slot
    /// holds a kind that fits it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidKit`] describing the first problem found.
    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |reason: String| SimError::InvalidKit {
            kit: self.name.clone(),
            reason,
        };

        non_negative("move_speed", self.move_speed).map_err(&invalid)?;
        positive("acceleration", self.acceleration).map_err(&invalid)?;
        positive("max_health", self.max_health).map_err(&invalid)?;
        for (label, v) in [
            ("state_speed.normal", self.state_speed.normal),
            ("state_speed.attacking", self.state_speed.attacking),
            ("state_speed.blocking", self.state_speed.blocking),
            ("state_speed.firing", self.state_speed.firing),
            ("block.charge_per_sec", self.resources.block.charge_per_sec),
            ("block.discharge_per_sec", self.resources.block.discharge_per_sec),
            ("signature.charge_per_sec", self.resources.signature.charge_per_sec),
            ("signature.charge_per_damage_dealt", self.resources.signature.charge_per_damage_dealt),
            ("signature.charge_per_damage_taken", self.resources.signature.charge_per_damage_taken),
        ] {
            non_negative(label, v).map_err(&invalid)?;
        }
        positive("block.max_charge", self.resources.block.max_charge).map_err(&invalid)?;
        positive("signature.max_charge", self.resources.signature.max_charge).map_err(&invalid)?;

        // Each stat holds at most one pending cooldown.
        let mut gated: [Option<AbilitySlot>; StatKind::COUNT] = [None; StatKind::COUNT];
        for (slot, desc) in &self.abilities {
            validate_descriptor(*slot, desc)
                .map_err(|reason| invalid(format!("{slot:?}: {reason}")))?;
            if let AbilityKind::StatBoost { stat, .. } = &desc.kind {
                if let Some(other) = gated[stat.index()].replace(*slot) {
                    return Err(invalid(format!(
                        "{slot:?}: {stat:?} is already boosted by {other:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Bind this kit to a tick duration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidKit`] if the kit fails validation or
    /// `tick_dt` is not positive and finite.
    pub fn bind(&self, tick_dt: f64) -> Result<Loadout, SimError> {
        self.validate()?;
        if !(tick_dt > 0.0 && tick_dt.is_finite()) {
            return Err(SimError::InvalidKit {
                kit: self.name.clone(),
                reason: format!("tick_dt must be positive and finite, got {tick_dt}"),
            });
        }

        let mut slots = [None; AbilitySlot::COUNT];
        for (slot, desc) in &self.abilities {
            let (interval, modifier_duration) = match &desc.kind {
                AbilityKind::ProjectileBurst { interval_secs, .. } => {
                    (secs_to_ticks(*interval_secs, tick_dt), None)
                }
                AbilityKind::StatBoost { duration_secs, .. } => {
                    (0, duration_secs.map(|s| secs_to_ticks(s, tick_dt).max(1)))
                }
                _ => (0, None),
            };
            slots[slot.index()] = Some(SlotTicks {
                cooldown: secs_to_ticks(desc.cooldown_secs, tick_dt),
                duration: secs_to_ticks(desc.duration_secs, tick_dt),
                interval,
                modifier_duration,
            });
        }

        Ok(Loadout {
            kit: self.clone(),
            tick_dt,
            slots,
        })
    }

    /// A balanced melee archetype with every slot filled. Used by tests and
    /// demos.
    pub fn brawler() -> Self {
        let mut abilities = BTreeMap::new();
        abilities.insert(
            AbilitySlot::Dash,
            AbilityDescriptor::new(AbilityKind::Dash { speed: 20.0 }, LocomotionState::Dashing, 1.0)
                .with_duration(0.2)
                .without_rotation(),
        );
        abilities.insert(
            AbilitySlot::Block,
            AbilityDescriptor::new(
                AbilityKind::Block {
                    damage_multiplier: 0.25,
                },
                LocomotionState::Blocking,
                0.5,
            )
            .cooldown_from_end(),
        );
        abilities.insert(
            AbilitySlot::Melee,
            AbilityDescriptor::new(
                AbilityKind::Melee {
                    damage: 10.0,
                    offset: 1.0,
                    half_extents: Vec2::new(0.75, 0.5),
                },
                LocomotionState::Attacking,
                0.5,
            )
            .with_duration(0.1),
        );
        abilities.insert(
            AbilitySlot::Projectile,
            AbilityDescriptor::new(
                AbilityKind::RangedHold {
                    projectile_speed: 18.0,
                    damage: 4.0,
                },
                LocomotionState::Firing,
                0.25,
            ),
        );
        abilities.insert(
            AbilitySlot::Primary,
            AbilityDescriptor::new(
                AbilityKind::StatBoost {
                    stat: StatKind::Damage,
                    multiplier: 1.5,
                    charges: Budget::Infinite,
                    duration_secs: Some(5.0),
                },
                LocomotionState::Normal,
                8.0,
            ),
        );
        abilities.insert(
            AbilitySlot::Signature,
            AbilityDescriptor::new(
                AbilityKind::ProjectileBurst {
                    projectile_speed: 22.0,
                    damage: 8.0,
                    count: 3,
                    interval_secs: 0.1,
                },
                LocomotionState::UsingSignatureAbility,
                2.0,
            )
            .with_duration(0.3)
            .locking_movement(),
        );

        Self {
            name: "brawler".to_owned(),
            max_health: 100.0,
            move_speed: 5.0,
            acceleration: 50.0,
            state_speed: StateSpeed::default(),
            resources: ResourceConfig {
                block: BlockCharge {
                    max_charge: 3.0,
                    charge_per_sec: 1.0,
                    discharge_per_sec: 1.5,
                },
                signature: SignatureCharge {
                    max_charge: 100.0,
                    charge_per_sec: 2.0,
                    charge_per_damage_dealt: 1.0,
                    charge_per_damage_taken: 0.5,
                },
            },
            abilities,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn positive(label: &str, v: f64) -> Result<(), String> {
    if v > 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(format!("{label} must be positive and finite, got {v}"))
    }
}

fn non_negative(label: &str, v: f64) -> Result<(), String> {
    if v >= 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(format!("{label} must be non-negative and finite, got {v}"))
    }
}

fn validate_descriptor(slot: AbilitySlot, desc: &AbilityDescriptor) -> Result<(), String> {
    non_negative("cooldown_secs", desc.cooldown_secs)?;
    non_negative("duration_secs", desc.duration_secs)?;
    non_negative("move_speed_multiplier", desc.move_speed_multiplier)?;

    if desc.target_state == LocomotionState::Stunned {
        return Err("Stunned cannot be an ability target".to_owned());
    }
    if let Some(required) = desc.kind.required_state() {
        if desc.target_state != required {
            return Err(format!(
                "{} must target {required:?}, not {:?}",
                desc.kind.label(),
                desc.target_state
            ));
        }
    }
    if desc.target_state.is_holdable() && desc.kind.required_state() != Some(desc.target_state) {
        return Err(format!(
            "{:?} is only entered by its holdable ability kind",
            desc.target_state
        ));
    }

    if desc.target_state == LocomotionState::Normal
        && matches!(desc.kind, AbilityKind::ProjectileBurst { .. })
    {
        return Err("a projectile burst needs a state to run in, not Normal".to_owned());
    }

    let slot_fits = match slot {
        AbilitySlot::Dash => matches!(desc.kind, AbilityKind::Dash { .. }),
        AbilitySlot::Block => matches!(desc.kind, AbilityKind::Block { .. }),
        _ => !matches!(desc.kind, AbilityKind::Dash { .. } | AbilityKind::Block { .. }),
    };
    if !slot_fits {
        return Err(format!("{} does not fit this slot", desc.kind.label()));
    }

    match &desc.kind {
        AbilityKind::Dash { speed } => {
            non_negative("speed", *speed)?;
            positive("duration_secs", desc.duration_secs)?;
        }
        AbilityKind::Block { damage_multiplier } => non_negative("damage_multiplier", *damage_multiplier)?,
        AbilityKind::Melee {
            damage,
            offset,
            half_extents,
        } => {
            non_negative("damage", *damage)?;
            if !offset.is_finite() || !half_extents.is_finite() {
                return Err("melee hitbox must be finite".to_owned());
            }
        }
        AbilityKind::RangedHold {
            projectile_speed,
            damage,
        }
        | AbilityKind::Projectile {
            projectile_speed,
            damage,
        } => {
            non_negative("projectile_speed", *projectile_speed)?;
            non_negative("damage", *damage)?;
        }
        AbilityKind::ProjectileBurst {
            projectile_speed,
            damage,
            count,
            interval_secs,
        } => {
            non_negative("projectile_speed", *projectile_speed)?;
            non_negative("damage", *damage)?;
            non_negative("interval_secs", *interval_secs)?;
            if *count == 0 {
                return Err("burst count must be at least 1".to_owned());
            }
        }
        AbilityKind::StatBoost {
            stat,
            multiplier,
            charges,
            duration_secs,
        } => {
            if !multiplier.is_finite() {
                return Err(format!("multiplier must be finite, got {multiplier}"));
            }
            if charges.is_exhausted() {
                return Err("charges must be infinite or at least 1".to_owned());
            }
            match duration_secs {
                Some(secs) => positive("duration_secs", *secs)?,
                None if *charges == Budget::Infinite => {
                    return Err("a stat boost needs a duration or finite charges".to_owned())
                }
                None if !stat.spends_charges() => {
                    return Err(format!("{stat:?} charges are never spent; give the boost a duration"))
                }
                None => {}
            }
        }
        AbilityKind::SpawnZone {
            damage_per_interval,
            zone_duration_secs,
            damage_interval_secs,
            max_range,
            ..
        } => {
            non_negative("damage_per_interval", *damage_per_interval)?;
            positive("zone_duration_secs", *zone_duration_secs)?;
            positive("damage_interval_secs", *damage_interval_secs)?;
            non_negative("max_range", *max_range)?;
        }
        AbilityKind::ColliderBurst { offset } => {
            if !offset.is_finite() {
                return Err("offset must be finite".to_owned());
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
