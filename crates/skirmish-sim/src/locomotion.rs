//! Locomotion states and the transition policy between them.

use serde::{Deserialize, Serialize};

/// The mutually exclusive activity an entity is performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LocomotionState {
    #[default]
    Normal,
    Attacking,
    Dashing,
    Blocking,
    Firing,
    UsingPrimaryAbility,
    UsingSignatureAbility,
    Stunned,
}

impl LocomotionState {
    /// Holdable states persist while their trigger is held and can be
    /// interrupted by a dash.
    pub fn is_holdable(self) -> bool {
        matches!(self, LocomotionState::Blocking | LocomotionState::Firing)
    }

    /// States that only end by expiry or by their ability's own end.
    pub fn is_locked(self) -> bool {
        matches!(
            self,
            LocomotionState::Attacking
                | LocomotionState::Dashing
                | LocomotionState::UsingPrimaryAbility
                | LocomotionState::UsingSignatureAbility
                | LocomotionState::Stunned
        )
    }

    /// States in which the integrator brakes to a halt regardless of input.
    pub fn halts_movement(self) -> bool {
        matches!(
            self,
            LocomotionState::UsingPrimaryAbility
                | LocomotionState::UsingSignatureAbility
                | LocomotionState::Stunned
        )
    }

    /// States in which the entity does not turn towards its aim point.
    pub fn freezes_facing(self) -> bool {
        matches!(self, LocomotionState::Dashing | LocomotionState::Stunned)
    }
}

/// Whether an entity in `from` may enter `to`.
///
/// `block_available` reflects the block resource: an exhausted block charge
/// forbids entering (or re-entering) [`LocomotionState::Blocking`].
///
/// | from \ to            | Normal | Blocking          | Dashing | Firing | other |
/// |----------------------|--------|-------------------|---------|--------|-------|
/// | Normal               | yes    | if block available| yes     | yes    | yes   |
/// | Blocking             | yes    | if block available| yes     | no     | no    |
/// | Firing               | yes    | no                | yes     | yes    | no    |
/// | locked states        | yes    | no                | no      | no     | no    |
pub fn can_transition(from: LocomotionState, to: LocomotionState, block_available: bool) -> bool {
    use LocomotionState::*;

    if to == Normal {
        return true;
    }
    match from {
        Normal => to != Blocking || block_available,
        Blocking => (to == Blocking && block_available) || to == Dashing,
        Firing => matches!(to, Dashing | Firing),
        Attacking | Dashing | UsingPrimaryAbility | UsingSignatureAbility | Stunned => false,
    }
}
