//! Interfaces to external collaborators, and hit resolution on top of them.
//!
//! The simulation core never reaches into the world. It emits
//! [`SideEffect`]s; the authority hands them to [`resolve_effects`], which
//! asks a [`CollisionQuery`] what overlaps and reports damage to a
//! [`DamageSink`]. Nothing is read back synchronously.

use skirmish_sim::input::Input;
use skirmish_sim::intent::{AbilityCue, SideEffect, SideEffectIntent};
use skirmish_sim::math::Vec2;
use tracing::trace;

use crate::registry::EntityId;
use crate::snapshot::AuthoritativeSnapshot;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// A one-directional message channel (input upstream, snapshots downstream).
pub trait Channel<T> {
    /// Queue `msg` for delivery.
    fn send(&mut self, msg: T);
    /// Take every message that has arrived, in arrival order.
    fn poll(&mut self) -> Vec<T>;
}

/// Client-to-authority input channel. Must be reliable and ordered.
pub trait InputChannel: Channel<Input> {}
impl<C: Channel<Input>> InputChannel for C {}

/// Authority-to-client snapshot channel. May drop or reorder.
pub trait SnapshotChannel: Channel<AuthoritativeSnapshot> {}
impl<C: Channel<AuthoritativeSnapshot>> SnapshotChannel for C {}

/// Shape queries against the physics world.
pub trait CollisionQuery {
    /// Live entities overlapping `shape`.
    fn overlap_box(&self, shape: &OrientedBox) -> Vec<EntityId>;
}

/// Something that can receive damage.
pub trait DamageSink {
    fn take_damage(&mut self, target: EntityId, source: EntityId, amount: f64);
}

/// Visual/audio spawner notified of ability activations.
pub trait CueSink {
    fn on_cue(&mut self, entity: EntityId, cue: &AbilityCue);

    /// A cue recomputed while a correction was replayed. It was already
    /// reported through [`on_cue`](Self::on_cue) when first predicted, so the
    /// default ignores it.
    fn on_replayed_cue(&mut self, _entity: EntityId, _cue: &AbilityCue) {}
}

impl CueSink for Vec<(EntityId, AbilityCue)> {
    fn on_cue(&mut self, entity: EntityId, cue: &AbilityCue) {
        self.push((entity, *cue));
    }
}

// ---------------------------------------------------------------------------
// OrientedBox
// ---------------------------------------------------------------------------

/// A box rotated so its local y axis points along `up`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: Vec2,
    /// Half extent along the box's right (x) and up (y) axes.
    pub half_extents: Vec2,
    /// Unit up axis.
    pub up: Vec2,
}

impl OrientedBox {
    /// `up` is normalized; a zero `up` falls back to world up.
    pub fn new(center: Vec2, half_extents: Vec2, up: Vec2) -> Self {
        let up = if up.is_zero() { Vec2::UP } else { up.normalized() };
        Self {
            center,
            half_extents,
            up,
        }
    }

    fn to_local(&self, point: Vec2) -> Vec2 {
        let d = point - self.center;
        Vec2::new(d.dot(self.up.perp_cw()), d.dot(self.up))
    }

    pub fn contains(&self, point: Vec2) -> bool {
        let local = self.to_local(point);
        local.x.abs() <= self.half_extents.x && local.y.abs() <= self.half_extents.y
    }

    /// Whether a circle at `center` with `radius` touches the box.
    pub fn overlaps_circle(&self, center: Vec2, radius: f64) -> bool {
        let local = self.to_local(center);
        let closest = Vec2::new(
            local.x.clamp(-self.half_extents.x, self.half_extents.x),
            local.y.clamp(-self.half_extents.y, self.half_extents.y),
        );
        (local - closest).length() <= radius
    }
}

// ---------------------------------------------------------------------------
// Hit resolution
// ---------------------------------------------------------------------------

/// One damage application made while resolving effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub source: EntityId,
    pub target: EntityId,
    pub amount: f64,
}

/// What [`resolve_effects`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Damage delivered to the sink.
    pub hits: Vec<Hit>,
    /// Effects that need a world spawner (projectiles, zones, colliders).
    pub spawns: Vec<SideEffect>,
}

/// Execute `effects` emitted by `source`.
///
/// Melee hit-checks are resolved immediately against `world`; the source
/// never hits itself. Everything else is passed through as a spawn request.
pub fn resolve_effects(
    source: EntityId,
    effects: &[SideEffect],
    world: &dyn CollisionQuery,
    sink: &mut dyn DamageSink,
) -> Resolution {
    let mut resolution = Resolution::default();
    for effect in effects {
        match effect.intent {
            SideEffectIntent::MeleeHitCheck {
                center,
                half_extents,
                facing,
                damage,
            } => {
                let shape = OrientedBox::new(center, half_extents, facing);
                for target in world.overlap_box(&shape) {
                    if target == source {
                        continue;
                    }
                    trace!(tick = effect.tick, %source, %target, damage, "melee hit");
                    sink.take_damage(target, source, damage);
                    resolution.hits.push(Hit {
                        source,
                        target,
                        amount: damage,
                    });
                }
            }
            SideEffectIntent::SpawnProjectile { .. }
            | SideEffectIntent::SpawnZone { .. }
            | SideEffectIntent::SpawnCollider { .. } => resolution.spawns.push(*effect),
        }
    }
    resolution
}
