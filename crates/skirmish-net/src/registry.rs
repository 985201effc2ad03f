//! Read-only cross-entity registry.
//!
//! The registry is an explicit object owned by the session and handed to
//! whatever needs cross-entity answers ("how many opponents are alive",
//! "where is the action centred", "what overlaps this box"). Simulation
//! contexts never read it during a step.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use skirmish_sim::math::Vec2;

use crate::collab::{CollisionQuery, OrientedBox};

/// Stable identifier of a simulated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// What the registry knows about one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryEntry {
    pub team: u8,
    pub position: Vec2,
    /// Body radius used for overlap queries.
    pub radius: f64,
    pub alive: bool,
}

/// All entities in a match, by id.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entries: BTreeMap<EntityId, RegistryEntry>,
    next_id: u32,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live entity and return its id.
    pub fn register(&mut self, team: u8, position: Vec2, radius: f64) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            RegistryEntry {
                team,
                position,
                radius,
                alive: true,
            },
        );
        id
    }

    /// Refresh an entity's position and liveness. Returns `false` for an
    /// unknown id.
    pub fn update(&mut self, id: EntityId, position: Vec2, alive: bool) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.position = position;
                entry.alive = alive;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&RegistryEntry> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &RegistryEntry)> {
        self.entries.iter().map(|(id, e)| (*id, e))
    }

    /// Number of live entities.
    pub fn alive_count(&self) -> usize {
        self.entries.values().filter(|e| e.alive).count()
    }

    /// Number of live entities not on `team`.
    pub fn opponents_alive(&self, team: u8) -> usize {
        self.entries
            .values()
            .filter(|e| e.alive && e.team != team)
            .count()
    }

    /// Mean position of the live entities (camera focus), if any.
    pub fn centroid(&self) -> Option<Vec2> {
        let (sum, n) = self
            .entries
            .values()
            .filter(|e| e.alive)
            .fold((Vec2::ZERO, 0usize), |(sum, n), e| (sum + e.position, n + 1));
        (n > 0).then(|| Vec2::new(sum.x / n as f64, sum.y / n as f64))
    }
}

impl CollisionQuery for EntityRegistry {
    fn overlap_box(&self, shape: &OrientedBox) -> Vec<EntityId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.alive && shape.overlaps_circle(e.position, e.radius))
            .map(|(id, _)| *id)
            .collect()
    }
}
