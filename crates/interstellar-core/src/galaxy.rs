//! Galaxy topology: systems, wormholes and cosmetic asteroid fields.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::ids::{PlayerId, SystemId};

/// Point in galaxy space. Stored as a `[x, y, z]` array.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for Position {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Position> for [f64; 3] {
    fn from(p: Position) -> Self {
        [p.x, p.y, p.z]
    }
}

/// Decorative planet orbiting a system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub id: String,
    pub size: f64,
    pub distance: f64,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    pub id: SystemId,
    pub position: Position,
    pub sun_size: f64,
    pub planets: Vec<Planet>,
    /// `None` while unclaimed.
    pub owner: Option<PlayerId>,
}

/// Undirected edge between two systems.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wormhole {
    pub from: SystemId,
    pub to: SystemId,
}

impl Wormhole {
    pub fn new(from: SystemId, to: SystemId) -> Self {
        Self { from, to }
    }

    /// True if this wormhole joins `a` and `b`, in either direction.
    pub fn connects(&self, a: &SystemId, b: &SystemId) -> bool {
        (&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
    }

    /// The far end when entering from `system`.
    pub fn other_end(&self, system: &SystemId) -> Option<&SystemId> {
        if &self.from == system {
            Some(&self.to)
        } else if &self.to == system {
            Some(&self.from)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asteroid {
    pub id: String,
    pub position: Position,
    pub size: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GalaxyMap {
    pub systems: Vec<System>,
    pub wormholes: Vec<Wormhole>,
    pub asteroids: Vec<Asteroid>,
}

impl GalaxyMap {
    pub fn system(&self, id: &SystemId) -> Option<&System> {
        self.systems.iter().find(|s| &s.id == id)
    }

    pub fn system_index(&self, id: &SystemId) -> Option<usize> {
        self.systems.iter().position(|s| &s.id == id)
    }

    pub fn has_route(&self, a: &SystemId, b: &SystemId) -> bool {
        self.wormholes.iter().any(|w| w.connects(a, b))
    }

    /// Systems one wormhole away from `system`, without duplicates.
    pub fn neighbours<'a>(&'a self, system: &'a SystemId) -> Vec<&'a SystemId> {
        let mut seen = HashSet::new();
        self.wormholes
            .iter()
            .filter_map(|w| w.other_end(system))
            .filter(|n| seen.insert(*n))
            .collect()
    }

    /// Breadth-first reachability over wormholes. Returns the first system that
    /// cannot be reached from `systems[0]`, if any.
    pub fn first_unreachable(&self) -> Option<&SystemId> {
        let first = self.systems.first()?;

        let mut adjacency: HashMap<&SystemId, Vec<&SystemId>> = HashMap::new();
        for w in &self.wormholes {
            adjacency.entry(&w.from).or_default().push(&w.to);
            adjacency.entry(&w.to).or_default().push(&w.from);
        }

        let mut visited: HashSet<&SystemId> = HashSet::from([&first.id]);
        let mut queue = VecDeque::from([&first.id]);
        while let Some(current) = queue.pop_front() {
            for &next in adjacency.get(current).into_iter().flatten() {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        self.systems
            .iter()
            .map(|s| &s.id)
            .find(|id| !visited.contains(id))
    }

    pub fn is_connected(&self) -> bool {
        self.first_unreachable().is_none()
    }

    /// Check the topology invariants: unique system ids, wormholes between
    /// known and distinct systems, and a connected graph.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let mut ids = HashSet::with_capacity(self.systems.len());
        for system in &self.systems {
            if !ids.insert(&system.id) {
                return Err(InvariantViolation::DuplicateSystem(system.id.clone()));
            }
        }

        for w in &self.wormholes {
            if w.from == w.to {
                return Err(InvariantViolation::SelfLoop(w.from.clone()));
            }
            for end in [&w.from, &w.to] {
                if !ids.contains(end) {
                    return Err(InvariantViolation::DanglingWormhole(end.clone()));
                }
            }
        }

        match self.first_unreachable() {
            Some(id) => Err(InvariantViolation::Disconnected(id.clone())),
            None => Ok(()),
        }
    }
}
