//! Galaxy generation parameters.

use serde::{Deserialize, Serialize};

/// Tuning knobs for a new galaxy. Values are illustrative, not balanced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalaxyConfig {
    /// Inclusive bounds on the number of star systems.
    pub min_systems: u32,
    pub max_systems: u32,

    /// Inclusive bounds on planets per system.
    pub min_planets: u32,
    pub max_planets: u32,

    /// Inclusive bounds on extra wormhole attempts after the spanning tree.
    pub min_extra_wormholes: u32,
    pub max_extra_wormholes: u32,

    pub asteroid_count: u32,

    /// Fleets stationed on each starting system.
    pub initial_fleets: u32,

    /// Side length of the cube systems are scattered in, centered on the origin.
    pub extent: f64,

    /// Hours a player may hold the turn.
    pub time_limit_hours: u32,

    /// Fixed seed for reproducible games. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GalaxyConfig {
    fn default() -> Self {
        Self {
            min_systems: 20,
            max_systems: 30,
            min_planets: 1,
            max_planets: 3,
            min_extra_wormholes: 10,
            max_extra_wormholes: 15,
            asteroid_count: 50,
            initial_fleets: 5,
            extent: 1000.0,
            time_limit_hours: 24,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} range is inverted ({min} > {max})")]
    InvertedRange {
        name: &'static str,
        min: u32,
        max: u32,
    },
    #[error("a galaxy needs at least one system")]
    NoSystems,
    #[error("players must start with at least one fleet")]
    NoInitialFleets,
    #[error("extent must be a positive finite number, got {0}")]
    BadExtent(f64),
}

impl GalaxyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ranges = [
            ("systems", self.min_systems, self.max_systems),
            ("planets", self.min_planets, self.max_planets),
            (
                "extra wormholes",
                self.min_extra_wormholes,
                self.max_extra_wormholes,
            ),
        ];
        for (name, min, max) in ranges {
            if min > max {
                return Err(ConfigError::InvertedRange { name, min, max });
            }
        }
        if self.max_systems == 0 {
            return Err(ConfigError::NoSystems);
        }
        if self.initial_fleets == 0 {
            return Err(ConfigError::NoInitialFleets);
        }
        if !(self.extent.is_finite() && self.extent > 0.0) {
            return Err(ConfigError::BadExtent(self.extent));
        }
        Ok(())
    }
}
