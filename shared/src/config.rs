//! Runtime tuning shared by both roles.
//!
//! Every field has a default, so a TOML file only needs the values it changes:
//!
//! ```toml
//! tick_rate = 30
//! reconciliation_threshold = 2.5
//!
//! [combat]
//! rewind_targets = true
//! ```

use crate::error::NetcodeResult;
use crate::movement::MovementConfig;
use crate::weapon::Weapon;
use crate::world::{layers, LayerMask};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub shot_range: f32,
    pub hit_mask: LayerMask,
    /// Lower bound on the fire loop interval, in seconds.
    pub min_fire_interval: f32,
    /// Test hitscan shots against rewound target positions instead of the live world.
    pub rewind_targets: bool,
    pub projectile_lifetime: f32,
    pub projectile_radius: f32,
    pub weapons: Vec<Weapon>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            shot_range: 100.0,
            hit_mask: layers::WORLD | layers::PLAYER,
            min_fire_interval: 1.0 / 28.0,
            rewind_targets: false,
            projectile_lifetime: 5.0,
            projectile_radius: 0.25,
            weapons: vec![
                Weapon::hitscan("bolt", 0.25, 20.0),
                Weapon::projectile("orb", 31.0, 0.5, 35.0),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetcodeConfig {
    pub tick_rate: f32,
    pub buffer_capacity: usize,
    pub reconciliation_threshold: f32,
    pub reconciliation_cooldown: f32,
    pub extrapolation_limit: f32,
    pub extrapolation_multiplier: f32,
    pub movement: MovementConfig,
    pub combat: CombatConfig,
}

impl Default for NetcodeConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            buffer_capacity: 1024,
            reconciliation_threshold: 10.0,
            reconciliation_cooldown: 1.0,
            extrapolation_limit: 0.5,
            extrapolation_multiplier: 1.2,
            movement: MovementConfig::default(),
            combat: CombatConfig::default(),
        }
    }
}

impl NetcodeConfig {
    pub fn from_toml_str(source: &str) -> NetcodeResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> NetcodeResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Defaults when `path` is `None`.
    pub fn load_or_default(path: Option<&Path>) -> NetcodeResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn fixed_delta(&self) -> f32 {
        1.0 / self.tick_rate
    }
}
