//! # Pool Capacities
//!
//! How many slots each entity pool gets. Loaded once at startup from TOML and
//! fixed for the lifetime of the match.
//!
//! ```toml
//! players = 4
//! units_per_player = 300
//! buildings_per_player = 96
//! projectiles = 2048
//! explosion_pieces = 4096
//! ```
//!
//! Missing keys fall back to the skirmish defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Slot counts for every pool of a match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolCapacities {
    /// Number of players; units and buildings get one pool each.
    pub players: u8,
    /// Unit slots per player.
    pub units_per_player: usize,
    /// Building slots per player.
    pub buildings_per_player: usize,
    /// Projectile slots, shared by all players.
    pub projectiles: usize,
    /// Explosion fragment slots, shared by all players.
    pub explosion_pieces: usize,
}

impl Default for PoolCapacities {
    fn default() -> Self {
        Self {
            players: 2,
            units_per_player: 200,
            buildings_per_player: 64,
            projectiles: 512,
            explosion_pieces: 1024,
        }
    }
}

impl PoolCapacities {
    /// Eight-player preset.
    ///
    /// Sized for sustained artillery fire: every unit of every player can
    /// have about one shell in flight, and each shell one explosion.
    #[must_use]
    pub const fn large_battle() -> Self {
        Self {
            players: 8,
            units_per_player: 400,
            buildings_per_player: 128,
            projectiles: 4096,
            explosion_pieces: 8192,
        }
    }

    /// Parses and validates capacities from TOML.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed TOML, `ZeroCapacity`/`NoPlayers` for invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let capacities: Self = toml::from_str(source)?;
        capacities.validate()?;
        Ok(capacities)
    }

    /// Reads, parses and validates capacities from a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks that every pool gets at least one slot.
    ///
    /// # Errors
    ///
    /// `NoPlayers` or `ZeroCapacity` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players == 0 {
            return Err(ConfigError::NoPlayers);
        }

        let pools = [
            ("units_per_player", self.units_per_player),
            ("buildings_per_player", self.buildings_per_player),
            ("projectiles", self.projectiles),
            ("explosion_pieces", self.explosion_pieces),
        ];
        match pools.into_iter().find(|&(_, capacity)| capacity == 0) {
            Some((pool, _)) => Err(ConfigError::ZeroCapacity { pool }),
            None => Ok(()),
        }
    }

    /// Total slots across every pool.
    #[must_use]
    pub fn total_slots(&self) -> usize {
        usize::from(self.players) * (self.units_per_player + self.buildings_per_player)
            + self.projectiles
            + self.explosion_pieces
    }
}
