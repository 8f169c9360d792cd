//! # Match Error Types

use phalanx_pool::PoolError;
use thiserror::Error;

/// Errors loading or validating pool capacities.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read pool config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`PoolCapacities`](crate::PoolCapacities).
    #[error("failed to parse pool config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A pool was configured with no slots.
    #[error("pool capacity must be positive: {pool}")]
    ZeroCapacity {
        /// Name of the offending setting.
        pool: &'static str,
    },

    /// A match needs at least one player.
    #[error("player count must be positive")]
    NoPlayers,
}

/// Errors from match-level spawn and despawn requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The underlying pool rejected the request.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The player has no pool partition in this match.
    #[error("unknown player {player}: match has {players} players")]
    UnknownPlayer {
        /// Requested player.
        player: u8,
        /// Number of players in the match.
        players: u8,
    },
}

/// Result type for match operations.
pub type MatchResult<T> = Result<T, MatchError>;
