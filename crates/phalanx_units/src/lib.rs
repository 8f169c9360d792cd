//! # PHALANX Units
//!
//! The pooled entities of a match and the manager that owns their pools.
//!
//! ## Design Principles
//!
//! 1. **Sized at load** - Capacities come from TOML once; nothing grows mid-match
//! 2. **Partitioned per player** - Each player has its own unit and building pools
//! 3. **Explicit ownership** - The manager is passed to subsystems, never global
//! 4. **Spawn failures are gameplay limits** - An exhausted pool drops or defers
//!    the spawn; it never crashes the match
//!
//! ## Example
//!
//! ```rust,ignore
//! use phalanx_pool::ManagerId;
//! use phalanx_units::{MatchPoolManager, PoolCapacities, Position, UnitKind};
//!
//! let capacities = PoolCapacities::from_path("data/pools.toml")?;
//! let mut pools = MatchPoolManager::new(ManagerId::new(match_id), &capacities)?;
//!
//! let tank = pools.spawn_unit(0, UnitKind::Tank, Position::new(5.0, 0.0, 5.0))?;
//! // ... end of frame
//! pools.tick(1.0 / 60.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod components;
pub mod config;
pub mod entities;
pub mod error;
pub mod manager;

pub use components::{Position, Velocity};
pub use config::PoolCapacities;
pub use entities::{Building, BuildingKind, ExplosionPiece, Projectile, Unit, UnitKind};
pub use error::{ConfigError, MatchError, MatchResult};
pub use manager::{MatchPoolManager, EXPLOSION_PIECE_TTL, PROJECTILE_TTL};
