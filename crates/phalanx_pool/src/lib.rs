//! # PHALANX Pool Core
//!
//! Fixed-capacity pools for long-lived game entities (units, buildings,
//! projectiles, explosion pieces), designed for:
//! - Thousands of spawns and despawns per match
//! - A 16-33ms frame budget with no allocation hitches
//! - Bounded, predictable memory footprint
//!
//! ## Architecture Rules
//!
//! 1. **Pre-sized** - Every slot is constructed at load time; pools never grow
//! 2. **O(1) acquire/release** - A free list of stable node indices
//! 3. **Reset on release** - Entity types own their reset logic; the pool
//!    never inspects entity fields
//! 4. **Single writer** - One owner thread per pool; other threads return
//!    items through a queue drained once per tick
//!
//! ## Slot Lifecycle
//!
//! ```text
//! Free --acquire--> InUse --release (reset+clear)--> Free
//! Free --dispose--> Torn down
//! InUse --dispose--> Torn down
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use phalanx_pool::{Pool, PoolError};
//!
//! let mut pool: Pool<Projectile> = Pool::new(512);
//! let index = match pool.acquire() {
//!     Ok(node) => node.index(),
//!     Err(PoolError::PoolExhausted { .. }) => return, // drop the spawn
//!     Err(err) => panic!("{err}"),
//! };
//! pool.release(index)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod item;
pub mod manager;
pub mod node;
pub mod pool;

pub use error::{NodeStateReason, PoolError, PoolResult};
pub use item::{ItemType, ManagerId, OwnerKey, PoolItem, PoolNodeItem, Poolable, ResetDefaults};
pub use manager::{unknown_item_type, PoolManagerBase};
pub use node::{NodeIndex, PoolEventArgs, PoolNode, ReturnHandle};
pub use pool::{DrainReport, Pool};
