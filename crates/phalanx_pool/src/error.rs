//! # Pool Error Types
//!
//! All errors that can occur while acquiring, releasing or querying pools.
//!
//! Every error is a local, synchronous failure reported to the immediate
//! caller. Nothing in this crate retries: retrying an exhausted pool without
//! an intervening release would spin.

use thiserror::Error;

use crate::item::ItemType;
use crate::node::NodeIndex;

/// Why a release or return was rejected.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStateReason {
    /// The index does not address a slot of this pool.
    #[error("index outside pool of capacity {capacity}")]
    OutOfRange {
        /// Capacity of the pool that rejected the index.
        capacity: usize,
    },
    /// The slot is already free (double release).
    #[error("node is already free")]
    AlreadyFree,
    /// A return notification for this tenant is already queued.
    #[error("a return is already pending")]
    ReturnPending,
    /// The notification belongs to an earlier tenant of the slot.
    #[error("return belongs to a previous tenant")]
    StaleReturn,
    /// The return queue cannot hold another notification. Only reachable if
    /// more than one notification per node were ever queued.
    #[error("return queue is full")]
    ReturnQueueFull,
}

/// Errors that can occur in the pool core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Acquire requested with no free slot available. The pool never grows.
    #[error("pool exhausted: all {capacity} slots of {item_type} are in use")]
    PoolExhausted {
        /// Item type held by the pool.
        item_type: ItemType,
        /// Fixed capacity of the pool.
        capacity: usize,
    },

    /// Release or return on a node that cannot accept it. A caller defect.
    #[error("invalid node state for {index}: {reason}")]
    InvalidNodeState {
        /// Node the caller tried to release.
        index: NodeIndex,
        /// What was wrong with it.
        reason: NodeStateReason,
    },

    /// A manager was queried for an item type it does not own.
    #[error("unknown item type: {item_type}")]
    UnknownItemType {
        /// The requested type.
        item_type: ItemType,
    },

    /// The pool has been torn down; no further acquire/release is valid.
    #[error("pool has been disposed")]
    Disposed,
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;
