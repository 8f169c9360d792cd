//! # Pool Nodes
//!
//! A node is one fixed slot of a pool: the pooled item, its stable index and
//! the sending half of the pool's return queue.
//!
//! Nodes are created once per slot when the pool is constructed and live until
//! the pool is dropped. `NodeIndex` always equals the node's position in the
//! pool's backing storage.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};

use crate::error::{NodeStateReason, PoolError, PoolResult};
use crate::item::PoolNodeItem;

/// Stable identity of a pool slot.
///
/// Assigned once at pool construction and never reused for a different slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Creates a node index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the index as a slot offset.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Payload of a return notification.
///
/// Identifies the node being given back and the tenancy it belongs to, so a
/// notification that outlives its tenant can be told apart from a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolEventArgs {
    /// Node being returned.
    pub node_index: NodeIndex,
    /// Generation of the node when the notification was raised.
    pub generation: u32,
}

/// Low half of the tenancy word: the node's generation.
const GENERATION_MASK: u64 = 0xFFFF_FFFF;
/// A notification for this node is queued or in flight.
const RETURN_PENDING: u64 = 1 << 32;
/// The owning pool has been disposed.
const CLOSED: u64 = 1 << 33;

#[allow(clippy::cast_possible_truncation)]
#[inline]
const fn generation_of(state: u64) -> u32 {
    (state & GENERATION_MASK) as u32
}

/// Tenancy word shared by a node and every return handle cut from it.
///
/// The pending bit is set before a notification is sent and cleared only
/// when the owning pool consumes it, so at most one notification per node
/// exists at any time and a queue sized to the pool's capacity never fills.
#[derive(Debug, Default)]
struct Tenancy(AtomicU64);

impl Tenancy {
    #[inline]
    fn load(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Marks a notification for `args` as queued.
    fn claim(&self, args: PoolEventArgs) -> PoolResult<()> {
        let idle = u64::from(args.generation);
        match self
            .0
            .compare_exchange(idle, idle | RETURN_PENDING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(current) if current & CLOSED != 0 => Err(PoolError::Disposed),
            Err(current) if generation_of(current) == args.generation => {
                Err(invalid(args.node_index, NodeStateReason::ReturnPending))
            }
            Err(_) => Err(invalid(args.node_index, NodeStateReason::StaleReturn)),
        }
    }

    /// Drops the pending mark, whatever the generation.
    fn unclaim(&self) {
        self.0.fetch_and(!RETURN_PENDING, Ordering::AcqRel);
    }

    /// Ends `generation`, which must have a notification pending or not as
    /// `pending` says.
    fn end(&self, generation: u32, pending: bool) -> Result<(), NodeStateReason> {
        let expected = if pending {
            u64::from(generation) | RETURN_PENDING
        } else {
            u64::from(generation)
        };
        let next = u64::from(generation.wrapping_add(1));
        self.0
            .compare_exchange(expected, next, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| {
                if pending {
                    NodeStateReason::StaleReturn
                } else {
                    NodeStateReason::ReturnPending
                }
            })
    }

    /// Ends the current generation. A pending mark survives: its notification
    /// is still out there and will be consumed as stale.
    fn advance(&self) {
        let mut state = self.load();
        loop {
            let next = (state & !GENERATION_MASK)
                | u64::from(generation_of(state).wrapping_add(1));
            match self
                .0
                .compare_exchange_weak(state, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(current) => state = current,
            }
        }
    }

    fn close(&self) {
        self.0.fetch_or(CLOSED, Ordering::AcqRel);
    }
}

/// One slot of a pool.
#[derive(Debug)]
pub struct PoolNode<T> {
    index: NodeIndex,
    /// Generation and pending mark, shared with return handles.
    tenancy: Arc<Tenancy>,
    item: T,
    returns: Sender<PoolEventArgs>,
}

impl<T: PoolNodeItem> PoolNode<T> {
    pub(crate) fn new(index: NodeIndex, item: T, returns: Sender<PoolEventArgs>) -> Self {
        Self {
            index,
            tenancy: Arc::new(Tenancy::default()),
            item,
            returns,
        }
    }

    /// Returns the node's stable index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> NodeIndex {
        self.index
    }

    /// Returns the node's current generation. It advances whenever a tenancy
    /// ends.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u32 {
        generation_of(self.tenancy.load())
    }

    /// Returns whether a return notification is queued for this node.
    #[inline]
    #[must_use]
    pub fn is_return_pending(&self) -> bool {
        self.tenancy.load() & RETURN_PENDING != 0
    }

    /// Returns the pooled item.
    #[inline]
    #[must_use]
    pub const fn item(&self) -> &T {
        &self.item
    }

    /// Returns the pooled item mutably.
    #[inline]
    pub fn item_mut(&mut self) -> &mut T {
        &mut self.item
    }

    /// Returns whether the slot is currently handed out.
    #[inline]
    #[must_use]
    pub fn in_use(&self) -> bool {
        self.item.in_use()
    }

    /// Raises the node's "returned" notification.
    ///
    /// The owning pool picks the notification up in
    /// [`Pool::process_returns`](crate::Pool::process_returns) and releases
    /// the slot there.
    ///
    /// # Errors
    ///
    /// `InvalidNodeState` if the node is free or already has a return queued.
    /// Returning twice is a caller defect and is never treated as a no-op.
    pub fn return_to_pool(&mut self) -> PoolResult<()> {
        if !self.item.in_use() {
            return Err(invalid(self.index, NodeStateReason::AlreadyFree));
        }
        let args = self.event_args();
        self.tenancy.claim(args)?;
        send_return(&self.returns, &self.tenancy, args)
    }

    /// Creates a detached handle that can return this tenant from anywhere.
    ///
    /// Any number of handles may exist; the first one used wins and the rest
    /// are rejected as pending or stale.
    ///
    /// # Errors
    ///
    /// `InvalidNodeState` if the node is free.
    pub fn return_handle(&self) -> PoolResult<ReturnHandle> {
        if !self.item.in_use() {
            return Err(invalid(self.index, NodeStateReason::AlreadyFree));
        }
        Ok(ReturnHandle {
            args: self.event_args(),
            tenancy: Arc::clone(&self.tenancy),
            returns: self.returns.clone(),
        })
    }

    #[inline]
    fn event_args(&self) -> PoolEventArgs {
        PoolEventArgs {
            node_index: self.index,
            generation: self.generation(),
        }
    }

    /// Ends the current tenancy through a release path.
    pub(crate) fn end_tenancy(&self, pending: bool) -> Result<(), NodeStateReason> {
        self.tenancy.end(self.generation(), pending)
    }

    /// Ends the current tenancy during a bulk clear.
    pub(crate) fn advance_generation(&self) {
        self.tenancy.advance();
    }

    /// Forgets a notification consumed without releasing the slot.
    pub(crate) fn clear_return_pending(&self) {
        self.tenancy.unclaim();
    }

    /// Rejects every later notification with `Disposed`.
    pub(crate) fn close(&self) {
        self.tenancy.close();
    }
}

/// Detached return notification for one tenant of one node.
///
/// Gameplay code keeps this instead of a reference to the pool. It is
/// `Send`, so worker threads can hand items back; the owning thread applies
/// the release when it next drains the pool's return queue.
#[derive(Debug)]
pub struct ReturnHandle {
    args: PoolEventArgs,
    tenancy: Arc<Tenancy>,
    returns: Sender<PoolEventArgs>,
}

impl ReturnHandle {
    /// Returns the node this handle gives back.
    #[inline]
    #[must_use]
    pub const fn node_index(&self) -> NodeIndex {
        self.args.node_index
    }

    /// Queues the return. Consumes the handle.
    ///
    /// # Errors
    ///
    /// `InvalidNodeState` with `ReturnPending` if the tenant is already being
    /// returned, `StaleReturn` if the tenancy has ended, `Disposed` if the
    /// pool has been torn down.
    pub fn return_to_pool(self) -> PoolResult<()> {
        self.tenancy.claim(self.args)?;
        send_return(&self.returns, &self.tenancy, self.args)
    }
}

fn send_return(
    returns: &Sender<PoolEventArgs>,
    tenancy: &Tenancy,
    args: PoolEventArgs,
) -> PoolResult<()> {
    returns.try_send(args).map_err(|err| {
        tenancy.unclaim();
        match err {
            TrySendError::Full(_) => invalid(args.node_index, NodeStateReason::ReturnQueueFull),
            TrySendError::Disconnected(_) => PoolError::Disposed,
        }
    })
}

#[inline]
const fn invalid(index: NodeIndex, reason: NodeStateReason) -> PoolError {
    PoolError::InvalidNodeState { index, reason }
}
