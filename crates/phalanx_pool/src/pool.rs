//! # Entity Pool
//!
//! Fixed-capacity pool of pre-constructed, reusable entity objects.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::{NodeStateReason, PoolError, PoolResult};
use crate::item::{ItemType, ManagerId, OwnerKey, Poolable};
use crate::node::{NodeIndex, PoolEventArgs, PoolNode, ReturnHandle};

/// Outcome of draining a pool's return queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Notifications that released a slot.
    pub released: usize,
    /// Notifications rejected as double or stale returns.
    pub rejected: usize,
}

impl DrainReport {
    /// Sums two reports.
    #[inline]
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            released: self.released + other.released,
            rejected: self.rejected + other.rejected,
        }
    }
}

/// A pre-sized pool of `T`.
///
/// Every slot is default-constructed when the pool is created; acquire and
/// release only move indices between the free list and the caller. The pool
/// never grows.
///
/// # Thread Safety
///
/// Single writer. All acquire/release calls for one pool must come from one
/// owner thread; other threads give items back through [`ReturnHandle`]s,
/// which the owner applies in [`Pool::process_returns`].
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: Pool<Projectile> = Pool::new(256);
///
/// // Acquire - O(1), no heap allocation
/// let index = pool.acquire()?.index();
///
/// // Release - O(1), resets the projectile
/// pool.release(index)?;
/// ```
#[derive(Debug)]
pub struct Pool<T: Poolable> {
    /// The slots, `nodes[i].index() == i`.
    nodes: Box<[PoolNode<T>]>,
    /// Free slot indices. Reserved to capacity, never reallocates.
    free_list: Vec<NodeIndex>,
    /// Number of slots handed out.
    in_use_count: usize,
    /// Manager stamped onto items at acquire.
    manager: Option<ManagerId>,
    /// Per-item value initializer run by bulk attribute updates.
    initializer: Option<fn(&mut T)>,
    /// Receiving half of the return queue. `None` once disposed.
    returns: Option<Receiver<PoolEventArgs>>,
}

impl<T: Poolable> Pool<T> {
    /// Creates a pool with `capacity` pre-constructed slots.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            u32::try_from(capacity).is_ok(),
            "Capacity cannot exceed u32::MAX"
        );

        // One pending notification per node at most
        let (tx, rx): (Sender<PoolEventArgs>, Receiver<PoolEventArgs>) = bounded(capacity);

        #[allow(clippy::cast_possible_truncation)]
        let nodes = (0..capacity as u32)
            .map(|i| {
                let index = NodeIndex::new(i);
                let mut item = T::default();
                item.pool_item_mut().node = Some(index);
                PoolNode::new(index, item, tx.clone())
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let free_list: Vec<NodeIndex> = free_indices(capacity).collect();

        tracing::info!(
            "Pool created: {} x {}",
            capacity,
            std::any::type_name::<T>()
        );

        Self {
            nodes,
            free_list,
            in_use_count: 0,
            manager: None,
            initializer: None,
            returns: Some(rx),
        }
    }

    /// Creates a pool whose bulk attribute update also runs `initializer` on
    /// every item.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn with_initializer(capacity: usize, initializer: fn(&mut T)) -> Self {
        let mut pool = Self::new(capacity);
        pool.initializer = Some(initializer);
        pool
    }

    /// Returns the type identity of the pooled items.
    #[inline]
    #[must_use]
    pub fn item_type(&self) -> ItemType {
        ItemType::of::<T>()
    }

    /// Returns the fixed capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of slots handed out.
    #[inline]
    #[must_use]
    pub const fn in_use_count(&self) -> usize {
        self.in_use_count
    }

    /// Returns the number of free slots.
    #[inline]
    #[must_use]
    pub fn available_count(&self) -> usize {
        self.free_list.len()
    }

    /// Returns whether the pool has been torn down.
    #[inline]
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.returns.is_none()
    }

    /// Returns the manager stamped onto items at acquire.
    #[inline]
    #[must_use]
    pub const fn manager(&self) -> Option<ManagerId> {
        self.manager
    }

    /// Claims a free slot.
    ///
    /// This is a **O(1)** operation with **zero heap allocations**. The
    /// returned node's item is marked in use and carries the pool's manager.
    ///
    /// # Errors
    ///
    /// `PoolExhausted` if every slot is in use, `Disposed` after teardown.
    pub fn acquire(&mut self) -> PoolResult<&mut PoolNode<T>> {
        self.ensure_live()?;

        let Some(index) = self.free_list.pop() else {
            tracing::debug!(
                "Pool exhausted: {} x {}",
                self.capacity(),
                std::any::type_name::<T>()
            );
            return Err(PoolError::PoolExhausted {
                item_type: self.item_type(),
                capacity: self.capacity(),
            });
        };

        let manager = self.manager;
        let node = &mut self.nodes[index.as_usize()];

        let bookkeeping = node.item_mut().pool_item_mut();
        bookkeeping.node = Some(index);
        bookkeeping.manager = manager;
        bookkeeping.in_use = true;

        self.in_use_count += 1;
        Ok(node)
    }

    /// Gives a slot back.
    ///
    /// Runs the item's reset hook, clears `InUse` and the manager reference,
    /// and re-admits the slot to the free set. **O(1)**, no allocation.
    ///
    /// # Errors
    ///
    /// `InvalidNodeState` if the index is out of range, the slot is already
    /// free or a return notification for it is already queued, `Disposed`
    /// after teardown.
    pub fn release(&mut self, index: NodeIndex) -> PoolResult<()> {
        self.release_slot(index, false).map_err(|err| {
            tracing::warn!("Rejected release of {}: {}", std::any::type_name::<T>(), err);
            err
        })
    }

    /// `pending` says whether the release consumes a queued notification.
    fn release_slot(&mut self, index: NodeIndex, pending: bool) -> PoolResult<()> {
        self.ensure_live()?;

        let capacity = self.capacity();
        let Some(node) = self.nodes.get_mut(index.as_usize()) else {
            return Err(reject(index, NodeStateReason::OutOfRange { capacity }));
        };
        if !node.in_use() {
            return Err(reject(index, NodeStateReason::AlreadyFree));
        }
        node.end_tenancy(pending).map_err(|reason| reject(index, reason))?;

        // The reset hook may overwrite the whole item; the link must survive it
        let bookkeeping = *node.item().pool_item();
        node.item_mut().reset_to_default_values();
        *node.item_mut().pool_item_mut() = bookkeeping.released();

        self.free_list.push(index);
        self.in_use_count -= 1;
        Ok(())
    }

    /// Creates a detached return handle for the current tenant of `index`.
    ///
    /// # Errors
    ///
    /// `InvalidNodeState` if the index is out of range or the slot is free.
    pub fn return_handle(&self, index: NodeIndex) -> PoolResult<ReturnHandle> {
        self.node(index)?.return_handle()
    }

    /// Drains the return queue, releasing every slot whose notification is
    /// still valid.
    ///
    /// Call once per tick from the owning thread. Double and stale returns
    /// are rejected, counted and logged; they never abort the drain.
    pub fn process_returns(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        let Some(returns) = self.returns.clone() else {
            return report;
        };

        for args in returns.try_iter() {
            match self.release_returned(args) {
                Ok(()) => report.released += 1,
                Err(err) => {
                    tracing::warn!("Rejected return to {}: {}", std::any::type_name::<T>(), err);
                    report.rejected += 1;
                }
            }
        }

        if report.released + report.rejected > 0 {
            tracing::debug!(
                "Drained returns for {}: {} released, {} rejected",
                std::any::type_name::<T>(),
                report.released,
                report.rejected
            );
        }
        report
    }

    fn release_returned(&mut self, args: PoolEventArgs) -> PoolResult<()> {
        let node = self.node(args.node_index)?;
        if node.generation() != args.generation {
            // Raised before a bulk clear ended its tenancy
            node.clear_return_pending();
            return Err(reject(args.node_index, NodeStateReason::StaleReturn));
        }
        self.release_slot(args.node_index, true)
    }

    /// Returns the node at `index`.
    ///
    /// # Errors
    ///
    /// `InvalidNodeState` if the index is out of range.
    pub fn node(&self, index: NodeIndex) -> PoolResult<&PoolNode<T>> {
        let capacity = self.capacity();
        self.nodes
            .get(index.as_usize())
            .ok_or(reject(index, NodeStateReason::OutOfRange { capacity }))
    }

    /// Returns the node at `index` mutably.
    ///
    /// # Errors
    ///
    /// `InvalidNodeState` if the index is out of range.
    pub fn node_mut(&mut self, index: NodeIndex) -> PoolResult<&mut PoolNode<T>> {
        let capacity = self.capacity();
        self.nodes
            .get_mut(index.as_usize())
            .ok_or(reject(index, NodeStateReason::OutOfRange { capacity }))
    }

    /// Returns the item at `index` if it is handed out.
    #[inline]
    #[must_use]
    pub fn get(&self, index: NodeIndex) -> Option<&T> {
        self.nodes
            .get(index.as_usize())
            .filter(|node| node.in_use())
            .map(PoolNode::item)
    }

    /// Returns the item at `index` mutably if it is handed out.
    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut T> {
        self.nodes
            .get_mut(index.as_usize())
            .filter(|node| node.in_use())
            .map(PoolNode::item_mut)
    }

    /// Iterates over every node, free and in use.
    ///
    /// The iterator is `Clone`, so it can be restarted; it has no side effects.
    pub fn all_nodes(&self) -> std::slice::Iter<'_, PoolNode<T>> {
        self.nodes.iter()
    }

    /// Iterates mutably over every node, free and in use.
    pub fn all_nodes_mut(&mut self) -> std::slice::IterMut<'_, PoolNode<T>> {
        self.nodes.iter_mut()
    }

    /// Iterates over the nodes currently handed out.
    pub fn in_use_nodes(&self) -> impl Iterator<Item = &PoolNode<T>> + Clone {
        self.nodes.iter().filter(|node| node.in_use())
    }

    /// Re-links every item to its node and runs the value initializer.
    pub(crate) fn bind_nodes(&mut self) {
        let initializer = self.initializer;
        for node in self.nodes.iter_mut() {
            let index = node.index();
            let item = node.item_mut();
            item.pool_item_mut().node = Some(index);
            if let Some(init) = initializer {
                init(item);
            }
        }
    }

    /// Stamps `manager` and `owner` onto the pool and every item.
    pub(crate) fn bind_manager(&mut self, manager: ManagerId, owner: Option<OwnerKey>) {
        self.bind_nodes();
        self.manager = Some(manager);
        for node in self.nodes.iter_mut() {
            let bookkeeping = node.item_mut().pool_item_mut();
            bookkeeping.manager = Some(manager);
            bookkeeping.owner = owner;
        }
        tracing::info!(
            "Pool of {} bound to manager {} (owner {:?})",
            std::any::type_name::<T>(),
            manager.get(),
            owner
        );
    }

    /// Clears `InUse` and the manager reference on every item without running
    /// reset hooks, and makes every slot free again.
    pub(crate) fn clear_node_attributes(&mut self) {
        for node in self.nodes.iter_mut() {
            node.advance_generation();
            let bookkeeping = node.item_mut().pool_item_mut();
            bookkeeping.in_use = false;
            bookkeeping.manager = None;
        }

        self.free_list.clear();
        self.free_list.extend(free_indices(self.nodes.len()));
        self.in_use_count = 0;

        // Anything still queued names a tenancy that no longer exists
        if let Some(returns) = &self.returns {
            for args in returns.try_iter() {
                if let Some(node) = self.nodes.get(args.node_index.as_usize()) {
                    node.clear_return_pending();
                }
            }
        }
    }

    /// Tears the pool down. Terminal: later acquire/release fail with
    /// `Disposed` and outstanding return handles see a closed queue.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.clear_node_attributes();
        for node in self.nodes.iter() {
            node.close();
        }
        self.manager = None;
        self.returns = None;
        tracing::info!(
            "Pool disposed: {} x {}",
            self.capacity(),
            std::any::type_name::<T>()
        );
    }

    #[inline]
    fn ensure_live(&self) -> PoolResult<()> {
        if self.is_disposed() {
            Err(PoolError::Disposed)
        } else {
            Ok(())
        }
    }
}

/// Every slot index, highest first: popped from the back, slot 0 goes out first.
#[allow(clippy::cast_possible_truncation)]
fn free_indices(capacity: usize) -> impl Iterator<Item = NodeIndex> {
    (0..capacity as u32).rev().map(NodeIndex::new)
}

#[inline]
const fn reject(index: NodeIndex, reason: NodeStateReason) -> PoolError {
    PoolError::InvalidNodeState { index, reason }
}
