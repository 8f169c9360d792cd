//! # Pool Managers
//!
//! Type-keyed coordination over the typed pools an engine subsystem owns.
//!
//! A concrete manager owns its pools (one per poolable entity type, possibly
//! partitioned per owner) and is constructed once at startup, then passed to
//! whichever subsystems spawn and despawn entities.

use crate::error::{PoolError, PoolResult};
use crate::item::{ItemType, ManagerId, OwnerKey, Poolable};
use crate::pool::Pool;

/// Contract of a pool manager.
///
/// The type queries and `dispose` are object safe; the bulk bookkeeping
/// helpers are generic and provided.
pub trait PoolManagerBase {
    /// Identity stamped onto items acquired through this manager.
    fn manager_id(&self) -> ManagerId;

    /// Number of free slots across the pools holding `item_type`.
    ///
    /// # Errors
    ///
    /// `UnknownItemType` if the manager owns no pool of that type.
    fn pool_item_available_count(&self, item_type: ItemType) -> PoolResult<usize>;

    /// Fixed capacity across the pools holding `item_type`.
    ///
    /// # Errors
    ///
    /// `UnknownItemType` if the manager owns no pool of that type.
    fn pool_item_capacity(&self, item_type: ItemType) -> PoolResult<usize>;

    /// Tears down every owned pool.
    fn dispose(&mut self);

    /// Wires every item's node back-reference and runs the pool's value
    /// initializer. Called once after a pool is constructed.
    fn update_pool_nodes_atts<T: Poolable>(pool: &mut Pool<T>)
    where
        Self: Sized,
    {
        pool.bind_nodes();
    }

    /// Like [`update_pool_nodes_atts`](Self::update_pool_nodes_atts), and
    /// also stamps `manager` and `owner` onto every item. Used when one pool
    /// per owner partitions an entity type.
    fn update_pool_nodes_atts_for_owner<T: Poolable>(
        pool: &mut Pool<T>,
        manager: ManagerId,
        owner: OwnerKey,
    ) where
        Self: Sized,
    {
        pool.bind_manager(manager, Some(owner));
    }

    /// Stamps `manager` onto a pool shared by every owner.
    fn update_pool_nodes_atts_for_manager<T: Poolable>(pool: &mut Pool<T>, manager: ManagerId)
    where
        Self: Sized,
    {
        pool.bind_manager(manager, None);
    }

    /// Clears `InUse` and the manager reference on every item, without
    /// running reset hooks. Used for teardown and full-pool recycling.
    fn dispose_pool_nodes_attributes<T: Poolable>(pool: &mut Pool<T>)
    where
        Self: Sized,
    {
        pool.clear_node_attributes();
    }

    /// Free slots for items of type `T`.
    ///
    /// # Errors
    ///
    /// `UnknownItemType` if the manager owns no pool of `T`.
    fn available_count_of<T: 'static>(&self) -> PoolResult<usize>
    where
        Self: Sized,
    {
        self.pool_item_available_count(ItemType::of::<T>())
    }

    /// Capacity for items of type `T`.
    ///
    /// # Errors
    ///
    /// `UnknownItemType` if the manager owns no pool of `T`.
    fn capacity_of<T: 'static>(&self) -> PoolResult<usize>
    where
        Self: Sized,
    {
        self.pool_item_capacity(ItemType::of::<T>())
    }
}

/// Error for a type query the manager cannot answer.
#[inline]
#[must_use]
pub fn unknown_item_type(item_type: ItemType) -> PoolError {
    PoolError::UnknownItemType { item_type }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{PoolItem, PoolNodeItem, ResetDefaults};

    #[derive(Default)]
    struct Crate {
        pool: PoolItem,
        label: u32,
    }

    impl PoolNodeItem for Crate {
        fn pool_item(&self) -> &PoolItem {
            &self.pool
        }

        fn pool_item_mut(&mut self) -> &mut PoolItem {
            &mut self.pool
        }
    }

    impl ResetDefaults for Crate {
        fn reset_to_default_values(&mut self) {
            self.label = 0;
        }
    }

    struct CrateManager {
        id: ManagerId,
        crates: Pool<Crate>,
    }

    impl CrateManager {
        fn new(capacity: usize) -> Self {
            let id = ManagerId::new(7);
            let mut crates = Pool::with_initializer(capacity, |item: &mut Crate| item.label = 99);
            Self::update_pool_nodes_atts(&mut crates);
            Self::update_pool_nodes_atts_for_owner(&mut crates, id, OwnerKey(1));
            Self { id, crates }
        }
    }

    impl PoolManagerBase for CrateManager {
        fn manager_id(&self) -> ManagerId {
            self.id
        }

        fn pool_item_available_count(&self, item_type: ItemType) -> PoolResult<usize> {
            if item_type.is::<Crate>() {
                Ok(self.crates.available_count())
            } else {
                Err(unknown_item_type(item_type))
            }
        }

        fn pool_item_capacity(&self, item_type: ItemType) -> PoolResult<usize> {
            if item_type.is::<Crate>() {
                Ok(self.crates.capacity())
            } else {
                Err(unknown_item_type(item_type))
            }
        }

        fn dispose(&mut self) {
            self.crates.dispose();
        }
    }

    #[test]
    fn test_capacity_and_availability() {
        let mut manager = CrateManager::new(10);
        let mut held = Vec::new();

        for expected_in_use in 0..10 {
            assert_eq!(manager.capacity_of::<Crate>(), Ok(10));
            assert_eq!(manager.available_count_of::<Crate>(), Ok(10 - expected_in_use));
            held.push(manager.crates.acquire().unwrap().index());
        }
        assert_eq!(manager.available_count_of::<Crate>(), Ok(0));

        for (released, index) in held.into_iter().enumerate() {
            manager.crates.release(index).unwrap();
            assert_eq!(manager.available_count_of::<Crate>(), Ok(released + 1));
            assert_eq!(manager.capacity_of::<Crate>(), Ok(10));
        }
    }

    #[test]
    fn test_unknown_item_type() {
        let manager = CrateManager::new(2);
        assert_eq!(
            manager.capacity_of::<String>(),
            Err(PoolError::UnknownItemType {
                item_type: ItemType::of::<String>()
            })
        );
        assert!(manager.available_count_of::<u8>().is_err());
    }

    #[test]
    fn test_bulk_attribute_update() {
        let mut manager = CrateManager::new(3);
        let id = manager.manager_id();

        for node in manager.crates.all_nodes() {
            assert_eq!(node.item().label, 99);
            assert_eq!(node.item().pool_node(), Some(node.index()));
            assert_eq!(node.item().owner(), Some(OwnerKey(1)));
            assert_eq!(node.item().pool_manager(), Some(id));
        }

        let index = manager.crates.acquire().unwrap().index();
        assert_eq!(manager.crates.get(index).unwrap().pool_manager(), Some(id));

        manager.crates.release(index).unwrap();
        assert_eq!(manager.crates.node(index).unwrap().item().pool_manager(), None);

        // Fresh manager reference on the next tenant
        let index = manager.crates.acquire().unwrap().index();
        assert_eq!(manager.crates.get(index).unwrap().pool_manager(), Some(id));
    }

    #[test]
    fn test_dispose_node_attributes_recycles() {
        let mut manager = CrateManager::new(4);
        for _ in 0..4 {
            manager.crates.acquire().unwrap();
        }

        CrateManager::dispose_pool_nodes_attributes(&mut manager.crates);

        assert_eq!(manager.available_count_of::<Crate>(), Ok(4));
        assert!(manager
            .crates
            .all_nodes()
            .all(|node| !node.in_use() && node.item().pool_manager().is_none()));
        assert!(manager.crates.acquire().is_ok());

        manager.dispose();
        assert!(manager.crates.is_disposed());
    }
}
