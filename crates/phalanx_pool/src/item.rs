//! # Poolable Items
//!
//! The contracts an entity type satisfies to live inside a [`Pool`](crate::Pool).
//!
//! Pools are generic over any type implementing both capabilities, not over a
//! base class. Entity types embed a [`PoolItem`] block for the bookkeeping and
//! keep their own fields next to it:
//!
//! ```rust,ignore
//! #[derive(Default)]
//! struct Projectile {
//!     pool: PoolItem,
//!     damage: u32,
//! }
//!
//! impl PoolNodeItem for Projectile {
//!     fn pool_item(&self) -> &PoolItem { &self.pool }
//!     fn pool_item_mut(&mut self) -> &mut PoolItem { &mut self.pool }
//! }
//!
//! impl ResetDefaults for Projectile {
//!     fn reset_to_default_values(&mut self) { self.damage = 0; }
//! }
//! ```

use std::any::{type_name, TypeId};
use std::fmt;

use crate::node::NodeIndex;

/// Non-owning reference to a pool manager.
///
/// Chosen by whoever builds the manager, typically from a match or session id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ManagerId(u32);

impl ManagerId {
    /// Creates a manager identity.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Discriminator stamped on items of a pool partitioned per owner
/// (typically the player number).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct OwnerKey(pub u8);

/// Runtime identity of a poolable type, used for type-keyed manager queries.
#[derive(Clone, Copy, Debug)]
pub struct ItemType {
    id: TypeId,
    name: &'static str,
}

impl ItemType {
    /// Returns the identity of `T`.
    #[inline]
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns whether this identity names `T`.
    #[inline]
    #[must_use]
    pub fn is<T: 'static>(self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Returns the type name.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for ItemType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ItemType {}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Pool bookkeeping carried by every poolable item.
///
/// Everything except `reduce_ifd_counter` is written only by pool machinery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolItem {
    pub(crate) node: Option<NodeIndex>,
    pub(crate) manager: Option<ManagerId>,
    pub(crate) owner: Option<OwnerKey>,
    pub(crate) in_use: bool,
    reduce_ifd_counter: bool,
}

impl PoolItem {
    /// Creates an unbound, free bookkeeping block.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            node: None,
            manager: None,
            owner: None,
            in_use: false,
            reduce_ifd_counter: true,
        }
    }

    /// Returns the node this item is linked to.
    #[inline]
    #[must_use]
    pub const fn node(&self) -> Option<NodeIndex> {
        self.node
    }

    /// Returns the manager the item is currently loaned through.
    #[inline]
    #[must_use]
    pub const fn manager(&self) -> Option<ManagerId> {
        self.manager
    }

    /// Returns the owner stamped on the item's pool partition.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> Option<OwnerKey> {
        self.owner
    }

    /// Returns whether the item is handed out.
    #[inline]
    #[must_use]
    pub const fn in_use(&self) -> bool {
        self.in_use
    }

    /// Opaque accounting flag consumed by the build-queue UI.
    #[inline]
    #[must_use]
    pub const fn reduce_ifd_counter(&self) -> bool {
        self.reduce_ifd_counter
    }

    /// Sets the accounting flag.
    #[inline]
    pub fn set_reduce_ifd_counter(&mut self, value: bool) {
        self.reduce_ifd_counter = value;
    }

    /// Bookkeeping for a slot that just went back to the free set.
    pub(crate) const fn released(self) -> Self {
        Self {
            node: self.node,
            manager: None,
            owner: self.owner,
            in_use: false,
            reduce_ifd_counter: true,
        }
    }
}

impl Default for PoolItem {
    fn default() -> Self {
        Self::new()
    }
}

/// Node-tracking capability.
///
/// Implementors only expose their embedded [`PoolItem`]; the accessors are
/// provided.
pub trait PoolNodeItem {
    /// Returns the embedded bookkeeping block.
    fn pool_item(&self) -> &PoolItem;

    /// Returns the embedded bookkeeping block mutably.
    fn pool_item_mut(&mut self) -> &mut PoolItem;

    /// Node this item lives in.
    #[inline]
    fn pool_node(&self) -> Option<NodeIndex> {
        self.pool_item().node()
    }

    /// Manager the item is loaned through.
    #[inline]
    fn pool_manager(&self) -> Option<ManagerId> {
        self.pool_item().manager()
    }

    /// Owner of the item's pool partition.
    #[inline]
    fn owner(&self) -> Option<OwnerKey> {
        self.pool_item().owner()
    }

    /// Whether the item is handed out.
    #[inline]
    fn in_use(&self) -> bool {
        self.pool_item().in_use()
    }

    /// Opaque accounting flag.
    #[inline]
    fn reduce_ifd_counter(&self) -> bool {
        self.pool_item().reduce_ifd_counter()
    }

    /// Sets the opaque accounting flag.
    #[inline]
    fn set_reduce_ifd_counter(&mut self, value: bool) {
        self.pool_item_mut().set_reduce_ifd_counter(value);
    }
}

/// Reset capability.
pub trait ResetDefaults {
    /// Clears every domain field.
    ///
    /// After this returns, no field may hold information from the previous
    /// tenant. The pool cannot check this; a missed field leaks silently into
    /// the next acquirer.
    fn reset_to_default_values(&mut self);
}

/// Anything a [`Pool`](crate::Pool) can hold.
pub trait Poolable: PoolNodeItem + ResetDefaults + Default + 'static {}

impl<T> Poolable for T where T: PoolNodeItem + ResetDefaults + Default + 'static {}
