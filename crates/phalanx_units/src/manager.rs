//! # Match Pool Manager
//!
//! Owns every entity pool of one match. Units and buildings are partitioned
//! with one pool per player; projectiles and explosion pieces share a pool.
//!
//! The manager is built once when the match loads and handed by reference to
//! the subsystems that spawn and destroy entities. There is no global
//! instance.
//!
//! ## Frame Protocol
//!
//! ```text
//! gameplay:  spawn_* / despawn_*        (owner thread, immediate)
//! anywhere:  ReturnHandle::return_to_pool (queued)
//! end of frame: tick(dt)                (moves shells/debris, expires them,
//!                                        drains every return queue)
//! ```

use phalanx_pool::{
    unknown_item_type, DrainReport, ItemType, ManagerId, NodeIndex, OwnerKey, Pool,
    PoolManagerBase, PoolResult, Poolable,
};

use crate::components::{Position, Velocity};
use crate::config::PoolCapacities;
use crate::entities::{Building, BuildingKind, ExplosionPiece, Projectile, Unit, UnitKind};
use crate::error::{ConfigError, MatchError, MatchResult};

/// Seconds a projectile may fly before it is expired.
pub const PROJECTILE_TTL: f32 = 4.0;

/// Seconds an explosion piece stays visible.
pub const EXPLOSION_PIECE_TTL: f32 = 1.2;

/// Outward speed of explosion pieces, world units per second.
const EXPLOSION_SPEED: f32 = 6.0;

/// All entity pools of one match.
pub struct MatchPoolManager {
    id: ManagerId,
    /// One pool per player, indexed by player number.
    units: Box<[Pool<Unit>]>,
    /// One pool per player, indexed by player number.
    buildings: Box<[Pool<Building>]>,
    projectiles: Pool<Projectile>,
    explosion_pieces: Pool<ExplosionPiece>,
}

impl MatchPoolManager {
    /// Allocates every pool of a match up front. `id` is stamped onto every
    /// item acquired through this manager.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `capacities` are invalid.
    pub fn new(id: ManagerId, capacities: &PoolCapacities) -> Result<Self, ConfigError> {
        capacities.validate()?;

        let units: Box<[Pool<Unit>]> = (0..capacities.players)
            .map(|player| Self::player_pool(capacities.units_per_player, id, player))
            .collect();
        let buildings: Box<[Pool<Building>]> = (0..capacities.players)
            .map(|player| Self::player_pool(capacities.buildings_per_player, id, player))
            .collect();

        let mut projectiles = Pool::with_initializer(capacities.projectiles, |p: &mut Projectile| {
            p.ttl = PROJECTILE_TTL;
        });
        Self::update_pool_nodes_atts_for_manager(&mut projectiles, id);

        let mut explosion_pieces =
            Pool::with_initializer(capacities.explosion_pieces, |p: &mut ExplosionPiece| {
                p.ttl = EXPLOSION_PIECE_TTL;
            });
        Self::update_pool_nodes_atts_for_manager(&mut explosion_pieces, id);

        tracing::info!(
            "Match pools ready: {} players, {} slots",
            capacities.players,
            capacities.total_slots()
        );

        Ok(Self {
            id,
            units,
            buildings,
            projectiles,
            explosion_pieces,
        })
    }

    fn player_pool<T: Poolable>(capacity: usize, manager: ManagerId, player: u8) -> Pool<T> {
        let mut pool = Pool::new(capacity);
        Self::update_pool_nodes_atts_for_owner(&mut pool, manager, OwnerKey(player));
        pool
    }

    /// Number of players in the match.
    #[inline]
    #[must_use]
    pub fn players(&self) -> u8 {
        player_count(&self.units)
    }

    /// Unit pool of `player`.
    ///
    /// # Errors
    ///
    /// `UnknownPlayer` if the player is not in the match.
    pub fn units(&self, player: u8) -> MatchResult<&Pool<Unit>> {
        partition(&self.units, player)
    }

    /// Unit pool of `player`, mutably.
    ///
    /// # Errors
    ///
    /// `UnknownPlayer` if the player is not in the match.
    pub fn units_mut(&mut self, player: u8) -> MatchResult<&mut Pool<Unit>> {
        partition_mut(&mut self.units, player)
    }

    /// Building pool of `player`.
    ///
    /// # Errors
    ///
    /// `UnknownPlayer` if the player is not in the match.
    pub fn buildings(&self, player: u8) -> MatchResult<&Pool<Building>> {
        partition(&self.buildings, player)
    }

    /// Building pool of `player`, mutably.
    ///
    /// # Errors
    ///
    /// `UnknownPlayer` if the player is not in the match.
    pub fn buildings_mut(&mut self, player: u8) -> MatchResult<&mut Pool<Building>> {
        partition_mut(&mut self.buildings, player)
    }

    /// Shared projectile pool.
    #[inline]
    #[must_use]
    pub const fn projectiles(&self) -> &Pool<Projectile> {
        &self.projectiles
    }

    /// Shared projectile pool, mutably.
    #[inline]
    pub fn projectiles_mut(&mut self) -> &mut Pool<Projectile> {
        &mut self.projectiles
    }

    /// Shared explosion piece pool.
    #[inline]
    #[must_use]
    pub const fn explosion_pieces(&self) -> &Pool<ExplosionPiece> {
        &self.explosion_pieces
    }

    /// Spawns a unit for `player`.
    ///
    /// # Errors
    ///
    /// `UnknownPlayer`, or `PoolExhausted` when the player is at the unit cap.
    pub fn spawn_unit(
        &mut self,
        player: u8,
        kind: UnitKind,
        position: Position,
    ) -> MatchResult<NodeIndex> {
        let node = self.units_mut(player)?.acquire()?;
        node.item_mut().spawn(kind, position);
        Ok(node.index())
    }

    /// Releases a unit of `player`.
    ///
    /// # Errors
    ///
    /// `UnknownPlayer`, or `InvalidNodeState` for a free or foreign index.
    pub fn despawn_unit(&mut self, player: u8, unit: NodeIndex) -> MatchResult<()> {
        Ok(self.units_mut(player)?.release(unit)?)
    }

    /// Places a building site for `player`.
    ///
    /// # Errors
    ///
    /// `UnknownPlayer`, or `PoolExhausted` when the player is at the building cap.
    pub fn spawn_building(
        &mut self,
        player: u8,
        kind: BuildingKind,
        position: Position,
    ) -> MatchResult<NodeIndex> {
        let node = self.buildings_mut(player)?.acquire()?;
        node.item_mut().place(kind, position);
        Ok(node.index())
    }

    /// Releases a building of `player`.
    ///
    /// # Errors
    ///
    /// `UnknownPlayer`, or `InvalidNodeState` for a free or foreign index.
    pub fn despawn_building(&mut self, player: u8, building: NodeIndex) -> MatchResult<()> {
        Ok(self.buildings_mut(player)?.release(building)?)
    }

    /// Fires a projectile.
    ///
    /// # Errors
    ///
    /// `PoolExhausted` when every projectile slot is in flight.
    pub fn fire_projectile(
        &mut self,
        position: Position,
        velocity: Velocity,
        damage: u32,
        source: Option<NodeIndex>,
    ) -> MatchResult<NodeIndex> {
        let node = self.projectiles.acquire()?;
        let projectile = node.item_mut();
        projectile.position = position;
        projectile.velocity = velocity;
        projectile.damage = damage;
        projectile.ttl = PROJECTILE_TTL;
        projectile.source = source;
        Ok(node.index())
    }

    /// Spawns up to `pieces` fragments flying outward from `origin`.
    ///
    /// Returns how many were spawned. Fragments are cosmetic: once the pool is
    /// exhausted the rest are dropped.
    pub fn spawn_explosion(&mut self, origin: Position, pieces: usize) -> usize {
        let mut spawned = 0;
        #[allow(clippy::cast_precision_loss)]
        let step = std::f32::consts::TAU / pieces.max(1) as f32;

        for i in 0..pieces {
            let Ok(node) = self.explosion_pieces.acquire() else {
                break;
            };
            #[allow(clippy::cast_precision_loss)]
            let angle = step * i as f32;
            let piece = node.item_mut();
            piece.position = origin;
            piece.velocity = Velocity::new(
                angle.cos() * EXPLOSION_SPEED,
                EXPLOSION_SPEED * 0.5,
                angle.sin() * EXPLOSION_SPEED,
            );
            piece.spin = angle;
            piece.ttl = EXPLOSION_PIECE_TTL;
            spawned += 1;
        }

        if spawned < pieces {
            tracing::debug!("Explosion truncated: {} of {} pieces", spawned, pieces);
        }
        spawned
    }

    /// End-of-frame maintenance.
    ///
    /// Moves projectiles and explosion pieces, returns the expired ones to
    /// their pools, then drains every pool's return queue.
    pub fn tick(&mut self, dt: f32) -> DrainReport {
        for node in self.projectiles.all_nodes_mut().filter(|n| n.in_use()) {
            let projectile = node.item_mut();
            projectile.position.advance(projectile.velocity, dt);
            projectile.ttl -= dt;
            if projectile.ttl <= 0.0 && !node.is_return_pending() {
                if let Err(err) = node.return_to_pool() {
                    tracing::warn!("Expired projectile not returned: {}", err);
                }
            }
        }

        for node in self.explosion_pieces.all_nodes_mut().filter(|n| n.in_use()) {
            let piece = node.item_mut();
            piece.position.advance(piece.velocity, dt);
            piece.ttl -= dt;
            if piece.ttl <= 0.0 && !node.is_return_pending() {
                if let Err(err) = node.return_to_pool() {
                    tracing::warn!("Expired explosion piece not returned: {}", err);
                }
            }
        }

        let mut report = self.projectiles.process_returns();
        report = report.merge(self.explosion_pieces.process_returns());
        for pool in self.units.iter_mut() {
            report = report.merge(pool.process_returns());
        }
        for pool in self.buildings.iter_mut() {
            report = report.merge(pool.process_returns());
        }
        report
    }

    /// Recycles every pool for a level reload.
    ///
    /// Slots become free without running reset hooks. Every spawn helper
    /// writes all domain fields of the slot it acquires, so nothing of the
    /// previous level survives into the next tenant.
    pub fn recycle_all(&mut self) {
        for pool in self.units.iter_mut() {
            Self::dispose_pool_nodes_attributes(pool);
        }
        for pool in self.buildings.iter_mut() {
            Self::dispose_pool_nodes_attributes(pool);
        }
        Self::dispose_pool_nodes_attributes(&mut self.projectiles);
        Self::dispose_pool_nodes_attributes(&mut self.explosion_pieces);
        tracing::info!("Match pools recycled");
    }

    fn sum_over<F>(&self, item_type: ItemType, per_pool: F) -> PoolResult<usize>
    where
        F: Fn(PoolStats) -> usize,
    {
        let total = if item_type.is::<Unit>() {
            self.units.iter().map(|p| per_pool(PoolStats::of(p))).sum::<usize>()
        } else if item_type.is::<Building>() {
            self.buildings.iter().map(|p| per_pool(PoolStats::of(p))).sum::<usize>()
        } else if item_type.is::<Projectile>() {
            per_pool(PoolStats::of(&self.projectiles))
        } else if item_type.is::<ExplosionPiece>() {
            per_pool(PoolStats::of(&self.explosion_pieces))
        } else {
            return Err(unknown_item_type(item_type));
        };
        Ok(total)
    }
}

/// Number of players in a per-player partition.
#[allow(clippy::cast_possible_truncation)]
fn player_count<T: Poolable>(pools: &[Pool<T>]) -> u8 {
    // Built from a u8 player count
    pools.len() as u8
}

/// Pool of `player` in a per-player partition.
fn partition<T: Poolable>(pools: &[Pool<T>], player: u8) -> MatchResult<&Pool<T>> {
    let players = player_count(pools);
    pools
        .get(usize::from(player))
        .ok_or(MatchError::UnknownPlayer { player, players })
}

/// Pool of `player` in a per-player partition, mutably.
fn partition_mut<T: Poolable>(pools: &mut [Pool<T>], player: u8) -> MatchResult<&mut Pool<T>> {
    let players = player_count(pools);
    pools
        .get_mut(usize::from(player))
        .ok_or(MatchError::UnknownPlayer { player, players })
}

/// Counts read from one pool.
#[derive(Clone, Copy)]
struct PoolStats {
    capacity: usize,
    available: usize,
}

impl PoolStats {
    fn of<T: Poolable>(pool: &Pool<T>) -> Self {
        Self {
            capacity: pool.capacity(),
            available: pool.available_count(),
        }
    }
}

impl PoolManagerBase for MatchPoolManager {
    fn manager_id(&self) -> ManagerId {
        self.id
    }

    fn pool_item_available_count(&self, item_type: ItemType) -> PoolResult<usize> {
        self.sum_over(item_type, |stats| stats.available)
    }

    fn pool_item_capacity(&self, item_type: ItemType) -> PoolResult<usize> {
        self.sum_over(item_type, |stats| stats.capacity)
    }

    fn dispose(&mut self) {
        for pool in self.units.iter_mut() {
            pool.dispose();
        }
        for pool in self.buildings.iter_mut() {
            pool.dispose();
        }
        self.projectiles.dispose();
        self.explosion_pieces.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phalanx_pool::{PoolError, PoolNodeItem};

    fn small() -> PoolCapacities {
        PoolCapacities {
            players: 2,
            units_per_player: 3,
            buildings_per_player: 2,
            projectiles: 4,
            explosion_pieces: 8,
        }
    }

    fn small_match() -> MatchPoolManager {
        MatchPoolManager::new(ManagerId::new(1), &small()).unwrap()
    }

    #[test]
    fn test_units_are_partitioned_per_player() {
        let mut manager = small_match();
        let a = manager.spawn_unit(0, UnitKind::Tank, Position::ORIGIN).unwrap();
        let b = manager.spawn_unit(1, UnitKind::Infantry, Position::ORIGIN).unwrap();

        // Same slot index, different partitions
        assert_eq!(a, b);
        let tank = manager.units(0).unwrap().get(a).unwrap();
        assert_eq!(tank.owner(), Some(OwnerKey(0)));
        assert_eq!(tank.health, 400);
        assert_eq!(tank.pool_manager(), Some(manager.manager_id()));
        assert_eq!(
            manager.units(1).unwrap().get(b).unwrap().owner(),
            Some(OwnerKey(1))
        );
    }

    #[test]
    fn test_unknown_player() {
        let mut manager = small_match();
        assert_eq!(
            manager.spawn_unit(5, UnitKind::Tank, Position::ORIGIN),
            Err(MatchError::UnknownPlayer {
                player: 5,
                players: 2
            })
        );
    }

    #[test]
    fn test_type_queries_sum_partitions() {
        let mut manager = small_match();
        assert_eq!(manager.capacity_of::<Unit>(), Ok(6));
        assert_eq!(manager.capacity_of::<Building>(), Ok(4));
        assert_eq!(manager.capacity_of::<Projectile>(), Ok(4));

        manager.spawn_unit(1, UnitKind::Harvester, Position::ORIGIN).unwrap();
        assert_eq!(manager.available_count_of::<Unit>(), Ok(5));
        assert_eq!(manager.capacity_of::<Unit>(), Ok(6));

        assert_eq!(
            manager.capacity_of::<String>(),
            Err(PoolError::UnknownItemType {
                item_type: ItemType::of::<String>()
            })
        );
    }

    #[test]
    fn test_projectiles_expire_on_tick() {
        let mut manager = small_match();
        let shell = manager
            .fire_projectile(Position::ORIGIN, Velocity::new(10.0, 0.0, 0.0), 25, None)
            .unwrap();

        let report = manager.tick(1.0);
        assert_eq!(report.released, 0);
        let x = manager.projectiles().get(shell).unwrap().position.x;
        assert!((x - 10.0).abs() < 1e-4);

        let report = manager.tick(PROJECTILE_TTL);
        assert_eq!(report, DrainReport { released: 1, rejected: 0 });
        assert!(manager.projectiles().get(shell).is_none());
        assert_eq!(manager.available_count_of::<Projectile>(), Ok(4));
    }

    #[test]
    fn test_explosion_truncates_when_exhausted() {
        let mut manager = small_match();
        assert_eq!(manager.spawn_explosion(Position::ORIGIN, 5), 5);
        assert_eq!(manager.spawn_explosion(Position::ORIGIN, 5), 3);
        assert_eq!(manager.available_count_of::<ExplosionPiece>(), Ok(0));

        manager.tick(EXPLOSION_PIECE_TTL + 0.1);
        assert_eq!(manager.available_count_of::<ExplosionPiece>(), Ok(8));
    }

    #[test]
    fn test_recycle_all() {
        let mut manager = small_match();
        for _ in 0..3 {
            manager.spawn_unit(0, UnitKind::Infantry, Position::ORIGIN).unwrap();
        }
        manager.spawn_building(1, BuildingKind::Refinery, Position::ORIGIN).unwrap();

        manager.recycle_all();
        assert_eq!(manager.available_count_of::<Unit>(), Ok(6));
        assert_eq!(manager.available_count_of::<Building>(), Ok(4));
        assert!(manager.spawn_unit(0, UnitKind::Tank, Position::ORIGIN).is_ok());
    }

    #[test]
    fn test_dispose_tears_down() {
        let mut manager = small_match();
        manager.dispose();
        assert_eq!(
            manager.spawn_unit(0, UnitKind::Tank, Position::ORIGIN),
            Err(MatchError::Pool(PoolError::Disposed))
        );
        assert_eq!(
            manager.fire_projectile(Position::ORIGIN, Velocity::ZERO, 1, None),
            Err(MatchError::Pool(PoolError::Disposed))
        );
    }
}
