//! # Pooled Entities
//!
//! The entity types a match spawns and destroys by the thousand. Each embeds a
//! [`PoolItem`] and clears every domain field in its reset hook, so a fresh
//! tenant never inherits a dead entity's health, target or timers.

use phalanx_pool::{NodeIndex, PoolItem, PoolNodeItem, ResetDefaults};

use crate::components::{Position, Velocity};

/// Implements [`PoolNodeItem`] for a type with a `pool: PoolItem` field.
macro_rules! pool_node_item {
    ($ty:ty) => {
        impl PoolNodeItem for $ty {
            #[inline]
            fn pool_item(&self) -> &PoolItem {
                &self.pool
            }

            #[inline]
            fn pool_item_mut(&mut self) -> &mut PoolItem {
                &mut self.pool
            }
        }
    };
}

/// Unit archetypes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Foot soldier.
    #[default]
    Infantry,
    /// Armoured vehicle.
    Tank,
    /// Resource gatherer.
    Harvester,
}

impl UnitKind {
    /// Hit points of a freshly spawned unit.
    #[inline]
    #[must_use]
    pub const fn max_health(self) -> u32 {
        match self {
            Self::Infantry => 100,
            Self::Tank => 400,
            Self::Harvester => 250,
        }
    }
}

/// A mobile unit owned by one player.
#[derive(Debug, Default)]
pub struct Unit {
    pool: PoolItem,
    /// Archetype.
    pub kind: UnitKind,
    /// World position.
    pub position: Position,
    /// Current velocity.
    pub velocity: Velocity,
    /// Remaining hit points.
    pub health: u32,
    /// Unit being attacked, in an enemy unit pool.
    pub target: Option<NodeIndex>,
    /// Seconds until the next attack.
    pub attack_cooldown: f32,
}

impl Unit {
    /// Prepares a freshly acquired unit. Every domain field is rewritten, so
    /// a slot recycled without its reset hook is still clean.
    pub fn spawn(&mut self, kind: UnitKind, position: Position) {
        self.reset_to_default_values();
        self.kind = kind;
        self.position = position;
        self.health = kind.max_health();
    }

    /// Applies damage. Returns `true` if the unit died.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        self.health = self.health.saturating_sub(amount);
        self.health == 0
    }
}

pool_node_item!(Unit);

impl ResetDefaults for Unit {
    fn reset_to_default_values(&mut self) {
        self.kind = UnitKind::default();
        self.position = Position::ORIGIN;
        self.velocity = Velocity::ZERO;
        self.health = 0;
        self.target = None;
        self.attack_cooldown = 0.0;
    }
}

/// Building archetypes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BuildingKind {
    /// Trains infantry.
    #[default]
    Barracks,
    /// Builds vehicles.
    Factory,
    /// Accepts harvested resources.
    Refinery,
}

impl BuildingKind {
    /// Hit points of a completed building.
    #[inline]
    #[must_use]
    pub const fn max_health(self) -> u32 {
        match self {
            Self::Barracks => 800,
            Self::Factory => 1200,
            Self::Refinery => 1000,
        }
    }
}

/// A static structure owned by one player.
#[derive(Debug, Default)]
pub struct Building {
    pool: PoolItem,
    /// Archetype.
    pub kind: BuildingKind,
    /// World position.
    pub position: Position,
    /// Remaining hit points.
    pub health: u32,
    /// Construction progress in `[0, 1]`.
    pub build_progress: f32,
}

impl Building {
    /// Places a freshly acquired building as a construction site.
    pub fn place(&mut self, kind: BuildingKind, position: Position) {
        self.reset_to_default_values();
        self.kind = kind;
        self.position = position;
        self.health = kind.max_health() / 10;
        self.build_progress = 0.0;
    }

    /// Returns whether construction has finished.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.build_progress >= 1.0
    }
}

pool_node_item!(Building);

impl ResetDefaults for Building {
    fn reset_to_default_values(&mut self) {
        self.kind = BuildingKind::default();
        self.position = Position::ORIGIN;
        self.health = 0;
        self.build_progress = 0.0;
    }
}

/// A shell, missile or bullet in flight.
#[derive(Debug, Default)]
pub struct Projectile {
    pool: PoolItem,
    /// World position.
    pub position: Position,
    /// Flight velocity.
    pub velocity: Velocity,
    /// Damage dealt on impact.
    pub damage: u32,
    /// Seconds of flight left.
    pub ttl: f32,
    /// Unit that fired it, in its owner's unit pool.
    pub source: Option<NodeIndex>,
}

pool_node_item!(Projectile);

impl ResetDefaults for Projectile {
    fn reset_to_default_values(&mut self) {
        self.position = Position::ORIGIN;
        self.velocity = Velocity::ZERO;
        self.damage = 0;
        self.ttl = 0.0;
        self.source = None;
    }
}

/// One flying fragment of an explosion.
#[derive(Debug, Default)]
pub struct ExplosionPiece {
    pool: PoolItem,
    /// World position.
    pub position: Position,
    /// Flight velocity.
    pub velocity: Velocity,
    /// Spin in radians per second.
    pub spin: f32,
    /// Seconds until the piece fades out.
    pub ttl: f32,
}

pool_node_item!(ExplosionPiece);

impl ResetDefaults for ExplosionPiece {
    fn reset_to_default_values(&mut self) {
        self.position = Position::ORIGIN;
        self.velocity = Velocity::ZERO;
        self.spin = 0.0;
        self.ttl = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_reset_clears_tenant() {
        let mut unit = Unit::default();
        unit.spawn(UnitKind::Tank, Position::new(3.0, 0.0, 4.0));
        unit.target = Some(NodeIndex::new(9));
        unit.attack_cooldown = 1.5;
        assert_eq!(unit.health, 400);

        unit.reset_to_default_values();
        assert_eq!(unit.kind, UnitKind::Infantry);
        assert_eq!(unit.position, Position::ORIGIN);
        assert_eq!(unit.health, 0);
        assert_eq!(unit.target, None);
        assert!(unit.attack_cooldown.abs() < f32::EPSILON);
    }

    #[test]
    fn test_spawn_overwrites_previous_tenant() {
        let mut unit = Unit::default();
        unit.spawn(UnitKind::Tank, Position::ORIGIN);
        unit.target = Some(NodeIndex::new(42));
        unit.velocity = Velocity::new(9.0, 0.0, 0.0);
        unit.attack_cooldown = 3.5;

        // No reset in between, as after a bulk recycle
        unit.spawn(UnitKind::Infantry, Position::new(1.0, 0.0, 1.0));
        assert_eq!(unit.target, None);
        assert_eq!(unit.velocity, Velocity::ZERO);
        assert!(unit.attack_cooldown.abs() < f32::EPSILON);
        assert_eq!(unit.health, 100);
    }

    #[test]
    fn test_unit_take_damage() {
        let mut unit = Unit::default();
        unit.spawn(UnitKind::Infantry, Position::ORIGIN);
        assert!(!unit.take_damage(60));
        assert!(unit.take_damage(60));
        assert_eq!(unit.health, 0);
    }

    #[test]
    fn test_building_placement() {
        let mut building = Building::default();
        building.place(BuildingKind::Factory, Position::new(10.0, 0.0, 10.0));
        assert_eq!(building.health, 120);
        assert!(!building.is_complete());

        building.build_progress = 1.0;
        assert!(building.is_complete());

        building.reset_to_default_values();
        assert_eq!(building.health, 0);
        assert!(!building.is_complete());
    }

    #[test]
    fn test_projectile_reset() {
        let mut projectile = Projectile {
            damage: 35,
            ttl: 2.0,
            source: Some(NodeIndex::new(1)),
            ..Projectile::default()
        };
        projectile.reset_to_default_values();
        assert_eq!(projectile.damage, 0);
        assert_eq!(projectile.source, None);
    }
}
