//! Integration test for a match's pool lifecycle.
//!
//! Drives a manager loaded from TOML through spawns, combat, returns from a
//! worker thread, a level reload and teardown.

use std::thread;

use phalanx_pool::{
    ManagerId, NodeIndex, NodeStateReason, PoolError, PoolManagerBase, PoolNodeItem,
};
use phalanx_units::{
    BuildingKind, MatchError, MatchPoolManager, PoolCapacities, Position, Unit, UnitKind,
    Velocity,
};

const CONFIG: &str = r#"
players = 2
units_per_player = 10
buildings_per_player = 4
projectiles = 16
explosion_pieces = 32
"#;

fn manager() -> MatchPoolManager {
    let capacities = PoolCapacities::from_toml_str(CONFIG).unwrap();
    MatchPoolManager::new(ManagerId::new(1), &capacities).unwrap()
}

#[test]
fn test_availability_tracks_in_use_count() {
    let mut pools = manager();
    let mut spawned = Vec::new();

    for in_use in 0..10 {
        assert_eq!(pools.capacity_of::<Unit>(), Ok(20));
        assert_eq!(pools.available_count_of::<Unit>(), Ok(20 - in_use));
        spawned.push(pools.spawn_unit(0, UnitKind::Infantry, Position::ORIGIN).unwrap());
    }

    // Player 0 is capped, player 1 is not
    assert!(matches!(
        pools.spawn_unit(0, UnitKind::Infantry, Position::ORIGIN),
        Err(MatchError::Pool(PoolError::PoolExhausted { capacity: 10, .. }))
    ));
    assert!(pools.spawn_unit(1, UnitKind::Tank, Position::ORIGIN).is_ok());
    assert_eq!(pools.available_count_of::<Unit>(), Ok(9));

    for unit in spawned {
        pools.despawn_unit(0, unit).unwrap();
    }
    assert_eq!(pools.available_count_of::<Unit>(), Ok(19));
    assert_eq!(pools.capacity_of::<Unit>(), Ok(20));
}

#[test]
fn test_dead_unit_state_does_not_leak() {
    let mut pools = manager();
    let victim = pools.spawn_unit(1, UnitKind::Tank, Position::new(4.0, 0.0, 4.0)).unwrap();
    let attacker = pools.spawn_unit(0, UnitKind::Infantry, Position::ORIGIN).unwrap();

    {
        let unit = pools.units_mut(0).unwrap().get_mut(attacker).unwrap();
        unit.target = Some(victim);
        unit.attack_cooldown = 0.8;
    }
    let killed = pools
        .units_mut(1)
        .unwrap()
        .get_mut(victim)
        .unwrap()
        .take_damage(1_000);
    assert!(killed);

    pools.despawn_unit(1, victim).unwrap();
    pools.despawn_unit(0, attacker).unwrap();

    let fresh = pools.spawn_unit(0, UnitKind::Harvester, Position::ORIGIN).unwrap();
    assert_eq!(fresh, attacker);
    let unit = pools.units(0).unwrap().get(fresh).unwrap();
    assert_eq!(unit.target, None);
    assert_eq!(unit.health, UnitKind::Harvester.max_health());
    assert!(unit.attack_cooldown.abs() < f32::EPSILON);
    assert_eq!(unit.pool_manager(), Some(pools.manager_id()));
}

#[test]
fn test_worker_thread_returns_units() {
    let mut pools = manager();
    let units: Vec<_> = (0..5)
        .map(|_| pools.spawn_unit(1, UnitKind::Infantry, Position::ORIGIN).unwrap())
        .collect();
    let handles: Vec<_> = units
        .iter()
        .map(|&unit| pools.units(1).unwrap().return_handle(unit).unwrap())
        .collect();

    // A pathfinding worker decides these units are gone
    thread::spawn(move || {
        for handle in handles {
            handle.return_to_pool().unwrap();
        }
    })
    .join()
    .unwrap();

    assert_eq!(pools.available_count_of::<Unit>(), Ok(15));
    let report = pools.tick(0.016);
    assert_eq!(report.released, 5);
    assert_eq!(report.rejected, 0);
    assert_eq!(pools.available_count_of::<Unit>(), Ok(20));
}

#[test]
fn test_double_despawn_is_a_caller_error() {
    let mut pools = manager();
    let building = pools
        .spawn_building(0, BuildingKind::Barracks, Position::ORIGIN)
        .unwrap();
    pools.despawn_building(0, building).unwrap();

    assert_eq!(
        pools.despawn_building(0, building),
        Err(MatchError::Pool(PoolError::InvalidNodeState {
            index: building,
            reason: NodeStateReason::AlreadyFree,
        }))
    );
}

#[test]
fn test_reload_does_not_leak_into_next_tenant() {
    let mut pools = manager();
    let tank = pools.spawn_unit(0, UnitKind::Tank, Position::ORIGIN).unwrap();
    {
        let unit = pools.units_mut(0).unwrap().get_mut(tank).unwrap();
        unit.target = Some(NodeIndex::new(42));
        unit.velocity = Velocity::new(9.0, 0.0, 0.0);
        unit.attack_cooldown = 3.5;
    }
    let depot = pools
        .spawn_building(1, BuildingKind::Factory, Position::ORIGIN)
        .unwrap();
    pools.buildings_mut(1).unwrap().get_mut(depot).unwrap().build_progress = 1.0;

    pools.recycle_all();

    let fresh = pools.spawn_unit(0, UnitKind::Infantry, Position::ORIGIN).unwrap();
    assert_eq!(fresh, tank);
    let unit = pools.units(0).unwrap().get(fresh).unwrap();
    assert_eq!(unit.target, None);
    assert_eq!(unit.velocity, Velocity::ZERO);
    assert!(unit.attack_cooldown.abs() < f32::EPSILON);
    assert_eq!(unit.health, UnitKind::Infantry.max_health());

    let site = pools
        .spawn_building(1, BuildingKind::Barracks, Position::ORIGIN)
        .unwrap();
    assert_eq!(site, depot);
    assert!(!pools.buildings(1).unwrap().get(site).unwrap().is_complete());
}

#[test]
fn test_combat_frame_with_reload_and_teardown() {
    let mut pools = manager();
    let tank = pools.spawn_unit(0, UnitKind::Tank, Position::ORIGIN).unwrap();

    for _ in 0..4 {
        pools
            .fire_projectile(Position::ORIGIN, Velocity::new(0.0, 0.0, 20.0), 40, Some(tank))
            .unwrap();
    }
    assert_eq!(pools.spawn_explosion(Position::new(0.0, 0.0, 30.0), 12), 12);
    assert_eq!(pools.projectiles().in_use_count(), 4);

    pools.recycle_all();
    assert_eq!(pools.projectiles().in_use_count(), 0);
    assert_eq!(pools.explosion_pieces().in_use_count(), 0);
    assert!(pools.units(0).unwrap().get(tank).is_none());

    pools.dispose();
    assert_eq!(
        pools.spawn_unit(0, UnitKind::Tank, Position::ORIGIN),
        Err(MatchError::Pool(PoolError::Disposed))
    );
}
