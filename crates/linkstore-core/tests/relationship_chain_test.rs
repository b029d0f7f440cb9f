//! Relationship chains through the engine: splicing, dense promotion, group
//! ordering, degree counters and locking

use linkstore_core::config::ChainConfig;
use linkstore_core::ids::IdGenerator;
use linkstore_core::log::TracingLog;
use linkstore_core::record::{
    ChainLink, NULL_REFERENCE, NodeRecord, Record, RecordKind, RelationshipDirection, is_null,
};
use linkstore_core::relationship::Direction;
use linkstore_core::store::RecordStore;
use linkstore_core::token::TokenRegistry;
use linkstore_core::{Engine, Error, Result};
use std::sync::Arc;
use std::time::Duration;

fn committed_nodes(engine: &Engine, count: usize) -> Result<Vec<u64>> {
    let mut tx = engine.begin();
    let nodes = (0..count)
        .map(|_| tx.create_node())
        .collect::<Result<Vec<_>>>()?;
    tx.commit()?;
    Ok(nodes)
}

#[test]
fn test_dense_promotion_builds_one_group_per_type() {
    let config = ChainConfig {
        dense_node_threshold: 5,
        ..ChainConfig::default()
    };
    let engine = Engine::new(config).unwrap();
    let nodes = committed_nodes(&engine, 3).unwrap();
    let (hub, a, b) = (nodes[0], nodes[1], nodes[2]);

    // Six relationships over three types, so the sixth one promotes the hub
    let mut tx = engine.begin();
    let out_knows = tx.create_relationship(0, hub, a).unwrap();
    let in_knows = tx.create_relationship(0, b, hub).unwrap();
    let out_likes = tx.create_relationship(1, hub, b).unwrap();
    let loop_likes = tx.create_relationship(1, hub, hub).unwrap();
    let out_knows_2 = tx.create_relationship(0, hub, b).unwrap();
    tx.commit().unwrap();

    let mut tx = engine.begin();
    assert!(!tx.access().nodes.read(hub).unwrap().dense);
    let in_owns = tx.create_relationship(2, a, hub).unwrap();
    tx.commit().unwrap();

    let mut tx = engine.begin();
    let node = tx.access().nodes.read(hub).unwrap();
    assert!(node.dense);

    let groups = engine
        .relationship_manager()
        .group_manager()
        .groups(hub, tx.access())
        .unwrap();
    assert_eq!(groups.len(), 3);
    assert_eq!(node.next_rel, groups[0]);

    let knows = tx.access().groups.read(groups[0]).unwrap();
    assert_eq!(knows.rel_type, 0);
    assert_eq!(knows.owning_node, hub);
    assert_eq!(knows.first_out, out_knows_2);
    assert_eq!(knows.first_in, in_knows);
    assert!(is_null(knows.first_loop));

    let likes = tx.access().groups.read(groups[1]).unwrap();
    assert_eq!(likes.rel_type, 1);
    assert_eq!(likes.first_out, out_likes);
    assert!(is_null(likes.first_in));
    assert_eq!(likes.first_loop, loop_likes);

    let owns = tx.access().groups.read(groups[2]).unwrap();
    assert_eq!(owns.rel_type, 2);
    assert!(is_null(owns.first_out));
    assert_eq!(owns.first_in, in_owns);

    // The outgoing KNOWS sub-chain keeps chain order, newest first
    let head = tx.access().relationships.read(out_knows_2).unwrap();
    assert_eq!(head.first_chain, ChainLink::head(2, out_knows));
    let tail = tx.access().relationships.read(out_knows).unwrap();
    assert_eq!(tail.first_chain, ChainLink::linked(out_knows_2, NULL_REFERENCE));

    let mut all = tx.relationships(hub).unwrap();
    all.sort_unstable();
    assert_eq!(all, vec![out_knows, in_knows, out_likes, loop_likes, out_knows_2, in_owns]);
    assert_eq!(tx.degree(hub, None, Direction::Both).unwrap(), 6);
    assert_eq!(tx.degree(hub, Some(1), Direction::Outgoing).unwrap(), 2);
    assert_eq!(tx.degree(hub, Some(1), Direction::Incoming).unwrap(), 1);

    // The spoke nodes stay sparse
    assert!(!tx.access().nodes.read(a).unwrap().dense);
    assert_eq!(tx.degree(a, None, Direction::Both).unwrap(), 2);
    assert_eq!(tx.degree(b, None, Direction::Both).unwrap(), 3);
}

#[test]
fn test_dense_node_stays_dense_after_losing_everything() {
    let config = ChainConfig {
        dense_node_threshold: 2,
        ..ChainConfig::default()
    };
    let engine = Engine::new(config).unwrap();
    let nodes = committed_nodes(&engine, 2).unwrap();

    let mut tx = engine.begin();
    let rels: Vec<u64> = (0..4)
        .map(|i| tx.create_relationship(i % 2, nodes[0], nodes[1]).unwrap())
        .collect();
    tx.commit().unwrap();

    let mut tx = engine.begin();
    for id in rels {
        tx.delete_relationship(id).unwrap();
    }
    tx.commit().unwrap();

    let mut tx = engine.begin();
    let node = tx.access().nodes.read(nodes[0]).unwrap();
    assert!(node.dense);
    let groups = engine
        .relationship_manager()
        .group_manager()
        .groups(nodes[0], tx.access())
        .unwrap();
    assert_eq!(groups.len(), 2);
    for group in groups {
        assert!(tx.access().groups.read(group).unwrap().is_empty());
    }
    assert_eq!(tx.degree(nodes[0], None, Direction::Both).unwrap(), 0);
    assert!(tx.relationships(nodes[0]).unwrap().is_empty());
    assert!(tx.degrees(nodes[0]).unwrap().is_empty());
}

#[test]
fn test_loop_degree_drops_by_exactly_one() {
    let engine = Engine::new(ChainConfig::default()).unwrap();
    let nodes = committed_nodes(&engine, 2).unwrap();
    let (n, m) = (nodes[0], nodes[1]);

    let mut tx = engine.begin();
    let first = tx.create_relationship(0, n, m).unwrap();
    let middle = tx.create_relationship(0, m, n).unwrap();
    let looped = tx.create_relationship(0, n, n).unwrap();
    tx.commit().unwrap();

    let mut tx = engine.begin();
    let head = tx.access().relationships.read(looped).unwrap();
    assert_eq!(head.first_chain, ChainLink::head(3, middle));
    assert_eq!(head.second_chain, head.first_chain);
    tx.delete_relationship(middle).unwrap();
    tx.commit().unwrap();

    // Committed through the fixed-size layout and read back
    let mut tx = engine.begin();
    let head = tx.access().relationships.read(looped).unwrap();
    assert_eq!(head.first_chain, ChainLink::head(2, first));
    assert_eq!(head.second_chain, ChainLink::head(2, first));
    let tail = tx.access().relationships.read(first).unwrap();
    assert_eq!(tail.first_chain, ChainLink::linked(looped, NULL_REFERENCE));
    assert!(!tx.access().relationships.read(middle).unwrap().in_use());

    assert_eq!(tx.degree(n, None, Direction::Both).unwrap(), 2);
    assert_eq!(tx.degree(n, None, Direction::Outgoing).unwrap(), 2);
    assert_eq!(tx.degree(n, None, Direction::Incoming).unwrap(), 1);
    assert_eq!(tx.degree(m, None, Direction::Both).unwrap(), 1);
    assert_eq!(tx.relationships(n).unwrap(), vec![looped, first]);
}

#[test]
fn test_group_chain_is_sorted_by_type() {
    let engine = Engine::new(ChainConfig::default()).unwrap();
    let mut tx = engine.begin();
    let mut node = NodeRecord::new(0);
    node.dense = true;
    tx.access().nodes.create(node).unwrap();

    let groups = engine.relationship_manager().group_manager();
    for rel_type in [3, 1, 2] {
        groups.find_or_create_group(0, rel_type, tx.access()).unwrap();
    }
    // Asking again finds rather than duplicates
    groups.find_or_create_group(0, 2, tx.access()).unwrap();
    tx.commit().unwrap();

    let mut tx = engine.begin();
    let ids = groups.groups(0, tx.access()).unwrap();
    let types: Vec<u32> = ids
        .iter()
        .map(|&id| tx.access().groups.read(id).unwrap().rel_type)
        .collect();
    assert_eq!(types, vec![1, 2, 3]);
}

#[test]
fn test_relationship_id_exhaustion_is_a_hard_error() {
    let store = RecordStore::with_generators(|kind| match kind {
        RecordKind::Relationship => IdGenerator::with_max_id(kind, 1),
        _ => IdGenerator::new(kind),
    });
    let engine = Engine::with_parts(
        ChainConfig::default(),
        store,
        Arc::new(TokenRegistry::new()),
        Arc::new(TracingLog),
    )
    .unwrap();
    let nodes = committed_nodes(&engine, 2).unwrap();

    let mut tx = engine.begin();
    tx.create_relationship(0, nodes[0], nodes[1]).unwrap();
    tx.create_relationship(0, nodes[0], nodes[1]).unwrap();
    let err = tx.create_relationship(0, nodes[0], nodes[1]).unwrap_err();
    assert!(matches!(
        err,
        Error::IdExhausted {
            kind: RecordKind::Relationship,
            ..
        }
    ));
}

#[test]
fn test_deleted_relationship_ids_are_reused() {
    let engine = Engine::new(ChainConfig::default()).unwrap();
    let nodes = committed_nodes(&engine, 2).unwrap();

    let mut tx = engine.begin();
    let id = tx.create_relationship(0, nodes[0], nodes[1]).unwrap();
    tx.commit().unwrap();

    let mut tx = engine.begin();
    tx.delete_relationship(id).unwrap();
    tx.commit().unwrap();

    let mut tx = engine.begin();
    assert_eq!(tx.create_relationship(0, nodes[1], nodes[0]).unwrap(), id);
    tx.commit().unwrap();
}

#[test]
fn test_endpoint_locks_serialize_transactions() {
    let engine = Engine::new(ChainConfig::default())
        .unwrap()
        .with_lock_timeout(Duration::from_millis(20));
    let nodes = committed_nodes(&engine, 3).unwrap();

    let mut first = engine.begin();
    first.create_relationship(0, nodes[0], nodes[1]).unwrap();

    let mut second = engine.begin();
    let err = second
        .create_relationship(0, nodes[1], nodes[2])
        .unwrap_err();
    assert!(matches!(err, Error::LockTimeout(_)));
    second.abort();

    first.commit().unwrap();

    let mut third = engine.begin();
    third.create_relationship(0, nodes[1], nodes[2]).unwrap();
    third.commit().unwrap();

    let mut tx = engine.begin();
    assert_eq!(tx.degree(nodes[1], None, Direction::Both).unwrap(), 2);
}

#[test]
fn test_directions_of_a_loop() {
    let engine = Engine::new(ChainConfig::default()).unwrap();
    let nodes = committed_nodes(&engine, 1).unwrap();

    let mut tx = engine.begin();
    let id = tx.create_relationship(0, nodes[0], nodes[0]).unwrap();
    let rel = tx.access().relationships.read(id).unwrap();
    assert_eq!(rel.direction_for(nodes[0]), Some(RelationshipDirection::Loop));
    assert!(rel.in_use());
}

#[test]
fn test_node_lock_guards_its_groups() {
    let config = ChainConfig {
        dense_node_threshold: 1,
        ..ChainConfig::default()
    };
    let engine = Engine::new(config)
        .unwrap()
        .with_lock_timeout(Duration::from_millis(20));
    let nodes = committed_nodes(&engine, 3).unwrap();
    let (hub, a, b) = (nodes[0], nodes[1], nodes[2]);

    let mut tx = engine.begin();
    tx.create_relationship(0, hub, a).unwrap();
    tx.create_relationship(0, hub, b).unwrap();
    tx.commit().unwrap();

    // A new type on the dense hub inserts a group under the hub's lock
    let mut first = engine.begin();
    first.create_relationship(1, a, hub).unwrap();

    let mut second = engine.begin();
    let err = second.create_relationship(2, b, hub).unwrap_err();
    assert!(matches!(err, Error::LockTimeout(_)));
    drop(second);
    first.commit().unwrap();

    let mut third = engine.begin();
    third.create_relationship(2, b, hub).unwrap();
    third.commit().unwrap();

    let mut tx = engine.begin();
    let groups = engine
        .relationship_manager()
        .group_manager()
        .groups(hub, tx.access())
        .unwrap();
    let types: Vec<u32> = groups
        .iter()
        .map(|&id| tx.access().groups.read(id).unwrap().rel_type)
        .collect();
    assert_eq!(types, vec![0, 1, 2]);
}
