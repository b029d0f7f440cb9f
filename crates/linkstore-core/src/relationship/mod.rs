//! Relationship chains
//!
//! Each relationship sits in two doubly-linked chains, one per endpoint (a
//! loop sits in one). A sparse node points straight at its chain. Past the
//! configured threshold a node turns dense: its relationships are split into
//! one outgoing, incoming and loop sub-chain per type, hung off a sorted chain
//! of group records.
//!
//! The first record of every (sub-)chain stores the chain's degree where the
//! back pointer would be, see [`ChainPosition`].

mod creator;
mod degree;
mod deleter;
mod group;

pub use degree::{Direction, TypeDegrees};
pub use group::{GroupLookup, RelationshipGroupManager};

use crate::access::RecordAccessSet;
use crate::config::ChainConfig;
use crate::property::PropertyChainManager;
use crate::record::{ChainLink, ChainPosition, RelationshipDirection, is_null};
use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Creates and deletes relationships, keeping both endpoint chains intact
pub struct RelationshipChainManager {
    config: ChainConfig,
    groups: RelationshipGroupManager,
    properties: Arc<PropertyChainManager>,
}

impl RelationshipChainManager {
    /// Create a manager; `properties` deletes the chains of removed relationships
    pub fn new(
        config: ChainConfig,
        groups: RelationshipGroupManager,
        properties: Arc<PropertyChainManager>,
    ) -> Self {
        Self {
            config,
            groups,
            properties,
        }
    }

    /// Group manager used for dense nodes
    pub fn group_manager(&self) -> &RelationshipGroupManager {
        &self.groups
    }

    /// Every relationship of `node`
    ///
    /// Sparse nodes list their chain from the head; dense nodes list each
    /// group's outgoing, incoming and loop sub-chains in type order.
    pub fn relationships(&self, node: u64, access: &mut RecordAccessSet<'_>) -> Result<Vec<u64>> {
        let record = access.nodes.get_in_use(node)?.for_reading().clone();
        if !record.dense {
            return walk_chain(node, record.next_rel, access);
        }

        let mut relationships = Vec::new();
        for group_id in self.groups.groups(node, access)? {
            let group = access.groups.read(group_id)?;
            for direction in DIRECTIONS {
                relationships.extend(walk_chain(node, group.first_for(direction), access)?);
            }
        }
        Ok(relationships)
    }

    /// First record of the (sub-)chain of `node` a relationship of
    /// `rel_type` in `direction` belongs to
    fn chain_head(
        &self,
        node: u64,
        rel_type: u32,
        direction: RelationshipDirection,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<u64> {
        let record = access.nodes.get_in_use(node)?.for_reading();
        if !record.dense {
            return Ok(record.next_rel);
        }
        let group = self
            .groups
            .find_group(node, rel_type, access)?
            .group
            .ok_or_else(|| Error::inconsistent(format!("node {node} has no group for type {rel_type}")))?;
        Ok(access.groups.read(group)?.first_for(direction))
    }
}

const DIRECTIONS: [RelationshipDirection; 3] = [
    RelationshipDirection::Outgoing,
    RelationshipDirection::Incoming,
    RelationshipDirection::Loop,
];

/// Relationship ids of the chain of `node` starting at `first`
fn walk_chain(node: u64, first: u64, access: &mut RecordAccessSet<'_>) -> Result<Vec<u64>> {
    let mut ids = Vec::new();
    let mut visited = HashSet::new();
    let mut current = first;
    while !is_null(current) {
        if !visited.insert(current) {
            return Err(Error::inconsistent(format!(
                "cycle in relationship chain of node {node} at {current}"
            )));
        }
        ids.push(current);
        current = chain_link(node, current, access)?.next;
    }
    Ok(ids)
}

/// Link of `node` in relationship `id`, which must be in use and touch `node`
fn chain_link(node: u64, id: u64, access: &mut RecordAccessSet<'_>) -> Result<ChainLink> {
    access
        .relationships
        .get_in_use(id)?
        .for_reading()
        .link_for(node)
        .ok_or_else(|| Error::inconsistent(format!("relationship {id} does not touch node {node}")))
}

/// Degree stored on the head record `head` of a chain of `node`, 0 for an empty chain
fn head_degree(node: u64, head: u64, access: &mut RecordAccessSet<'_>) -> Result<u64> {
    if is_null(head) {
        return Ok(0);
    }
    match chain_link(node, head, access)?.position {
        ChainPosition::Head { degree } => Ok(degree),
        ChainPosition::Linked { .. } => Err(Error::inconsistent(format!(
            "relationship {head} is not first in the chain of node {node}"
        ))),
    }
}

/// Endpoints of a relationship, once each
fn distinct_nodes(first_node: u64, second_node: u64) -> Vec<u64> {
    if first_node == second_node {
        vec![first_node]
    } else {
        vec![first_node, second_node]
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{manager, nodes};
    use super::*;
    use crate::locks::{RowLockManager, TransactionLocks};
    use crate::store::RecordStore;

    #[test]
    fn test_relationships_lists_sparse_chain_from_head() {
        let store = RecordStore::new();
        let manager = manager(&store, ChainConfig::default());
        let mut access = RecordAccessSet::new(&store);
        let mut locks = TransactionLocks::new(RowLockManager::default(), 1);
        nodes(&mut access, 0..3);

        manager.create_relationship(10, 0, 0, 1, &mut access, &mut locks).unwrap();
        manager.create_relationship(11, 0, 2, 0, &mut access, &mut locks).unwrap();
        manager.create_relationship(12, 0, 0, 0, &mut access, &mut locks).unwrap();

        assert_eq!(manager.relationships(0, &mut access).unwrap(), vec![12, 11, 10]);
        assert_eq!(manager.relationships(1, &mut access).unwrap(), vec![10]);
        assert_eq!(head_degree(0, 12, &mut access).unwrap(), 3);
        assert!(head_degree(0, 11, &mut access).is_err());
    }
}
