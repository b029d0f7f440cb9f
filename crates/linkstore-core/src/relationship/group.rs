use crate::access::RecordAccessSet;
use crate::ids::IdSequence;
use crate::record::{RelationshipGroupRecord, is_null};
use crate::{Error, Result};
use std::sync::Arc;

/// Result of looking a type up in a dense node's group chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupLookup {
    /// Group for the requested type
    pub group: Option<u64>,
    /// Last group with a lower type, the insertion point for a new group
    pub previous: Option<u64>,
}

/// Maintains the per-type group chain of dense nodes, sorted by type
pub struct RelationshipGroupManager {
    group_ids: Arc<dyn IdSequence>,
}

impl RelationshipGroupManager {
    /// Create a manager allocating group ids from `group_ids`
    pub fn new(group_ids: Arc<dyn IdSequence>) -> Self {
        Self { group_ids }
    }

    /// Look `rel_type` up on `node`, stopping at the first higher type
    pub fn find_group(
        &self,
        node: u64,
        rel_type: u32,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<GroupLookup> {
        let mut current = first_group(node, access)?;
        let mut previous = None;
        while !is_null(current) {
            let group = access.groups.get_in_use(current)?.for_reading();
            if group.rel_type == rel_type {
                return Ok(GroupLookup {
                    group: Some(current),
                    previous,
                });
            }
            if group.rel_type > rel_type {
                break;
            }
            previous = Some(current);
            current = group.next;
        }
        Ok(GroupLookup {
            group: None,
            previous,
        })
    }

    /// Group for `rel_type` on `node`, created in sorted position if missing
    pub fn find_or_create_group(
        &self,
        node: u64,
        rel_type: u32,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<u64> {
        let lookup = self.find_group(node, rel_type, access)?;
        if let Some(group) = lookup.group {
            return Ok(group);
        }

        let id = self.group_ids.next_id()?;
        let mut group = RelationshipGroupRecord::new(id, rel_type, node);
        match lookup.previous {
            Some(previous) => {
                let previous = access.groups.get_or_load(previous)?.for_changing();
                group.next = previous.next;
                previous.next = id;
            }
            None => {
                let owner = access.nodes.get_or_load(node)?.for_changing();
                group.next = owner.next_rel;
                owner.next_rel = id;
            }
        }
        access.groups.create(group)?;
        tracing::debug!("Created relationship group {} for node {} type {}", id, node, rel_type);
        Ok(id)
    }

    /// Group ids of `node` in ascending type order
    pub fn groups(&self, node: u64, access: &mut RecordAccessSet<'_>) -> Result<Vec<u64>> {
        let mut groups = Vec::new();
        let mut current = first_group(node, access)?;
        while !is_null(current) {
            if groups.contains(&current) {
                return Err(Error::inconsistent(format!(
                    "cycle in group chain of node {node} at group {current}"
                )));
            }
            groups.push(current);
            current = access.groups.get_in_use(current)?.for_reading().next;
        }
        Ok(groups)
    }
}

fn first_group(node: u64, access: &mut RecordAccessSet<'_>) -> Result<u64> {
    let record = access.nodes.get_in_use(node)?.for_reading();
    if !record.dense {
        return Err(Error::inconsistent(format!("node {node} is not dense")));
    }
    Ok(record.next_rel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{NodeRecord, RecordKind};
    use crate::store::RecordStore;

    fn dense_node(access: &mut RecordAccessSet<'_>, id: u64) {
        let mut node = NodeRecord::new(id);
        node.dense = true;
        access.nodes.create(node).unwrap();
    }

    #[test]
    fn test_groups_stay_sorted_by_type() {
        let store = RecordStore::new();
        let manager = RelationshipGroupManager::new(store.id_sequence(RecordKind::RelationshipGroup));
        let mut access = RecordAccessSet::new(&store);
        dense_node(&mut access, 0);

        for rel_type in [3, 1, 2] {
            manager.find_or_create_group(0, rel_type, &mut access).unwrap();
        }

        let types: Vec<u32> = manager
            .groups(0, &mut access)
            .unwrap()
            .into_iter()
            .map(|id| access.groups.read(id).unwrap().rel_type)
            .collect();
        assert_eq!(types, vec![1, 2, 3]);
    }

    #[test]
    fn test_find_or_create_returns_existing_group() {
        let store = RecordStore::new();
        let manager = RelationshipGroupManager::new(store.id_sequence(RecordKind::RelationshipGroup));
        let mut access = RecordAccessSet::new(&store);
        dense_node(&mut access, 0);

        let first = manager.find_or_create_group(0, 5, &mut access).unwrap();
        let again = manager.find_or_create_group(0, 5, &mut access).unwrap();
        assert_eq!(first, again);
        assert_eq!(access.groups.change_count(), 1);

        let lookup = manager.find_group(0, 7, &mut access).unwrap();
        assert_eq!(lookup, GroupLookup { group: None, previous: Some(first) });
        let lookup = manager.find_group(0, 2, &mut access).unwrap();
        assert_eq!(lookup, GroupLookup { group: None, previous: None });
    }

    #[test]
    fn test_sparse_node_has_no_group_chain() {
        let store = RecordStore::new();
        let manager = RelationshipGroupManager::new(store.id_sequence(RecordKind::RelationshipGroup));
        let mut access = RecordAccessSet::new(&store);
        access.nodes.create(NodeRecord::new(0)).unwrap();
        assert!(matches!(
            manager.find_or_create_group(0, 1, &mut access),
            Err(Error::Inconsistent(_))
        ));
    }
}
