use super::{RelationshipChainManager, chain_link, distinct_nodes, head_degree, walk_chain};
use crate::access::RecordAccessSet;
use crate::locks::{LockClient, ResourceType};
use crate::record::{
    ChainLink, ChainPosition, NULL_REFERENCE, RelationshipDirection, RelationshipRecord, is_null,
};
use crate::{Error, Result};
use std::collections::BTreeMap;

impl RelationshipChainManager {
    /// Create relationship `id` of `rel_type` from `first_node` to `second_node`
    ///
    /// The record is spliced in at the head of each endpoint's chain, or of the
    /// matching group sub-chain for dense endpoints. A sparse endpoint whose
    /// degree then exceeds the dense threshold is promoted.
    pub fn create_relationship(
        &self,
        id: u64,
        rel_type: u32,
        first_node: u64,
        second_node: u64,
        access: &mut RecordAccessSet<'_>,
        locks: &mut dyn LockClient,
    ) -> Result<()> {
        let nodes = distinct_nodes(first_node, second_node);
        locks.acquire_exclusive(ResourceType::Node, &nodes)?;
        for &node in &nodes {
            access.nodes.get_in_use(node)?;
        }

        access
            .relationships
            .create(RelationshipRecord::new(id, first_node, second_node, rel_type))?;
        for &node in &nodes {
            self.connect(node, id, access)?;
        }
        for &node in &nodes {
            self.promote_if_needed(node, access)?;
        }
        Ok(())
    }

    /// Splice relationship `id` into the chain of `node` it belongs to
    fn connect(&self, node: u64, id: u64, access: &mut RecordAccessSet<'_>) -> Result<()> {
        let rel = access.relationships.read(id)?;
        let direction = rel
            .direction_for(node)
            .ok_or_else(|| Error::inconsistent(format!("relationship {id} does not touch node {node}")))?;

        if !access.nodes.read(node)?.dense {
            let head = access.nodes.read(node)?.next_rel;
            splice_at_head(node, id, head, access)?;
            access.nodes.get_or_load(node)?.for_changing().next_rel = id;
            return Ok(());
        }

        let group = self.groups.find_or_create_group(node, rel.rel_type, access)?;
        let head = access.groups.read(group)?.first_for(direction);
        splice_at_head(node, id, head, access)?;
        access
            .groups
            .get_or_load(group)?
            .for_changing()
            .set_first_for(direction, id);
        Ok(())
    }

    fn promote_if_needed(&self, node: u64, access: &mut RecordAccessSet<'_>) -> Result<()> {
        let record = access.nodes.read(node)?;
        if record.dense {
            return Ok(());
        }
        let degree = head_degree(node, record.next_rel, access)?;
        if degree as usize > self.config.dense_node_threshold {
            self.promote_to_dense(node, access)?;
        }
        Ok(())
    }

    /// Turn a sparse node dense
    ///
    /// The node's links in its relationships are regrouped into one sub-chain
    /// per type and direction, keeping their relative order. Links of the other
    /// endpoints are not touched.
    fn promote_to_dense(&self, node: u64, access: &mut RecordAccessSet<'_>) -> Result<()> {
        let first = access.nodes.read(node)?.next_rel;
        let mut sub_chains: BTreeMap<(u32, RelationshipDirection), Vec<u64>> = BTreeMap::new();
        for id in walk_chain(node, first, access)? {
            let rel = access.relationships.read(id)?;
            let direction = rel.direction_for(node).ok_or_else(|| {
                Error::inconsistent(format!("relationship {id} does not touch node {node}"))
            })?;
            sub_chains.entry((rel.rel_type, direction)).or_default().push(id);
        }

        {
            let record = access.nodes.get_or_load(node)?.for_changing();
            record.dense = true;
            record.next_rel = NULL_REFERENCE;
        }

        for ((rel_type, direction), ids) in &sub_chains {
            let group = self.groups.find_or_create_group(node, *rel_type, access)?;
            for (index, &id) in ids.iter().enumerate() {
                let position = match index.checked_sub(1) {
                    None => ChainPosition::Head {
                        degree: ids.len() as u64,
                    },
                    Some(prev) => ChainPosition::Linked { prev: ids[prev] },
                };
                let next = ids.get(index + 1).copied().unwrap_or(NULL_REFERENCE);
                access
                    .relationships
                    .get_or_load(id)?
                    .for_changing()
                    .set_link_for(node, ChainLink { position, next });
            }
            if let Some(&head) = ids.first() {
                access
                    .groups
                    .get_or_load(group)?
                    .for_changing()
                    .set_first_for(*direction, head);
            }
        }

        tracing::debug!(
            "Promoted node {} to dense with {} sub-chains",
            node,
            sub_chains.len()
        );
        Ok(())
    }
}

/// Make `id` the head of the chain of `node` currently headed by `head`
fn splice_at_head(node: u64, id: u64, head: u64, access: &mut RecordAccessSet<'_>) -> Result<()> {
    let degree = if is_null(head) {
        1
    } else {
        let old_degree = chain_link(node, head, access)?.degree().ok_or_else(|| {
            Error::inconsistent(format!("relationship {head} is not first in the chain of node {node}"))
        })?;
        access
            .relationships
            .get_or_load(head)?
            .for_changing()
            .set_position_for(node, ChainPosition::Linked { prev: id });
        old_degree + 1
    };
    access
        .relationships
        .get_or_load(id)?
        .for_changing()
        .set_link_for(node, ChainLink::head(degree, head));
    Ok(())
}
