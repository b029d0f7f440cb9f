use super::{RelationshipChainManager, chain_link, distinct_nodes};
use crate::access::RecordAccessSet;
use crate::locks::{LockClient, ResourceType};
use crate::property::PropertyOwner;
use crate::record::{ChainPosition, Record, is_null};
use crate::{Error, Result};

impl RelationshipChainManager {
    /// Delete relationship `id`
    ///
    /// Splices it out of each endpoint's chain, fixes the degree on the chain
    /// head, deletes its property chain and frees the record. A loop is
    /// spliced out once. Nodes and groups are never freed.
    pub fn delete_relationship(
        &self,
        id: u64,
        access: &mut RecordAccessSet<'_>,
        locks: &mut dyn LockClient,
    ) -> Result<()> {
        locks.acquire_exclusive(ResourceType::Relationship, &[id])?;
        let rel = access.relationships.get_in_use(id)?.for_reading().clone();
        let nodes = distinct_nodes(rel.first_node, rel.second_node);
        locks.acquire_exclusive(ResourceType::Node, &nodes)?;

        for &node in &nodes {
            self.disconnect(node, id, access)?;
        }

        self.properties
            .delete_property_chain(PropertyOwner::Relationship(id), access)?;
        access
            .relationships
            .get_or_load(id)?
            .for_changing()
            .set_in_use(false);
        Ok(())
    }

    /// Splice relationship `id` out of the chain of `node`
    fn disconnect(&self, node: u64, id: u64, access: &mut RecordAccessSet<'_>) -> Result<()> {
        let rel = access.relationships.read(id)?;
        let (link, direction) = match (rel.link_for(node), rel.direction_for(node)) {
            (Some(link), Some(direction)) => (link, direction),
            _ => {
                return Err(Error::inconsistent(format!(
                    "relationship {id} does not touch node {node}"
                )));
            }
        };

        match link.position {
            ChainPosition::Linked { prev } => {
                access
                    .relationships
                    .get_in_use(prev)?
                    .for_changing()
                    .set_next_for(node, link.next);
                if !is_null(link.next) {
                    access
                        .relationships
                        .get_in_use(link.next)?
                        .for_changing()
                        .set_position_for(node, ChainPosition::Linked { prev });
                }

                let head = self.chain_head(node, rel.rel_type, direction, access)?;
                let degree = chain_link(node, head, access)?.degree().ok_or_else(|| {
                    Error::inconsistent(format!(
                        "relationship {head} is not first in the chain of node {node}"
                    ))
                })?;
                access
                    .relationships
                    .get_or_load(head)?
                    .for_changing()
                    .set_position_for(
                        node,
                        ChainPosition::Head {
                            degree: degree.saturating_sub(1),
                        },
                    );
            }
            ChainPosition::Head { degree } => {
                if !is_null(link.next) {
                    access
                        .relationships
                        .get_in_use(link.next)?
                        .for_changing()
                        .set_position_for(
                            node,
                            ChainPosition::Head {
                                degree: degree.saturating_sub(1),
                            },
                        );
                }

                if access.nodes.read(node)?.dense {
                    let group = self
                        .groups
                        .find_group(node, rel.rel_type, access)?
                        .group
                        .ok_or_else(|| {
                            Error::inconsistent(format!(
                                "node {node} has no group for type {}",
                                rel.rel_type
                            ))
                        })?;
                    access
                        .groups
                        .get_or_load(group)?
                        .for_changing()
                        .set_first_for(direction, link.next);
                } else {
                    access.nodes.get_or_load(node)?.for_changing().next_rel = link.next;
                }
            }
        }
        Ok(())
    }
}
