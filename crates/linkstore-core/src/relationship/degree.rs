//! Degree queries
//!
//! Dense nodes answer from the degree stored on each sub-chain head, three
//! reads per group. Sparse nodes know only their total degree; anything
//! filtered by type or direction walks the chain.

use super::{DIRECTIONS, RelationshipChainManager, head_degree, walk_chain};
use crate::access::RecordAccessSet;
use crate::record::RelationshipDirection;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Direction filter for degree queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Relationships starting at the node, loops included
    Outgoing,
    /// Relationships ending at the node, loops included
    Incoming,
    /// All relationships, loops counted once
    Both,
}

/// Degrees of one relationship type on one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeDegrees {
    /// Relationship type
    pub rel_type: u32,
    /// Non-loop relationships starting at the node
    pub outgoing: u64,
    /// Non-loop relationships ending at the node
    pub incoming: u64,
    /// Loops on the node
    pub loops: u64,
}

impl TypeDegrees {
    fn new(rel_type: u32) -> Self {
        Self {
            rel_type,
            ..Self::default()
        }
    }

    /// Count for `direction`
    pub fn get(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Outgoing => self.outgoing + self.loops,
            Direction::Incoming => self.incoming + self.loops,
            Direction::Both => self.total(),
        }
    }

    /// Every relationship of this type, loops once
    pub fn total(&self) -> u64 {
        self.outgoing + self.incoming + self.loops
    }

    fn add(&mut self, direction: RelationshipDirection, count: u64) {
        match direction {
            RelationshipDirection::Outgoing => self.outgoing += count,
            RelationshipDirection::Incoming => self.incoming += count,
            RelationshipDirection::Loop => self.loops += count,
        }
    }
}

impl RelationshipChainManager {
    /// Number of relationships of `node`, optionally of one type only
    ///
    /// A dense node asked for one type reads only that type's group.
    pub fn degree(
        &self,
        node: u64,
        rel_type: Option<u32>,
        direction: Direction,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<u64> {
        let record = access.nodes.get_in_use(node)?.for_reading().clone();
        match (record.dense, rel_type) {
            (false, None) if direction == Direction::Both => {
                return head_degree(node, record.next_rel, access);
            }
            (true, Some(rel_type)) => {
                let Some(group_id) = self.groups.find_group(node, rel_type, access)?.group else {
                    return Ok(0);
                };
                let group = access.groups.read(group_id)?;
                let mut degrees = TypeDegrees::new(rel_type);
                for dir in DIRECTIONS {
                    degrees.add(dir, head_degree(node, group.first_for(dir), access)?);
                }
                return Ok(degrees.get(direction));
            }
            _ => {}
        }

        Ok(self
            .degrees(node, access)?
            .iter()
            .filter(|degrees| rel_type.is_none_or(|t| t == degrees.rel_type))
            .map(|degrees| degrees.get(direction))
            .sum())
    }

    /// Per-type degree breakdown of `node`, ascending by type
    ///
    /// Types without relationships are left out, including the empty groups
    /// a dense node keeps after its relationships are deleted.
    pub fn degrees(
        &self,
        node: u64,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<Vec<TypeDegrees>> {
        let record = access.nodes.get_in_use(node)?.for_reading().clone();
        let mut by_type: BTreeMap<u32, TypeDegrees> = BTreeMap::new();

        if record.dense {
            for group_id in self.groups.groups(node, access)? {
                let group = access.groups.read(group_id)?;
                let degrees = by_type
                    .entry(group.rel_type)
                    .or_insert_with(|| TypeDegrees::new(group.rel_type));
                for direction in DIRECTIONS {
                    degrees.add(direction, head_degree(node, group.first_for(direction), access)?);
                }
            }
        } else {
            for id in walk_chain(node, record.next_rel, access)? {
                let rel = access.relationships.read(id)?;
                let direction = rel.direction_for(node).ok_or_else(|| {
                    Error::inconsistent(format!("relationship {id} does not touch node {node}"))
                })?;
                by_type
                    .entry(rel.rel_type)
                    .or_insert_with(|| TypeDegrees::new(rel.rel_type))
                    .add(direction, 1);
            }
        }

        Ok(by_type
            .into_values()
            .filter(|degrees| degrees.total() > 0)
            .collect())
    }
}
