//! Fixed-size byte layouts for node, relationship and group records
//!
//! - Node: 32 bytes (label_bits: 8, next_rel: 8, next_prop: 8, flags: 4, padding: 4)
//! - Relationship: 64 bytes (first_node, second_node, first_prev, first_next,
//!   second_prev, second_next, next_prop: 8 each; rel_type: 4, flags: 4)
//! - Group: 48 bytes (owning_node, first_out, first_in, first_loop, next: 8 each;
//!   rel_type: 4, flags: 4)
//!
//! The `*_prev` words of a relationship hold the degree counter whenever the
//! matching first-in-chain flag is set. In memory that is a [`ChainPosition`];
//! on disk it is the same word, reinterpreted.

use super::{
    ChainLink, ChainPosition, NodeRecord, RecordHeader, RelationshipGroupRecord,
    RelationshipRecord,
};
use bytemuck::{Pod, Zeroable};

const IN_USE: u32 = 0x01;
const NODE_DENSE: u32 = 0x02;
const FIRST_IN_FIRST_CHAIN: u32 = 0x02;
const FIRST_IN_SECOND_CHAIN: u32 = 0x04;

/// Size of an encoded node record
pub const NODE_RECORD_SIZE: usize = 32;
/// Size of an encoded relationship record
pub const RELATIONSHIP_RECORD_SIZE: usize = 64;
/// Size of an encoded relationship group record
pub const GROUP_RECORD_SIZE: usize = 48;

/// Node record as stored (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawNodeRecord {
    label_bits: u64,
    next_rel: u64,
    next_prop: u64,
    flags: u32,
    _padding: u32,
}

impl RawNodeRecord {
    /// Encode a node record
    pub fn from_record(record: &NodeRecord) -> Self {
        let mut flags = 0;
        if record.header.in_use {
            flags |= IN_USE;
        }
        if record.dense {
            flags |= NODE_DENSE;
        }
        Self {
            label_bits: record.label_bits,
            next_rel: record.next_rel,
            next_prop: record.next_prop,
            flags,
            _padding: 0,
        }
    }

    /// Decode into the record with id `id`
    pub fn to_record(&self, id: u64) -> NodeRecord {
        NodeRecord {
            header: RecordHeader {
                id,
                in_use: self.flags & IN_USE != 0,
            },
            dense: self.flags & NODE_DENSE != 0,
            next_rel: self.next_rel,
            next_prop: self.next_prop,
            label_bits: self.label_bits,
        }
    }
}

/// Relationship record as stored (64 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawRelationshipRecord {
    first_node: u64,
    second_node: u64,
    first_prev: u64,
    first_next: u64,
    second_prev: u64,
    second_next: u64,
    next_prop: u64,
    rel_type: u32,
    flags: u32,
}

fn encode_position(position: ChainPosition) -> (u64, bool) {
    match position {
        ChainPosition::Head { degree } => (degree, true),
        ChainPosition::Linked { prev } => (prev, false),
    }
}

fn decode_link(prev_word: u64, first_in_chain: bool, next: u64) -> ChainLink {
    let position = if first_in_chain {
        ChainPosition::Head { degree: prev_word }
    } else {
        ChainPosition::Linked { prev: prev_word }
    };
    ChainLink { position, next }
}

impl RawRelationshipRecord {
    /// Encode a relationship record
    pub fn from_record(record: &RelationshipRecord) -> Self {
        let (first_prev, first_head) = encode_position(record.first_chain.position);
        let (second_prev, second_head) = encode_position(record.second_chain.position);
        let mut flags = 0;
        if record.header.in_use {
            flags |= IN_USE;
        }
        if first_head {
            flags |= FIRST_IN_FIRST_CHAIN;
        }
        if second_head {
            flags |= FIRST_IN_SECOND_CHAIN;
        }
        Self {
            first_node: record.first_node,
            second_node: record.second_node,
            first_prev,
            first_next: record.first_chain.next,
            second_prev,
            second_next: record.second_chain.next,
            next_prop: record.next_prop,
            rel_type: record.rel_type,
            flags,
        }
    }

    /// Decode into the record with id `id`
    pub fn to_record(&self, id: u64) -> RelationshipRecord {
        RelationshipRecord {
            header: RecordHeader {
                id,
                in_use: self.flags & IN_USE != 0,
            },
            first_node: self.first_node,
            second_node: self.second_node,
            rel_type: self.rel_type,
            first_chain: decode_link(
                self.first_prev,
                self.flags & FIRST_IN_FIRST_CHAIN != 0,
                self.first_next,
            ),
            second_chain: decode_link(
                self.second_prev,
                self.flags & FIRST_IN_SECOND_CHAIN != 0,
                self.second_next,
            ),
            next_prop: self.next_prop,
        }
    }

    /// Raw `prev` word of the start node's chain (degree when first in chain)
    pub fn first_prev_word(&self) -> u64 {
        self.first_prev
    }

    /// Raw `prev` word of the end node's chain (degree when first in chain)
    pub fn second_prev_word(&self) -> u64 {
        self.second_prev
    }
}

/// Relationship group record as stored (48 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RawGroupRecord {
    owning_node: u64,
    first_out: u64,
    first_in: u64,
    first_loop: u64,
    next: u64,
    rel_type: u32,
    flags: u32,
}

impl RawGroupRecord {
    /// Encode a group record
    pub fn from_record(record: &RelationshipGroupRecord) -> Self {
        Self {
            owning_node: record.owning_node,
            first_out: record.first_out,
            first_in: record.first_in,
            first_loop: record.first_loop,
            next: record.next,
            rel_type: record.rel_type,
            flags: if record.header.in_use { IN_USE } else { 0 },
        }
    }

    /// Decode into the record with id `id`
    pub fn to_record(&self, id: u64) -> RelationshipGroupRecord {
        RelationshipGroupRecord {
            header: RecordHeader {
                id,
                in_use: self.flags & IN_USE != 0,
            },
            rel_type: self.rel_type,
            owning_node: self.owning_node,
            first_out: self.first_out,
            first_in: self.first_in,
            first_loop: self.first_loop,
            next: self.next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{NULL_REFERENCE, Record};

    #[test]
    fn test_record_sizes() {
        assert_eq!(std::mem::size_of::<RawNodeRecord>(), NODE_RECORD_SIZE);
        assert_eq!(
            std::mem::size_of::<RawRelationshipRecord>(),
            RELATIONSHIP_RECORD_SIZE
        );
        assert_eq!(std::mem::size_of::<RawGroupRecord>(), GROUP_RECORD_SIZE);
    }

    #[test]
    fn test_degree_shares_the_prev_word() {
        let mut rel = RelationshipRecord::new(9, 1, 2, 4);
        rel.first_chain = ChainLink::head(17, 3);
        rel.second_chain = ChainLink::linked(5, NULL_REFERENCE);

        let raw = RawRelationshipRecord::from_record(&rel);
        assert_eq!(raw.first_prev_word(), 17);
        assert_eq!(raw.second_prev_word(), 5);

        let bytes = bytemuck::bytes_of(&raw).to_vec();
        let decoded = bytemuck::pod_read_unaligned::<RawRelationshipRecord>(&bytes).to_record(9);
        assert_eq!(decoded, rel);
    }

    #[test]
    fn test_zeroed_bytes_decode_as_unused() {
        let raw = RawNodeRecord::zeroed();
        assert!(!raw.to_record(0).in_use());

        let raw = RawGroupRecord::zeroed();
        assert!(!raw.to_record(0).in_use());
    }

    #[test]
    fn test_node_flags() {
        let mut node = NodeRecord::new(2);
        node.dense = true;
        node.label_bits = 0b100_0001;
        let decoded = RawNodeRecord::from_record(&node).to_record(2);
        assert_eq!(decoded, node);
    }

    #[test]
    fn test_group_round_trip() {
        let mut group = RelationshipGroupRecord::new(3, 8, 1);
        group.first_in = 12;
        group.next = 4;
        let decoded = RawGroupRecord::from_record(&group).to_record(3);
        assert_eq!(decoded, group);
    }
}
