use super::{NULL_REFERENCE, Record, RecordHeader, RecordKind, is_null};

/// Direction of a relationship relative to one of its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationshipDirection {
    /// The node is the start node
    Outgoing,
    /// The node is the end node
    Incoming,
    /// The node is both ends
    Loop,
}

/// Relationship group record - heads of one type's sub-chains for a dense node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipGroupRecord {
    /// Shared header
    pub header: RecordHeader,
    /// Relationship type this group covers
    pub rel_type: u32,
    /// Dense node owning the group
    pub owning_node: u64,
    /// Head of the outgoing sub-chain
    pub first_out: u64,
    /// Head of the incoming sub-chain
    pub first_in: u64,
    /// Head of the loop sub-chain
    pub first_loop: u64,
    /// Next group of the same node, higher type
    pub next: u64,
}

impl RelationshipGroupRecord {
    /// A live, empty group
    pub fn new(id: u64, rel_type: u32, owning_node: u64) -> Self {
        Self {
            header: RecordHeader::in_use(id),
            rel_type,
            owning_node,
            first_out: NULL_REFERENCE,
            first_in: NULL_REFERENCE,
            first_loop: NULL_REFERENCE,
            next: NULL_REFERENCE,
        }
    }

    /// Head of the sub-chain for `direction`
    pub fn first_for(&self, direction: RelationshipDirection) -> u64 {
        match direction {
            RelationshipDirection::Outgoing => self.first_out,
            RelationshipDirection::Incoming => self.first_in,
            RelationshipDirection::Loop => self.first_loop,
        }
    }

    /// Point the sub-chain for `direction` at `first`
    pub fn set_first_for(&mut self, direction: RelationshipDirection, first: u64) {
        match direction {
            RelationshipDirection::Outgoing => self.first_out = first,
            RelationshipDirection::Incoming => self.first_in = first,
            RelationshipDirection::Loop => self.first_loop = first,
        }
    }

    /// Whether all three sub-chains are empty
    pub fn is_empty(&self) -> bool {
        is_null(self.first_out) && is_null(self.first_in) && is_null(self.first_loop)
    }
}

impl Record for RelationshipGroupRecord {
    const KIND: RecordKind = RecordKind::RelationshipGroup;

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }

    fn blank(id: u64) -> Self {
        Self {
            header: RecordHeader::unused(id),
            ..Self::new(id, 0, NULL_REFERENCE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_for_each_direction() {
        let mut group = RelationshipGroupRecord::new(1, 2, 3);
        assert!(group.is_empty());

        group.set_first_for(RelationshipDirection::Outgoing, 10);
        group.set_first_for(RelationshipDirection::Incoming, 11);
        group.set_first_for(RelationshipDirection::Loop, 12);

        assert_eq!(group.first_for(RelationshipDirection::Outgoing), 10);
        assert_eq!(group.first_for(RelationshipDirection::Incoming), 11);
        assert_eq!(group.first_for(RelationshipDirection::Loop), 12);
        assert!(!group.is_empty());
    }
}
