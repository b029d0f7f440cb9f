use super::group::RelationshipDirection;
use super::{NULL_REFERENCE, Record, RecordHeader, RecordKind};

/// Where a relationship sits in one endpoint's chain
///
/// The first record of a chain (or of a dense node's sub-chain) has no
/// predecessor, so its back-pointer slot carries the chain's degree instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPosition {
    /// First in chain; the value is the number of relationships in the chain
    Head {
        /// Relationships in this (sub-)chain, this one included
        degree: u64,
    },
    /// Somewhere after the head
    Linked {
        /// Previous relationship in the chain
        prev: u64,
    },
}

/// One endpoint's view of a relationship: position plus forward pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLink {
    /// Head (with degree) or linked (with back pointer)
    pub position: ChainPosition,
    /// Next relationship in the chain
    pub next: u64,
}

impl ChainLink {
    /// A detached link: head of an empty chain
    pub fn detached() -> Self {
        Self {
            position: ChainPosition::Head { degree: 0 },
            next: NULL_REFERENCE,
        }
    }

    /// Link at the head of a chain
    pub fn head(degree: u64, next: u64) -> Self {
        Self {
            position: ChainPosition::Head { degree },
            next,
        }
    }

    /// Link behind `prev`
    pub fn linked(prev: u64, next: u64) -> Self {
        Self {
            position: ChainPosition::Linked { prev },
            next,
        }
    }

    /// Whether this link is first in its chain
    pub fn is_head(&self) -> bool {
        matches!(self.position, ChainPosition::Head { .. })
    }

    /// Degree carried by a head link
    pub fn degree(&self) -> Option<u64> {
        match self.position {
            ChainPosition::Head { degree } => Some(degree),
            ChainPosition::Linked { .. } => None,
        }
    }

    /// Back pointer of a non-head link
    pub fn prev(&self) -> Option<u64> {
        match self.position {
            ChainPosition::Linked { prev } => Some(prev),
            ChainPosition::Head { .. } => None,
        }
    }
}

/// Relationship record
///
/// A loop (`first_node == second_node`) lives in a single physical chain, so
/// every setter below writes both links when asked about the loop's node. That
/// keeps the two links identical and makes each splice happen exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRecord {
    /// Shared header
    pub header: RecordHeader,
    /// Start node
    pub first_node: u64,
    /// End node
    pub second_node: u64,
    /// Relationship type id
    pub rel_type: u32,
    /// Link in the start node's chain
    pub first_chain: ChainLink,
    /// Link in the end node's chain
    pub second_chain: ChainLink,
    /// First property record
    pub next_prop: u64,
}

impl RelationshipRecord {
    /// A live relationship that is not yet spliced into any chain
    pub fn new(id: u64, first_node: u64, second_node: u64, rel_type: u32) -> Self {
        Self {
            header: RecordHeader::in_use(id),
            first_node,
            second_node,
            rel_type,
            first_chain: ChainLink::detached(),
            second_chain: ChainLink::detached(),
            next_prop: NULL_REFERENCE,
        }
    }

    /// Whether both endpoints are the same node
    pub fn is_loop(&self) -> bool {
        self.first_node == self.second_node
    }

    /// Whether `node` is one of the endpoints
    pub fn has_endpoint(&self, node: u64) -> bool {
        self.first_node == node || self.second_node == node
    }

    /// Direction of this relationship as seen from `node`
    pub fn direction_for(&self, node: u64) -> Option<RelationshipDirection> {
        if self.is_loop() && self.first_node == node {
            Some(RelationshipDirection::Loop)
        } else if self.first_node == node {
            Some(RelationshipDirection::Outgoing)
        } else if self.second_node == node {
            Some(RelationshipDirection::Incoming)
        } else {
            None
        }
    }

    /// The link `node` follows through this relationship
    pub fn link_for(&self, node: u64) -> Option<ChainLink> {
        if self.first_node == node {
            Some(self.first_chain)
        } else if self.second_node == node {
            Some(self.second_chain)
        } else {
            None
        }
    }

    /// The endpoint at the other end, `node` itself for loops
    pub fn other_node(&self, node: u64) -> Option<u64> {
        if self.first_node == node {
            Some(self.second_node)
        } else if self.second_node == node {
            Some(self.first_node)
        } else {
            None
        }
    }

    /// Replace the link for `node`
    pub fn set_link_for(&mut self, node: u64, link: ChainLink) {
        if self.first_node == node {
            self.first_chain = link;
        }
        if self.second_node == node {
            self.second_chain = link;
        }
    }

    /// Replace the forward pointer for `node`
    pub fn set_next_for(&mut self, node: u64, next: u64) {
        if self.first_node == node {
            self.first_chain.next = next;
        }
        if self.second_node == node {
            self.second_chain.next = next;
        }
    }

    /// Replace the chain position for `node`
    pub fn set_position_for(&mut self, node: u64, position: ChainPosition) {
        if self.first_node == node {
            self.first_chain.position = position;
        }
        if self.second_node == node {
            self.second_chain.position = position;
        }
    }
}

impl Record for RelationshipRecord {
    const KIND: RecordKind = RecordKind::Relationship;

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }

    fn blank(id: u64) -> Self {
        Self {
            header: RecordHeader::unused(id),
            ..Self::new(id, NULL_REFERENCE, NULL_REFERENCE, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_for_endpoints() {
        let rel = RelationshipRecord::new(1, 10, 20, 3);
        assert_eq!(rel.direction_for(10), Some(RelationshipDirection::Outgoing));
        assert_eq!(rel.direction_for(20), Some(RelationshipDirection::Incoming));
        assert_eq!(rel.direction_for(30), None);
        assert_eq!(rel.other_node(10), Some(20));

        let looped = RelationshipRecord::new(2, 10, 10, 3);
        assert!(looped.is_loop());
        assert_eq!(looped.direction_for(10), Some(RelationshipDirection::Loop));
        assert_eq!(looped.other_node(10), Some(10));
    }

    #[test]
    fn test_setters_only_touch_the_matching_endpoint() {
        let mut rel = RelationshipRecord::new(1, 10, 20, 0);
        rel.set_link_for(10, ChainLink::head(4, 7));
        assert_eq!(rel.first_chain, ChainLink::head(4, 7));
        assert_eq!(rel.second_chain, ChainLink::detached());

        rel.set_next_for(20, 9);
        rel.set_position_for(20, ChainPosition::Linked { prev: 5 });
        assert_eq!(rel.second_chain, ChainLink::linked(5, 9));
        assert_eq!(rel.first_chain, ChainLink::head(4, 7));
    }

    #[test]
    fn test_loop_setters_write_both_links() {
        let mut rel = RelationshipRecord::new(1, 10, 10, 0);
        rel.set_link_for(10, ChainLink::head(3, 8));
        assert_eq!(rel.first_chain, rel.second_chain);

        rel.set_position_for(10, ChainPosition::Head { degree: 2 });
        assert_eq!(rel.first_chain.degree(), Some(2));
        assert_eq!(rel.second_chain.degree(), Some(2));
    }

    #[test]
    fn test_chain_link_accessors() {
        let head = ChainLink::head(5, NULL_REFERENCE);
        assert!(head.is_head());
        assert_eq!(head.degree(), Some(5));
        assert_eq!(head.prev(), None);

        let linked = ChainLink::linked(2, 3);
        assert!(!linked.is_head());
        assert_eq!(linked.prev(), Some(2));
        assert_eq!(linked.degree(), None);
    }
}
