//! Record model - fixed-size, id-addressed records of the graph store
//!
//! Five record kinds make up the chains this crate maintains:
//! - `NodeRecord`: entry point into a node's relationship chain (or group chain
//!   once dense) and its property chain
//! - `RelationshipRecord`: member of two doubly-linked chains, one per endpoint
//! - `RelationshipGroupRecord`: per-type heads of a dense node's sub-chains
//! - `PropertyRecord`: a handful of property blocks, doubly linked
//! - `DynamicRecord`: overflow fragment for values too large to inline
//!
//! Every record embeds a [`RecordHeader`]; "deleted" only ever means the
//! `in_use` flag was cleared.

mod dynamic;
mod group;
pub mod layout;
mod node;
mod property;
mod relationship;

pub use dynamic::DynamicRecord;
pub use group::{RelationshipDirection, RelationshipGroupRecord};
pub use node::NodeRecord;
pub use property::{
    BlockValue, DynamicKind, MAX_INLINE_BYTES, PAYLOAD_WORDS, PropertyBlock, PropertyRecord,
    PropertyValue,
};
pub use relationship::{ChainLink, ChainPosition, RelationshipRecord};

use std::fmt;

/// Reserved reference meaning "no record"
pub const NULL_REFERENCE: u64 = u64::MAX;

/// Whether a reference field points nowhere
#[inline]
pub fn is_null(reference: u64) -> bool {
    reference == NULL_REFERENCE
}

/// Kind of record, used for id sequences, errors and locks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// Node records
    Node,
    /// Relationship records
    Relationship,
    /// Relationship group records
    RelationshipGroup,
    /// Property records
    Property,
    /// Dynamic (overflow) records
    Dynamic,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Node => "node",
            RecordKind::Relationship => "relationship",
            RecordKind::RelationshipGroup => "relationship group",
            RecordKind::Property => "property",
            RecordKind::Dynamic => "dynamic",
        };
        f.write_str(name)
    }
}

/// Fields shared by every record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record id
    pub id: u64,
    /// Whether the record is live
    pub in_use: bool,
}

impl RecordHeader {
    /// Header of a live record
    pub fn in_use(id: u64) -> Self {
        Self { id, in_use: true }
    }

    /// Header of a free slot
    pub fn unused(id: u64) -> Self {
        Self { id, in_use: false }
    }
}

/// Common behaviour of all record kinds
pub trait Record: Clone + fmt::Debug {
    /// Kind tag for this record type
    const KIND: RecordKind;

    /// Shared header
    fn header(&self) -> &RecordHeader;

    /// Mutable shared header
    fn header_mut(&mut self) -> &mut RecordHeader;

    /// A blank, not-in-use record for `id`
    fn blank(id: u64) -> Self;

    /// Record id
    fn id(&self) -> u64 {
        self.header().id
    }

    /// Whether the record is live
    fn in_use(&self) -> bool {
        self.header().in_use
    }

    /// Flip the live flag
    fn set_in_use(&mut self, in_use: bool) {
        self.header_mut().in_use = in_use;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_reference() {
        assert!(is_null(NULL_REFERENCE));
        assert!(!is_null(0));
    }

    #[test]
    fn test_blank_records_are_unused() {
        assert!(!NodeRecord::blank(3).in_use());
        assert!(!RelationshipRecord::blank(3).in_use());
        assert!(!RelationshipGroupRecord::blank(3).in_use());
        assert!(!PropertyRecord::blank(3).in_use());
        assert!(!DynamicRecord::blank(3).in_use());
        assert_eq!(NodeRecord::blank(3).id(), 3);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(RecordKind::RelationshipGroup.to_string(), "relationship group");
        assert_eq!(RecordKind::Dynamic.to_string(), "dynamic");
    }
}
