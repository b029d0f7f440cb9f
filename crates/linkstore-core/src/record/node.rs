use super::{NULL_REFERENCE, Record, RecordHeader, RecordKind};

/// Node record
///
/// `next_rel` is the head of the node's relationship chain while the node is
/// sparse and the head of its relationship group chain once it is dense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Shared header
    pub header: RecordHeader,
    /// Whether relationships are organised in per-type groups
    pub dense: bool,
    /// First relationship (sparse) or first relationship group (dense)
    pub next_rel: u64,
    /// First property record
    pub next_prop: u64,
    /// Label data, owned by the label store and carried through unchanged
    pub label_bits: u64,
}

impl NodeRecord {
    /// A live, sparse node without relationships or properties
    pub fn new(id: u64) -> Self {
        Self {
            header: RecordHeader::in_use(id),
            dense: false,
            next_rel: NULL_REFERENCE,
            next_prop: NULL_REFERENCE,
            label_bits: 0,
        }
    }
}

impl Record for NodeRecord {
    const KIND: RecordKind = RecordKind::Node;

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }

    fn blank(id: u64) -> Self {
        Self {
            header: RecordHeader::unused(id),
            ..Self::new(id)
        }
    }
}
