use super::{NULL_REFERENCE, Record, RecordHeader, RecordKind};

/// Dynamic record - one fragment of an overflowed property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicRecord {
    /// Shared header
    pub header: RecordHeader,
    /// Next fragment
    pub next: u64,
    /// Raw payload fragment
    pub data: Vec<u8>,
}

impl DynamicRecord {
    /// A live fragment holding `data`
    pub fn new(id: u64, data: Vec<u8>) -> Self {
        Self {
            header: RecordHeader::in_use(id),
            next: NULL_REFERENCE,
            data,
        }
    }
}

impl Record for DynamicRecord {
    const KIND: RecordKind = RecordKind::Dynamic;

    fn header(&self) -> &RecordHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut RecordHeader {
        &mut self.header
    }

    fn blank(id: u64) -> Self {
        Self {
            header: RecordHeader::unused(id),
            next: NULL_REFERENCE,
            data: Vec::new(),
        }
    }
}
