use super::{NULL_REFERENCE, Record, RecordHeader, RecordKind};
use std::fmt;

/// Payload of one property record, in 8-byte words
pub const PAYLOAD_WORDS: usize = 4;

/// Longest string/byte value stored inline in a block
pub const MAX_INLINE_BYTES: usize = 24;

/// Longest int array stored inline in a block
const MAX_INLINE_ARRAY_LEN: usize = 3;

/// Property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Boolean value
    Bool(bool),
    /// 64-bit integer value
    Int(i64),
    /// 64-bit floating point value
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Array of 64-bit integers
    IntArray(Vec<i64>),
}

impl PropertyValue {
    /// Words this value takes as an inline block, `None` when it must overflow
    pub fn inline_words(&self) -> Option<usize> {
        match self {
            PropertyValue::Bool(_) => Some(1),
            PropertyValue::Int(v) => Some(if i32::try_from(*v).is_ok() { 1 } else { 2 }),
            PropertyValue::Float(_) => Some(2),
            PropertyValue::String(s) => inline_byte_words(s.len()),
            PropertyValue::Bytes(b) => inline_byte_words(b.len()),
            PropertyValue::IntArray(values) => {
                (values.len() <= MAX_INLINE_ARRAY_LEN).then(|| 1 + values.len())
            }
        }
    }

    /// Kind and raw bytes for values that can live in a dynamic chain
    pub fn dynamic_payload(&self) -> Option<(DynamicKind, Vec<u8>)> {
        match self {
            PropertyValue::String(s) => Some((DynamicKind::String, s.as_bytes().to_vec())),
            PropertyValue::Bytes(b) => Some((DynamicKind::Bytes, b.clone())),
            PropertyValue::IntArray(values) => Some((
                DynamicKind::IntArray,
                values.iter().flat_map(|v| v.to_le_bytes()).collect(),
            )),
            _ => None,
        }
    }
}

fn inline_byte_words(len: usize) -> Option<usize> {
    (len <= MAX_INLINE_BYTES).then(|| 1 + len.div_ceil(8))
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Bytes(b) => write!(f, "{b:?}"),
            PropertyValue::IntArray(values) => write!(f, "{values:?}"),
        }
    }
}

/// Value kind stored in a dynamic chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicKind {
    /// UTF-8 string bytes
    String,
    /// Raw bytes
    Bytes,
    /// Little-endian i64 words
    IntArray,
}

impl DynamicKind {
    /// Rebuild a value from the concatenated chain payload
    pub fn decode(self, bytes: Vec<u8>) -> Option<PropertyValue> {
        match self {
            DynamicKind::String => String::from_utf8(bytes).ok().map(PropertyValue::String),
            DynamicKind::Bytes => Some(PropertyValue::Bytes(bytes)),
            DynamicKind::IntArray => {
                if bytes.len() % 8 != 0 {
                    return None;
                }
                let values = bytes
                    .chunks_exact(8)
                    .map(|chunk| {
                        let mut word = [0u8; 8];
                        word.copy_from_slice(chunk);
                        i64::from_le_bytes(word)
                    })
                    .collect();
                Some(PropertyValue::IntArray(values))
            }
        }
    }
}

/// Value slot of a property block
#[derive(Debug, Clone, PartialEq)]
pub enum BlockValue {
    /// Value encoded in the block itself
    Inline(PropertyValue),
    /// Value stored in a dynamic record chain
    Dynamic {
        /// How to decode the chain payload
        kind: DynamicKind,
        /// First dynamic record
        first: u64,
    },
}

/// One key/value pair inside a property record
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBlock {
    /// Property key id
    pub key: u32,
    /// Inline value or dynamic chain reference
    pub value: BlockValue,
}

impl PropertyBlock {
    /// Words this block occupies in a record payload
    pub fn size_in_words(&self) -> usize {
        match &self.value {
            BlockValue::Inline(value) => value.inline_words().unwrap_or(PAYLOAD_WORDS),
            BlockValue::Dynamic { .. } => 1,
        }
    }

    /// Head of the overflow chain, if the value overflowed
    pub fn dynamic_head(&self) -> Option<u64> {
        match self.value {
            BlockValue::Dynamic { first, .. } => Some(first),
            BlockValue::Inline(_) => None,
        }
    }
}

/// Property record - capacity-bounded set of blocks in a doubly-linked chain
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    /// Shared header
    pub header: RecordHeader,
    /// Previous record in the owner's chain
    pub prev: u64,
    /// Next record in the owner's chain
    pub next: u64,
    /// Blocks in insertion order
    pub blocks: Vec<PropertyBlock>,
}

impl PropertyRecord {
    /// A live, empty, unlinked record
    pub fn new(id: u64) -> Self {
        Self {
            header: RecordHeader::in_use(id),
            prev: NULL_REFERENCE,
            next: NULL_REFERENCE,
            blocks: Vec::new(),
        }
    }

    /// Words used by all blocks
    pub fn size_in_words(&self) -> usize {
        self.blocks.iter().map(PropertyBlock::size_in_words).sum()
    }

    /// Words still available
    pub fn free_words(&self) -> usize {
        PAYLOAD_WORDS.saturating_sub(self.size_in_words())
    }

    /// Whether the record holds no blocks
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block for `key`
    pub fn block(&self, key: u32) -> Option<&PropertyBlock> {
        self.blocks.iter().find(|block| block.key == key)
    }

    /// Append a block
    pub fn add_block(&mut self, block: PropertyBlock) {
        self.blocks.push(block);
    }

    /// Swap the block with the same key, keeping its position
    pub fn replace_block(&mut self, block: PropertyBlock) -> Option<PropertyBlock> {
        let slot = self.blocks.iter_mut().find(|b| b.key == block.key)?;
        Some(std::mem::replace(slot, block))
    }

    /// Take the block for `key` out of the record
    pub fn remove_block(&mut self, key: u32) -> Option<PropertyBlock> {
        let index = self.blocks.iter().position(|block| block.key == key)?;
        Some(self.blocks.remove(index))
    }
}

impl Record for PropertyRecord {
    const KIND: RecordKind = RecordKind::Property;

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
