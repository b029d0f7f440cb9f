//! Block encoding and dynamic overflow chains

use super::PropertyChainManager;
use super::deleter::ChainAnomaly;
use crate::access::RecordChanges;
use crate::record::{BlockValue, DynamicRecord, PropertyBlock, PropertyValue, Record, is_null};
use crate::{Error, Result};
use std::collections::HashSet;

impl PropertyChainManager {
    /// Encode `value` under `key`, spilling into a new dynamic chain if needed
    pub(crate) fn encode_block(
        &self,
        key: u32,
        value: &PropertyValue,
        dynamics: &mut RecordChanges<'_, DynamicRecord>,
    ) -> Result<PropertyBlock> {
        if value.inline_words().is_some() {
            return Ok(PropertyBlock {
                key,
                value: BlockValue::Inline(value.clone()),
            });
        }

        let (kind, bytes) = value.dynamic_payload().ok_or_else(|| {
            Error::inconsistent(format!("value for key {key} neither inlines nor overflows"))
        })?;
        let first = self.write_dynamic_chain(&bytes, dynamics)?;
        Ok(PropertyBlock {
            key,
            value: BlockValue::Dynamic { kind, first },
        })
    }

    /// Split `bytes` over freshly allocated dynamic records, returning the head
    fn write_dynamic_chain(
        &self,
        bytes: &[u8],
        dynamics: &mut RecordChanges<'_, DynamicRecord>,
    ) -> Result<u64> {
        let chunk_size = self.config.dynamic_record_data_size;
        if chunk_size == 0 {
            return Err(Error::config("dynamic_record_data_size must be positive"));
        }
        let count = bytes.len().div_ceil(chunk_size).max(1);
        let ids: Vec<u64> = self.dynamic_ids.next_id_batch(count)?.collect();

        let mut chunks = bytes.chunks(chunk_size);
        for (index, &id) in ids.iter().enumerate() {
            let mut record = DynamicRecord::new(id, chunks.next().unwrap_or_default().to_vec());
            if let Some(&next) = ids.get(index + 1) {
                record.next = next;
            }
            dynamics.create(record)?;
        }
        ids.first()
            .copied()
            .ok_or_else(|| Error::inconsistent("empty dynamic id batch"))
    }
}

/// Decode the value held by `block`
pub(crate) fn read_block_value(
    block: &PropertyBlock,
    dynamics: &mut RecordChanges<'_, DynamicRecord>,
) -> Result<PropertyValue> {
    match &block.value {
        BlockValue::Inline(value) => Ok(value.clone()),
        BlockValue::Dynamic { kind, first } => {
            let bytes = read_dynamic_chain(*first, dynamics)?;
            kind.decode(bytes).ok_or_else(|| {
                Error::inconsistent(format!(
                    "dynamic chain at {first} does not decode as {kind:?}"
                ))
            })
        }
    }
}

/// Concatenate the payload of the chain starting at `first`
///
/// Fails on a cycle or a record that is not in use.
pub(crate) fn read_dynamic_chain(
    first: u64,
    dynamics: &mut RecordChanges<'_, DynamicRecord>,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut visited = HashSet::new();
    let mut current = first;
    while !is_null(current) {
        if !visited.insert(current) {
            return Err(Error::inconsistent(format!(
                "cycle in dynamic chain at record {current}"
            )));
        }
        let record = dynamics.get_in_use(current)?.for_reading();
        bytes.extend_from_slice(&record.data);
        current = record.next;
    }
    Ok(bytes)
}

/// Free every reachable record of the chain starting at `first`
///
/// Stops at the first revisited or already freed record and reports it.
pub(crate) fn free_dynamic_chain(
    first: u64,
    dynamics: &mut RecordChanges<'_, DynamicRecord>,
) -> Result<Option<ChainAnomaly>> {
    let mut visited = HashSet::new();
    let mut current = first;
    while !is_null(current) {
        if !visited.insert(current) {
            return Ok(Some(ChainAnomaly::Cycle { record: current }));
        }
        let proxy = dynamics.get_or_load(current)?;
        if !proxy.for_reading().in_use() {
            return Ok(Some(ChainAnomaly::UnusedRecord { record: current }));
        }
        let record = proxy.for_changing();
        record.set_in_use(false);
        current = record.next;
    }
    Ok(None)
}
