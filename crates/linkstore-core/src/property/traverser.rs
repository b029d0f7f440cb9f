use super::PropertyOwner;
use super::encoding::read_block_value;
use crate::access::{RecordAccessSet, RecordChanges};
use crate::record::{PropertyRecord, PropertyValue, is_null};
use crate::{Error, Result};
use std::collections::HashSet;

/// Read-only walker over property chains
///
/// Walks refuse to loop forever: a chain that revisits a record is reported
/// as [`Error::Inconsistent`]. Repairing such a chain is the deleter's job.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyTraverser;

impl PropertyTraverser {
    /// Id of the record in the chain starting at `first` that holds `key`
    pub fn find_property_record_containing(
        &self,
        first: u64,
        key: u32,
        properties: &mut RecordChanges<'_, PropertyRecord>,
    ) -> Result<Option<u64>> {
        let mut visited = HashSet::new();
        let mut current = first;
        while !is_null(current) {
            if !visited.insert(current) {
                return Err(cycle(current));
            }
            let record = properties.get_in_use(current)?.for_reading();
            if record.block(key).is_some() {
                return Ok(Some(current));
            }
            current = record.next;
        }
        Ok(None)
    }

    /// Record ids of the chain starting at `first`, head first
    pub fn chain(
        &self,
        first: u64,
        properties: &mut RecordChanges<'_, PropertyRecord>,
    ) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        let mut visited = HashSet::new();
        let mut current = first;
        while !is_null(current) {
            if !visited.insert(current) {
                return Err(cycle(current));
            }
            ids.push(current);
            current = properties.get_in_use(current)?.for_reading().next;
        }
        Ok(ids)
    }

    /// Value stored under `key` on `owner`
    pub fn property_value(
        &self,
        owner: PropertyOwner,
        key: u32,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<Option<PropertyValue>> {
        let first = owner.first_property(access)?;
        let Some(record_id) = self.find_property_record_containing(first, key, &mut access.properties)?
        else {
            return Ok(None);
        };
        let record = access.properties.read(record_id)?;
        match record.block(key) {
            Some(block) => read_block_value(block, &mut access.dynamics).map(Some),
            None => Ok(None),
        }
    }

    /// Every key/value pair on `owner`, in chain order
    pub fn properties(
        &self,
        owner: PropertyOwner,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<Vec<(u32, PropertyValue)>> {
        let first = owner.first_property(access)?;
        let mut values = Vec::new();
        for record_id in self.chain(first, &mut access.properties)? {
            let record = access.properties.read(record_id)?;
            for block in &record.blocks {
                values.push((block.key, read_block_value(block, &mut access.dynamics)?));
            }
        }
        Ok(values)
    }
}

fn cycle(record: u64) -> Error {
    Error::inconsistent(format!("cycle in property chain at record {record}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BlockValue, NULL_REFERENCE, PropertyBlock};
    use crate::store::RecordStore;

    fn record(id: u64, prev: u64, next: u64, keys: &[u32]) -> PropertyRecord {
        let mut record = PropertyRecord::new(id);
        record.prev = prev;
        record.next = next;
        for &key in keys {
            record.add_block(PropertyBlock {
                key,
                value: BlockValue::Inline(PropertyValue::Int(key as i64)),
            });
        }
        record
    }

    #[test]
    fn test_find_walks_to_the_record_holding_the_key() {
        let store = RecordStore::new();
        let mut access = RecordAccessSet::new(&store);
        access.properties.create(record(0, NULL_REFERENCE, 1, &[1, 2])).unwrap();
        access.properties.create(record(1, 0, NULL_REFERENCE, &[3])).unwrap();

        let traverser = PropertyTraverser;
        let found = traverser.find_property_record_containing(0, 3, &mut access.properties);
        assert_eq!(found.unwrap(), Some(1));
        let missing = traverser.find_property_record_containing(0, 9, &mut access.properties);
        assert_eq!(missing.unwrap(), None);
        let empty = traverser.find_property_record_containing(NULL_REFERENCE, 1, &mut access.properties);
        assert_eq!(empty.unwrap(), None);
        assert_eq!(traverser.chain(0, &mut access.properties).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_cycles_are_reported_not_followed() {
        let store = RecordStore::new();
        let mut access = RecordAccessSet::new(&store);
        access.properties.create(record(0, NULL_REFERENCE, 1, &[1])).unwrap();
        access.properties.create(record(1, 0, 0, &[2])).unwrap();

        let result = PropertyTraverser.find_property_record_containing(0, 9, &mut access.properties);
        assert!(matches!(result, Err(Error::Inconsistent(_))));
    }
}
