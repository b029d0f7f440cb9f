//! Setting and removing single properties

use super::encoding::{free_dynamic_chain, read_block_value};
use super::{PropertyChainManager, PropertyOwner};
use crate::access::RecordAccessSet;
use crate::record::{
    NULL_REFERENCE, PAYLOAD_WORDS, PropertyBlock, PropertyRecord, PropertyValue, Record, is_null,
};
use crate::{Error, Result};
use std::collections::HashSet;

impl PropertyChainManager {
    /// Set `key` to `value` on `owner`
    ///
    /// An existing block is rewritten in place while its record still has room
    /// for the new encoding; otherwise it moves to wherever
    /// [placement](Self::place_block) puts a fresh block.
    pub fn set_property(
        &self,
        owner: PropertyOwner,
        key: u32,
        value: &PropertyValue,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<()> {
        let first = owner.first_property(access)?;
        let found = self
            .traverser
            .find_property_record_containing(first, key, &mut access.properties)?;

        let Some(record_id) = found else {
            let block = self.encode_block(key, value, &mut access.dynamics)?;
            return self.place_block(owner, block, access);
        };

        let record = access.properties.read(record_id)?;
        let old_block = record
            .block(key)
            .cloned()
            .ok_or_else(|| Error::inconsistent(format!("key {key} vanished from record {record_id}")))?;
        if let Some(head) = old_block.dynamic_head() {
            free_dynamic_chain(head, &mut access.dynamics)?;
        }
        let new_block = self.encode_block(key, value, &mut access.dynamics)?;

        let used = record.size_in_words() - old_block.size_in_words();
        if used + new_block.size_in_words() <= PAYLOAD_WORDS {
            access
                .properties
                .get_or_load(record_id)?
                .for_changing()
                .replace_block(new_block);
            return Ok(());
        }

        self.take_block(owner, record_id, key, access)?;
        self.place_block(owner, new_block, access)
    }

    /// Remove `key` from `owner`, returning the value it held
    pub fn remove_property(
        &self,
        owner: PropertyOwner,
        key: u32,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<Option<PropertyValue>> {
        let first = owner.first_property(access)?;
        let Some(record_id) = self
            .traverser
            .find_property_record_containing(first, key, &mut access.properties)?
        else {
            return Ok(None);
        };

        let block = self.take_block(owner, record_id, key, access)?;
        let value = read_block_value(&block, &mut access.dynamics)?;
        if let Some(head) = block.dynamic_head() {
            free_dynamic_chain(head, &mut access.dynamics)?;
        }
        Ok(Some(value))
    }

    /// Build a chain for an owner that has none, packing blocks in order
    pub fn create_property_chain(
        &self,
        owner: PropertyOwner,
        properties: &[(u32, PropertyValue)],
        access: &mut RecordAccessSet<'_>,
    ) -> Result<()> {
        if !is_null(owner.first_property(access)?) {
            return Err(Error::inconsistent(format!("{owner} already has a property chain")));
        }
        let mut keys = HashSet::new();
        if let Some((key, _)) = properties.iter().find(|(key, _)| !keys.insert(*key)) {
            return Err(Error::inconsistent(format!("duplicate property key {key} for {owner}")));
        }

        let mut records: Vec<PropertyRecord> = Vec::new();
        for (key, value) in properties {
            let block = self.encode_block(*key, value, &mut access.dynamics)?;
            let fits = records
                .last()
                .is_some_and(|record| record.free_words() >= block.size_in_words());
            if !fits {
                records.push(PropertyRecord::new(self.property_ids.next_id()?));
            }
            if let Some(record) = records.last_mut() {
                record.add_block(block);
            }
        }

        let ids: Vec<u64> = records.iter().map(Record::id).collect();
        for (index, mut record) in records.into_iter().enumerate() {
            record.prev = index
                .checked_sub(1)
                .map_or(NULL_REFERENCE, |prev| ids[prev]);
            record.next = ids.get(index + 1).copied().unwrap_or(NULL_REFERENCE);
            access.properties.create(record)?;
        }
        if let Some(&first) = ids.first() {
            owner.set_first_property(access, first)?;
        }
        Ok(())
    }

    /// Put `block` into the first record from the head with room for it,
    /// or into a new record that becomes the chain head
    fn place_block(
        &self,
        owner: PropertyOwner,
        block: PropertyBlock,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<()> {
        let first = owner.first_property(access)?;
        let needed = block.size_in_words();

        for record_id in self.traverser.chain(first, &mut access.properties)? {
            let proxy = access.properties.get_or_load(record_id)?;
            if proxy.for_reading().free_words() >= needed {
                proxy.for_changing().add_block(block);
                return Ok(());
            }
        }

        let mut record = PropertyRecord::new(self.property_ids.next_id()?);
        let new_head = record.id();
        record.next = first;
        record.add_block(block);
        access.properties.create(record)?;
        if !is_null(first) {
            access.properties.get_or_load(first)?.for_changing().prev = new_head;
        }
        owner.set_first_property(access, new_head)
    }

    /// Take the block for `key` out of `record_id`, unlinking and freeing the
    /// record when it ends up empty. Dynamic chains are left to the caller.
    fn take_block(
        &self,
        owner: PropertyOwner,
        record_id: u64,
        key: u32,
        access: &mut RecordAccessSet<'_>,
    ) -> Result<PropertyBlock> {
        let record = access.properties.get_in_use(record_id)?.for_changing();
        let block = record
            .remove_block(key)
            .ok_or_else(|| Error::inconsistent(format!("key {key} not in record {record_id}")))?;
        if !record.is_empty() {
            return Ok(block);
        }

        let (prev, next) = (record.prev, record.next);
        record.set_in_use(false);
        record.prev = NULL_REFERENCE;
        record.next = NULL_REFERENCE;

        if is_null(prev) {
            owner.set_first_property(access, next)?;
        } else {
            access.properties.get_or_load(prev)?.for_changing().next = next;
        }
        if !is_null(next) {
            access.properties.get_or_load(next)?.for_changing().prev = prev;
        }
        Ok(block)
    }
}
