//! Record store - committed state the chain managers read through
//!
//! An in-memory stand-in for the on-disk stores:
//! - node, relationship and group records live in fixed-size slots of a byte
//!   buffer (`id * record_size`), encoded with the layouts in
//!   [`crate::record::layout`], so every commit round-trips the degree-in-prev
//!   encoding
//! - property and dynamic records are kept as decoded records keyed by id
//!
//! The store owns one [`IdGenerator`] per record kind. Applying a change set
//! returns the ids of records that went out of use to their generator.

use crate::access::{ChangeSet, RecordLoader};
use crate::ids::{IdGenerator, IdSequence};
use crate::record::layout::{
    GROUP_RECORD_SIZE, NODE_RECORD_SIZE, RELATIONSHIP_RECORD_SIZE, RawGroupRecord, RawNodeRecord,
    RawRelationshipRecord,
};
use crate::record::{
    DynamicRecord, NodeRecord, PropertyRecord, Record, RecordKind, RelationshipGroupRecord,
    RelationshipRecord, is_null,
};
use crate::{Error, Result};
use bytemuck::Pod;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Initial size of each fixed-size record buffer
const INITIAL_SIZE: usize = 64 * 1024;

/// Growable buffer of fixed-size record slots
struct RecordFile {
    bytes: Vec<u8>,
    record_size: usize,
}

impl RecordFile {
    fn new(record_size: usize) -> Self {
        Self {
            bytes: vec![0; INITIAL_SIZE],
            record_size,
        }
    }

    /// Slot for `id`, or `None` past the end of the buffer
    fn read<T: Pod>(&self, id: u64) -> Option<T> {
        let offset = usize::try_from(id).ok()?.checked_mul(self.record_size)?;
        let slice = self.bytes.get(offset..offset + self.record_size)?;
        Some(bytemuck::pod_read_unaligned::<T>(slice))
    }

    /// Write the slot for `id`, doubling the buffer as needed
    fn write<T: Pod>(&mut self, id: u64, record: &T) -> Result<()> {
        let offset = usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_mul(self.record_size))
            .ok_or_else(|| Error::inconsistent(format!("record id {id} out of addressable range")))?;
        let required_size = offset + self.record_size;

        if required_size > self.bytes.len() {
            let new_size = (self.bytes.len() * 2).max(required_size);
            self.bytes.resize(new_size, 0);
        }

        self.bytes[offset..required_size].copy_from_slice(bytemuck::bytes_of(record));
        Ok(())
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Record store manager
pub struct RecordStore {
    nodes: RwLock<RecordFile>,
    relationships: RwLock<RecordFile>,
    groups: RwLock<RecordFile>,
    properties: RwLock<HashMap<u64, PropertyRecord>>,
    dynamics: RwLock<HashMap<u64, DynamicRecord>>,

    node_ids: Arc<IdGenerator>,
    relationship_ids: Arc<IdGenerator>,
    group_ids: Arc<IdGenerator>,
    property_ids: Arc<IdGenerator>,
    dynamic_ids: Arc<IdGenerator>,
}

impl RecordStore {
    /// Create an empty store
    ///
    /// # Examples
    ///
    /// ```
    /// use linkstore_core::store::RecordStore;
    ///
    /// let store = RecordStore::new();
    /// assert_eq!(store.stats().node_count, 0);
    /// ```
    pub fn new() -> Self {
        Self::with_generators(IdGenerator::new)
    }

    /// Create an empty store whose id generators come from `make`
    pub fn with_generators(make: impl Fn(RecordKind) -> IdGenerator) -> Self {
        Self {
            nodes: RwLock::new(RecordFile::new(NODE_RECORD_SIZE)),
            relationships: RwLock::new(RecordFile::new(RELATIONSHIP_RECORD_SIZE)),
            groups: RwLock::new(RecordFile::new(GROUP_RECORD_SIZE)),
            properties: RwLock::new(HashMap::new()),
            dynamics: RwLock::new(HashMap::new()),
            node_ids: Arc::new(make(RecordKind::Node)),
            relationship_ids: Arc::new(make(RecordKind::Relationship)),
            group_ids: Arc::new(make(RecordKind::RelationshipGroup)),
            property_ids: Arc::new(make(RecordKind::Property)),
            dynamic_ids: Arc::new(make(RecordKind::Dynamic)),
        }
    }

    /// Id generator for `kind`
    pub fn id_generator(&self, kind: RecordKind) -> &Arc<IdGenerator> {
        match kind {
            RecordKind::Node => &self.node_ids,
            RecordKind::Relationship => &self.relationship_ids,
            RecordKind::RelationshipGroup => &self.group_ids,
            RecordKind::Property => &self.property_ids,
            RecordKind::Dynamic => &self.dynamic_ids,
        }
    }

    /// Id sequence for `kind`, as handed to the chain managers
    pub fn id_sequence(&self, kind: RecordKind) -> Arc<dyn IdSequence> {
        self.id_generator(kind).clone()
    }

    /// Apply a committed change set
    ///
    /// Every record committed as not in use gives its id back to the
    /// generator, including records created and freed by the same change
    /// set; records in use push the generator's high-water mark.
    pub fn apply(&self, changes: &ChangeSet) -> Result<()> {
        {
            let mut nodes = self.nodes.write();
            for record in &changes.nodes {
                let was_in_use = nodes
                    .read::<RawNodeRecord>(record.id())
                    .is_some_and(|raw| raw.to_record(record.id()).in_use());
                nodes.write(record.id(), &RawNodeRecord::from_record(record))?;
                self.track_id(record, was_in_use);
            }
        }
        {
            let mut rels = self.relationships.write();
            for record in &changes.relationships {
                let was_in_use = rels
                    .read::<RawRelationshipRecord>(record.id())
                    .is_some_and(|raw| raw.to_record(record.id()).in_use());
                rels.write(record.id(), &RawRelationshipRecord::from_record(record))?;
                self.track_id(record, was_in_use);
            }
        }
        {
            let mut groups = self.groups.write();
            for record in &changes.groups {
                let was_in_use = groups
                    .read::<RawGroupRecord>(record.id())
                    .is_some_and(|raw| raw.to_record(record.id()).in_use());
                groups.write(record.id(), &RawGroupRecord::from_record(record))?;
                self.track_id(record, was_in_use);
            }
        }
        {
            let mut properties = self.properties.write();
            for record in &changes.properties {
                let was_in_use = properties.get(&record.id()).is_some_and(|r| r.in_use());
                properties.insert(record.id(), record.clone());
                self.track_id(record, was_in_use);
            }
        }
        {
            let mut dynamics = self.dynamics.write();
            for record in &changes.dynamics {
                let was_in_use = dynamics.get(&record.id()).is_some_and(|r| r.in_use());
                dynamics.insert(record.id(), record.clone());
                self.track_id(record, was_in_use);
            }
        }
        Ok(())
    }

    fn track_id<R: Record>(&self, record: &R, was_in_use: bool) {
        let ids = self.id_generator(R::KIND);
        if record.in_use() {
            ids.mark_used(record.id());
        } else {
            // Also covers records created and freed by the same change set
            if !was_in_use {
                tracing::trace!("Reclaiming {} id {} never committed in use", R::KIND, record.id());
            }
            ids.free_id(record.id());
        }
    }

    /// Get statistics
    pub fn stats(&self) -> RecordStoreStats {
        RecordStoreStats {
            node_count: self.node_ids.high_id(),
            relationship_count: self.relationship_ids.high_id(),
            group_count: self.group_ids.high_id(),
            property_records_in_use: self.properties.read().values().filter(|r| r.in_use()).count(),
            dynamic_records_in_use: self.dynamics.read().values().filter(|r| r.in_use()).count(),
            nodes_buffer_size: self.nodes.read().size(),
            relationships_buffer_size: self.relationships.read().size(),
        }
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn load_fixed<R, T>(file: &RwLock<RecordFile>, id: u64, decode: impl Fn(&T, u64) -> R) -> Result<R>
where
    R: Record,
    T: Pod,
{
    if is_null(id) {
        return Err(Error::InvalidId { kind: R::KIND, id });
    }
    Ok(file
        .read()
        .read::<T>(id)
        .map(|raw| decode(&raw, id))
        .filter(|record| record.in_use())
        .unwrap_or_else(|| R::blank(id)))
}

impl RecordLoader<NodeRecord> for RecordStore {
    fn load(&self, id: u64) -> Result<NodeRecord> {
        load_fixed(&self.nodes, id, RawNodeRecord::to_record)
    }
}

impl RecordLoader<RelationshipRecord> for RecordStore {
    fn load(&self, id: u64) -> Result<RelationshipRecord> {
        load_fixed(&self.relationships, id, RawRelationshipRecord::to_record)
    }
}

impl RecordLoader<RelationshipGroupRecord> for RecordStore {
    fn load(&self, id: u64) -> Result<RelationshipGroupRecord> {
        load_fixed(&self.groups, id, RawGroupRecord::to_record)
    }
}

impl RecordLoader<PropertyRecord> for RecordStore {
    fn load(&self, id: u64) -> Result<PropertyRecord> {
        if is_null(id) {
            return Err(Error::InvalidId {
                kind: RecordKind::Property,
                id,
            });
        }
        Ok(self
            .properties
            .read()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| PropertyRecord::blank(id)))
    }
}

impl RecordLoader<DynamicRecord> for RecordStore {
    fn load(&self, id: u64) -> Result<DynamicRecord> {
        if is_null(id) {
            return Err(Error::InvalidId {
                kind: RecordKind::Dynamic,
                id,
            });
        }
        Ok(self
            .dynamics
            .read()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| DynamicRecord::blank(id)))
    }
}

/// Record store statistics
#[derive(Debug, Clone)]
pub struct RecordStoreStats {
    /// Node high-water mark
    pub node_count: u64,
    /// Relationship high-water mark
    pub relationship_count: u64,
    /// Group high-water mark
    pub group_count: u64,
    /// Property records currently in use
    pub property_records_in_use: usize,
    /// Dynamic records currently in use
    pub dynamic_records_in_use: usize,
    /// Size of the node buffer in bytes
    pub nodes_buffer_size: usize,
    /// Size of the relationship buffer in bytes
    pub relationships_buffer_size: usize,
}
