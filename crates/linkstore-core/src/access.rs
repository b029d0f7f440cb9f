//! Record access - per-transaction overlay of staged record changes
//!
//! Chain managers never touch the store. They ask a [`RecordChanges`] for a
//! record id and get back a [`RecordProxy`] holding the record as it was read
//! (`before`) and the copy being changed. The first access loads from the
//! underlying [`RecordLoader`]; later accesses in the same transaction see the
//! staged copy. On commit the caller drains the changed proxies into a
//! [`ChangeSet`] and applies it atomically.

use crate::record::{
    DynamicRecord, NodeRecord, PropertyRecord, Record, RecordKind, RelationshipGroupRecord,
    RelationshipRecord, is_null,
};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Read side of a record store for one record kind
pub trait RecordLoader<R: Record> {
    /// Load the committed record for `id`
    ///
    /// Ids that were never written read as a blank, not-in-use record.
    fn load(&self, id: u64) -> Result<R>;
}

/// A record staged in a transaction
#[derive(Debug, Clone)]
pub struct RecordProxy<R> {
    id: u64,
    before: Option<R>,
    after: R,
    created: bool,
    changed: bool,
}

impl<R: Record> RecordProxy<R> {
    /// Record id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current state, including changes staged so far
    pub fn for_reading(&self) -> &R {
        &self.after
    }

    /// Mutable copy; marks the record as changed
    pub fn for_changing(&mut self) -> &mut R {
        self.changed = true;
        &mut self.after
    }

    /// The record as it was before this transaction, `None` for created records
    pub fn before(&self) -> Option<&R> {
        self.before.as_ref()
    }

    /// Whether the record was created in this transaction
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Whether the record was changed (or created) in this transaction
    pub fn is_changed(&self) -> bool {
        self.changed
    }
}

/// Staged records of one kind
pub struct RecordChanges<'s, R: Record> {
    loader: &'s dyn RecordLoader<R>,
    records: BTreeMap<u64, RecordProxy<R>>,
}

impl<'s, R: Record> RecordChanges<'s, R> {
    /// Overlay on top of `loader`
    pub fn new(loader: &'s dyn RecordLoader<R>) -> Self {
        Self {
            loader,
            records: BTreeMap::new(),
        }
    }

    /// Staged proxy for `id`, loading it on first access
    pub fn get_or_load(&mut self, id: u64) -> Result<&mut RecordProxy<R>> {
        if is_null(id) {
            return Err(Error::InvalidId { kind: R::KIND, id });
        }
        if !self.records.contains_key(&id) {
            let record = self.loader.load(id)?;
            self.records.insert(
                id,
                RecordProxy {
                    id,
                    before: Some(record.clone()),
                    after: record,
                    created: false,
                    changed: false,
                },
            );
        }
        self.records
            .get_mut(&id)
            .ok_or_else(|| Error::inconsistent(format!("{} record {id} vanished", R::KIND)))
    }

    /// Load `id` and fail unless it is in use
    pub fn get_in_use(&mut self, id: u64) -> Result<&mut RecordProxy<R>> {
        let proxy = self.get_or_load(id)?;
        if !proxy.for_reading().in_use() {
            return Err(Error::not_in_use(R::KIND, id));
        }
        Ok(proxy)
    }

    /// Current state of `id`, cloned out of the overlay
    pub fn read(&mut self, id: u64) -> Result<R> {
        Ok(self.get_or_load(id)?.for_reading().clone())
    }

    /// Stage a newly created record
    pub fn create(&mut self, record: R) -> Result<&mut RecordProxy<R>> {
        let id = record.id();
        if is_null(id) {
            return Err(Error::InvalidId { kind: R::KIND, id });
        }
        if self.records.contains_key(&id) {
            return Err(Error::DuplicateRecord { kind: R::KIND, id });
        }
        Ok(self.records.entry(id).or_insert(RecordProxy {
            id,
            before: None,
            after: record,
            created: true,
            changed: true,
        }))
    }

    /// Proxy for `id` if it was already touched in this transaction
    pub fn get_if_loaded(&self, id: u64) -> Option<&RecordProxy<R>> {
        self.records.get(&id)
    }

    /// Number of records changed or created
    pub fn change_count(&self) -> usize {
        self.records.values().filter(|p| p.is_changed()).count()
    }

    /// Changed and created proxies in id order
    pub fn changes(&self) -> impl Iterator<Item = &RecordProxy<R>> + '_ {
        self.records.values().filter(|p| p.is_changed())
    }

    /// Ids of records created in this transaction
    pub fn created_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.records.values().filter(|p| p.is_created()).map(|p| p.id)
    }

    /// Drain the final state of every changed record, leaving the overlay empty
    pub fn take_changed_records(&mut self) -> Vec<R> {
        std::mem::take(&mut self.records)
            .into_values()
            .filter(|p| p.is_changed())
            .map(|p| p.after)
            .collect()
    }
}

/// Record overlays for every kind touched by chain maintenance
pub struct RecordAccessSet<'s> {
    /// Node records
    pub nodes: RecordChanges<'s, NodeRecord>,
    /// Relationship records
    pub relationships: RecordChanges<'s, RelationshipRecord>,
    /// Relationship group records
    pub groups: RecordChanges<'s, RelationshipGroupRecord>,
    /// Property records
    pub properties: RecordChanges<'s, PropertyRecord>,
    /// Dynamic overflow records
    pub dynamics: RecordChanges<'s, DynamicRecord>,
}

impl<'s> RecordAccessSet<'s> {
    /// Overlays reading through `store`
    pub fn new<L>(store: &'s L) -> Self
    where
        L: RecordLoader<NodeRecord>
            + RecordLoader<RelationshipRecord>
            + RecordLoader<RelationshipGroupRecord>
            + RecordLoader<PropertyRecord>
            + RecordLoader<DynamicRecord>,
    {
        Self {
            nodes: RecordChanges::new(store),
            relationships: RecordChanges::new(store),
            groups: RecordChanges::new(store),
            properties: RecordChanges::new(store),
            dynamics: RecordChanges::new(store),
        }
    }

    /// Total number of staged changes
    pub fn change_count(&self) -> usize {
        self.nodes.change_count()
            + self.relationships.change_count()
            + self.groups.change_count()
            + self.properties.change_count()
            + self.dynamics.change_count()
    }

    /// Ids of every record created in this transaction, by kind
    pub fn created_ids(&self) -> Vec<(RecordKind, u64)> {
        let mut ids = Vec::new();
        ids.extend(self.nodes.created_ids().map(|id| (RecordKind::Node, id)));
        ids.extend(self.relationships.created_ids().map(|id| (RecordKind::Relationship, id)));
        ids.extend(self.groups.created_ids().map(|id| (RecordKind::RelationshipGroup, id)));
        ids.extend(self.properties.created_ids().map(|id| (RecordKind::Property, id)));
        ids.extend(self.dynamics.created_ids().map(|id| (RecordKind::Dynamic, id)));
        ids
    }

    /// Drain every changed record into a change set
    pub fn take_change_set(&mut self) -> ChangeSet {
        ChangeSet {
            nodes: self.nodes.take_changed_records(),
            relationships: self.relationships.take_changed_records(),
            groups: self.groups.take_changed_records(),
            properties: self.properties.take_changed_records(),
            dynamics: self.dynamics.take_changed_records(),
        }
    }
}

/// Final state of every record changed by one transaction
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Changed node records
    pub nodes: Vec<NodeRecord>,
    /// Changed relationship records
    pub relationships: Vec<RelationshipRecord>,
    /// Changed group records
    pub groups: Vec<RelationshipGroupRecord>,
    /// Changed property records
    pub properties: Vec<PropertyRecord>,
    /// Changed dynamic records
    pub dynamics: Vec<DynamicRecord>,
}

impl ChangeSet {
    /// Number of records in the set
    pub fn len(&self) -> usize {
        self.nodes.len()
            + self.relationships.len()
            + self.groups.len()
            + self.properties.len()
            + self.dynamics.len()
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of changed records of `kind`
    pub fn count(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Node => self.nodes.len(),
            RecordKind::Relationship => self.relationships.len(),
            RecordKind::RelationshipGroup => self.groups.len(),
            RecordKind::Property => self.properties.len(),
            RecordKind::Dynamic => self.dynamics.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NULL_REFERENCE;
    use crate::store::RecordStore;

    #[test]
    fn test_load_tracks_before_and_after() {
        let store = RecordStore::new();
        let mut changes = RecordChanges::<NodeRecord>::new(&store);

        let proxy = changes.get_or_load(5).unwrap();
        assert!(!proxy.is_created());
        assert!(!proxy.is_changed());
        assert!(!proxy.for_reading().in_use());

        proxy.for_changing().set_in_use(true);
        assert!(proxy.is_changed());
        assert!(!proxy.before().unwrap().in_use());
        assert!(proxy.for_reading().in_use());

        // Second access sees the staged copy
        assert!(changes.get_or_load(5).unwrap().for_reading().in_use());
        assert_eq!(changes.change_count(), 1);
    }

    #[test]
    fn test_create_and_duplicate() {
        let store = RecordStore::new();
        let mut changes = RecordChanges::<NodeRecord>::new(&store);

        let proxy = changes.create(NodeRecord::new(1)).unwrap();
        assert!(proxy.is_created());
        assert!(proxy.before().is_none());

        let err = changes.create(NodeRecord::new(1)).unwrap_err();
        assert!(matches!(err, Error::DuplicateRecord { id: 1, .. }));
    }

    #[test]
    fn test_null_reference_is_rejected() {
        let store = RecordStore::new();
        let mut changes = RecordChanges::<RelationshipRecord>::new(&store);
        let err = changes.get_or_load(NULL_REFERENCE).unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
    }

    #[test]
    fn test_get_in_use_fails_fast() {
        let store = RecordStore::new();
        let mut changes = RecordChanges::<RelationshipRecord>::new(&store);
        let err = changes.get_in_use(3).unwrap_err();
        assert!(matches!(err, Error::RecordNotInUse { id: 3, .. }));
    }

    #[test]
    fn test_unchanged_records_stay_out_of_the_change_set() {
        let store = RecordStore::new();
        let mut access = RecordAccessSet::new(&store);
        access.nodes.get_or_load(1).unwrap();
        access.nodes.create(NodeRecord::new(2)).unwrap();
        assert_eq!(access.change_count(), 1);

        assert_eq!(access.created_ids(), vec![(RecordKind::Node, 2)]);

        let set = access.take_change_set();
        assert_eq!(set.len(), 1);
        assert_eq!(set.count(RecordKind::Node), 1);
        assert_eq!(set.nodes[0].header.id, 2);
        assert_eq!(access.change_count(), 0);
    }
}
