//! Write transactions
//!
//! A [`WriteTransaction`] owns one record overlay and one lock client. Chain
//! operations stage records in the overlay; [`commit`](WriteTransaction::commit)
//! applies the resulting change set to the store in one step. A failed
//! operation may leave the overlay half-changed, so it aborts the transaction
//! and nothing it staged can be committed. A transaction that ends without
//! committing returns the ids of the records it created.

use crate::access::{ChangeSet, RecordAccessSet};
use crate::engine::Engine;
use crate::ids::IdSequence;
use crate::locks::{LockClient, ResourceType, TransactionLocks};
use crate::property::{ChainAnomaly, PropertyOwner};
use crate::record::{NodeRecord, PropertyValue, RecordKind};
use crate::relationship::{Direction, TypeDegrees};
use crate::{Error, Result};

/// Transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Active transaction
    Active,
    /// Committed transaction
    Committed,
    /// Aborted transaction
    Aborted,
}

/// Write transaction handle
pub struct WriteTransaction<'e> {
    id: u64,
    state: TxState,
    engine: &'e Engine,
    access: RecordAccessSet<'e>,
    locks: TransactionLocks,
}

impl<'e> WriteTransaction<'e> {
    pub(crate) fn new(engine: &'e Engine, id: u64) -> Self {
        tracing::trace!("Begin write transaction {}", id);
        Self {
            id,
            state: TxState::Active,
            engine,
            access: RecordAccessSet::new(engine.store()),
            locks: TransactionLocks::new(engine.lock_manager().clone(), id),
        }
    }

    /// Transaction ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Transaction state
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Staged records, for callers driving the chain managers directly
    pub fn access(&mut self) -> &mut RecordAccessSet<'e> {
        &mut self.access
    }

    /// Lock client of this transaction
    pub fn locks(&mut self) -> &mut dyn LockClient {
        &mut self.locks
    }

    /// Run `op` against the overlay, aborting the transaction if it fails
    fn run<T>(
        &mut self,
        op: impl FnOnce(&'e Engine, &mut RecordAccessSet<'e>, &mut TransactionLocks) -> Result<T>,
    ) -> Result<T> {
        if self.state != TxState::Active {
            return Err(Error::transaction(format!(
                "transaction {} is {:?}",
                self.id, self.state
            )));
        }
        let result = op(self.engine, &mut self.access, &mut self.locks);
        if let Err(e) = &result {
            tracing::debug!("Transaction {} aborted: {}", self.id, e);
            self.state = TxState::Aborted;
        }
        result
    }

    /// Create a node without relationships or properties
    pub fn create_node(&mut self) -> Result<u64> {
        self.run(|engine, access, _| {
            let id = engine.store().id_generator(RecordKind::Node).next_id()?;
            access.nodes.create(NodeRecord::new(id))?;
            Ok(id)
        })
    }

    /// Create a relationship, returning its id
    pub fn create_relationship(&mut self, rel_type: u32, from: u64, to: u64) -> Result<u64> {
        self.run(|engine, access, locks| {
            let ids = engine.store().id_generator(RecordKind::Relationship);
            let id = ids.next_id()?;
            let created = engine
                .relationship_manager()
                .create_relationship(id, rel_type, from, to, access, locks);
            if created.is_err() && access.relationships.get_if_loaded(id).is_none() {
                // Failed before the record was staged, so nothing else returns it
                ids.free_id(id);
            }
            created.map(|()| id)
        })
    }

    /// Delete a relationship and its properties
    pub fn delete_relationship(&mut self, id: u64) -> Result<()> {
        self.run(|engine, access, locks| {
            engine
                .relationship_manager()
                .delete_relationship(id, access, locks)
        })
    }

    /// Relationships of a node
    pub fn relationships(&mut self, node: u64) -> Result<Vec<u64>> {
        self.run(|engine, access, _| engine.relationship_manager().relationships(node, access))
    }

    /// Degree of a node
    pub fn degree(&mut self, node: u64, rel_type: Option<u32>, direction: Direction) -> Result<u64> {
        self.run(|engine, access, _| {
            engine
                .relationship_manager()
                .degree(node, rel_type, direction, access)
        })
    }

    /// Per-type degrees of a node
    pub fn degrees(&mut self, node: u64) -> Result<Vec<TypeDegrees>> {
        self.run(|engine, access, _| engine.relationship_manager().degrees(node, access))
    }

    /// Set a property
    pub fn set_property(&mut self, owner: PropertyOwner, key: u32, value: PropertyValue) -> Result<()> {
        self.run(|engine, access, locks| {
            lock_owner(owner, locks)?;
            engine
                .property_manager()
                .set_property(owner, key, &value, access)
        })
    }

    /// Remove a property, returning its old value
    pub fn remove_property(&mut self, owner: PropertyOwner, key: u32) -> Result<Option<PropertyValue>> {
        self.run(|engine, access, locks| {
            lock_owner(owner, locks)?;
            engine.property_manager().remove_property(owner, key, access)
        })
    }

    /// Read a property
    pub fn property(&mut self, owner: PropertyOwner, key: u32) -> Result<Option<PropertyValue>> {
        self.run(|engine, access, _| {
            engine
                .property_manager()
                .traverser()
                .property_value(owner, key, access)
        })
    }

    /// Every property of an owner, in chain order
    pub fn properties(&mut self, owner: PropertyOwner) -> Result<Vec<(u32, PropertyValue)>> {
        self.run(|engine, access, _| {
            engine
                .property_manager()
                .traverser()
                .properties(owner, access)
        })
    }

    /// Delete every property of an owner
    pub fn delete_properties(&mut self, owner: PropertyOwner) -> Result<Option<ChainAnomaly>> {
        self.run(|engine, access, locks| {
            lock_owner(owner, locks)?;
            engine.property_manager().delete_property_chain(owner, access)
        })
    }

    /// Apply every staged change to the store
    pub fn commit(mut self) -> Result<ChangeSet> {
        if self.state != TxState::Active {
            return Err(Error::transaction(format!(
                "cannot commit transaction {}: {:?}",
                self.id, self.state
            )));
        }
        let changes = self.access.take_change_set();
        self.engine.store().apply(&changes)?;
        self.state = TxState::Committed;
        self.locks.release_all();
        tracing::debug!("Committed transaction {} ({} records)", self.id, changes.len());
        Ok(changes)
    }

    /// Discard every staged change
    ///
    /// Ids of records created by this transaction go back to their
    /// generators. Dropping an uncommitted transaction does the same.
    pub fn abort(mut self) {
        self.state = TxState::Aborted;
        tracing::debug!(
            "Aborted transaction {} ({} staged records dropped)",
            self.id,
            self.access.change_count()
        );
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if self.state == TxState::Committed {
            return;
        }
        let store = self.engine.store();
        for (kind, id) in self.access.created_ids() {
            store.id_generator(kind).free_id(id);
        }
        self.locks.release_all();
    }
}

fn lock_owner(owner: PropertyOwner, locks: &mut TransactionLocks) -> Result<()> {
    match owner {
        PropertyOwner::Node(id) => locks.acquire_exclusive(ResourceType::Node, &[id]),
        PropertyOwner::Relationship(id) => locks.acquire_exclusive(ResourceType::Relationship, &[id]),
    }
}
