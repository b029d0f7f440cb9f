//! Property chains
//!
//! Every node and relationship owns a doubly-linked chain of
//! [`PropertyRecord`](crate::record::PropertyRecord)s. Each record packs a
//! handful of key/value blocks into a fixed payload; values too large to
//! inline spill into a chain of dynamic records.
//!
//! - [`PropertyTraverser`]: read-only walks (find the record holding a key,
//!   read values back)
//! - [`PropertyChainManager`]: set, remove and bulk-create properties, and
//!   delete whole chains even when they are damaged

mod creator;
mod deleter;
mod encoding;
mod traverser;

pub use deleter::ChainAnomaly;
pub use traverser::PropertyTraverser;

use crate::access::RecordAccessSet;
use crate::config::ChainConfig;
use crate::ids::IdSequence;
use crate::log::DiagnosticLog;
use crate::record::Record;
use crate::token::TokenNameLookup;
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// The record a property chain hangs off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyOwner {
    /// A node record
    Node(u64),
    /// A relationship record
    Relationship(u64),
}

impl PropertyOwner {
    /// Owner record id
    pub fn id(&self) -> u64 {
        match *self {
            PropertyOwner::Node(id) | PropertyOwner::Relationship(id) => id,
        }
    }

    /// First property record of the owner; the owner must be in use
    pub fn first_property(&self, access: &mut RecordAccessSet<'_>) -> Result<u64> {
        Ok(match *self {
            PropertyOwner::Node(id) => access.nodes.get_in_use(id)?.for_reading().next_prop,
            PropertyOwner::Relationship(id) => {
                access.relationships.get_in_use(id)?.for_reading().next_prop
            }
        })
    }

    /// Point the owner at a new first property record
    pub fn set_first_property(&self, access: &mut RecordAccessSet<'_>, first: u64) -> Result<()> {
        match *self {
            PropertyOwner::Node(id) => {
                let node = access.nodes.get_or_load(id)?;
                if node.for_reading().next_prop != first {
                    node.for_changing().next_prop = first;
                }
            }
            PropertyOwner::Relationship(id) => {
                let rel = access.relationships.get_or_load(id)?;
                if rel.for_reading().next_prop != first {
                    rel.for_changing().next_prop = first;
                }
            }
        }
        Ok(())
    }

    /// Whether the owner record is live
    pub fn in_use(&self, access: &mut RecordAccessSet<'_>) -> Result<bool> {
        Ok(match *self {
            PropertyOwner::Node(id) => access.nodes.get_or_load(id)?.for_reading().in_use(),
            PropertyOwner::Relationship(id) => {
                access.relationships.get_or_load(id)?.for_reading().in_use()
            }
        })
    }
}

impl fmt::Display for PropertyOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyOwner::Node(id) => write!(f, "node {id}"),
            PropertyOwner::Relationship(id) => write!(f, "relationship {id}"),
        }
    }
}

/// Creates, updates and deletes property chains
pub struct PropertyChainManager {
    config: ChainConfig,
    property_ids: Arc<dyn IdSequence>,
    dynamic_ids: Arc<dyn IdSequence>,
    tokens: Arc<dyn TokenNameLookup>,
    log: Arc<dyn DiagnosticLog>,
    traverser: PropertyTraverser,
}

impl PropertyChainManager {
    /// Create a manager allocating from the given id sequences
    pub fn new(
        config: ChainConfig,
        property_ids: Arc<dyn IdSequence>,
        dynamic_ids: Arc<dyn IdSequence>,
        tokens: Arc<dyn TokenNameLookup>,
        log: Arc<dyn DiagnosticLog>,
    ) -> Self {
        Self {
            config,
            property_ids,
            dynamic_ids,
            tokens,
            log,
            traverser: PropertyTraverser,
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Read-only walker over the chains this manager maintains
    pub fn traverser(&self) -> &PropertyTraverser {
        &self.traverser
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{NULL_REFERENCE, NodeRecord, RelationshipRecord};
    use crate::store::RecordStore;

    #[test]
    fn test_owner_first_property_round_trip() {
        let store = RecordStore::new();
        let mut access = RecordAccessSet::new(&store);
        access.nodes.create(NodeRecord::new(1)).unwrap();
        access
            .relationships
            .create(RelationshipRecord::new(2, 1, 1, 0))
            .unwrap();

        for owner in [PropertyOwner::Node(1), PropertyOwner::Relationship(2)] {
            assert_eq!(owner.first_property(&mut access).unwrap(), NULL_REFERENCE);
            owner.set_first_property(&mut access, 9).unwrap();
            assert_eq!(owner.first_property(&mut access).unwrap(), 9);
            assert!(owner.in_use(&mut access).unwrap());
        }
    }

    #[test]
    fn test_owner_must_be_in_use() {
        let store = RecordStore::new();
        let mut access = RecordAccessSet::new(&store);
        assert!(PropertyOwner::Node(4).first_property(&mut access).is_err());
        assert_eq!(PropertyOwner::Relationship(4).to_string(), "relationship 4");
    }
}
