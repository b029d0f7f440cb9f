//! Engine - wires the record store, locks and chain managers together

use crate::config::ChainConfig;
use crate::locks::RowLockManager;
use crate::log::{DiagnosticLog, TracingLog};
use crate::property::PropertyChainManager;
use crate::record::RecordKind;
use crate::relationship::{RelationshipChainManager, RelationshipGroupManager};
use crate::store::RecordStore;
use crate::token::{TokenNameLookup, TokenRegistry};
use crate::transaction::WriteTransaction;
use crate::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Graph record engine
///
/// Owns the committed [`RecordStore`] and hands out [`WriteTransaction`]s that
/// stage chain changes and apply them on commit.
///
/// # Examples
///
/// ```
/// use linkstore_core::Engine;
/// use linkstore_core::config::ChainConfig;
/// use linkstore_core::relationship::Direction;
///
/// let engine = Engine::new(ChainConfig::default())?;
/// let mut tx = engine.begin();
/// let a = tx.create_node()?;
/// let b = tx.create_node()?;
/// tx.create_relationship(0, a, b)?;
/// tx.commit()?;
///
/// let mut tx = engine.begin();
/// assert_eq!(tx.degree(a, None, Direction::Outgoing)?, 1);
/// # Ok::<(), linkstore_core::Error>(())
/// ```
pub struct Engine {
    config: ChainConfig,
    store: RecordStore,
    lock_manager: RowLockManager,
    properties: Arc<PropertyChainManager>,
    relationships: RelationshipChainManager,
    tokens: Arc<dyn TokenNameLookup>,
    next_tx_id: AtomicU64,
}

impl Engine {
    /// Engine over an empty store, logging through `tracing`
    pub fn new(config: ChainConfig) -> Result<Self> {
        Self::with_parts(
            config,
            RecordStore::new(),
            Arc::new(TokenRegistry::new()),
            Arc::new(TracingLog),
        )
    }

    /// Engine over `store` with explicit token names and diagnostic sink
    ///
    /// Fails with [`Error::Config`](crate::Error::Config) when `config` is out
    /// of range.
    pub fn with_parts(
        config: ChainConfig,
        store: RecordStore,
        tokens: Arc<dyn TokenNameLookup>,
        log: Arc<dyn DiagnosticLog>,
    ) -> Result<Self> {
        let config = config.validated()?;
        let properties = Arc::new(PropertyChainManager::new(
            config.clone(),
            store.id_sequence(RecordKind::Property),
            store.id_sequence(RecordKind::Dynamic),
            tokens.clone(),
            log,
        ));
        let relationships = RelationshipChainManager::new(
            config.clone(),
            RelationshipGroupManager::new(store.id_sequence(RecordKind::RelationshipGroup)),
            properties.clone(),
        );
        tracing::debug!(
            "Engine ready (dense threshold {}, dynamic record size {})",
            config.dense_node_threshold,
            config.dynamic_record_data_size
        );

        Ok(Self {
            config,
            store,
            lock_manager: RowLockManager::default(),
            properties,
            relationships,
            tokens,
            next_tx_id: AtomicU64::new(1),
        })
    }

    /// Replace the lock manager's acquisition timeout
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_manager = RowLockManager::new(timeout);
        self
    }

    /// Begin a write transaction
    pub fn begin(&self) -> WriteTransaction<'_> {
        let id = self.next_tx_id.fetch_add(1, Ordering::Relaxed);
        WriteTransaction::new(self, id)
    }

    /// Configuration in effect
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Committed records
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Shared lock table
    pub fn lock_manager(&self) -> &RowLockManager {
        &self.lock_manager
    }

    /// Property chain manager
    pub fn property_manager(&self) -> &PropertyChainManager {
        &self.properties
    }

    /// Relationship chain manager
    pub fn relationship_manager(&self) -> &RelationshipChainManager {
        &self.relationships
    }

    /// Token names used in diagnostics
    pub fn tokens(&self) -> &dyn TokenNameLookup {
        self.tokens.as_ref()
    }
}
