//! Row-level locking for chain maintenance
//!
//! Chain managers only *request* locks through [`LockClient`]. The
//! [`RowLockManager`] is the shared lock table; each write transaction talks
//! to it through its own [`TransactionLocks`] client, which is reentrant and
//! releases everything it holds when dropped.

use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Resource type for locking
///
/// Group records have no locks of their own; they belong to one node and are
/// only touched under that node's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    /// Node resource
    Node,
    /// Relationship resource
    Relationship,
}

/// Resource identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Resource type
    pub resource_type: ResourceType,
    /// Resource ID
    pub id: u64,
}

impl ResourceId {
    /// Create a new node resource ID
    pub fn node(id: u64) -> Self {
        Self {
            resource_type: ResourceType::Node,
            id,
        }
    }

    /// Create a new relationship resource ID
    pub fn relationship(id: u64) -> Self {
        Self {
            resource_type: ResourceType::Relationship,
            id,
        }
    }
}

/// Lock requests issued by the chain managers
pub trait LockClient {
    /// Take exclusive locks on `ids`, blocking until granted or timed out
    fn acquire_exclusive(&mut self, resource_type: ResourceType, ids: &[u64]) -> Result<()>;

    /// Give back exclusive locks on `ids`
    fn release_exclusive(&mut self, resource_type: ResourceType, ids: &[u64]);

    /// Give back everything this client holds
    fn release_all(&mut self);
}

/// Lock holder information
#[derive(Debug, Clone)]
struct LockHolder {
    /// Transaction ID holding the lock
    tx_id: u64,
    /// When the lock was acquired
    acquired_at: Instant,
}

/// Row-level lock manager
#[derive(Debug, Clone)]
pub struct RowLockManager {
    /// Map of resource to its exclusive holder
    locks: Arc<RwLock<HashMap<ResourceId, LockHolder>>>,
    /// Default timeout for lock acquisition
    default_timeout: Duration,
}

impl RowLockManager {
    /// Create a new row lock manager
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Arc::new(RwLock::new(HashMap::new())),
            default_timeout: timeout,
        }
    }

    /// Default timeout for lock acquisition
    pub fn timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Acquire a write lock on a resource
    pub fn acquire_write(&self, tx_id: u64, resource: ResourceId) -> Result<RowLockGuard> {
        self.acquire_write_with_timeout(tx_id, resource, self.default_timeout)
    }

    /// Acquire a write lock with timeout
    pub fn acquire_write_with_timeout(
        &self,
        tx_id: u64,
        resource: ResourceId,
        timeout: Duration,
    ) -> Result<RowLockGuard> {
        let start = Instant::now();

        loop {
            {
                let mut locks = self.locks.write();
                let held_by_other = locks
                    .get(&resource)
                    .is_some_and(|holder| holder.tx_id != tx_id);

                if !held_by_other {
                    locks.entry(resource).or_insert(LockHolder {
                        tx_id,
                        acquired_at: Instant::now(),
                    });
                    return Ok(RowLockGuard {
                        manager: self.clone(),
                        tx_id,
                        resource,
                    });
                }
            }

            if start.elapsed() >= timeout {
                return Err(Error::LockTimeout(format!(
                    "Failed to acquire write lock on {:?} within timeout",
                    resource
                )));
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Acquire multiple write locks, in resource order
    pub fn acquire_multiple_write(
        &self,
        tx_id: u64,
        resources: &[ResourceId],
    ) -> Result<Vec<RowLockGuard>> {
        let mut ordered = resources.to_vec();
        ordered.sort();
        ordered.dedup();

        // Guards acquired so far are released on the error path by drop
        ordered
            .into_iter()
            .map(|resource| self.acquire_write(tx_id, resource))
            .collect()
    }

    /// Transaction currently holding `resource`
    pub fn holder(&self, resource: ResourceId) -> Option<u64> {
        self.locks.read().get(&resource).map(|holder| holder.tx_id)
    }

    /// Release a lock
    fn release(&self, tx_id: u64, resource: ResourceId) {
        let mut locks = self.locks.write();
        if locks.get(&resource).is_some_and(|holder| holder.tx_id == tx_id) {
            if let Some(holder) = locks.remove(&resource) {
                tracing::trace!(
                    "Released {:?} held by tx {} for {:?}",
                    resource,
                    tx_id,
                    holder.acquired_at.elapsed()
                );
            }
        }
    }

    /// Get lock statistics
    pub fn stats(&self) -> LockStats {
        let locks = self.locks.read();
        let mut transactions: Vec<u64> = locks.values().map(|h| h.tx_id).collect();
        transactions.sort_unstable();
        transactions.dedup();

        LockStats {
            total_resources: locks.len(),
            node_locks: locks
                .keys()
                .filter(|r| r.resource_type == ResourceType::Node)
                .count(),
            relationship_locks: locks
                .keys()
                .filter(|r| r.resource_type == ResourceType::Relationship)
                .count(),
            transactions: transactions.len(),
        }
    }
}

impl Default for RowLockManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Lock guard that automatically releases the lock when dropped
pub struct RowLockGuard {
    manager: RowLockManager,
    tx_id: u64,
    resource: ResourceId,
}

impl RowLockGuard {
    /// Locked resource
    pub fn resource(&self) -> ResourceId {
        self.resource
    }
}

impl Drop for RowLockGuard {
    fn drop(&mut self) {
        self.manager.release(self.tx_id, self.resource);
    }
}

/// Lock statistics
#[derive(Debug, Clone)]
pub struct LockStats {
    /// Total number of locked resources
    pub total_resources: usize,
    /// Locked nodes
    pub node_locks: usize,
    /// Locked relationships
    pub relationship_locks: usize,
    /// Distinct transactions holding locks
    pub transactions: usize,
}

/// Per-transaction lock client
///
/// Asking twice for the same resource is a no-op; all guards are released
/// when the client is dropped.
pub struct TransactionLocks {
    manager: RowLockManager,
    tx_id: u64,
    held: HashMap<ResourceId, RowLockGuard>,
}

impl TransactionLocks {
    /// Lock client for transaction `tx_id`
    pub fn new(manager: RowLockManager, tx_id: u64) -> Self {
        Self {
            manager,
            tx_id,
            held: HashMap::new(),
        }
    }

    /// Whether this client holds `resource`
    pub fn holds(&self, resource: ResourceId) -> bool {
        self.held.contains_key(&resource)
    }

    /// Number of resources held
    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

impl LockClient for TransactionLocks {
    fn acquire_exclusive(&mut self, resource_type: ResourceType, ids: &[u64]) -> Result<()> {
        let wanted: Vec<ResourceId> = ids
            .iter()
            .map(|&id| ResourceId { resource_type, id })
            .filter(|resource| !self.held.contains_key(resource))
            .collect();

        for guard in self.manager.acquire_multiple_write(self.tx_id, &wanted)? {
            self.held.insert(guard.resource(), guard);
        }
        Ok(())
    }

    fn release_exclusive(&mut self, resource_type: ResourceType, ids: &[u64]) {
        for &id in ids {
            self.held.remove(&ResourceId { resource_type, id });
        }
    }

    fn release_all(&mut self) {
        self.held.clear();
    }
}

impl std::fmt::Debug for TransactionLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionLocks")
            .field("tx_id", &self.tx_id)
            .field("held", &self.held.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_lock_exclusivity() {
        let manager = RowLockManager::default();
        let resource = ResourceId::node(1);

        // Write lock should succeed
        let guard1 = manager.acquire_write(1, resource).unwrap();

        // Second write lock should fail (timeout)
        let result = manager.acquire_write_with_timeout(2, resource, Duration::from_millis(100));
        assert!(matches!(result, Err(Error::LockTimeout(_))));

        drop(guard1);

        // Now write lock should succeed
        let guard2 = manager.acquire_write(2, resource).unwrap();
        assert_eq!(manager.holder(resource), Some(2));
        drop(guard2);
        assert_eq!(manager.holder(resource), None);
    }

    #[test]
    fn test_multiple_resources() {
        let manager = RowLockManager::default();

        // Lock different resources concurrently
        let guard1 = manager.acquire_write(1, ResourceId::node(1)).unwrap();
        let guard2 = manager.acquire_write(2, ResourceId::node(2)).unwrap();
        let guard3 = manager
            .acquire_write(3, ResourceId::relationship(1))
            .unwrap();

        let stats = manager.stats();
        assert_eq!(stats.total_resources, 3);
        assert_eq!(stats.node_locks, 2);
        assert_eq!(stats.relationship_locks, 1);
        assert_eq!(stats.transactions, 3);

        drop(guard1);
        drop(guard2);
        drop(guard3);
        assert_eq!(manager.stats().total_resources, 0);
    }

    #[test]
    fn test_multiple_write_locks_dedup() {
        let manager = RowLockManager::default();
        let resources = vec![ResourceId::node(3), ResourceId::node(1), ResourceId::node(3)];

        let guards = manager.acquire_multiple_write(1, &resources).unwrap();
        assert_eq!(guards.len(), 2);
        assert_eq!(guards[0].resource(), ResourceId::node(1));
        assert_eq!(manager.stats().total_resources, 2);
    }

    #[test]
    fn test_failed_multiple_write_releases_partial_guards() {
        let manager = RowLockManager::new(Duration::from_millis(50));
        let _blocker = manager.acquire_write(9, ResourceId::node(2)).unwrap();

        let result = manager.acquire_multiple_write(1, &[ResourceId::node(1), ResourceId::node(2)]);
        assert!(result.is_err());
        assert_eq!(manager.holder(ResourceId::node(1)), None);
    }

    #[test]
    fn test_transaction_locks_are_reentrant_and_released_on_drop() {
        let manager = RowLockManager::new(Duration::from_millis(50));
        let mut locks = TransactionLocks::new(manager.clone(), 1);

        locks.acquire_exclusive(ResourceType::Node, &[1, 2]).unwrap();
        locks.acquire_exclusive(ResourceType::Node, &[2]).unwrap();
        assert_eq!(locks.held_count(), 2);
        assert!(locks.holds(ResourceId::node(2)));

        let mut other = TransactionLocks::new(manager.clone(), 2);
        assert!(other.acquire_exclusive(ResourceType::Node, &[2]).is_err());

        locks.release_exclusive(ResourceType::Node, &[2]);
        other.acquire_exclusive(ResourceType::Node, &[2]).unwrap();

        drop(locks);
        assert_eq!(manager.holder(ResourceId::node(1)), None);
        other.release_all();
        assert_eq!(manager.stats().total_resources, 0);
    }
}
