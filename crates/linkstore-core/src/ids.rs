//! Id sequences
//!
//! The chain managers only rely on the [`IdSequence`] contract. [`IdGenerator`]
//! is the store-side implementation: a high-water mark plus a free list that
//! ids are returned to when a deletion is applied.

use crate::record::{NULL_REFERENCE, RecordKind};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::ops::Range;

/// Source of fresh record ids
pub trait IdSequence: Send + Sync {
    /// One fresh id
    fn next_id(&self) -> Result<u64>;

    /// `count` consecutive fresh ids
    fn next_id_batch(&self, count: usize) -> Result<Range<u64>>;
}

#[derive(Debug)]
struct GeneratorState {
    high_id: u64,
    free: BTreeSet<u64>,
}

/// Id generator for one record kind
#[derive(Debug)]
pub struct IdGenerator {
    kind: RecordKind,
    max_id: u64,
    state: Mutex<GeneratorState>,
}

impl IdGenerator {
    /// Generator handing out ids from 0 up to the reserved null reference
    pub fn new(kind: RecordKind) -> Self {
        Self::with_max_id(kind, NULL_REFERENCE - 1)
    }

    /// Generator that fails once `max_id` has been handed out
    pub fn with_max_id(kind: RecordKind, max_id: u64) -> Self {
        Self {
            kind,
            max_id: max_id.min(NULL_REFERENCE - 1),
            state: Mutex::new(GeneratorState {
                high_id: 0,
                free: BTreeSet::new(),
            }),
        }
    }

    /// Return a freed id for reuse
    pub fn free_id(&self, id: u64) {
        let mut state = self.state.lock();
        if id < state.high_id {
            state.free.insert(id);
        }
    }

    /// Make sure ids up to and including `id` are never handed out fresh
    pub fn mark_used(&self, id: u64) {
        let mut state = self.state.lock();
        state.free.remove(&id);
        if id >= state.high_id {
            state.high_id = id + 1;
        }
    }

    /// Next id past everything ever handed out
    pub fn high_id(&self) -> u64 {
        self.state.lock().high_id
    }

    /// Ids waiting for reuse
    pub fn free_count(&self) -> usize {
        self.state.lock().free.len()
    }

    fn exhausted(&self) -> Error {
        Error::IdExhausted {
            kind: self.kind,
            limit: self.max_id,
        }
    }
}

impl IdSequence for IdGenerator {
    fn next_id(&self) -> Result<u64> {
        let mut state = self.state.lock();
        if let Some(id) = state.free.pop_first() {
            return Ok(id);
        }
        if state.high_id > self.max_id {
            return Err(self.exhausted());
        }
        let id = state.high_id;
        state.high_id += 1;
        Ok(id)
    }

    fn next_id_batch(&self, count: usize) -> Result<Range<u64>> {
        // Batches are always contiguous, so they come from the high-water mark
        let mut state = self.state.lock();
        let start = state.high_id;
        let end = start
            .checked_add(count as u64)
            .filter(|end| *end <= self.max_id.saturating_add(1))
            .ok_or_else(|| self.exhausted())?;
        state.high_id = end;
        Ok(start..end)
    }
}
