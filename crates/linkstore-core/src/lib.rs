//! Linkstore Core - record-chain maintenance for a native graph store
//!
//! This crate maintains the linked record structures a native graph store
//! keeps on disk:
//! - Property chains: key/value blocks packed into fixed-size property records,
//!   large values overflowing into dynamic record chains, and deletion that
//!   survives corrupted chains
//! - Relationship chains: doubly-linked per-node chains, sparse to dense
//!   promotion, and per-type relationship groups for dense nodes
//! - Degree accounting: the first record of every (sub-)chain carries the
//!   chain's degree in place of a back pointer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        Engine / WriteTransaction            │
//! │     (commit, abort, row locks, ids)         │
//! └──────────────┬──────────────────────────────┘
//!                │
//! ┌──────────────┴──────────────────────────────┐
//! │             Chain Managers                  │
//! │ (PropertyChainManager, PropertyTraverser,   │
//! │  RelationshipChainManager, GroupManager)    │
//! └──────────────┬──────────────────────────────┘
//!                │
//! ┌──────────────┴──────────────────────────────┐
//! │             Record Access                   │
//! │    (per-transaction overlay of records)     │
//! └──────────────┬──────────────────────────────┘
//!                │
//! ┌──────────────┴──────────────────────────────┐
//! │             Record Store                    │
//! │  (fixed-size record slots, id generators)   │
//! └─────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod config;
pub mod engine;
pub mod error;
pub mod ids;
pub mod locks;
pub mod log;
pub mod property;
pub mod record;
pub mod relationship;
pub mod store;
pub mod token;
pub mod transaction;

pub use engine::Engine;
pub use error::{Error, Result};
