//! hashledger - An append-only, hash-linked ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, content hashing, linkage validation and the chain
//! - [`transaction`] - Opaque key-value payloads and their canonical encoding
//!
//! ## State Management
//! - [`persistence`] - Storage backends (in-memory, SQLite)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;

pub use blockchain::{Block, Chain};
pub use error::{ChainError, Result};
pub use transaction::{Transaction, Value};
