// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// block construction and hashing, linkage validation and chain management.

pub mod core;
pub use core::*;
