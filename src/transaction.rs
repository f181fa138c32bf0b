//! Transaction payload module split into types and validation

pub mod types;
pub mod validation;

pub use types::*;
