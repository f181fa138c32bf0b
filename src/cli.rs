//! Helpers shared by the command-line driver

use crate::blockchain::Chain;
use crate::config::Config;
use crate::error::ChainError;
use crate::persistence::Database;
use crate::transaction::{Transaction, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Open the ledger described by `config`: SQLite when a database path is
/// set, otherwise a fresh in-memory chain.
pub fn open_chain(config: &Config) -> Result<Chain, ChainError> {
    match config.database.path.as_deref() {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            debug!("Opening ledger database at {}", path);
            Chain::open(Box::new(Database::open(path)?))
        }
        None => Ok(Chain::new()),
    }
}

/// Parse `key=value` pairs into a payload. Values go through
/// [`Value::parse_literal`].
pub fn parse_assignments<S: AsRef<str>>(pairs: &[S]) -> Result<Transaction, ChainError> {
    let mut tx = Transaction::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, raw) = pair.split_once('=').ok_or_else(|| {
            ChainError::InvalidBlock(format!("expected key=value, got '{}'", pair))
        })?;
        if key.is_empty() {
            return Err(ChainError::InvalidBlock(format!("empty key in '{}'", pair)));
        }
        tx.insert(key, Value::parse_literal(raw));
    }
    Ok(tx)
}
