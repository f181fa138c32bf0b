//! Database persistence layer for hashledger
//!
//! Blocks are stored in their canonical encoding, the same bytes that are
//! hashed, so a loaded block always reproduces the hash it was stored with.

use crate::blockchain::Block;
use crate::error::ChainError;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::sync::Arc;

/// Abstraction for persistence backends. A backend only ever sees blocks that
/// already passed linkage validation, in chain order.
pub trait Persistence: Send + Sync {
    fn save_block(&self, block: &Block) -> Result<(), ChainError>;
    /// All stored blocks ordered by index. Implementations must check that
    /// each block still matches the hash it was stored under.
    fn load_blocks(&self) -> Result<Vec<Block>, ChainError>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                idx INTEGER PRIMARY KEY,
                hash TEXT NOT NULL,
                previous_hash TEXT NOT NULL,
                body TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        Ok(Database { conn: Mutex::new(conn) })
    }

    pub fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        let body = String::from_utf8(block.canonical_bytes())
            .map_err(|e| ChainError::SerializationError(format!("Block encoding is not UTF-8: {}", e)))?;
        let index = i64::try_from(block.index())
            .map_err(|_| ChainError::DatabaseError(format!("Block index {} exceeds storage range", block.index())))?;

        let conn = self.conn.lock();
        // Plain INSERT: an index is written once and never replaced.
        conn.execute(
            "INSERT INTO blocks (idx, hash, previous_hash, body) VALUES (?1, ?2, ?3, ?4)",
            params![index, block.hash(), block.previous_hash(), body],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to save block {}: {}", block.index(), e)))?;

        Ok(())
    }

    pub fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT idx, hash, body FROM blocks ORDER BY idx ASC")
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let index: i64 = row.get(0)?;
                let hash: String = row.get(1)?;
                let body: String = row.get(2)?;
                Ok((index, hash, body))
            })
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query blocks: {}", e)))?;

        let mut blocks = Vec::new();
        for row in rows {
            let (index, stored_hash, body) =
                row.map_err(|e| ChainError::DatabaseError(format!("Failed to read row: {}", e)))?;
            let index = index as u64;

            let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| ChainError::CorruptChain {
                index,
                reason: format!("stored body is not valid JSON: {}", e),
            })?;
            let block = Block::from_value(&raw).map_err(|e| ChainError::CorruptChain {
                index,
                reason: e.to_string(),
            })?;

            check_stored(index, &stored_hash, &block)?;
            blocks.push(block);
        }

        Ok(blocks)
    }
}

fn check_stored(index: u64, stored_hash: &str, block: &Block) -> Result<(), ChainError> {
    if block.index() != index {
        return Err(ChainError::CorruptChain {
            index,
            reason: format!("row holds block with index {}", block.index()),
        });
    }
    let computed = block.hash();
    if computed != stored_hash {
        return Err(ChainError::CorruptChain {
            index,
            reason: format!("stored hash {} does not match content hash {}", stored_hash, computed),
        });
    }
    Ok(())
}

impl Persistence for Database {
    fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        Database::save_block(self, block)
    }

    fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        Database::load_blocks(self)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
/// Clones share the same underlying storage.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    blocks: Arc<Mutex<Vec<Block>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.lock().is_empty()
    }
}

impl Persistence for InMemoryPersistence {
    fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        let mut blocks = self.blocks.lock();
        if blocks.iter().any(|b| b.index() == block.index()) {
            return Err(ChainError::DatabaseError(format!(
                "Block {} is already stored",
                block.index()
            )));
        }
        blocks.push(block.clone());
        Ok(())
    }

    fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        let mut blocks = self.blocks.lock().clone();
        blocks.sort_by_key(|b| b.index());
        Ok(blocks)
    }
}
