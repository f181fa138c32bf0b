use crate::error::ChainError;
use crate::persistence::Persistence;
use crate::transaction::Transaction;
use std::fmt;
use tracing::{debug, info, warn};

use super::block::Block;
use super::validation::{validate_chain, validate_linkage};

/// Back-reference carried by the genesis block. Never produced by hashing
/// real content.
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// An append-only sequence of blocks. Always holds at least the genesis
/// block; every later block is linked to its predecessor.
pub struct Chain {
    blocks: Vec<Block>,
    /// Storage backend; `None` for a purely in-memory chain.
    persistence: Option<Box<dyn Persistence>>,
}

impl Clone for Chain {
    fn clone(&self) -> Self {
        Self {
            blocks: self.blocks.clone(),
            // Persistence cannot be cloned as a trait object; the clone lives in memory only.
            persistence: None,
        }
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// Create a new in-memory `Chain` holding only a fresh genesis block.
    pub fn new() -> Self {
        let genesis = Self::create_genesis_block();
        Chain {
            blocks: vec![genesis],
            persistence: None,
        }
    }

    /// Open a chain backed by `persistence`. Stored blocks are re-verified;
    /// an empty store is seeded with a new genesis block.
    pub fn open(persistence: Box<dyn Persistence>) -> Result<Self, ChainError> {
        let blocks = persistence.load_blocks()?;

        if blocks.is_empty() {
            let genesis = Self::create_genesis_block();
            persistence.save_block(&genesis)?;
            info!("Created new chain with genesis block {}", genesis.hash());
            return Ok(Chain {
                blocks: vec![genesis],
                persistence: Some(persistence),
            });
        }

        if let Err(e) = validate_chain(&blocks) {
            warn!("Stored chain failed verification: {}", e);
            return Err(e);
        }
        info!("Loaded chain with {} blocks", blocks.len());
        Ok(Chain {
            blocks,
            persistence: Some(persistence),
        })
    }

    fn create_genesis_block() -> Block {
        Block::genesis(now_seconds(), GENESIS_PREVIOUS_HASH)
    }

    /// The most recently appended block.
    pub fn last_block(&self) -> &Block {
        // Non-empty from construction onwards.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn genesis_block(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a chain holds its genesis block from creation.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Build the candidate that would extend the current tip with `transaction`.
    /// The chain is not modified; pass the result to [`Chain::append`] to commit it.
    pub fn create_block_from_transaction(&self, transaction: Transaction) -> Result<Block, ChainError> {
        let last = self.last_block();
        let block = Block::new(last.index() + 1, now_seconds(), last.hash(), transaction)?;
        debug!("Prepared candidate block {} on top of {}", block.index(), block.previous_hash());
        Ok(block)
    }

    /// Validate `block` against the tip and append it. On any error the chain
    /// is left exactly as it was.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        if let Err(e) = validate_linkage(self.last_block(), &block) {
            warn!("Rejected block {}: {}", block.index(), e);
            return Err(e);
        }

        if let Some(persistence) = &self.persistence {
            persistence.save_block(&block)?;
        }

        info!("Appended block {} with hash {}", block.index(), block.hash());
        self.blocks.push(block);
        Ok(())
    }

    /// Append an untyped record. Values that are not block records are
    /// rejected before any linkage check.
    pub fn append_value(&mut self, value: &serde_json::Value) -> Result<(), ChainError> {
        let block = Block::from_value(value).map_err(|e| {
            warn!("Rejected record: {}", e);
            e
        })?;
        self.append(block)
    }

    /// Re-check the whole-chain invariant.
    pub fn verify(&self) -> Result<(), ChainError> {
        validate_chain(&self.blocks)
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Chain(length={})", self.blocks.len())?;
        for block in &self.blocks {
            writeln!(f, "  #{} {}", block.index(), block.hash())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Chain").field("blocks", &self.blocks).finish_non_exhaustive()
    }
}
