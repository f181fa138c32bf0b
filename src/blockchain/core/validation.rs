use crate::error::ChainError;

use super::block::Block;

/// Checks that `candidate` directly extends `tip`: the index is exactly one
/// higher and the back-reference equals the tip's content hash.
pub fn validate_linkage(tip: &Block, candidate: &Block) -> Result<(), ChainError> {
    let expected_index = tip.index() + 1;
    if candidate.index() != expected_index {
        return Err(ChainError::IndexMismatch {
            expected: expected_index,
            got: candidate.index(),
        });
    }

    let tip_hash = tip.hash();
    if candidate.previous_hash() != tip_hash {
        return Err(ChainError::PreviousHashMismatch {
            expected: tip_hash,
            got: candidate.previous_hash().to_string(),
        });
    }
    Ok(())
}

/// Verifies a whole block sequence: non-empty, genesis at index 0, and every
/// later block linked to its predecessor.
pub fn validate_chain(blocks: &[Block]) -> Result<(), ChainError> {
    let genesis = blocks.first().ok_or_else(|| ChainError::CorruptChain {
        index: 0,
        reason: "chain has no genesis block".to_string(),
    })?;

    if genesis.index() != 0 {
        return Err(ChainError::CorruptChain {
            index: genesis.index(),
            reason: "first block is not at index 0".to_string(),
        });
    }

    for pair in blocks.windows(2) {
        validate_linkage(&pair[0], &pair[1]).map_err(|e| ChainError::CorruptChain {
            index: pair[1].index(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;

    fn genesis() -> Block {
        Block::new(0, 1.0, "0".repeat(64), Transaction::new()).unwrap()
    }

    fn next(tip: &Block) -> Block {
        Block::new(tip.index() + 1, 2.0, tip.hash(), Transaction::new().with("n", 1)).unwrap()
    }

    #[test]
    fn test_linked_block_passes() {
        let genesis = genesis();
        assert!(validate_linkage(&genesis, &next(&genesis)).is_ok());
    }

    #[test]
    fn test_index_checked_before_hash() {
        let genesis = genesis();
        let candidate = Block::new(5, 2.0, "0123456789abcdef".to_string(), Transaction::new()).unwrap();
        assert_eq!(
            validate_linkage(&genesis, &candidate).unwrap_err(),
            ChainError::IndexMismatch { expected: 1, got: 5 }
        );
    }

    #[test]
    fn test_stale_previous_hash_rejected() {
        let genesis = genesis();
        let candidate = Block::new(1, 2.0, "0123456789abcdef".to_string(), Transaction::new()).unwrap();
        let err = validate_linkage(&genesis, &candidate).unwrap_err();
        assert_eq!(
            err,
            ChainError::PreviousHashMismatch {
                expected: genesis.hash(),
                got: "0123456789abcdef".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_chain() {
        let genesis = genesis();
        let first = next(&genesis);
        let second = next(&first);
        assert!(validate_chain(&[genesis.clone(), first.clone(), second.clone()]).is_ok());

        assert!(validate_chain(&[]).is_err());

        let err = validate_chain(&[first.clone()]).unwrap_err();
        assert!(matches!(err, ChainError::CorruptChain { index: 1, .. }));

        // Rewriting block 1 breaks the back-reference held by block 2.
        let tampered = first.with_nonce(99);
        let err = validate_chain(&[genesis, tampered, second]).unwrap_err();
        assert!(matches!(err, ChainError::CorruptChain { index: 2, .. }));
    }
}
