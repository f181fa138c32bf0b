use crate::error::ChainError;
use crate::transaction::validation::json_kind;
use crate::transaction::Transaction;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

pub type Sha256Hash = [u8; 32];

/// Field names making up the canonical attribute set, in sorted order.
pub const BLOCK_FIELDS: [&str; 5] = ["index", "nonce", "previous_hash", "timestamp", "transaction"];

/// One ledger entry.
///
/// Fields are private: a block is fully populated by [`Block::new`] and read
/// through accessors afterwards. The only mutable attribute is the nonce,
/// and only through [`Block::with_nonce`] / [`Block::increment_nonce`].
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    index: u64,
    timestamp: f64,
    previous_hash: String,
    transaction: Transaction,
    nonce: u64,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: f64,
        previous_hash: String,
        transaction: Transaction,
    ) -> Result<Self, ChainError> {
        if !timestamp.is_finite() {
            return Err(ChainError::InvalidBlock(format!(
                "timestamp must be a finite number, got {}",
                timestamp
            )));
        }
        transaction.validate()?;

        Ok(Block {
            index,
            timestamp,
            previous_hash,
            transaction,
            nonce: 0,
        })
    }

    /// Genesis constructor: empty payload and a caller-chosen sentinel link.
    pub(crate) fn genesis(timestamp: f64, previous_hash: &str) -> Self {
        Block {
            index: 0,
            timestamp,
            previous_hash: previous_hash.to_string(),
            transaction: Transaction::new(),
            nonce: 0,
        }
    }

    /// Builds a block from an untyped record, e.g. one read from a JSON file
    /// or from storage. `nonce` is optional and defaults to 0.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ChainError> {
        let object = value
            .as_object()
            .ok_or_else(|| ChainError::NotABlock(format!("expected a block record, got {}", json_kind(value))))?;

        if let Some(unknown) = object.keys().find(|k| !BLOCK_FIELDS.contains(&k.as_str())) {
            return Err(ChainError::InvalidBlock(format!("unknown block field '{}'", unknown)));
        }

        let field = |name: &'static str| object.get(name).ok_or(ChainError::MissingField(name));

        let raw_index = field("index")?;
        let index = raw_index.as_u64().ok_or_else(|| {
            ChainError::InvalidBlock(format!("index must be a non-negative integer, got {}", raw_index))
        })?;

        let raw_timestamp = field("timestamp")?;
        let timestamp = raw_timestamp.as_f64().ok_or_else(|| {
            ChainError::InvalidBlock(format!("timestamp must be numeric, got {}", json_kind(raw_timestamp)))
        })?;

        let raw_previous = field("previous_hash")?;
        let previous_hash = raw_previous
            .as_str()
            .ok_or_else(|| {
                ChainError::InvalidBlock(format!("previous_hash must be a string, got {}", json_kind(raw_previous)))
            })?
            .to_string();

        let transaction = Transaction::from_json(field("transaction")?)?;

        let nonce = match object.get("nonce") {
            None => 0,
            Some(raw) => raw.as_u64().ok_or_else(|| {
                ChainError::InvalidBlock(format!("nonce must be a non-negative integer, got {}", raw))
            })?,
        };

        Ok(Block::new(index, timestamp, previous_hash, transaction)?.with_nonce(nonce))
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn increment_nonce(&mut self) {
        self.nonce = self.nonce.wrapping_add(1);
    }

    /// The full attribute set that is hashed, keyed by field name.
    pub fn attributes(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut attributes = serde_json::Map::new();
        attributes.insert("index".to_string(), serde_json::Value::from(self.index));
        attributes.insert("nonce".to_string(), serde_json::Value::from(self.nonce));
        attributes.insert(
            "previous_hash".to_string(),
            serde_json::Value::String(self.previous_hash.clone()),
        );
        attributes.insert("timestamp".to_string(), serde_json::Value::from(self.timestamp));
        attributes.insert("transaction".to_string(), self.transaction.to_json());
        attributes
    }

    /// Compact JSON of [`Block::attributes`] with sorted keys. These bytes are
    /// both the hash input and the storage form.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        encode_attributes(&self.attributes())
    }

    pub fn digest(&self) -> Sha256Hash {
        Sha256::digest(self.canonical_bytes()).into()
    }

    /// Lowercase hex SHA-256 of the canonical encoding; 64 characters.
    ///
    /// The hash is derived on every call and cannot be assigned:
    ///
    /// ```compile_fail
    /// use hashledger::blockchain::Block;
    /// use hashledger::transaction::Transaction;
    ///
    /// let mut block = Block::new(0, 0.0, "0123456789abcdef".to_string(), Transaction::new()).unwrap();
    /// block.hash = "0123456789abcdef".to_string();
    /// ```
    pub fn hash(&self) -> String {
        hex::encode(self.digest())
    }
}

fn encode_attributes(attributes: &serde_json::Map<String, serde_json::Value>) -> Vec<u8> {
    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    let mut sorted = serde_json::Map::new();
    for key in keys {
        sorted.insert(key.clone(), attributes[key.as_str()].clone());
    }
    serde_json::Value::Object(sorted).to_string().into_bytes()
}

/// Hex SHA-256 over an arbitrary attribute map, encoded the same way as a
/// block. `content_hash(&block.attributes()) == block.hash()`.
pub fn content_hash(attributes: &serde_json::Map<String, serde_json::Value>) -> String {
    hex::encode(Sha256::digest(encode_attributes(attributes)))
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Block(index={}, timestamp={}, previous_hash={}, nonce={}, hash={})",
            self.index,
            self.timestamp,
            self.previous_hash,
            self.nonce,
            self.hash()
        )
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::Object(self.attributes()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Block::from_value(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PREVIOUS: &str = "0123456789abcdef";
    const NOW: f64 = 1_700_000_000.25;

    fn transaction() -> Transaction {
        Transaction::new()
            .with("sender", "Alice")
            .with("receiver", "Bob")
            .with("amount", 10.0)
    }

    fn block() -> Block {
        Block::new(0, NOW, PREVIOUS.to_string(), transaction()).unwrap()
    }

    #[test]
    fn test_block_init() {
        let block = block();
        assert_eq!(block.index(), 0);
        assert_eq!(block.timestamp(), NOW);
        assert_eq!(block.previous_hash(), PREVIOUS);
        assert_eq!(block.transaction(), &transaction());
        assert_eq!(block.nonce(), 0);
    }

    #[test]
    fn test_hash_is_64_lowercase_hex() {
        let hash = block().hash();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_hash_matches_sha256_of_sorted_json() {
        let expected_json = format!(
            r#"{{"index":0,"nonce":0,"previous_hash":"{}","timestamp":{},"transaction":{{"amount":10.0,"receiver":"Bob","sender":"Alice"}}}}"#,
            PREVIOUS,
            serde_json::Value::from(NOW)
        );
        let block = block();
        assert_eq!(block.canonical_bytes(), expected_json.as_bytes());
        assert_eq!(block.hash(), hex::encode(Sha256::digest(expected_json.as_bytes())));
    }

    #[test]
    fn test_attributes_cover_every_field() {
        let attributes = block().attributes();
        assert_eq!(attributes.len(), BLOCK_FIELDS.len());
        for name in BLOCK_FIELDS {
            assert!(attributes.contains_key(name), "missing {}", name);
        }
        assert_eq!(content_hash(&attributes), block().hash());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = block();
        let b = block();
        assert_eq!(a.hash(), a.hash());
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_consistent_after_display() {
        let block = block();
        let before = block.hash();
        let _ = block.to_string();
        let _ = format!("{:?}", block);
        assert_eq!(block.hash(), before);
    }

    #[test]
    fn test_display_embeds_hash() {
        let block = block();
        assert!(block.to_string().contains(&block.hash()));
    }

    #[test]
    fn test_changing_any_field_changes_hash() {
        let original = block().hash();

        let other_index = Block::new(1, NOW, PREVIOUS.to_string(), transaction()).unwrap();
        assert_ne!(other_index.hash(), original);

        let other_time = Block::new(0, NOW + 1.0, PREVIOUS.to_string(), transaction()).unwrap();
        assert_ne!(other_time.hash(), original);

        let other_previous = Block::new(0, NOW, "fedcba9876543210".to_string(), transaction()).unwrap();
        assert_ne!(other_previous.hash(), original);

        let other_tx = Block::new(0, NOW, PREVIOUS.to_string(), transaction().with("amount", 11.0)).unwrap();
        assert_ne!(other_tx.hash(), original);

        let mut other_nonce = block().clone();
        other_nonce.increment_nonce();
        assert_eq!(other_nonce.nonce(), 1);
        assert_ne!(other_nonce.hash(), original);
    }

    #[test]
    fn test_added_attribute_changes_hash() {
        let block = block();
        let mut attributes = block.attributes();
        attributes.insert("new_attribute".to_string(), json!("my new attribute"));
        assert_ne!(content_hash(&attributes), block.hash());
    }

    #[test]
    fn test_new_rejects_non_finite_timestamp() {
        let err = Block::new(0, f64::NAN, PREVIOUS.to_string(), transaction()).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBlock(_)));
        assert!(Block::new(0, f64::INFINITY, PREVIOUS.to_string(), transaction()).is_err());
    }

    #[test]
    fn test_from_value_errors() {
        let valid = json!({
            "index": 0,
            "timestamp": NOW,
            "previous_hash": PREVIOUS,
            "transaction": { "sender": "Alice", "receiver": "Bob", "amount": 10.0 }
        });
        assert_eq!(Block::from_value(&valid).unwrap(), block());

        assert_eq!(Block::from_value(&json!({})).unwrap_err(), ChainError::MissingField("index"));

        let mut index_fraction = valid.clone();
        index_fraction["index"] = json!(0.5);
        assert!(matches!(Block::from_value(&index_fraction), Err(ChainError::InvalidBlock(_))));

        let mut index_negative = valid.clone();
        index_negative["index"] = json!(-1);
        assert!(matches!(Block::from_value(&index_negative), Err(ChainError::InvalidBlock(_))));

        let mut timestamp_text = valid.clone();
        timestamp_text["timestamp"] = json!("now");
        assert!(matches!(Block::from_value(&timestamp_text), Err(ChainError::InvalidBlock(_))));

        let mut previous_number = valid.clone();
        previous_number["previous_hash"] = json!(123456789);
        assert!(matches!(Block::from_value(&previous_number), Err(ChainError::InvalidBlock(_))));

        let mut tx_text = valid.clone();
        tx_text["transaction"] = json!("Alice sends Bob 10 EUR");
        assert!(matches!(Block::from_value(&tx_text), Err(ChainError::InvalidBlock(_))));

        let mut extra = valid.clone();
        extra["new_attribute"] = json!("my new attribute");
        assert!(matches!(Block::from_value(&extra), Err(ChainError::InvalidBlock(_))));

        assert!(matches!(
            Block::from_value(&json!("Alice sends Bob 50 EUR")),
            Err(ChainError::NotABlock(_))
        ));
    }

    #[test]
    fn test_serde_uses_canonical_encoding() {
        let block = block().with_nonce(7);
        let encoded = serde_json::to_vec(&block).unwrap();
        assert_eq!(encoded, block.canonical_bytes());

        let decoded: Block = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());
    }
}
