//! Validation and decoding of transaction payloads
use crate::error::ChainError;
use crate::transaction::types::{Transaction, Value};

impl Transaction {
    /// Checks that every value has a canonical encoding. Non-finite floats
    /// have no JSON form and would collapse to `null` when hashed.
    pub fn validate(&self) -> Result<(), ChainError> {
        for (key, value) in self.iter() {
            if let Value::Float(f) = value {
                if !f.is_finite() {
                    return Err(ChainError::InvalidBlock(format!(
                        "Transaction field '{}' holds a non-finite number ({})",
                        key, f
                    )));
                }
            }
        }
        Ok(())
    }

    /// Decodes an untyped JSON record. Only objects whose values are
    /// primitives are accepted.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ChainError> {
        let object = value.as_object().ok_or_else(|| {
            ChainError::InvalidBlock(format!("transaction must be a mapping, got {}", json_kind(value)))
        })?;

        let mut tx = Transaction::new();
        for (key, raw) in object {
            let value = match raw {
                serde_json::Value::Null => Value::Null,
                serde_json::Value::Bool(b) => Value::Bool(*b),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => Value::Integer(i),
                    None => Value::Float(n.as_f64().ok_or_else(|| {
                        ChainError::InvalidBlock(format!("Transaction field '{}' is out of range", key))
                    })?),
                },
                serde_json::Value::String(s) => Value::Text(s.clone()),
                other => {
                    return Err(ChainError::InvalidBlock(format!(
                        "Transaction field '{}' must be a primitive value, got {}",
                        key,
                        json_kind(other)
                    )))
                }
            };
            tx.insert(key.clone(), value);
        }
        Ok(tx)
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
