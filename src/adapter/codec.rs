use serde::{Serialize, de::DeserializeOwned};

use crate::error::BridgeError;

/// Turns a value into the ordered strings that cross the bridge and back.
pub trait Codec<T> {
    fn encode(&self, value: &T) -> Result<Vec<String>, BridgeError>;

    fn decode(&self, encoded: &[String]) -> Result<T, BridgeError>;
}

/// One JSON document per value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec {
    fn encode(&self, value: &T) -> Result<Vec<String>, BridgeError> {
        Ok(vec![serde_json::to_string(value)?])
    }

    fn decode(&self, encoded: &[String]) -> Result<T, BridgeError> {
        match encoded {
            [document] => Ok(serde_json::from_str(document)?),
            _ => Err(BridgeError::Codec(format!(
                "expected one encoded value, found {}",
                encoded.len()
            ))),
        }
    }
}
