//! JSON codec for port payloads using `serde_json`.
//!
//! Port requests and responses are plain strings. Handlers that want typed
//! payloads agree with their caller on JSON, which is what the VM side
//! produces natively.
//!
//! # Example
//!
//! ```
//! use vmport::codec::JsonCodec;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Message {
//!     id: u32,
//!     content: String,
//! }
//!
//! let msg = Message { id: 42, content: "hello".to_string() };
//! let encoded = JsonCodec::encode(&msg).unwrap();
//! assert_eq!(encoded, r#"{"id":42,"content":"hello"}"#);
//!
//! let decoded: Message = JsonCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use crate::error::Result;

/// JSON codec for string payloads.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to a compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    /// Decode a JSON string to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not valid JSON for type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(payload: &str) -> Result<T> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortError;
    use serde::Deserialize;

    #[derive(Deserialize, PartialEq, Debug)]
    #[serde(tag = "type")]
    enum Action {
        #[serde(rename = "VBANK_GET_BALANCE")]
        GetBalance { address: String, denom: String },
        #[serde(rename = "VBANK_GET_MODULE_ACCOUNT_ADDRESS")]
        ModuleAddress { module: String },
    }

    #[test]
    fn test_decode_tagged_request() {
        let action: Action = JsonCodec::decode(
            r#"{"type":"VBANK_GET_BALANCE","address":"agoric1xyz","denom":"ubld"}"#,
        )
        .unwrap();

        assert_eq!(
            action,
            Action::GetBalance {
                address: "agoric1xyz".to_string(),
                denom: "ubld".to_string(),
            }
        );
    }

    #[test]
    fn test_encode_is_compact() {
        let encoded = JsonCodec::encode(&vec!["a", "b"]).unwrap();
        assert_eq!(encoded, r#"["a","b"]"#);
    }

    #[test]
    fn test_decode_unknown_variant_fails() {
        let err = JsonCodec::decode::<Action>(r#"{"type":"NOPE"}"#).unwrap_err();
        assert!(matches!(err, PortError::Json(_)));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = JsonCodec::decode::<Action>("not json").unwrap_err();
        assert!(err.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn test_module_address_variant() {
        let action: Action =
            JsonCodec::decode(r#"{"type":"VBANK_GET_MODULE_ACCOUNT_ADDRESS","module":"vbank"}"#)
                .unwrap();
        assert_eq!(
            action,
            Action::ModuleAddress {
                module: "vbank".to_string()
            }
        );
    }
}
