//! Decoding of response bodies into domain records.
//!
//! Failures are not errors at this layer: they are logged and come back as
//! `None`. Callers that cannot continue without the record use [`require`].

use serde::de::DeserializeOwned;

use crate::errors::{Result, SyncError};

/// Decode `data` as `T`, logging and returning `None` on mismatch.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Option<T> {
    match serde_json::from_slice(data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                "Couldn't decode {}: {}",
                std::any::type_name::<T>(),
                e
            );
            None
        }
    }
}

/// Decode `data` as `T`, turning absence into a decode error naming `what`.
pub fn require<T: DeserializeOwned>(data: &[u8], what: &str) -> Result<T> {
    decode(data).ok_or_else(|| SyncError::Decode(format!("Couldn't decode {}", what)))
}
