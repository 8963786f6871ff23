//! Local storage
//!
//! A synchronous key/value store that survives reloads, standing in for the
//! browser's local storage.

use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Key holding the guest cart, `{"cartItems": [...]}`.
pub const CART_KEY: &str = "cart";

/// Key holding the applied coupon code.
pub const COUPON_CODE_KEY: &str = "coupon_code";

/// Key holding the applied coupon discount, in major units.
pub const COUPON_DISCOUNT_KEY: &str = "coupon_discount";

/// Key holding the server-computed total after the coupon, in major units.
pub const COUPON_FINAL_PRICE_KEY: &str = "final_after_coupon_code";

/// Key naming the cart a stored coupon was validated for (`guest` or `user:{id}`).
pub const COUPON_OWNER_KEY: &str = "coupon_owner";

/// Errors raised by local storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed")]
    Io(#[from] std::io::Error),

    #[error("storage serialization failed")]
    Serde(#[from] serde_json::Error),

    #[error("storage quota of {limit} bytes exceeded writing {key}")]
    QuotaExceeded { key: String, limit: usize },

    #[error("stored value {value:?} for {key} is invalid")]
    InvalidValue { key: String, value: String },

    #[error("stored value for {key} is corrupt")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Addressable, synchronously readable client-side store.
pub trait LocalStorage: Debug + Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails or would exceed the quota.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns [`StorageError::Corrupt`] when the stored value does not decode.
pub fn read_json<T: DeserializeOwned>(
    storage: &dyn LocalStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    storage
        .get(key)?
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}

/// Encode and write a JSON value.
///
/// # Errors
///
/// Returns an error when encoding or the write fails.
pub fn write_json<T: Serialize>(
    storage: &dyn LocalStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    storage.set(key, &serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn json_round_trips_through_any_backend() -> TestResult {
        let storage = MemoryStorage::new();

        write_json(&storage, "k", &json!({ "a": 1 }))?;

        assert_eq!(
            read_json::<serde_json::Value>(&storage, "k")?,
            Some(json!({ "a": 1 }))
        );
        assert_eq!(read_json::<serde_json::Value>(&storage, "missing")?, None);

        Ok(())
    }

    #[test]
    fn corrupt_values_fail_loudly() -> TestResult {
        let storage = MemoryStorage::new();

        storage.set(CART_KEY, "{not json")?;

        let result = read_json::<serde_json::Value>(&storage, CART_KEY);

        assert!(
            matches!(result, Err(StorageError::Corrupt { ref key, .. }) if key == CART_KEY),
            "expected Corrupt, got {result:?}"
        );

        Ok(())
    }
}
