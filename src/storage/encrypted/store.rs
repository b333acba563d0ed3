// src/storage/encrypted/store.rs
use super::{cipher::StorageCipher, errors::*};
use rocksdb::{Direction, IteratorMode, Options, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::debug;

/// RocksDB key/value store whose values are sealed with [`StorageCipher`].
/// Keys stay in clear so prefix scans keep their ordering.
pub struct EncryptedStore {
    db: DB,
    cipher: StorageCipher,
}

impl EncryptedStore {
    pub fn open<P: AsRef<Path>>(path: P, passphrase: &[u8]) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path.as_ref())
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        let cipher = StorageCipher::new(passphrase)?;

        debug!(
            "Opened encrypted store at {} (key {})",
            path.as_ref().display(),
            cipher.key_id()
        );
        Ok(Self { db, cipher })
    }

    pub fn store<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        let serialized = serde_json::to_vec(value)?;
        let encrypted = self.cipher.encrypt(&serialized)?;

        self.db
            .put(key, encrypted)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub fn retrieve<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        let encrypted = match self
            .db
            .get(key)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?
        {
            Some(data) => data,
            None => return Ok(None),
        };

        let decrypted = self.cipher.decrypt(&encrypted)?;
        Ok(Some(serde_json::from_slice(&decrypted)?))
    }

    /// Returns every value under `prefix` in key order.
    pub fn scan_prefix<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>> {
        let mut values = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, encrypted) = item.map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            let decrypted = self.cipher.decrypt(&encrypted)?;
            values.push(serde_json::from_slice(&decrypted)?);
        }

        Ok(values)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}
