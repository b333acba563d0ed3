// src/storage/encrypted/mod.rs
mod cipher;
mod errors;
mod store;

pub use cipher::StorageCipher;
pub use errors::StorageError;
pub use store::EncryptedStore;
