// src/storage/mod.rs
pub mod encrypted;
pub mod local;
pub mod records;

pub use local::{FileLocalStorage, LocalStorage, MemoryLocalStorage};
pub use records::{MemoryRecordStore, RecordStore, RocksRecordStore};
