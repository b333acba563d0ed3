// src/core/mod.rs
pub mod dashboard;
pub mod identity;
pub mod notify;
pub mod presentation;
pub mod transactions;
pub mod wallet;
pub mod wizard;
