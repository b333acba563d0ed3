// src/api/handlers/mod.rs
pub mod dashboard;
pub mod notices;
pub mod session;
pub mod wizard;
