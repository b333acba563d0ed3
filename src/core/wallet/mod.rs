// src/core/wallet/mod.rs
pub mod extension;
pub mod session;

pub use extension::{KeypairWallet, WalletError, WalletExtension};
pub use session::{WalletSession, WalletSessionHandle};
