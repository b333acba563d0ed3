// src/blockchain/mod.rs
pub mod solana;

pub use solana::{
    ConfirmationStatus, NetworkRpc, RpcError, SignatureInfo, SolanaRpc, TransactionDetails,
};
