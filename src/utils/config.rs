// src/utils/config.rs
use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::identity::biometric::ScanKind;
use crate::utils::error::{Result, VerifyError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub solana: SolanaConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub biometric: BiometricConfig,
    #[serde(default)]
    pub wizard: WizardConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub data_dir: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            data_dir: "data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolanaConfig {
    pub rpc_url: String,
    pub cluster: String,
    pub explorer_url: String,
    /// Recipient of the attestation transfer.
    pub recipient: String,
    pub attestation_lamports: u64,
    pub confirmation_timeout: u64,
    pub confirmation_poll_ms: u64,
    pub history_limit: usize,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            cluster: "devnet".to_string(),
            explorer_url: "https://explorer.solana.com".to_string(),
            recipient: "AuR8HMaNKXxUz8qFDWPyZMk8DhQcFYKAT6SLjohzNrUZ".to_string(),
            attestation_lamports: 1_000_000,
            confirmation_timeout: 60,
            confirmation_poll_ms: 500,
            history_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Keypair file backing the headless wallet. No file means no wallet is detected.
    pub keypair_path: Option<String>,
    pub balance_refresh_interval: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: None,
            balance_refresh_interval: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BiometricConfig {
    pub kind: ScanKind,
    pub tick_ms: u64,
    pub increment: u8,
    pub settle_ms: u64,
}

impl Default for BiometricConfig {
    fn default() -> Self {
        Self {
            kind: ScanKind::Fingerprint,
            tick_ms: 50,
            increment: 2,
            settle_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub completion_delay_ms: u64,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            completion_delay_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub records_path: String,
    pub encryption_key: String,
    pub local_state_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            records_path: "data/records".to_string(),
            encryption_key: String::new(),
            local_state_file: "data/local_state.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        let config = ConfigLib::builder()
            .set_default("node.log_level", "info")?
            .set_default("solana.rpc_url", "https://api.devnet.solana.com")?
            .set_default("solana.cluster", "devnet")?
            .set_default("wallet.balance_refresh_interval", 30)?
            .set_default("wizard.completion_delay_ms", 3_000)?

            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Override with environment variables (e.g., AURA__SOLANA__RPC_URL)
            .add_source(Environment::with_prefix("AURA").separator("__"))

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node.port == 0 {
            return Err(VerifyError::Config("Invalid port number".into()));
        }

        self.recipient()?;
        if self.solana.attestation_lamports == 0 {
            return Err(VerifyError::Config("attestation_lamports must be greater than 0".into()));
        }
        if self.solana.confirmation_timeout == 0 || self.solana.confirmation_poll_ms == 0 {
            return Err(VerifyError::Config("confirmation timings must be greater than 0".into()));
        }

        if self.wallet.balance_refresh_interval == 0 {
            return Err(VerifyError::Config("balance_refresh_interval must be greater than 0".into()));
        }

        if self.biometric.increment == 0 || self.biometric.increment > 100 {
            return Err(VerifyError::Config("biometric increment must be within 1..=100".into()));
        }
        if self.biometric.tick_ms == 0 {
            return Err(VerifyError::Config("biometric tick_ms must be greater than 0".into()));
        }

        if self.storage.encryption_key.is_empty() {
            return Err(VerifyError::Config("encryption_key must be set".into()));
        }

        Ok(())
    }

    pub fn recipient(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.solana.recipient)
            .map_err(|e| VerifyError::Config(format!("invalid recipient address: {}", e)))
    }

    pub fn get_confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.solana.confirmation_timeout)
    }

    pub fn get_confirmation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.solana.confirmation_poll_ms)
    }

    pub fn get_balance_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.wallet.balance_refresh_interval)
    }

    pub fn get_completion_delay(&self) -> Duration {
        Duration::from_millis(self.wizard.completion_delay_ms)
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.node.data_dir).join("logs")
    }
}

impl From<ConfigError> for VerifyError {
    fn from(error: ConfigError) -> Self {
        VerifyError::Config(error.to_string())
    }
}
