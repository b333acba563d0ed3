// src/lib.rs
pub mod api;
pub mod blockchain;
pub mod core;
pub mod storage;
pub mod utils;

use actix_web::dev::ServerHandle;
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::{
    api::{
        handlers::wizard::SharedWizard,
        rest::{ApiState, RestApi},
    },
    blockchain::{NetworkRpc, SolanaRpc},
    core::{
        dashboard::Dashboard,
        identity::{BiometricSimulator, GeneratedIdentity, VerificationForm},
        notify::{Notice, NoticeLevel, NotificationCenter},
        presentation::Explorer,
        transactions::{ConfirmationSettings, TransactionHistory, TransactionSubmitter},
        wallet::{KeypairWallet, WalletExtension, WalletSessionHandle},
        wizard::{VerificationWizard, WizardMonitor, WizardSettings},
    },
    storage::{FileLocalStorage, LocalStorage, RecordStore, RocksRecordStore},
    utils::{config::Config, error::Result},
};

pub struct Application {
    config: Arc<Config>,
    notifications: Arc<NotificationCenter>,
    session: WalletSessionHandle,
    wizard: Arc<SharedWizard>,
    monitor: WizardMonitor,
    dashboard: Arc<Dashboard>,
    explorer: Explorer,
    server: Mutex<Option<ServerHandle>>,
}

impl Application {
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let notifications = Arc::new(NotificationCenter::new());

        info!("Initializing storage...");
        ensure_parent(&config.storage.records_path)?;
        let records: Arc<dyn RecordStore> = Arc::new(RocksRecordStore::open(
            &config.storage.records_path,
            &config.storage.encryption_key,
        )?);
        let local: Arc<dyn LocalStorage> =
            Arc::new(FileLocalStorage::open(&config.storage.local_state_file)?);

        info!("Connecting to Solana RPC at {}", config.solana.rpc_url);
        let rpc: Arc<dyn NetworkRpc> = Arc::new(SolanaRpc::new(&config.solana.rpc_url));

        let extension: Arc<dyn WalletExtension> = match &config.wallet.keypair_path {
            Some(path) => Arc::new(KeypairWallet::from_file(path)),
            None => {
                warn!("No wallet keypair configured; wallet will report as not installed");
                Arc::new(KeypairWallet::absent())
            }
        };

        info!("Initializing services...");
        let session = WalletSessionHandle::new(
            extension.clone(),
            rpc.clone(),
            local.clone(),
            notifications.clone(),
            config.get_balance_refresh_interval(),
        );
        let form = Arc::new(VerificationForm::new(
            records.clone(),
            local.clone(),
            Arc::new(GeneratedIdentity),
            notifications.clone(),
        ));
        let biometric = Arc::new(BiometricSimulator::from_config(
            &config.biometric,
            notifications.clone(),
        ));
        let submitter = Arc::new(TransactionSubmitter::new(
            rpc.clone(),
            extension,
            notifications.clone(),
            ConfirmationSettings::from(&*config),
        ));
        let wizard = VerificationWizard::new(
            session.clone(),
            form,
            biometric,
            submitter,
            notifications.clone(),
            WizardSettings::from_config(&config)?,
        );

        let monitor = wizard.monitor();

        let explorer = Explorer::new(&config.solana.explorer_url, &config.solana.cluster);
        let dashboard = Dashboard::new(
            session.clone(),
            records,
            local,
            TransactionHistory::new(rpc),
            notifications.clone(),
            explorer.clone(),
            config.solana.history_limit,
        );

        Ok(Self {
            config,
            notifications,
            session,
            wizard: Arc::new(tokio::sync::Mutex::new(wizard)),
            monitor,
            dashboard: Arc::new(dashboard),
            explorer,
            server: Mutex::new(None),
        })
    }

    pub fn session(&self) -> &WalletSessionHandle {
        &self.session
    }

    pub fn wizard(&self) -> Arc<SharedWizard> {
        self.wizard.clone()
    }

    pub fn monitor(&self) -> &WizardMonitor {
        &self.monitor
    }

    pub fn dashboard(&self) -> Arc<Dashboard> {
        self.dashboard.clone()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notice> {
        self.notifications.subscribe()
    }

    pub fn api_state(&self) -> ApiState {
        ApiState {
            session: self.session.clone(),
            wizard: self.wizard.clone(),
            monitor: self.monitor.clone(),
            dashboard: self.dashboard.clone(),
            notifications: self.notifications.clone(),
            explorer: self.explorer.clone(),
        }
    }

    pub async fn start(&self) -> Result<()> {
        self.spawn_notice_log();

        if let Some(address) = self.session.restore().await {
            info!("Restored wallet session for {}", address);
        }

        info!("Starting API server...");
        let api = RestApi::new(
            self.config.node.host.clone(),
            self.config.node.port,
            self.config.api.allowed_origins.clone(),
            self.api_state(),
        );
        let server = api.start()?;
        *self.server.lock() = Some(server.handle());
        tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("API server stopped: {}", e);
            }
        });

        info!("Application successfully started");
        Ok(())
    }

    /// Mirrors user-facing notices into the log.
    fn spawn_notice_log(&self) {
        let mut notices = self.notifications.subscribe();
        tokio::spawn(async move {
            loop {
                match notices.recv().await {
                    Ok(notice) => {
                        let description = notice.description.as_deref().unwrap_or("");
                        match notice.level {
                            NoticeLevel::Error => warn!("[notice] {} {}", notice.title, description),
                            _ => info!("[notice] {} {}", notice.title, description),
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Notice log skipped {} notices", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application...");

        let server = self.server.lock().take();
        if let Some(server) = server {
            info!("Stopping API server...");
            server.stop(true).await;
        }

        self.session.shutdown();
        info!("Application shutdown complete");
        Ok(())
    }
}

fn ensure_parent(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).map_err(crate::storage::encrypted::StorageError::from)?;
    }
    Ok(())
}
