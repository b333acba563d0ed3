// src/core/identity/biometric.rs
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::core::notify::{Notice, Notifier};
use crate::utils::config::BiometricConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    #[default]
    Fingerprint,
    Face,
}

impl ScanKind {
    pub fn title(self) -> &'static str {
        match self {
            ScanKind::Fingerprint => "Fingerprint Scan",
            ScanKind::Face => "Face Recognition",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub percent: u8,
    pub scanning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub success: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ScanTiming {
    pub tick: Duration,
    pub increment: u8,
    pub settle: Duration,
}

impl From<&BiometricConfig> for ScanTiming {
    fn from(config: &BiometricConfig) -> Self {
        Self {
            tick: Duration::from_millis(config.tick_ms),
            increment: config.increment.max(1),
            settle: Duration::from_millis(config.settle_ms),
        }
    }
}

impl Default for ScanTiming {
    fn default() -> Self {
        Self::from(&BiometricConfig::default())
    }
}

/// A biometric check the wizard can run. Subscribe to `completions` before
/// calling `start`; a `start` while a scan is running must be a no-op.
pub trait BiometricCapability: Send + Sync {
    fn kind(&self) -> ScanKind;

    /// Returns `false` when a scan was already running.
    fn start(&self) -> bool;

    fn progress(&self) -> watch::Receiver<ScanProgress>;

    fn completions(&self) -> broadcast::Receiver<ScanOutcome>;
}

struct ScanShared {
    scanning: AtomicBool,
    progress: watch::Sender<ScanProgress>,
    completions: broadcast::Sender<ScanOutcome>,
    notifier: Arc<dyn Notifier>,
}

/// Placeholder capability: no sensor is read and no template is matched.
/// Progress climbs on a timer and every scan succeeds.
pub struct BiometricSimulator {
    kind: ScanKind,
    timing: ScanTiming,
    shared: Arc<ScanShared>,
}

impl BiometricSimulator {
    pub fn new(kind: ScanKind, timing: ScanTiming, notifier: Arc<dyn Notifier>) -> Self {
        let (progress, _) = watch::channel(ScanProgress::default());
        let (completions, _) = broadcast::channel(4);
        // A zero step would never reach 100.
        let timing = ScanTiming {
            increment: timing.increment.max(1),
            ..timing
        };
        Self {
            kind,
            timing,
            shared: Arc::new(ScanShared {
                scanning: AtomicBool::new(false),
                progress,
                completions,
                notifier,
            }),
        }
    }

    pub fn from_config(config: &BiometricConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(config.kind, ScanTiming::from(config), notifier)
    }

    pub fn is_scanning(&self) -> bool {
        self.shared.scanning.load(Ordering::SeqCst)
    }
}

impl BiometricCapability for BiometricSimulator {
    fn kind(&self) -> ScanKind {
        self.kind
    }

    fn start(&self) -> bool {
        if self
            .shared
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Biometric scan already running");
            return false;
        }

        self.shared.progress.send_replace(ScanProgress {
            percent: 0,
            scanning: true,
        });

        let shared = self.shared.clone();
        let timing = self.timing;
        let kind = self.kind;
        info!("{} started", kind.title());

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + timing.tick, timing.tick);
            let mut percent = 0u8;
            while percent < 100 {
                ticker.tick().await;
                percent = percent.saturating_add(timing.increment).min(100);
                shared.progress.send_replace(ScanProgress {
                    percent,
                    scanning: true,
                });
            }

            time::sleep(timing.settle).await;

            shared.progress.send_replace(ScanProgress {
                percent: 100,
                scanning: false,
            });
            shared.scanning.store(false, Ordering::SeqCst);
            let _ = shared.completions.send(ScanOutcome { success: true });
            shared
                .notifier
                .notify(Notice::success("Biometric scan completed"));
            info!("{} completed", kind.title());
        });

        true
    }

    fn progress(&self) -> watch::Receiver<ScanProgress> {
        self.shared.progress.subscribe()
    }

    fn completions(&self) -> broadcast::Receiver<ScanOutcome> {
        self.shared.completions.subscribe()
    }
}
