pub mod blacklist;
pub mod clock;
pub mod config;
pub mod dos;
pub mod error;
pub mod gate;
pub mod models;
pub mod radio;
pub mod report;
pub mod scenario;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info};

pub use blacklist::{AddOutcome, Blacklist, BlacklistEntry};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::Config;
pub use dos::{FloodEngine, FloodStats, FloodVerdict};
pub use error::GuardError;
pub use gate::{AdmissionGate, AssociationVerdict, MessageVerdict, StationEvent};
pub use models::{AttackKind, MacAddr};
pub use radio::{DisassocTarget, LoggingRadio, RadioControl, RecordingRadio};
pub use report::{SecurityReport, ThreatLevel};
pub use server::MessageServer;

/// Capacity of the station event queue between the radio layer and the gate
const EVENT_QUEUE: usize = 100;

/// Long-running service: station events, the TCP message server and the
/// periodic security report, all feeding one [`AdmissionGate`].
pub struct Daemon {
    config: Config,
    gate: AdmissionGate,
    event_tx: mpsc::Sender<StationEvent>,
    event_rx: mpsc::Receiver<StationEvent>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Daemon {
    /// Create a daemon that logs radio commands and reads the monotonic clock
    pub fn new(config: Config) -> Self {
        Self::with_parts(config, Arc::new(LoggingRadio), Arc::new(MonotonicClock::new()))
    }

    /// Create a daemon with a custom radio and clock
    pub fn with_parts(config: Config, radio: Arc<dyn RadioControl>, clock: Arc<dyn Clock>) -> Self {
        let gate = AdmissionGate::new(&config, radio, clock);
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            config,
            gate,
            event_tx,
            event_rx,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sender for the radio layer's association/disassociation events
    pub fn station_events(&self) -> mpsc::Sender<StationEvent> {
        self.event_tx.clone()
    }

    /// Sending on this stops [`Daemon::run`]
    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run until shutdown is signalled or the TCP server fails
    pub async fn run(self) -> Result<()> {
        let Daemon {
            config,
            gate,
            event_tx,
            mut event_rx,
            shutdown_tx,
            mut shutdown_rx,
        } = self;
        // Handles held by callers keep the channels open
        drop(event_tx);
        drop(shutdown_tx);

        let server = MessageServer::bind(&config.server, gate.clone())
            .await
            .context("Failed to start TCP server")?;
        let mut server_handle = tokio::spawn(server.serve());

        let status_handle = if config.status.enabled {
            let status_gate = gate.clone();
            let period = Duration::from_secs(config.status.interval_secs.max(1));
            Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                // First tick completes immediately
                interval.tick().await;
                loop {
                    interval.tick().await;
                    status_gate.report().log();
                }
            }))
        } else {
            info!("Periodic security reports are disabled");
            None
        };

        info!(
            "Flood protection active: disassoc>{}, auth>{}, packet>{} per {} ms, ban {} s",
            config.detection.disassoc_threshold,
            config.detection.auth_threshold,
            config.detection.packet_threshold,
            config.detection.window_ms,
            config.blacklist.duration_ms / 1000
        );

        let result = loop {
            tokio::select! {
                biased;

                Some(event) = event_rx.recv() => {
                    gate.handle_event(event);
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                joined = &mut server_handle => {
                    break match joined {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(e)) => {
                            error!("TCP server stopped: {}", e);
                            Err(anyhow::Error::new(e).context("TCP server stopped"))
                        }
                        Err(e) => Err(anyhow::anyhow!("TCP server task failed: {}", e)),
                    };
                }
            }
        };

        server_handle.abort();
        if let Some(handle) = status_handle {
            handle.abort();
        }

        gate.report().log();
        info!("Daemon stopped");
        result
    }
}
