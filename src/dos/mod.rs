//! Flood Detection Module
//!
//! Three independent one-second detectors feed the blacklist:
//! - Disassociation storms (one global window, all stations combined)
//! - Authentication floods (one global window, all stations combined)
//! - Per-client TCP message floods (one window per tracked station)
//!
//! The global detectors decide on aggregate traffic but still report the
//! address carried by the event that crossed the threshold. That station
//! is the one that gets banned, even if other stations caused the churn.

pub mod client_table;
pub mod rate_window;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{AttackKind, MacAddr};

pub use client_table::{ClientTable, ClientTableConfig, Observation};
pub use rate_window::{RateWindow, WindowCheck};

/// Detector thresholds, in events per window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodConfig {
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Disassociations per window across all stations
    pub disassoc_threshold: u32,
    /// Association attempts per window across all stations
    pub auth_threshold: u32,
    /// TCP messages per window per client
    pub packet_threshold: u32,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            window_ms: 1000,
            disassoc_threshold: 5,
            auth_threshold: 8,
            packet_threshold: 30,
        }
    }
}

/// A detector tripped on an event from `address`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodVerdict {
    pub kind: AttackKind,
    pub address: MacAddr,
    /// Events counted in the window when it tripped
    pub count: u32,
}

/// Detections per kind since start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FloodStats {
    pub disassoc_floods: u64,
    pub auth_floods: u64,
    pub packet_floods: u64,
}

impl FloodStats {
    pub fn total(&self) -> u64 {
        self.disassoc_floods + self.auth_floods + self.packet_floods
    }

    pub fn get(&self, kind: AttackKind) -> u64 {
        match kind {
            AttackKind::Disassoc => self.disassoc_floods,
            AttackKind::Auth => self.auth_floods,
            AttackKind::Packet => self.packet_floods,
        }
    }

    fn record(&mut self, kind: AttackKind) {
        match kind {
            AttackKind::Disassoc => self.disassoc_floods += 1,
            AttackKind::Auth => self.auth_floods += 1,
            AttackKind::Packet => self.packet_floods += 1,
        }
    }
}

/// Owns all rate detectors
#[derive(Debug)]
pub struct FloodEngine {
    config: FloodConfig,
    disassoc: RateWindow,
    auth: RateWindow,
    clients: ClientTable,
    stats: FloodStats,
}

impl FloodEngine {
    pub fn new() -> Self {
        Self::with_config(FloodConfig::default(), ClientTableConfig::default())
    }

    pub fn with_config(config: FloodConfig, clients: ClientTableConfig) -> Self {
        Self {
            disassoc: RateWindow::new(config.disassoc_threshold, config.window_ms),
            auth: RateWindow::new(config.auth_threshold, config.window_ms),
            clients: ClientTable::new(clients.capacity, config.packet_threshold, config.window_ms),
            config,
            stats: FloodStats::default(),
        }
    }

    /// Count an association attempt from `address`
    pub fn check_auth(&mut self, address: MacAddr, now: u64) -> Option<FloodVerdict> {
        let check = self.auth.check(now);
        if !check.triggered {
            return None;
        }

        warn!(
            "AUTH FLOOD detected: {} attempts in window (limit: {}), offending station {}",
            check.count, self.config.auth_threshold, address
        );
        Some(self.verdict(AttackKind::Auth, address, check.count))
    }

    /// Count a disassociation of `address`
    pub fn check_disassoc(&mut self, address: MacAddr, now: u64) -> Option<FloodVerdict> {
        let check = self.disassoc.check(now);
        if !check.triggered {
            return None;
        }

        warn!(
            "DISASSOC FLOOD detected: {} disconnections in window (limit: {}), offending station {}",
            check.count, self.config.disassoc_threshold, address
        );
        Some(self.verdict(AttackKind::Disassoc, address, check.count))
    }

    /// Count a TCP message from `address`
    pub fn observe_packet(&mut self, address: MacAddr, now: u64) -> Option<FloodVerdict> {
        match self.clients.observe(address, now) {
            Observation::Counted(check) if check.triggered => {
                warn!(
                    "PACKET FLOOD detected: client {} sent {} messages in window (limit: {})",
                    address, check.count, self.config.packet_threshold
                );
                Some(self.verdict(AttackKind::Packet, address, check.count))
            }
            _ => None,
        }
    }

    /// Drop per-client tracking for a departed station
    pub fn forget_client(&mut self, address: MacAddr) -> bool {
        self.clients.remove(address)
    }

    pub fn clients(&self) -> &ClientTable {
        &self.clients
    }

    pub fn stats(&self) -> FloodStats {
        self.stats
    }

    fn verdict(&mut self, kind: AttackKind, address: MacAddr, count: u32) -> FloodVerdict {
        self.stats.record(kind);
        FloodVerdict {
            kind,
            address,
            count,
        }
    }
}

impl Default for FloodEngine {
    fn default() -> Self {
        Self::new()
    }
}
