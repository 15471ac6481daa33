//! Radio layer collaborator
//!
//! The gate only ever asks the radio to push a station off the AP.

use parking_lot::Mutex;
use tracing::info;

use crate::models::MacAddr;

/// Station to force off the access point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisassocTarget {
    /// By association id
    Station(u16),
    /// By address
    Address(MacAddr),
}

impl std::fmt::Display for DisassocTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisassocTarget::Station(aid) => write!(f, "aid {}", aid),
            DisassocTarget::Address(mac) => write!(f, "{}", mac),
        }
    }
}

pub trait RadioControl: Send + Sync {
    fn force_disassociate(&self, target: DisassocTarget);
}

/// Radio stand-in that only logs the command
#[derive(Debug, Default)]
pub struct LoggingRadio;

impl RadioControl for LoggingRadio {
    fn force_disassociate(&self, target: DisassocTarget) {
        info!("Forcing disassociation of {}", target);
    }
}

/// Keeps every command, for replays and tests
#[derive(Debug, Default)]
pub struct RecordingRadio {
    commands: Mutex<Vec<DisassocTarget>>,
}

impl RecordingRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<DisassocTarget> {
        self.commands.lock().clone()
    }

    pub fn take(&self) -> Vec<DisassocTarget> {
        std::mem::take(&mut *self.commands.lock())
    }
}

impl RadioControl for RecordingRadio {
    fn force_disassociate(&self, target: DisassocTarget) {
        self.commands.lock().push(target);
    }
}
