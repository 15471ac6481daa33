//! Time-bounded ban table
//!
//! Fixed number of slots, at most one active entry per address. Repeated
//! offenses renew the existing entry in place. Expired entries are only
//! noticed when the table is scanned: every lookup and every add walks all
//! slots and deactivates any entry whose ban has run out, whichever address
//! was asked for. When every slot is still inside its ban, offenses by new
//! addresses are dropped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{AttackKind, MacAddr};

/// Blacklist configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistConfig {
    /// Ban length in milliseconds
    pub duration_ms: u64,
    /// Number of slots
    pub capacity: usize,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            duration_ms: 300_000,
            capacity: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlacklistEntry {
    pub address: MacAddr,
    /// Monotonic ms at which the ban ends
    pub blocked_until: u64,
    pub attack_kind: AttackKind,
    pub active: bool,
}

/// Result of [`Blacklist::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// New entry allocated
    Created,
    /// Existing active entry renewed
    Renewed,
    /// Table full, offense dropped
    Dropped,
}

#[derive(Debug)]
pub struct Blacklist {
    config: BlacklistConfig,
    slots: Vec<BlacklistEntry>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::with_config(BlacklistConfig::default())
    }

    pub fn with_config(config: BlacklistConfig) -> Self {
        let vacant = BlacklistEntry {
            address: MacAddr::ZERO,
            blocked_until: 0,
            attack_kind: AttackKind::Packet,
            active: false,
        };

        Self {
            slots: vec![vacant; config.capacity],
            config,
        }
    }

    /// Whether `address` is banned at `now`.
    ///
    /// Scans every slot; entries whose ban ended at or before `now` are
    /// deactivated along the way.
    pub fn is_blocked(&mut self, address: MacAddr, now: u64) -> bool {
        self.expire(now);
        self.slots.iter().any(|e| e.active && e.address == address)
    }

    /// Ban `address` for the configured duration starting at `now`.
    ///
    /// Expired entries are cleared first, so a lapsed ban is never renewed
    /// and its slot is free for reuse.
    pub fn add(&mut self, address: MacAddr, attack_kind: AttackKind, now: u64) -> AddOutcome {
        self.expire(now);
        let blocked_until = now.saturating_add(self.config.duration_ms);

        if let Some(entry) = self
            .slots
            .iter_mut()
            .find(|e| e.active && e.address == address)
        {
            entry.blocked_until = blocked_until;
            entry.attack_kind = attack_kind;
            info!("MAC {} already blocked, ban renewed ({})", address, attack_kind);
            return AddOutcome::Renewed;
        }

        match self.slots.iter_mut().find(|e| !e.active) {
            Some(entry) => {
                *entry = BlacklistEntry {
                    address,
                    blocked_until,
                    attack_kind,
                    active: true,
                };
                warn!(
                    "MAC {} blocked for {} ({} s)",
                    address,
                    attack_kind,
                    self.config.duration_ms / 1000
                );
                AddOutcome::Created
            }
            None => {
                debug!("Blacklist full, dropping {} offense by {}", attack_kind, address);
                AddOutcome::Dropped
            }
        }
    }

    fn expire(&mut self, now: u64) {
        for entry in self
            .slots
            .iter_mut()
            .filter(|e| e.active && e.blocked_until <= now)
        {
            entry.active = false;
            info!("MAC {} removed from blacklist (expired)", entry.address);
        }
    }

    /// Active entries still inside their ban at `now`, without expiring
    /// anything
    pub fn active_count(&self, now: u64) -> usize {
        self.slots
            .iter()
            .filter(|e| e.active && now < e.blocked_until)
            .count()
    }

    /// Slots currently flagged active, expired or not
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|e| e.active).count()
    }

    /// Active entries in slot order
    pub fn entries(&self) -> impl Iterator<Item = &BlacklistEntry> {
        self.slots.iter().filter(|e| e.active)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn duration_ms(&self) -> u64 {
        self.config.duration_ms
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new()
    }
}
