//! Per-station packet flood tracking
//!
//! Fixed number of slots, scanned in order. The first matching active slot
//! is used for a known address and the first inactive slot for a new one.
//! When every slot is taken a new address is simply not tracked.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_window::{RateWindow, WindowCheck};
use crate::models::MacAddr;

/// Client table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientTableConfig {
    /// Number of tracked stations (the AP station limit)
    pub capacity: usize,
}

impl Default for ClientTableConfig {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

/// What happened to an observed packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Known address, counted in its window
    Counted(WindowCheck),
    /// First packet from this address, slot allocated
    Started,
    /// Table full, address not tracked
    Untracked,
}

impl Observation {
    pub fn triggered(&self) -> bool {
        matches!(self, Observation::Counted(check) if check.triggered)
    }
}

#[derive(Debug, Clone)]
struct ClientSlot {
    address: MacAddr,
    window: RateWindow,
    active: bool,
}

#[derive(Debug)]
pub struct ClientTable {
    slots: Vec<ClientSlot>,
    threshold: u32,
    window_ms: u64,
}

impl ClientTable {
    pub fn new(capacity: usize, threshold: u32, window_ms: u64) -> Self {
        let vacant = ClientSlot {
            address: MacAddr::ZERO,
            window: RateWindow::new(threshold, window_ms),
            active: false,
        };

        Self {
            slots: vec![vacant; capacity],
            threshold,
            window_ms,
        }
    }

    /// Record one packet from `address` at `now`
    pub fn observe(&mut self, address: MacAddr, now: u64) -> Observation {
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.active && s.address == address)
        {
            return Observation::Counted(slot.window.check(now));
        }

        match self.slots.iter_mut().find(|s| !s.active) {
            Some(slot) => {
                slot.address = address;
                slot.window = RateWindow::started_at(self.threshold, self.window_ms, now);
                slot.active = true;
                debug!("New client added to monitor: {}", address);
                Observation::Started
            }
            None => {
                debug!("Client table full, not tracking {}", address);
                Observation::Untracked
            }
        }
    }

    /// Stop tracking `address`. Returns false if it was not tracked.
    pub fn remove(&mut self, address: MacAddr) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|s| s.active && s.address == address)
        {
            Some(slot) => {
                slot.active = false;
                debug!("Client removed from monitor: {}", address);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, address: MacAddr) -> bool {
        self.slots.iter().any(|s| s.active && s.address == address)
    }

    /// Number of tracked stations
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddr {
        MacAddr::new([0x24, 0x0a, 0xc4, 0x00, 0x00, last])
    }

    #[test]
    fn test_first_packet_never_triggers() {
        let mut table = ClientTable::new(4, 0, 1000);
        assert_eq!(table.observe(mac(1), 100), Observation::Started);
        assert!(table.contains(mac(1)));
        // Threshold 0 trips on the second packet
        assert!(table.observe(mac(1), 101).triggered());
    }

    #[test]
    fn test_packet_flood_on_31st() {
        let mut table = ClientTable::new(20, 30, 1000);
        let mut first_trigger = None;
        for i in 0..31u64 {
            if table.observe(mac(1), 5_000 + i * 29).triggered() && first_trigger.is_none() {
                first_trigger = Some(i + 1);
            }
        }
        assert_eq!(first_trigger, Some(31));
    }

    #[test]
    fn test_clients_are_independent() {
        let mut table = ClientTable::new(4, 2, 1000);
        for _ in 0..3 {
            table.observe(mac(1), 1_000);
        }
        assert!(table.observe(mac(1), 1_001).triggered());
        assert!(!table.observe(mac(2), 1_001).triggered());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_full_table_does_not_track() {
        let mut table = ClientTable::new(2, 1, 1000);
        table.observe(mac(1), 0);
        table.observe(mac(2), 0);
        for _ in 0..10 {
            assert_eq!(table.observe(mac(3), 10), Observation::Untracked);
        }
        assert!(!table.contains(mac(3)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_remove_frees_first_slot() {
        let mut table = ClientTable::new(2, 5, 1000);
        table.observe(mac(1), 0);
        table.observe(mac(2), 0);
        assert!(table.remove(mac(1)));
        assert!(!table.remove(mac(1)));
        assert_eq!(table.observe(mac(3), 5), Observation::Started);
        assert!(table.contains(mac(3)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_readded_client_starts_fresh() {
        let mut table = ClientTable::new(2, 2, 1000);
        for t in 0..3 {
            table.observe(mac(1), 100 + t);
        }
        table.remove(mac(1));
        assert_eq!(table.observe(mac(1), 110), Observation::Started);
        assert!(!table.observe(mac(1), 111).triggered());
    }
}
