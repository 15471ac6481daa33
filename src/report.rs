//! Security status snapshot

use serde::Serialize;
use tracing::info;

use crate::dos::FloodStats;

/// Overall threat level by number of detected floods
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ThreatLevel {
    /// No attacks detected
    Secure,
    /// Fewer than 5
    Light,
    /// Fewer than 20
    Moderate,
    /// 20 or more
    Intense,
}

impl ThreatLevel {
    pub fn from_total(total_attacks: u64) -> Self {
        match total_attacks {
            0 => ThreatLevel::Secure,
            1..=4 => ThreatLevel::Light,
            5..=19 => ThreatLevel::Moderate,
            _ => ThreatLevel::Intense,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ThreatLevel::Secure => "network secure, no attacks detected",
            ThreatLevel::Light => "network under light attack",
            ThreatLevel::Moderate => "network under moderate attack",
            ThreatLevel::Intense => "network under intense attack",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityReport {
    pub floods: FloodStats,
    pub total_attacks: u64,
    /// Blacklist entries still inside their ban
    pub blacklisted: usize,
    pub blacklist_capacity: usize,
    pub monitored_clients: usize,
    pub client_capacity: usize,
    pub connected_stations: u32,
    pub messages_served: u64,
    pub threat_level: ThreatLevel,
}

impl SecurityReport {
    /// Emit the report through tracing
    pub fn log(&self) {
        info!("=== Security report ===");
        info!(
            "Floods detected: disassoc={} auth={} packet={} (total {})",
            self.floods.disassoc_floods,
            self.floods.auth_floods,
            self.floods.packet_floods,
            self.total_attacks
        );
        info!(
            "Blacklisted: {}/{}, monitored clients: {}/{}",
            self.blacklisted, self.blacklist_capacity, self.monitored_clients, self.client_capacity
        );
        info!(
            "Connected stations: {}/{}, messages served: {}",
            self.connected_stations, self.client_capacity, self.messages_served
        );
        info!("Status: {}", self.threat_level.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_levels() {
        assert_eq!(ThreatLevel::from_total(0), ThreatLevel::Secure);
        assert_eq!(ThreatLevel::from_total(1), ThreatLevel::Light);
        assert_eq!(ThreatLevel::from_total(4), ThreatLevel::Light);
        assert_eq!(ThreatLevel::from_total(5), ThreatLevel::Moderate);
        assert_eq!(ThreatLevel::from_total(19), ThreatLevel::Moderate);
        assert_eq!(ThreatLevel::from_total(20), ThreatLevel::Intense);
        assert!(ThreatLevel::Intense > ThreatLevel::Light);
    }
}
