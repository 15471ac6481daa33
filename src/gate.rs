//! Admission gate
//!
//! Entry point for the two admission paths: station association events from
//! the radio layer and TCP messages from the connection handler. The
//! blacklist is consulted before the flood detectors, and detector verdicts
//! become blacklist entries.
//!
//! All detection state sits behind one mutex. Each handler takes it once,
//! so check-then-increment and scan-then-add run as a unit even when the
//! radio callback and the TCP loop call in concurrently. Radio commands are
//! issued after the lock is released.

use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::blacklist::{AddOutcome, Blacklist};
use crate::clock::Clock;
use crate::config::Config;
use crate::dos::{FloodEngine, FloodVerdict};
use crate::models::{AttackKind, MacAddr};
use crate::radio::{DisassocTarget, RadioControl};
use crate::report::{SecurityReport, ThreatLevel};

/// Reply sent to a client caught flooding
pub const BLOCKED_REPLY: &str = "Connection blocked due to flood detection";

/// Reply sent for an accepted message
pub fn echo_reply(payload: &str, messages: u64, clients: u32) -> String {
    format!(
        "Echo from AP: {} | Messages: {} | Clients: {} | Security: ACTIVE",
        payload, messages, clients
    )
}

/// Station events delivered by the radio layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationEvent {
    Associated { mac: MacAddr, aid: u16 },
    Disassociated { mac: MacAddr, aid: u16, reason: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationVerdict {
    /// Station admitted
    Accepted,
    /// Station already banned and forced off
    Blacklisted,
    /// Authentication flood detected, station banned
    Flooded(AddOutcome),
}

impl AssociationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AssociationVerdict::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisassociationOutcome {
    /// Set when the disassociation flood detector tripped
    pub flood: Option<AddOutcome>,
    /// Gauge was already zero, event ignored for counting
    pub duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageVerdict {
    Echo(String),
    Blocked,
}

impl MessageVerdict {
    /// Bytes to send back to the peer
    pub fn reply(&self) -> &str {
        match self {
            MessageVerdict::Echo(text) => text,
            MessageVerdict::Blocked => BLOCKED_REPLY,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, MessageVerdict::Blocked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Association(AssociationVerdict),
    Disassociation(DisassociationOutcome),
}

/// Everything the detectors and admission decisions share
#[derive(Debug)]
struct SecurityState {
    blacklist: Blacklist,
    engine: FloodEngine,
    connected_stations: u32,
    messages_served: u64,
}

impl SecurityState {
    fn associate(
        &mut self,
        mac: MacAddr,
        aid: u16,
        now: u64,
        commands: &mut Vec<DisassocTarget>,
    ) -> AssociationVerdict {
        if self.blacklist.is_blocked(mac, now) {
            warn!("Association attempt from blocked MAC {} (aid {})", mac, aid);
            commands.push(DisassocTarget::Station(aid));
            return AssociationVerdict::Blacklisted;
        }

        if let Some(verdict) = self.engine.check_auth(mac, now) {
            let outcome = self.ban(verdict, now, commands);
            return AssociationVerdict::Flooded(outcome);
        }

        self.connected_stations += 1;
        info!(
            "Station connected: {} (aid {}), total {}/{}",
            mac,
            aid,
            self.connected_stations,
            self.engine.clients().capacity()
        );
        AssociationVerdict::Accepted
    }

    fn disassociate(
        &mut self,
        mac: MacAddr,
        aid: u16,
        reason: u16,
        now: u64,
        commands: &mut Vec<DisassocTarget>,
    ) -> DisassociationOutcome {
        let flood = self
            .engine
            .check_disassoc(mac, now)
            .map(|verdict| self.ban(verdict, now, commands));

        self.engine.forget_client(mac);

        let duplicate = self.connected_stations == 0;
        if duplicate {
            info!("Duplicate disconnect event ignored: {}", mac);
        } else {
            self.connected_stations -= 1;
            info!(
                "Station disconnected: {} (aid {}, reason {}), total {}/{}",
                mac,
                aid,
                reason,
                self.connected_stations,
                self.engine.clients().capacity()
            );
        }

        DisassociationOutcome { flood, duplicate }
    }

    fn message(
        &mut self,
        peer: Ipv4Addr,
        payload: &str,
        now: u64,
        commands: &mut Vec<DisassocTarget>,
    ) -> MessageVerdict {
        self.messages_served += 1;
        let address = MacAddr::synthetic(peer);

        if let Some(verdict) = self.engine.observe_packet(address, now) {
            self.ban(verdict, now, commands);
            return MessageVerdict::Blocked;
        }

        info!(
            "Message from {} ({} bytes), total processed {}",
            peer,
            payload.len(),
            self.messages_served
        );
        MessageVerdict::Echo(echo_reply(
            payload,
            self.messages_served,
            self.connected_stations,
        ))
    }

    fn ban(
        &mut self,
        verdict: FloodVerdict,
        now: u64,
        commands: &mut Vec<DisassocTarget>,
    ) -> AddOutcome {
        let outcome = self.blacklist.add(verdict.address, verdict.kind, now);
        if outcome == AddOutcome::Created {
            commands.push(DisassocTarget::Address(verdict.address));
        }
        outcome
    }

    fn report(&self, now: u64) -> SecurityReport {
        let floods = self.engine.stats();
        let clients = self.engine.clients();
        SecurityReport {
            floods,
            total_attacks: floods.total(),
            blacklisted: self.blacklist.active_count(now),
            blacklist_capacity: self.blacklist.capacity(),
            monitored_clients: clients.len(),
            client_capacity: clients.capacity(),
            connected_stations: self.connected_stations,
            messages_served: self.messages_served,
            threat_level: ThreatLevel::from_total(floods.total()),
        }
    }
}

/// Shared handle to the detection state. Clones refer to the same tables.
#[derive(Clone)]
pub struct AdmissionGate {
    state: Arc<Mutex<SecurityState>>,
    radio: Arc<dyn RadioControl>,
    clock: Arc<dyn Clock>,
}

impl AdmissionGate {
    pub fn new(config: &Config, radio: Arc<dyn RadioControl>, clock: Arc<dyn Clock>) -> Self {
        let state = SecurityState {
            blacklist: Blacklist::with_config(config.blacklist.clone()),
            engine: FloodEngine::with_config(config.detection.clone(), config.clients.clone()),
            connected_stations: 0,
            messages_served: 0,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            radio,
            clock,
        }
    }

    /// A station joined the AP
    pub fn associate(&self, mac: MacAddr, aid: u16) -> AssociationVerdict {
        let now = self.clock.now_ms();
        let mut commands = Vec::new();
        let verdict = self.state.lock().associate(mac, aid, now, &mut commands);
        self.dispatch(commands);
        verdict
    }

    /// A station left or was forced off the AP
    pub fn disassociate(&self, mac: MacAddr, aid: u16, reason: u16) -> DisassociationOutcome {
        let now = self.clock.now_ms();
        let mut commands = Vec::new();
        let outcome = self
            .state
            .lock()
            .disassociate(mac, aid, reason, now, &mut commands);
        self.dispatch(commands);
        outcome
    }

    /// A TCP peer sent `payload`
    pub fn handle_message(&self, peer: Ipv4Addr, payload: &str) -> MessageVerdict {
        let now = self.clock.now_ms();
        let mut commands = Vec::new();
        let verdict = self.state.lock().message(peer, payload, now, &mut commands);
        self.dispatch(commands);
        verdict
    }

    pub fn handle_event(&self, event: StationEvent) -> GateOutcome {
        match event {
            StationEvent::Associated { mac, aid } => {
                GateOutcome::Association(self.associate(mac, aid))
            }
            StationEvent::Disassociated { mac, aid, reason } => {
                GateOutcome::Disassociation(self.disassociate(mac, aid, reason))
            }
        }
    }

    /// Whether `mac` is currently banned. Expires stale entries like any
    /// other lookup.
    pub fn is_blocked(&self, mac: MacAddr) -> bool {
        let now = self.clock.now_ms();
        self.state.lock().blacklist.is_blocked(mac, now)
    }

    /// Banned addresses with their kind, in slot order
    pub fn blacklisted(&self) -> Vec<(MacAddr, AttackKind)> {
        self.state
            .lock()
            .blacklist
            .entries()
            .map(|e| (e.address, e.attack_kind))
            .collect()
    }

    pub fn report(&self) -> SecurityReport {
        let now = self.clock.now_ms();
        self.state.lock().report(now)
    }

    pub fn connected_stations(&self) -> u32 {
        self.state.lock().connected_stations
    }

    pub fn messages_served(&self) -> u64 {
        self.state.lock().messages_served
    }

    fn dispatch(&self, commands: Vec<DisassocTarget>) {
        for target in commands {
            self.radio.force_disassociate(target);
        }
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
