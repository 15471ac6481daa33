//! Stimulus scenarios
//!
//! Deterministic, timestamped traffic modelled on the external test
//! programs that exercise the AP: an authentication flooder, a
//! disassociation flooder, a TCP packet flooder and a well-behaved client.
//! Replaying a scenario drives an [`AdmissionGate`] on a [`ManualClock`].
//!
//! # Example
//! ```ignore
//! use apguard::scenario::{Scenario, replay};
//!
//! let stimuli = Scenario::PacketFlood.generate(7);
//! let summary = replay(&gate, &clock, &stimuli);
//! assert!(summary.blocked_replies > 0);
//! ```

use std::net::Ipv4Addr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::clock::{Clock, ManualClock};
use crate::gate::{AdmissionGate, AssociationVerdict, GateOutcome, StationEvent};
use crate::models::MacAddr;

/// Vendor prefix used for generated station addresses
const STATION_OUI: [u8; 3] = [0x24, 0x0a, 0xc4];

/// One input to the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stimulus {
    Station(StationEvent),
    Message { peer: Ipv4Addr, payload: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedStimulus {
    /// Milliseconds from scenario start
    pub at_ms: u64,
    pub stimulus: Stimulus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Association attempts every 55 ms from random addresses
    AuthFlood,
    /// Rapid disconnect/reconnect cycles from one station
    DisassocFlood,
    /// Bursts of TCP messages from one peer
    PacketFlood,
    /// One station sending a message every few seconds
    NormalClient,
}

impl Scenario {
    pub fn generate(&self, seed: u64) -> Vec<TimedStimulus> {
        let mut rng = StdRng::seed_from_u64(seed);
        match self {
            Scenario::AuthFlood => auth_flood(&mut rng, 40),
            Scenario::DisassocFlood => disassoc_flood(&mut rng, 3),
            Scenario::PacketFlood => packet_flood(10),
            Scenario::NormalClient => normal_client(&mut rng, 10),
        }
    }
}

fn random_station(rng: &mut StdRng) -> MacAddr {
    let mut bytes = [0u8; 6];
    bytes[..3].copy_from_slice(&STATION_OUI);
    rng.fill(&mut bytes[3..]);
    MacAddr::new(bytes)
}

fn station(at_ms: u64, event: StationEvent) -> TimedStimulus {
    TimedStimulus {
        at_ms,
        stimulus: Stimulus::Station(event),
    }
}

fn message(at_ms: u64, peer: Ipv4Addr, payload: String) -> TimedStimulus {
    TimedStimulus {
        at_ms,
        stimulus: Stimulus::Message { peer, payload },
    }
}

/// Each attempt associates with a fresh address and drops 5 ms later
pub fn auth_flood(rng: &mut StdRng, attempts: u16) -> Vec<TimedStimulus> {
    let mut out = Vec::with_capacity(attempts as usize * 2);
    for i in 0..attempts {
        let at = i as u64 * 55;
        let mac = random_station(rng);
        let aid = i % 20 + 1;
        out.push(station(at, StationEvent::Associated { mac, aid }));
        out.push(station(
            at + 5,
            StationEvent::Disassociated { mac, aid, reason: 8 },
        ));
    }
    out
}

/// Bursts of 15 disconnect (10 ms) / reconnect (20 ms) cycles, 50 ms apart
pub fn disassoc_flood(rng: &mut StdRng, bursts: u16) -> Vec<TimedStimulus> {
    let mac = random_station(rng);
    let aid = 1;
    let mut out = vec![station(0, StationEvent::Associated { mac, aid })];

    let mut at = 3_000;
    for _ in 0..bursts {
        for _ in 0..15 {
            out.push(station(
                at,
                StationEvent::Disassociated { mac, aid, reason: 1 },
            ));
            at += 10;
            out.push(station(at, StationEvent::Associated { mac, aid }));
            at += 20;
        }
        at += 50;
    }
    out
}

/// Bursts of 10 messages 5 ms apart, 10 ms between bursts
pub fn packet_flood(bursts: u16) -> Vec<TimedStimulus> {
    let peer = Ipv4Addr::new(192, 168, 4, 2);
    let mut out = Vec::with_capacity(bursts as usize * 10);
    let mut at = 0;
    let mut seq = 0u32;
    for _ in 0..bursts {
        for _ in 0..10 {
            out.push(message(at, peer, format!("FLOOD_PACKET_{}", seq)));
            seq += 1;
            at += 5;
        }
        at += 10;
    }
    out
}

/// Associate, then send a message every 3 to 12 seconds
pub fn normal_client(rng: &mut StdRng, messages: u16) -> Vec<TimedStimulus> {
    let mac = random_station(rng);
    let peer = Ipv4Addr::new(192, 168, 4, 3);
    let mut out = vec![station(0, StationEvent::Associated { mac, aid: 1 })];

    let mut at = 2_000;
    for i in 0..messages {
        out.push(message(at, peer, format!("Hello from client, message {}", i + 1)));
        at += rng.gen_range(3_000..=12_000);
    }
    out
}

/// Outcome tally of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub associations_accepted: u64,
    pub associations_blacklisted: u64,
    pub associations_flooded: u64,
    pub disassociations: u64,
    pub disassoc_floods: u64,
    pub duplicate_disassociations: u64,
    pub echo_replies: u64,
    pub blocked_replies: u64,
}

/// Feed `stimuli` through `gate`, setting `clock` to `base + at_ms` first
pub fn replay(gate: &AdmissionGate, clock: &ManualClock, stimuli: &[TimedStimulus]) -> ReplaySummary {
    let base = clock.now_ms();
    let mut summary = ReplaySummary::default();

    for timed in stimuli {
        clock.set(base + timed.at_ms);
        match &timed.stimulus {
            Stimulus::Station(event) => match gate.handle_event(*event) {
                GateOutcome::Association(AssociationVerdict::Accepted) => {
                    summary.associations_accepted += 1
                }
                GateOutcome::Association(AssociationVerdict::Blacklisted) => {
                    summary.associations_blacklisted += 1
                }
                GateOutcome::Association(AssociationVerdict::Flooded(_)) => {
                    summary.associations_flooded += 1
                }
                GateOutcome::Disassociation(outcome) => {
                    summary.disassociations += 1;
                    if outcome.flood.is_some() {
                        summary.disassoc_floods += 1;
                    }
                    if outcome.duplicate {
                        summary.duplicate_disassociations += 1;
                    }
                }
            },
            Stimulus::Message { peer, payload } => {
                if gate.handle_message(*peer, payload).is_blocked() {
                    summary.blocked_replies += 1;
                } else {
                    summary.echo_replies += 1;
                }
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::radio::RecordingRadio;
    use std::sync::Arc;

    fn gate_at(start_ms: u64) -> (AdmissionGate, ManualClock) {
        let clock = ManualClock::new(start_ms);
        let gate = AdmissionGate::new(
            &Config::default(),
            Arc::new(RecordingRadio::new()),
            Arc::new(clock.clone()),
        );
        (gate, clock)
    }

    #[test]
    fn test_generation_is_deterministic() {
        for scenario in [
            Scenario::AuthFlood,
            Scenario::DisassocFlood,
            Scenario::PacketFlood,
            Scenario::NormalClient,
        ] {
            assert_eq!(scenario.generate(11), scenario.generate(11));
        }
        assert_ne!(
            Scenario::AuthFlood.generate(1),
            Scenario::AuthFlood.generate(2)
        );
    }

    #[test]
    fn test_stimuli_are_ordered() {
        for scenario in [Scenario::AuthFlood, Scenario::DisassocFlood, Scenario::NormalClient] {
            let stimuli = scenario.generate(3);
            assert!(stimuli.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
        }
    }

    #[test]
    fn test_auth_flood_detected() {
        let (gate, clock) = gate_at(10_000);
        let summary = replay(&gate, &clock, &Scenario::AuthFlood.generate(5));
        assert!(summary.associations_flooded > 0);
        assert!(summary.disassoc_floods > 0);
        assert!(gate.report().floods.auth_floods > 0);
    }

    #[test]
    fn test_disassoc_flood_detected() {
        let (gate, clock) = gate_at(10_000);
        let summary = replay(&gate, &clock, &Scenario::DisassocFlood.generate(5));
        assert!(summary.disassoc_floods > 0);
        // Banned station is turned away on reconnect
        assert!(summary.associations_blacklisted > 0);
        assert_eq!(gate.blacklisted().len(), 1);
    }

    #[test]
    fn test_packet_flood_blocks_after_thirty() {
        let (gate, clock) = gate_at(10_000);
        let summary = replay(&gate, &clock, &Scenario::PacketFlood.generate(0));
        // 100 messages in 600 ms, 30 allowed
        assert_eq!(summary.echo_replies, 30);
        assert_eq!(summary.blocked_replies, 70);
        assert!(gate.is_blocked(MacAddr::synthetic(Ipv4Addr::new(192, 168, 4, 2))));
    }

    #[test]
    fn test_normal_client_never_flagged() {
        let (gate, clock) = gate_at(10_000);
        let summary = replay(&gate, &clock, &Scenario::NormalClient.generate(9));
        assert_eq!(summary.associations_accepted, 1);
        assert_eq!(summary.echo_replies, 10);
        assert_eq!(summary.blocked_replies, 0);
        assert_eq!(gate.report().total_attacks, 0);
    }
}
