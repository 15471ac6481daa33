//! End-to-end flood scenarios through the public API

use std::net::Ipv4Addr;
use std::sync::Arc;

use apguard::blacklist::BlacklistConfig;
use apguard::gate::{echo_reply, BLOCKED_REPLY};
use apguard::{
    AddOutcome, AdmissionGate, AssociationVerdict, AttackKind, Blacklist, Config, DisassocTarget,
    MacAddr, ManualClock, RecordingRadio,
};

fn station(n: u8) -> MacAddr {
    MacAddr::new([0x24, 0x0a, 0xc4, 0x10, 0x20, n])
}

fn gate_with(config: Config) -> (AdmissionGate, ManualClock, Arc<RecordingRadio>) {
    let clock = ManualClock::new(60_000);
    let radio = Arc::new(RecordingRadio::new());
    let gate = AdmissionGate::new(&config, radio.clone(), Arc::new(clock.clone()));
    (gate, clock, radio)
}

#[test]
fn test_ninth_auth_attempt_in_half_second_is_banned() {
    let (gate, clock, radio) = gate_with(Config::default());

    for n in 0..8 {
        assert_eq!(gate.associate(station(n), n as u16 + 1), AssociationVerdict::Accepted);
        clock.advance(60);
    }
    assert!(radio.commands().is_empty());

    let verdict = gate.associate(station(8), 9);
    assert_eq!(verdict, AssociationVerdict::Flooded(AddOutcome::Created));
    assert!(gate.is_blocked(station(8)));
    assert!(!gate.is_blocked(station(0)));
    assert_eq!(radio.take(), vec![DisassocTarget::Address(station(8))]);
    assert_eq!(gate.blacklisted(), vec![(station(8), AttackKind::Auth)]);
}

#[test]
fn test_sixth_disassociation_trips_global_detector() {
    let (gate, clock, _) = gate_with(Config::default());
    for n in 0..6 {
        gate.associate(station(n), n as u16 + 1);
    }

    clock.advance(2_000);
    for n in 0..5 {
        assert!(gate.disassociate(station(n), n as u16 + 1, 8).flood.is_none());
        clock.advance(100);
    }
    let outcome = gate.disassociate(station(5), 6, 8);
    assert_eq!(outcome.flood, Some(AddOutcome::Created));
    assert_eq!(gate.blacklisted(), vec![(station(5), AttackKind::Disassoc)]);
    assert_eq!(gate.connected_stations(), 0);
}

#[test]
fn test_full_blacklist_drops_eleventh_offender() {
    let mut blacklist = Blacklist::with_config(BlacklistConfig {
        duration_ms: 300_000,
        capacity: 10,
    });
    for n in 0..10 {
        assert_eq!(blacklist.add(station(n), AttackKind::Packet, 1_000), AddOutcome::Created);
    }

    assert_eq!(blacklist.add(station(10), AttackKind::Auth, 1_500), AddOutcome::Dropped);
    assert_eq!(blacklist.occupied(), 10);
    assert!(!blacklist.is_blocked(station(10), 2_000));
    assert!(blacklist.is_blocked(station(9), 2_000));
}

#[test]
fn test_ban_expires_exactly_at_duration() {
    let mut blacklist = Blacklist::with_config(BlacklistConfig {
        duration_ms: 5_000,
        capacity: 10,
    });
    blacklist.add(station(1), AttackKind::Disassoc, 10_000);

    assert!(blacklist.is_blocked(station(1), 10_000));
    assert!(blacklist.is_blocked(station(1), 14_999));
    assert!(!blacklist.is_blocked(station(1), 15_000));
    assert_eq!(blacklist.occupied(), 0);
    // Deactivated: an earlier timestamp no longer finds it
    assert!(!blacklist.is_blocked(station(1), 12_000));
}

#[test]
fn test_renewal_keeps_single_entry() {
    let mut blacklist = Blacklist::new();
    blacklist.add(station(1), AttackKind::Auth, 1_000);
    assert_eq!(blacklist.add(station(1), AttackKind::Packet, 2_000), AddOutcome::Renewed);

    assert_eq!(blacklist.occupied(), 1);
    let entry = blacklist.entries().next().unwrap();
    assert_eq!(entry.attack_kind, AttackKind::Packet);
    assert_eq!(entry.blocked_until, 2_000 + blacklist.duration_ms());
}

#[test]
fn test_thirty_first_message_blocked() {
    let (gate, clock, radio) = gate_with(Config::default());
    let peer = Ipv4Addr::new(192, 168, 4, 50);

    for n in 1..=30u64 {
        let verdict = gate.handle_message(peer, "ping");
        assert_eq!(verdict.reply(), echo_reply("ping", n, 0));
        clock.advance(30);
    }

    let verdict = gate.handle_message(peer, "ping");
    assert_eq!(verdict.reply(), BLOCKED_REPLY);

    let synthetic: MacAddr = "02:00:c0:a8:04:32".parse().unwrap();
    assert!(gate.is_blocked(synthetic));
    assert_eq!(radio.take(), vec![DisassocTarget::Address(synthetic)]);
}

#[test]
fn test_disassociation_at_zero_is_duplicate() {
    let (gate, _, _) = gate_with(Config::default());
    let outcome = gate.disassociate(station(1), 1, 8);
    assert!(outcome.duplicate);
    assert_eq!(gate.connected_stations(), 0);
}

#[test]
fn test_banned_station_turned_away_by_aid() {
    let mut config = Config::default();
    config.detection.auth_threshold = 1;
    let (gate, clock, radio) = gate_with(config);

    gate.associate(station(1), 1);
    gate.associate(station(2), 2);
    radio.take();

    clock.advance(5_000);
    assert_eq!(gate.associate(station(2), 7), AssociationVerdict::Blacklisted);
    assert_eq!(radio.take(), vec![DisassocTarget::Station(7)]);

    // Default ban lapses after five minutes
    clock.advance(300_000);
    assert_eq!(gate.associate(station(2), 7), AssociationVerdict::Accepted);
}
