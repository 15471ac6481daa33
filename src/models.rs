use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// 6-byte station address.
///
/// Real wireless stations are keyed by their MAC. TCP peers get a synthetic
/// address in the same key space (see [`MacAddr::synthetic`]), so a genuine
/// station whose MAC starts with `02:00` can collide with a TCP peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    pub const ZERO: MacAddr = MacAddr([0, 0, 0, 0, 0, 0]);

    /// Prefix of every address derived from a TCP peer
    pub const SYNTHETIC_PREFIX: [u8; 2] = [0x02, 0x00];

    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Derive the key used for a TCP peer: `02:00` followed by the four
    /// IPv4 octets in dotted order.
    ///
    /// These share the table key space with real station addresses, so a
    /// station whose address starts with `02:00` can collide with a peer.
    pub fn synthetic(ip: Ipv4Addr) -> Self {
        let [a, b, c, d] = ip.octets();
        Self([
            Self::SYNTHETIC_PREFIX[0],
            Self::SYNTHETIC_PREFIX[1],
            a,
            b,
            c,
            d,
        ])
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// True when the address carries the synthetic TCP prefix. A real
    /// station can match this too.
    pub fn has_synthetic_prefix(&self) -> bool {
        self.0[..2] == Self::SYNTHETIC_PREFIX
    }

    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl std::str::FromStr for MacAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(|c| c == ':' || c == '-').collect();
        if parts.len() != 6 {
            return Err(format!("Invalid MAC address: {}", s));
        }

        let mut bytes = [0u8; 6];
        for (byte, part) in bytes.iter_mut().zip(parts) {
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| format!("Invalid MAC address: {}", s))?;
        }
        Ok(Self(bytes))
    }
}

/// Kind of flood that put an address on the blacklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    /// Disassociation storm
    Disassoc,
    /// Authentication / association flood
    Auth,
    /// Per-client TCP message flood
    Packet,
}

impl AttackKind {
    /// Label used in logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            AttackKind::Disassoc => "DISASSOC_FLOOD",
            AttackKind::Auth => "AUTH_FLOOD",
            AttackKind::Packet => "PACKET_FLOOD",
        }
    }
}

impl std::fmt::Display for AttackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for AttackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disassoc" | "deauth" | "disassoc_flood" => Ok(AttackKind::Disassoc),
            "auth" | "auth_flood" => Ok(AttackKind::Auth),
            "packet" | "packet_flood" => Ok(AttackKind::Packet),
            _ => Err(format!("Unknown attack kind: {}", s)),
        }
    }
}
