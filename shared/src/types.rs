use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Semantic tag for an ICMPv6 message the monitor cares about.
///
/// Declaration order is the display column order: NDP kinds first, then MLD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    RouterSolicitation,
    RouterAdvertisement,
    NeighborSolicitation,
    NeighborAdvertisement,
    Redirect,
    DuplicateAddressRequest,
    DuplicateAddressConfirmation,
    MldQuery,
    MldReport,
    MldDone,
}

impl MessageKind {
    pub const ALL: [MessageKind; 10] = [
        MessageKind::RouterSolicitation,
        MessageKind::RouterAdvertisement,
        MessageKind::NeighborSolicitation,
        MessageKind::NeighborAdvertisement,
        MessageKind::Redirect,
        MessageKind::DuplicateAddressRequest,
        MessageKind::DuplicateAddressConfirmation,
        MessageKind::MldQuery,
        MessageKind::MldReport,
        MessageKind::MldDone,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::RouterSolicitation => "router_solicitation",
            MessageKind::RouterAdvertisement => "router_advertisement",
            MessageKind::NeighborSolicitation => "neighbor_solicitation",
            MessageKind::NeighborAdvertisement => "neighbor_advertisement",
            MessageKind::Redirect => "redirect",
            MessageKind::DuplicateAddressRequest => "duplicate_address_request",
            MessageKind::DuplicateAddressConfirmation => "duplicate_address_confirmation",
            MessageKind::MldQuery => "mld_query",
            MessageKind::MldReport => "mld_report",
            MessageKind::MldDone => "mld_done",
        }
    }

    /// Column heading used by the terminal table
    pub fn short_name(self) -> &'static str {
        match self {
            MessageKind::RouterSolicitation => "RS",
            MessageKind::RouterAdvertisement => "RA",
            MessageKind::NeighborSolicitation => "NS",
            MessageKind::NeighborAdvertisement => "NA",
            MessageKind::Redirect => "Rdr",
            MessageKind::DuplicateAddressRequest => "DAR",
            MessageKind::DuplicateAddressConfirmation => "DAC",
            MessageKind::MldQuery => "MQ",
            MessageKind::MldReport => "MR",
            MessageKind::MldDone => "MD",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Window-filtered view of one observed peer.
/// Computed on demand from the aggregation store; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSummary {
    /// Canonical textual IPv6 address, e.g. "fe80::1"
    pub address: String,

    /// First time any event was recorded for this address
    pub first_seen: DateTime<Utc>,

    /// Most recent message from this address
    pub last_seen: DateTime<Utc>,

    /// Last observed link-layer address
    pub mac: Option<String>,

    /// Last observed IPv6 hop limit, when the packet source supplies it
    pub hop_limit: Option<u8>,

    /// Interface the peer was last heard on
    pub interface: Option<String>,

    /// Messages per kind inside the window
    pub counts: BTreeMap<MessageKind, usize>,

    /// Sum of `counts`
    pub total: usize,

    /// Multicast groups reported inside the window, sorted
    pub groups: Vec<String>,
}

impl PeerSummary {
    pub fn count(&self, kind: MessageKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// Default router preference carried by a Route Information option (RFC 4191).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutePreference {
    Medium,
    High,
    /// Wire value 2; undefined by RFC 4191 but reported as seen
    Reserved,
    Low,
}

impl RoutePreference {
    /// Decode the 2-bit Prf field
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => RoutePreference::Medium,
            1 => RoutePreference::High,
            2 => RoutePreference::Reserved,
            _ => RoutePreference::Low,
        }
    }
}

/// Prefix Information option from a Router Advertisement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixInfo {
    /// CIDR text, e.g. "2001:db8::/64"
    pub prefix: String,
    pub prefix_length: u8,
    #[serde(with = "duration_secs")]
    pub valid_lifetime: Duration,
    #[serde(with = "duration_secs")]
    pub preferred_lifetime: Duration,
    pub on_link: bool,
    pub autonomous: bool,
}

/// Route Information option from a Router Advertisement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// CIDR text, e.g. "2001:db8:1::/48"
    pub prefix: String,
    pub prefix_length: u8,
    pub preference: RoutePreference,
    #[serde(with = "duration_secs")]
    pub lifetime: Duration,
}

/// Everything learned from the most recent Router Advertisement of one router.
/// Each new advertisement replaces the record wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterRecord {
    pub address: String,
    pub mac: Option<String>,
    pub interface: Option<String>,
    pub hop_limit: u8,

    /// M flag: addresses are available via DHCPv6
    pub managed: bool,

    /// O flag: other configuration is available via DHCPv6
    pub other: bool,

    #[serde(with = "duration_secs")]
    pub lifetime: Duration,
    pub mtu: Option<u32>,
    pub prefixes: Vec<PrefixInfo>,
    pub rdnss: Vec<String>,
    pub routes: Vec<RouteInfo>,
    pub last_seen: DateTime<Utc>,
}

/// Serialize a `Duration` as whole seconds.
pub mod duration_secs {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
