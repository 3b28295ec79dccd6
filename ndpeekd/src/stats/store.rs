use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use chrono::{DateTime, Utc};
use shared::types::{MessageKind, PeerSummary, RouterRecord};

/// Everything known about one source address.
#[derive(Debug, Clone)]
struct PeerRecord {
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    /// Per-kind timestamps in arrival order
    messages: HashMap<MessageKind, Vec<DateTime<Utc>>>,
    /// Group address -> last report
    groups: HashMap<String, DateTime<Utc>>,
    mac: Option<String>,
    hop_limit: Option<u8>,
    interface: Option<String>,
    /// Creation order, breaks ties between equal totals
    seq: u64,
}

impl PeerRecord {
    fn new(now: DateTime<Utc>, seq: u64) -> Self {
        Self {
            first_seen: now,
            last_seen: now,
            messages: HashMap::new(),
            groups: HashMap::new(),
            mac: None,
            hop_limit: None,
            interface: None,
            seq,
        }
    }

    fn summarize(&self, address: &str, cutoff: DateTime<Utc>) -> PeerSummary {
        let counts: BTreeMap<MessageKind, usize> = self
            .messages
            .iter()
            .map(|(kind, stamps)| (*kind, stamps.iter().filter(|t| **t > cutoff).count()))
            .collect();
        let total = counts.values().sum();

        let mut groups: Vec<String> = self
            .groups
            .iter()
            .filter(|(_, reported)| **reported > cutoff)
            .map(|(group, _)| group.clone())
            .collect();
        groups.sort();

        PeerSummary {
            address: address.to_string(),
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            mac: self.mac.clone(),
            hop_limit: self.hop_limit,
            interface: self.interface.clone(),
            counts,
            total,
            groups,
        }
    }
}

#[derive(Debug, Default)]
struct StatsInner {
    peers: HashMap<String, PeerRecord>,
    routers: HashMap<String, RouterRecord>,
    next_seq: u64,
}

impl StatsInner {
    /// Get or create; creation stamps both first_seen and last_seen
    fn peer(&mut self, address: &str, now: DateTime<Utc>) -> &mut PeerRecord {
        let next_seq = &mut self.next_seq;
        self.peers.entry(address.to_string()).or_insert_with(|| {
            let seq = *next_seq;
            *next_seq += 1;
            PeerRecord::new(now, seq)
        })
    }
}

/// Windowed NDP/MLD aggregation store.
///
/// One lock guards both the peer table and the router table, so a snapshot
/// never observes a half-applied prune. Every public operation has a `*_at`
/// twin that takes the clock explicitly.
#[derive(Debug)]
pub struct NdpStats {
    inner: RwLock<StatsInner>,
    window: Duration,
}

impl NdpStats {
    pub fn new(window: Duration) -> Self {
        Self {
            inner: RwLock::new(StatsInner::default()),
            window,
        }
    }

    /// Retention window used by `snapshot` and `prune`
    pub fn window(&self) -> Duration {
        self.window
    }

    fn read(&self) -> RwLockReadGuard<'_, StatsInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StatsInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match chrono::Duration::from_std(self.window) {
            Ok(window) => now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC),
            Err(_) => DateTime::<Utc>::MIN_UTC,
        }
    }

    pub fn record_message(&self, address: &str, kind: MessageKind) {
        self.record_message_at(address, kind, Utc::now());
    }

    pub fn record_message_at(&self, address: &str, kind: MessageKind, now: DateTime<Utc>) {
        let mut inner = self.write();
        let peer = inner.peer(address, now);
        // wall clock can step back; last_seen never does
        peer.last_seen = peer.last_seen.max(now);
        peer.messages.entry(kind).or_default().push(now);
    }

    /// Refresh the last-report time of `group` for `address`
    pub fn record_mld_membership(&self, address: &str, group: &str) {
        self.record_mld_membership_at(address, group, Utc::now());
    }

    pub fn record_mld_membership_at(&self, address: &str, group: &str, now: DateTime<Utc>) {
        let mut inner = self.write();
        inner.peer(address, now).groups.insert(group.to_string(), now);
    }

    pub fn record_mac(&self, address: &str, mac: &str) {
        self.record_mac_at(address, mac, Utc::now());
    }

    pub fn record_mac_at(&self, address: &str, mac: &str, now: DateTime<Utc>) {
        let mut inner = self.write();
        inner.peer(address, now).mac = Some(mac.to_string());
    }

    pub fn record_hop_limit(&self, address: &str, hop_limit: u8) {
        self.record_hop_limit_at(address, hop_limit, Utc::now());
    }

    pub fn record_hop_limit_at(&self, address: &str, hop_limit: u8, now: DateTime<Utc>) {
        let mut inner = self.write();
        inner.peer(address, now).hop_limit = Some(hop_limit);
    }

    pub fn record_interface(&self, address: &str, interface: &str) {
        self.record_interface_at(address, interface, Utc::now());
    }

    pub fn record_interface_at(&self, address: &str, interface: &str, now: DateTime<Utc>) {
        let mut inner = self.write();
        inner.peer(address, now).interface = Some(interface.to_string());
    }

    /// Store a router, replacing any previous record for the same address
    pub fn record_router(&self, record: RouterRecord) {
        let mut inner = self.write();
        inner.routers.insert(record.address.clone(), record);
    }

    /// Window-filtered view of every peer, busiest first.
    pub fn snapshot(&self) -> Vec<PeerSummary> {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Vec<PeerSummary> {
        let cutoff = self.cutoff(now);
        let inner = self.read();

        let mut rows: Vec<(u64, PeerSummary)> = inner
            .peers
            .iter()
            .map(|(address, peer)| (peer.seq, peer.summarize(address, cutoff)))
            .collect();
        rows.sort_by(|(seq_a, a), (seq_b, b)| b.total.cmp(&a.total).then(seq_a.cmp(seq_b)));

        rows.into_iter().map(|(_, summary)| summary).collect()
    }

    /// Window-filtered view of a single peer
    pub fn peer(&self, address: &str) -> Option<PeerSummary> {
        self.peer_at(address, Utc::now())
    }

    pub fn peer_at(&self, address: &str, now: DateTime<Utc>) -> Option<PeerSummary> {
        let cutoff = self.cutoff(now);
        let inner = self.read();
        inner.peers.get(address).map(|peer| peer.summarize(address, cutoff))
    }

    /// Current router table sorted by address. Routers are not windowed.
    pub fn routers_snapshot(&self) -> Vec<RouterRecord> {
        let inner = self.read();
        let mut routers: Vec<RouterRecord> = inner.routers.values().cloned().collect();
        routers.sort_by(|a, b| a.address.cmp(&b.address));
        routers
    }

    /// Drop expired timestamps and group reports, then every peer left
    /// without an in-window message. Returns the number of peers removed.
    ///
    /// A peer with live group reports or a MAC but no live messages is removed too.
    pub fn prune(&self) -> usize {
        self.prune_at(Utc::now())
    }

    pub fn prune_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let mut inner = self.write();
        let before = inner.peers.len();

        inner.peers.retain(|_, peer| {
            peer.messages.retain(|_, stamps| {
                stamps.retain(|t| *t > cutoff);
                !stamps.is_empty()
            });
            peer.groups.retain(|_, reported| *reported > cutoff);
            !peer.messages.is_empty()
        });

        before - inner.peers.len()
    }

    pub fn peer_count(&self) -> usize {
        self.read().peers.len()
    }

    pub fn router_count(&self) -> usize {
        self.read().routers.len()
    }
}
