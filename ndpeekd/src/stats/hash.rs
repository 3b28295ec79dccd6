use std::time::Duration;
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared::types::{MessageKind, PeerSummary, PrefixInfo, RouteInfo, RouterRecord};

/// Hash only inventory fields. Counts and timestamps move on every packet and
/// would make the hash change continuously.
#[derive(Serialize)]
struct PeerView<'a> {
    address: &'a str,
    mac: Option<&'a str>,
    kinds: Vec<MessageKind>,
    groups: &'a [String],
}

#[derive(Serialize)]
struct RouterView<'a> {
    address: &'a str,
    mac: Option<&'a str>,
    interface: Option<&'a str>,
    hop_limit: u8,
    managed: bool,
    other: bool,
    #[serde(with = "shared::types::duration_secs")]
    lifetime: Duration,
    mtu: Option<u32>,
    prefixes: &'a [PrefixInfo],
    rdnss: &'a [String],
    routes: &'a [RouteInfo],
}

#[derive(Serialize)]
struct InventoryView<'a> {
    peers: Vec<PeerView<'a>>,
    routers: Vec<RouterView<'a>>,
}

/// SHA-256 over the stable part of the peer and router inventory, hex encoded.
/// Both lists are sorted by address first, so input order does not matter.
pub fn compute_hash(peers: &[PeerSummary], routers: &[RouterRecord]) -> Result<String> {
    let mut peer_views: Vec<PeerView<'_>> = peers
        .iter()
        .map(|p| PeerView {
            address: &p.address,
            mac: p.mac.as_deref(),
            kinds: p
                .counts
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(kind, _)| *kind)
                .collect(),
            groups: &p.groups,
        })
        .collect();
    peer_views.sort_by(|a, b| a.address.cmp(b.address));

    let mut router_views: Vec<RouterView<'_>> = routers
        .iter()
        .map(|r| RouterView {
            address: &r.address,
            mac: r.mac.as_deref(),
            interface: r.interface.as_deref(),
            hop_limit: r.hop_limit,
            managed: r.managed,
            other: r.other,
            lifetime: r.lifetime,
            mtu: r.mtu,
            prefixes: &r.prefixes,
            rdnss: &r.rdnss,
            routes: &r.routes,
        })
        .collect();
    router_views.sort_by(|a, b| a.address.cmp(b.address));

    let json = serde_json::to_string(&InventoryView { peers: peer_views, routers: router_views })
        .context("Failed to serialize inventory for hashing")?;

    Ok(hex::encode(Sha256::digest(json.as_bytes())))
}
