use shared::types::MessageKind;
use crate::ndp::{classify::classify, mld::extract_mld_groups, ndp_option, options::extract_link_layer, ra::parse_ra};
use crate::stats::NdpStats;

/// One received ICMPv6 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// ICMPv6 message, type byte first
    pub bytes: Vec<u8>,
    /// Canonical sender address without zone
    pub source: String,
    /// IPv6 hop limit from receive-side control data, when available
    pub hop_limit: Option<u8>,
    pub interface: Option<String>,
}

/// Feed one datagram into the store. Returns the kind it was recorded as,
/// or `None` if it was dropped.
pub fn ingest(stats: &NdpStats, datagram: &Datagram) -> Option<MessageKind> {
    let kind = classify(*datagram.bytes.first()?)?;
    let source = datagram.source.as_str();

    stats.record_message(source, kind);

    if let Some(hop_limit) = datagram.hop_limit {
        stats.record_hop_limit(source, hop_limit);
    }
    if let Some(interface) = &datagram.interface {
        stats.record_interface(source, interface);
    }

    let mac = match kind {
        MessageKind::RouterSolicitation
        | MessageKind::RouterAdvertisement
        | MessageKind::NeighborSolicitation => {
            extract_link_layer(&datagram.bytes, ndp_option::SOURCE_LINK_LAYER_ADDR)
        }
        MessageKind::NeighborAdvertisement => {
            extract_link_layer(&datagram.bytes, ndp_option::TARGET_LINK_LAYER_ADDR)
        }
        _ => None,
    };
    if let Some(mac) = &mac {
        stats.record_mac(source, mac);
    }

    match kind {
        MessageKind::RouterAdvertisement => {
            if let Some(router) = parse_ra(
                &datagram.bytes,
                source,
                mac,
                datagram.hop_limit,
                datagram.interface.clone(),
            ) {
                stats.record_router(router);
            }
        }
        MessageKind::MldReport | MessageKind::MldDone => {
            for group in extract_mld_groups(&datagram.bytes) {
                stats.record_mld_membership(source, &group);
            }
        }
        _ => {}
    }

    Some(kind)
}
