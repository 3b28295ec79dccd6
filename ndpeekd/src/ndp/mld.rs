use std::net::Ipv6Addr;
use super::{icmp_type, ipv6_at, u16_at};

/// MLDv1 message: 4 header + 2 max delay + 2 reserved + 16 group
const MLDV1_LEN: usize = 24;

/// MLDv2 report header: 4 header + 2 reserved + 2 record count
const MLDV2_HEADER_LEN: usize = 8;

/// Multicast Address Record fixed part: type, aux len, source count, group
const MLDV2_RECORD_LEN: usize = 20;

/// Extract the multicast groups named by an MLD report or done message.
///
/// MLDv1 (131, 132) carries a single group at bytes 8-23. MLDv2 reports (143)
/// carry a record count at bytes 6-7 followed by variable-length records:
///
///   byte 0      record type
///   byte 1      aux data length, in 32-bit words
///   bytes 2-3   number of sources
///   bytes 4-19  multicast group
///   then sources (16 bytes each) and aux data
///
/// A record that runs past the buffer ends the walk; groups already read are kept.
/// The unspecified address `::` is never reported as a group.
pub fn extract_mld_groups(buf: &[u8]) -> Vec<String> {
    if buf.len() < 4 {
        return Vec::new();
    }

    match buf[0] {
        icmp_type::MLD_REPORT | icmp_type::MLD_DONE => extract_v1(buf),
        icmp_type::MLDV2_REPORT => extract_v2(buf),
        _ => Vec::new(),
    }
}

fn extract_v1(buf: &[u8]) -> Vec<String> {
    if buf.len() < MLDV1_LEN {
        return Vec::new();
    }
    ipv6_at(buf, 8)
        .filter(|group| !group.is_unspecified())
        .map(|group| vec![group.to_string()])
        .unwrap_or_default()
}

fn extract_v2(buf: &[u8]) -> Vec<String> {
    let Some(count) = u16_at(buf, 6) else {
        return Vec::new();
    };

    let mut groups = Vec::new();
    let mut offset = MLDV2_HEADER_LEN;

    for _ in 0..count {
        if offset + MLDV2_RECORD_LEN > buf.len() {
            break;
        }
        let aux_words = buf[offset + 1] as usize;
        let sources = u16_at(buf, offset + 2).unwrap_or(0) as usize;

        if let Some(group) = ipv6_at(buf, offset + 4).filter(|g| !Ipv6Addr::is_unspecified(g)) {
            groups.push(group.to_string());
        }

        offset += MLDV2_RECORD_LEN + sources * 16 + aux_words * 4;
    }

    groups
}
