//! ICMPv6 Neighbor Discovery (RFC 4861) and Multicast Listener Discovery
//! (RFC 2710, RFC 3810) decoding.
//!
//! Every function here takes the raw ICMPv6 message, type byte first, and
//! degrades to `None` or an empty list on malformed input.

pub mod classify;
pub mod mld;
pub mod options;
pub mod ra;

use std::net::Ipv6Addr;

/// ICMPv6 message types
pub mod icmp_type {
    pub const MLD_QUERY: u8 = 130;
    pub const MLD_REPORT: u8 = 131;
    pub const MLD_DONE: u8 = 132;
    pub const ROUTER_SOLICITATION: u8 = 133;
    pub const ROUTER_ADVERTISEMENT: u8 = 134;
    pub const NEIGHBOR_SOLICITATION: u8 = 135;
    pub const NEIGHBOR_ADVERTISEMENT: u8 = 136;
    pub const REDIRECT: u8 = 137;
    pub const MLDV2_REPORT: u8 = 143;
    pub const DUPLICATE_ADDRESS_REQUEST: u8 = 157;
    pub const DUPLICATE_ADDRESS_CONFIRMATION: u8 = 158;
}

/// NDP option types
pub mod ndp_option {
    pub const SOURCE_LINK_LAYER_ADDR: u8 = 1;
    pub const TARGET_LINK_LAYER_ADDR: u8 = 2;
    pub const PREFIX_INFO: u8 = 3;
    pub const MTU: u8 = 5;
    pub const ROUTE_INFO: u8 = 24;
    pub const RDNSS: u8 = 25;
}

/// Read a 16-byte IPv6 address at `offset`, if the buffer holds one.
pub(crate) fn ipv6_at(buf: &[u8], offset: usize) -> Option<Ipv6Addr> {
    let bytes: [u8; 16] = buf.get(offset..offset.checked_add(16)?)?.try_into().ok()?;
    Some(Ipv6Addr::from(bytes))
}

pub(crate) fn u16_at(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes: [u8; 2] = buf.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
    Some(u16::from_be_bytes(bytes))
}

pub(crate) fn u32_at(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = buf.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

#[cfg(test)]
pub(crate) mod test_packets {
    //! Byte builders for hand-assembled ICMPv6 messages.

    use std::net::Ipv6Addr;

    pub fn addr(text: &str) -> Ipv6Addr {
        text.parse().unwrap()
    }

    /// NS (135) carrying a Source Link-Layer Address option
    pub fn neighbor_solicitation(target: Ipv6Addr, mac: [u8; 6]) -> Vec<u8> {
        let mut buf = vec![0u8; 32];
        buf[0] = 135;
        buf[8..24].copy_from_slice(&target.octets());
        buf[24] = 1;
        buf[25] = 1;
        buf[26..32].copy_from_slice(&mac);
        buf
    }

    /// NA (136) carrying a Target Link-Layer Address option
    pub fn neighbor_advertisement(target: Ipv6Addr, mac: [u8; 6]) -> Vec<u8> {
        let mut buf = vec![0u8; 32];
        buf[0] = 136;
        buf[4] = 0xe0;
        buf[8..24].copy_from_slice(&target.octets());
        buf[24] = 2;
        buf[25] = 1;
        buf[26..32].copy_from_slice(&mac);
        buf
    }

    /// RS (133) carrying a Source Link-Layer Address option
    pub fn router_solicitation(mac: [u8; 6]) -> Vec<u8> {
        let mut buf = vec![0u8; 16];
        buf[0] = 133;
        buf[8] = 1;
        buf[9] = 1;
        buf[10..16].copy_from_slice(&mac);
        buf
    }

    /// RA (134) header followed by an optional Source LLA and extra options
    pub fn router_advertisement(
        hop_limit: u8,
        managed: bool,
        other: bool,
        lifetime: u16,
        mac: Option<[u8; 6]>,
        options: &[Vec<u8>],
    ) -> Vec<u8> {
        let mut buf = vec![0u8; 16];
        buf[0] = 134;
        buf[4] = hop_limit;
        if managed {
            buf[5] |= 0x80;
        }
        if other {
            buf[5] |= 0x40;
        }
        buf[6..8].copy_from_slice(&lifetime.to_be_bytes());
        if let Some(mac) = mac {
            buf.extend_from_slice(&[1, 1]);
            buf.extend_from_slice(&mac);
        }
        for opt in options {
            buf.extend_from_slice(opt);
        }
        buf
    }

    pub fn prefix_info_option(
        prefix: Ipv6Addr,
        prefix_len: u8,
        on_link: bool,
        autonomous: bool,
        valid: u32,
        preferred: u32,
    ) -> Vec<u8> {
        let mut opt = vec![0u8; 32];
        opt[0] = 3;
        opt[1] = 4;
        opt[2] = prefix_len;
        if on_link {
            opt[3] |= 0x80;
        }
        if autonomous {
            opt[3] |= 0x40;
        }
        opt[4..8].copy_from_slice(&valid.to_be_bytes());
        opt[8..12].copy_from_slice(&preferred.to_be_bytes());
        opt[16..32].copy_from_slice(&prefix.octets());
        opt
    }

    pub fn mtu_option(mtu: u32) -> Vec<u8> {
        let mut opt = vec![0u8; 8];
        opt[0] = 5;
        opt[1] = 1;
        opt[4..8].copy_from_slice(&mtu.to_be_bytes());
        opt
    }

    pub fn rdnss_option(lifetime: u32, servers: &[Ipv6Addr]) -> Vec<u8> {
        let len = 8 + servers.len() * 16;
        let mut opt = vec![0u8; len];
        opt[0] = 25;
        opt[1] = (len / 8) as u8;
        opt[4..8].copy_from_slice(&lifetime.to_be_bytes());
        for (i, server) in servers.iter().enumerate() {
            opt[8 + i * 16..8 + (i + 1) * 16].copy_from_slice(&server.octets());
        }
        opt
    }

    /// Route Information option sized per RFC 4191 for the prefix length
    pub fn route_info_option(prefix: Ipv6Addr, prefix_len: u8, preference: u8, lifetime: u32) -> Vec<u8> {
        let size = match prefix_len {
            0 => 8,
            1..=64 => 16,
            _ => 24,
        };
        let mut opt = vec![0u8; size];
        opt[0] = 24;
        opt[1] = (size / 8) as u8;
        opt[2] = prefix_len;
        opt[3] = (preference & 0x03) << 3;
        opt[4..8].copy_from_slice(&lifetime.to_be_bytes());
        let copy_len = (size - 8).min(16);
        opt[8..8 + copy_len].copy_from_slice(&prefix.octets()[..copy_len]);
        opt
    }

    /// MLDv1 Report (131) or Done (132)
    pub fn mldv1(icmp_type: u8, group: Ipv6Addr) -> Vec<u8> {
        let mut buf = vec![0u8; 24];
        buf[0] = icmp_type;
        buf[8..24].copy_from_slice(&group.octets());
        buf
    }

    /// MLDv2 Report (143) with one source-less record per group
    pub fn mldv2_report(groups: &[Ipv6Addr]) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        buf[0] = 143;
        buf[6..8].copy_from_slice(&(groups.len() as u16).to_be_bytes());
        for group in groups {
            let mut record = vec![0u8; 20];
            record[0] = 4;
            record[4..20].copy_from_slice(&group.octets());
            buf.extend_from_slice(&record);
        }
        buf
    }
}
