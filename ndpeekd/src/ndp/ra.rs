use std::net::Ipv6Addr;
use std::time::Duration;
use chrono::Utc;
use shared::types::{PrefixInfo, RouteInfo, RoutePreference, RouterRecord};
use super::options::NdpOptions;
use super::{ipv6_at, ndp_option, u16_at, u32_at};

/// Fixed RA header: 4 bytes ICMPv6 header + 12 bytes of RA fields
const RA_HEADER_LEN: usize = 16;

/// Decode a Router Advertisement into a fresh `RouterRecord`.
///
/// Header layout after the 4-byte ICMPv6 header:
///   byte 4     Cur Hop Limit
///   byte 5     flags, bit 7 = M (managed), bit 6 = O (other config)
///   bytes 6-7  Router Lifetime in seconds
///
/// A zero Cur Hop Limit falls back to `control_hop_limit` from the receive path.
/// Options after byte 16 are walked with the shared TLV rules; unknown ones are skipped.
pub fn parse_ra(
    buf: &[u8],
    source: &str,
    mac: Option<String>,
    control_hop_limit: Option<u8>,
    interface: Option<String>,
) -> Option<RouterRecord> {
    if buf.len() < RA_HEADER_LEN {
        return None;
    }

    let mut hop_limit = buf[4];
    if hop_limit == 0 {
        hop_limit = control_hop_limit.unwrap_or(0);
    }

    let mut record = RouterRecord {
        address: source.to_string(),
        mac,
        interface,
        hop_limit,
        managed: buf[5] & 0x80 != 0,
        other: buf[5] & 0x40 != 0,
        lifetime: Duration::from_secs(u16_at(buf, 6)?.into()),
        mtu: None,
        prefixes: Vec::new(),
        rdnss: Vec::new(),
        routes: Vec::new(),
        last_seen: Utc::now(),
    };

    for opt in NdpOptions::new(buf, RA_HEADER_LEN) {
        match opt.kind {
            ndp_option::PREFIX_INFO if opt.data.len() >= 32 => {
                if let Some(prefix) = parse_prefix_info(opt.data) {
                    record.prefixes.push(prefix);
                }
            }
            ndp_option::MTU if opt.data.len() >= 8 => {
                record.mtu = u32_at(opt.data, 4);
            }
            ndp_option::ROUTE_INFO if opt.data.len() >= 8 => {
                if let Some(route) = parse_route_info(opt.data) {
                    record.routes.push(route);
                }
            }
            ndp_option::RDNSS if opt.data.len() >= 24 => {
                record.rdnss.extend(parse_rdnss(opt.data));
            }
            _ => {}
        }
    }

    Some(record)
}

/// Prefix Information (type 3, 32 bytes)
///
///   byte 2       prefix length
///   byte 3       bit 7 = L (on-link), bit 6 = A (autonomous / SLAAC)
///   bytes 4-7    valid lifetime
///   bytes 8-11   preferred lifetime
///   bytes 16-31  prefix
fn parse_prefix_info(opt: &[u8]) -> Option<PrefixInfo> {
    let prefix_length = opt[2];
    let prefix = ipv6_at(opt, 16)?;

    Some(PrefixInfo {
        prefix: format!("{}/{}", prefix, prefix_length),
        prefix_length,
        valid_lifetime: Duration::from_secs(u32_at(opt, 4)?.into()),
        preferred_lifetime: Duration::from_secs(u32_at(opt, 8)?.into()),
        on_link: opt[3] & 0x80 != 0,
        autonomous: opt[3] & 0x40 != 0,
    })
}

/// Route Information (type 24, RFC 4191)
///
///   byte 2      prefix length
///   byte 3      bits 4-3 = Prf
///   bytes 4-7   route lifetime
///   bytes 8..   prefix, only as many bytes as the option carries (0, 8 or 16)
fn parse_route_info(opt: &[u8]) -> Option<RouteInfo> {
    let prefix_length = opt[2];
    let preference = RoutePreference::from_bits(opt[3] >> 3);
    let lifetime = Duration::from_secs(u32_at(opt, 4)?.into());

    let mut octets = [0u8; 16];
    let carried = &opt[8..opt.len().min(24)];
    octets[..carried.len()].copy_from_slice(carried);
    let prefix = Ipv6Addr::from(octets);

    Some(RouteInfo {
        prefix: format!("{}/{}", prefix, prefix_length),
        prefix_length,
        preference,
        lifetime,
    })
}

/// Recursive DNS Server (type 25, RFC 6106)
///
/// bytes 4-7 hold the lifetime, which is not kept; each 16-byte block from
/// byte 8 on is one server address.
fn parse_rdnss(opt: &[u8]) -> Vec<String> {
    opt[8..]
        .chunks_exact(16)
        .filter_map(|chunk| ipv6_at(chunk, 0))
        .map(|server| server.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndp::test_packets::*;

    #[test]
    fn test_parse_basic_fields() {
        let buf = router_advertisement(64, true, true, 1800, Some([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]), &[]);

        let ra = parse_ra(&buf, "fe80::1", Some("aa:bb:cc:dd:ee:01".to_string()), Some(255), Some("en0".to_string()))
            .expect("valid RA should parse");

        assert_eq!(ra.address, "fe80::1");
        assert_eq!(ra.mac.as_deref(), Some("aa:bb:cc:dd:ee:01"));
        assert_eq!(ra.hop_limit, 64, "header hop limit wins over control metadata");
        assert!(ra.managed);
        assert!(ra.other);
        assert_eq!(ra.lifetime, Duration::from_secs(1800));
        assert_eq!(ra.interface.as_deref(), Some("en0"));
    }

    #[test]
    fn test_zero_hop_limit_falls_back_to_control() {
        let buf = router_advertisement(0, false, false, 0, None, &[]);

        let ra = parse_ra(&buf, "fe80::1", None, Some(255), None).unwrap();
        assert_eq!(ra.hop_limit, 255);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.hop_limit, 0);
    }

    #[test]
    fn test_parse_prefix_info() {
        let opt = prefix_info_option(addr("2001:db8::"), 64, true, true, 86400, 14400);
        let buf = router_advertisement(64, false, false, 1800, None, &[opt]);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.prefixes.len(), 1);

        let prefix = &ra.prefixes[0];
        assert_eq!(prefix.prefix, "2001:db8::/64");
        assert_eq!(prefix.prefix_length, 64);
        assert!(prefix.on_link);
        assert!(prefix.autonomous);
        assert_eq!(prefix.valid_lifetime, Duration::from_secs(86400));
        assert_eq!(prefix.preferred_lifetime, Duration::from_secs(14400));
    }

    #[test]
    fn test_repeated_prefixes_append() {
        let first = prefix_info_option(addr("2001:db8::"), 64, true, false, 10, 5);
        let second = prefix_info_option(addr("2001:db8::"), 64, true, false, 10, 5);
        let buf = router_advertisement(64, false, false, 1800, None, &[first, second]);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.prefixes.len(), 2, "prefixes are not de-duplicated");
        assert!(!ra.prefixes[0].autonomous);
    }

    #[test]
    fn test_parse_mtu_last_wins() {
        let buf = router_advertisement(64, false, false, 1800, None, &[mtu_option(9000), mtu_option(1280)]);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.mtu, Some(1280));
    }

    #[test]
    fn test_parse_rdnss() {
        let opt = rdnss_option(3600, &[addr("2001:db8::53"), addr("2001:db8::54")]);
        let buf = router_advertisement(64, false, false, 1800, None, &[opt]);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.rdnss, vec!["2001:db8::53".to_string(), "2001:db8::54".to_string()]);
    }

    #[test]
    fn test_rdnss_without_servers_is_ignored() {
        // length 1 (8 bytes) is below the RFC 6106 minimum of 24
        let mut opt = rdnss_option(3600, &[]);
        opt[1] = 1;
        let buf = router_advertisement(64, false, false, 1800, None, &[opt]);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert!(ra.rdnss.is_empty());
    }

    #[test]
    fn test_parse_route_info() {
        let opt = route_info_option(addr("2001:db8:1::"), 48, 1, 7200);
        let buf = router_advertisement(64, false, false, 1800, None, &[opt]);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.routes.len(), 1);

        let route = &ra.routes[0];
        assert_eq!(route.prefix, "2001:db8:1::/48");
        assert_eq!(route.prefix_length, 48);
        assert_eq!(route.preference, RoutePreference::High);
        assert_eq!(route.lifetime, Duration::from_secs(7200));
    }

    #[test]
    fn test_route_info_short_prefix_is_zero_padded() {
        // prefix length 0 carries no prefix bytes at all
        let opt = route_info_option(addr("2001:db8::"), 0, 3, 60);
        assert_eq!(opt.len(), 8);
        let buf = router_advertisement(64, false, false, 1800, None, &[opt]);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.routes[0].prefix, "::/0");
        assert_eq!(ra.routes[0].preference, RoutePreference::Low);
    }

    #[test]
    fn test_route_info_reserved_preference_passes_through() {
        let opt = route_info_option(addr("2001:db8:2::"), 64, 2, 60);
        let buf = router_advertisement(64, false, false, 1800, None, &[opt]);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.routes[0].preference, RoutePreference::Reserved);
    }

    #[test]
    fn test_parse_all_options() {
        let options = [
            prefix_info_option(addr("2001:db8::"), 64, true, true, 86400, 14400),
            mtu_option(1500),
            rdnss_option(3600, &[addr("2001:db8::53")]),
            route_info_option(addr("2001:db8:1::"), 48, 0, 3600),
            // unknown option type between known ones
            vec![200, 1, 0, 0, 0, 0, 0, 0],
        ];
        let buf = router_advertisement(64, true, true, 1800, Some([2, 0x42, 0xac, 0x11, 0, 1]), &options);

        let ra = parse_ra(&buf, "fe80::1", Some("02:42:ac:11:00:01".to_string()), Some(255), None).unwrap();
        assert_eq!(ra.hop_limit, 64);
        assert!(ra.managed && ra.other);
        assert_eq!(ra.lifetime, Duration::from_secs(1800));
        assert_eq!(ra.prefixes.len(), 1);
        assert_eq!(ra.mtu, Some(1500));
        assert_eq!(ra.rdnss.len(), 1);
        assert_eq!(ra.routes.len(), 1);
        assert_eq!(ra.routes[0].preference, RoutePreference::Medium);
    }

    #[test]
    fn test_truncated_option_keeps_earlier_ones() {
        let mut buf = router_advertisement(64, false, false, 1800, None, &[mtu_option(1500)]);
        // prefix option header claiming 32 bytes with only 8 present
        buf.extend_from_slice(&[3, 4, 64, 0xc0, 0, 0, 0, 0]);

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.mtu, Some(1500));
        assert!(ra.prefixes.is_empty());
    }

    #[test]
    fn test_too_short() {
        assert!(parse_ra(&[134, 0, 0, 0], "fe80::1", None, None, None).is_none());
        assert!(parse_ra(&[], "fe80::1", None, None, None).is_none());
    }

    #[test]
    fn test_minimal_zeroed_header() {
        let mut buf = vec![0u8; 16];
        buf[0] = 134;

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.hop_limit, 0);
        assert!(!ra.managed);
        assert!(!ra.other);
        assert_eq!(ra.lifetime, Duration::ZERO);
        assert_eq!(ra.mtu, None);
        assert!(ra.prefixes.is_empty());
        assert!(ra.routes.is_empty());
        assert!(ra.rdnss.is_empty());
    }

    #[test]
    fn test_header_only_flags_and_lifetime() {
        let mut buf = vec![0u8; 16];
        buf[0] = 134;
        buf[4] = 128;
        buf[5] = 0xc0;
        buf[6..8].copy_from_slice(&600u16.to_be_bytes());

        let ra = parse_ra(&buf, "fe80::1", None, None, None).unwrap();
        assert_eq!(ra.hop_limit, 128);
        assert!(ra.managed && ra.other);
        assert_eq!(ra.lifetime, Duration::from_secs(600));
    }
}
