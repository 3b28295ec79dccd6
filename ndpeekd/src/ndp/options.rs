use super::icmp_type;

/// Byte offset where the NDP option chain begins for a message type.
///
///   RS  (133): 4 header + 4 reserved                 = 8
///   RA  (134): 4 header + 12 fixed fields             = 16
///   NS  (135): 4 header + 4 reserved + 16 target      = 24
///   NA  (136): 4 header + 4 flags + 16 target         = 24
///   Rdr (137): 4 header + 4 reserved + 16 + 16        = 40
pub fn options_start_offset(icmp_type: u8) -> Option<usize> {
    match icmp_type {
        icmp_type::ROUTER_SOLICITATION => Some(8),
        icmp_type::ROUTER_ADVERTISEMENT => Some(16),
        icmp_type::NEIGHBOR_SOLICITATION | icmp_type::NEIGHBOR_ADVERTISEMENT => Some(24),
        icmp_type::REDIRECT => Some(40),
        _ => None,
    }
}

/// One TLV option. `data` spans the whole option, type and length bytes included.
#[derive(Debug, Clone, Copy)]
pub struct NdpOption<'a> {
    pub kind: u8,
    pub data: &'a [u8],
}

/// Walks an NDP option chain.
///
/// Stops at a zero length field (which would never advance) and at an option
/// that claims to run past the end of the buffer. Options yielded before that
/// point remain valid.
pub struct NdpOptions<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> NdpOptions<'a> {
    pub fn new(buf: &'a [u8], start: usize) -> Self {
        Self { buf, offset: start }
    }

    fn stop(&mut self) -> Option<NdpOption<'a>> {
        self.offset = self.buf.len();
        None
    }
}

impl<'a> Iterator for NdpOptions<'a> {
    type Item = NdpOption<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let header = self.buf.get(self.offset..self.offset.saturating_add(2))?;
        let kind = header[0];
        let len = header[1] as usize * 8;

        if len == 0 {
            return self.stop();
        }
        let end = self.offset + len;
        if end > self.buf.len() {
            return self.stop();
        }

        let data = &self.buf[self.offset..end];
        self.offset = end;
        Some(NdpOption { kind, data })
    }
}

/// Find a link-layer address option and format its MAC.
///
/// `wanted` is 1 (Source Link-Layer Address) or 2 (Target Link-Layer Address).
/// `buf` is the full ICMPv6 message; its type byte selects where options start.
pub fn extract_link_layer(buf: &[u8], wanted: u8) -> Option<String> {
    let start = options_start_offset(*buf.first()?)?;
    if buf.len() < start {
        return None;
    }

    NdpOptions::new(buf, start)
        .find(|opt| opt.kind == wanted && opt.data.len() >= 8)
        .map(|opt| format_mac(&opt.data[2..8]))
}

/// Colon-separated lowercase hex, e.g. "aa:bb:cc:dd:ee:01"
pub fn format_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
