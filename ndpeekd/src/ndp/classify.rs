use shared::types::MessageKind;
use super::icmp_type;

/// Map an ICMPv6 type code to the message kind it represents.
///
/// Both MLDv1 (131) and MLDv2 (143) reports collapse to `MldReport`.
/// Anything that is neither NDP nor MLD (echo, errors, ...) yields `None`.
pub fn classify(icmp_type: u8) -> Option<MessageKind> {
    let kind = match icmp_type {
        icmp_type::ROUTER_SOLICITATION => MessageKind::RouterSolicitation,
        icmp_type::ROUTER_ADVERTISEMENT => MessageKind::RouterAdvertisement,
        icmp_type::NEIGHBOR_SOLICITATION => MessageKind::NeighborSolicitation,
        icmp_type::NEIGHBOR_ADVERTISEMENT => MessageKind::NeighborAdvertisement,
        icmp_type::REDIRECT => MessageKind::Redirect,
        icmp_type::DUPLICATE_ADDRESS_REQUEST => MessageKind::DuplicateAddressRequest,
        icmp_type::DUPLICATE_ADDRESS_CONFIRMATION => MessageKind::DuplicateAddressConfirmation,
        icmp_type::MLD_QUERY => MessageKind::MldQuery,
        icmp_type::MLD_REPORT | icmp_type::MLDV2_REPORT => MessageKind::MldReport,
        icmp_type::MLD_DONE => MessageKind::MldDone,
        _ => return None,
    };
    Some(kind)
}
