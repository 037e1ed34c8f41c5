//! Pure predicate and statistics-window logic shared by the DP's filter
//! scan. Kept free of any BPF-specific types so it compiles and is
//! unit-testable under plain `std`, and is called unchanged from the real
//! `#[xdp]` entry point in `xdpfw-ebpf`.

use crate::config::FirewallConfig;
use crate::limits::STATS_WINDOW_NS;
use crate::packet::{L4Proto, ParsedPacket};
use crate::types::{Filter, IpStats};

/// Advance a source's sliding statistics window by one packet of `len`
/// bytes observed at `now_ns`, returning the PPS/BPS values visible to
/// filter evaluation.
///
/// The values returned are always the **most recently completed** window's
/// totals, never the in-progress accumulator — a burst can only affect
/// filter decisions starting with the *next* window after it's published,
/// which bounds the window's observation lag to one second.
pub fn update_window(stats: &mut IpStats, now_ns: u64, len: u32) -> (u64, u64) {
    let elapsed = now_ns.saturating_sub(stats.window_start_ns);
    if stats.window_start_ns == 0 || elapsed > STATS_WINDOW_NS {
        stats.pps = stats.pkt_accum;
        stats.bps = stats.byte_accum;
        stats.window_start_ns = now_ns;
        stats.pkt_accum = 1;
        stats.byte_accum = u64::from(len);
    } else {
        stats.pkt_accum += 1;
        stats.byte_accum += u64::from(len);
    }
    (stats.pps, stats.bps)
}

fn ipv4_matches(observed: u32, wanted: u32, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    if prefix_len >= 32 {
        return observed == wanted;
    }
    let mask = u32::MAX << (32 - prefix_len as u32);
    (observed & mask) == (wanted & mask)
}

fn exclusivity_skips(filter: &Filter, pkt: &ParsedPacket, cfg: &FirewallConfig) -> bool {
    if !cfg.allow_single_ip_v4_v6 {
        return false;
    }
    let has_v4 = filter.do_src_ip4 != 0 || filter.do_dst_ip4 != 0;
    let has_v6 = filter.do_src_ip6 != 0 || filter.do_dst_ip6 != 0;
    (has_v4 && pkt.is_ipv6) || (has_v6 && !pkt.is_ipv6)
}

fn passes_address(filter: &Filter, pkt: &ParsedPacket) -> bool {
    if !pkt.is_ipv6 {
        if filter.do_src_ip4 != 0 && !ipv4_matches(pkt.src_ip4, filter.src_ip4, filter.src_cidr4) {
            return false;
        }
        if filter.do_dst_ip4 != 0 && !ipv4_matches(pkt.dst_ip4, filter.dst_ip4, filter.dst_cidr4) {
            return false;
        }
    } else {
        if filter.do_src_ip6 != 0 && filter.src_ip6 != pkt.src_ip6 {
            return false;
        }
        if filter.do_dst_ip6 != 0 && filter.dst_ip6 != pkt.dst_ip6 {
            return false;
        }
    }
    true
}

fn passes_tos_ttl_len(filter: &Filter, pkt: &ParsedPacket) -> bool {
    if !pkt.is_ipv6 && filter.do_tos != 0 && pkt.tos != filter.tos {
        return false;
    }
    if filter.do_min_ttl != 0 && pkt.ttl < filter.min_ttl {
        return false;
    }
    if filter.do_max_ttl != 0 && pkt.ttl > filter.max_ttl {
        return false;
    }
    if filter.do_min_len != 0 && pkt.total_len < filter.min_len {
        return false;
    }
    if filter.do_max_len != 0 && pkt.total_len > filter.max_len {
        return false;
    }
    true
}

fn passes_rate(filter: &Filter, pps: u64, bps: u64) -> bool {
    if filter.do_pps != 0 && pps < filter.pps {
        return false;
    }
    if filter.do_bps != 0 && bps < filter.bps {
        return false;
    }
    true
}

fn passes_l4(filter: &Filter, pkt: &ParsedPacket) -> bool {
    match filter.l4_proto {
        0 => true,
        1 => {
            if pkt.l4_proto != L4Proto::Tcp {
                return false;
            }
            let f = &filter.tcp;
            if f.do_src_port != 0 && pkt.src_port != f.src_port {
                return false;
            }
            if f.do_dst_port != 0 && pkt.dst_port != f.dst_port {
                return false;
            }
            f.flags_mask == 0 || (pkt.tcp_flags & f.flags_mask) == f.flags_value
        }
        2 => {
            if pkt.l4_proto != L4Proto::Udp {
                return false;
            }
            let f = &filter.udp;
            if f.do_src_port != 0 && pkt.src_port != f.src_port {
                return false;
            }
            f.do_dst_port == 0 || pkt.dst_port == f.dst_port
        }
        3 => {
            if pkt.l4_proto != L4Proto::Icmp {
                return false;
            }
            let f = &filter.icmp;
            if f.do_type != 0 && pkt.icmp_type != f.icmp_type {
                return false;
            }
            f.do_code == 0 || pkt.icmp_code == f.code
        }
        _ => true,
    }
}

/// Evaluate every configured predicate on `filter` against `pkt` in
/// short-circuit AND, given the already-computed rate-window values for
/// this source and the active runtime feature toggles.
///
/// Does not consult `filter.enabled`; the caller's scan loop is responsible
/// for stopping at the first disabled slot (see SPEC_FULL.md §4.1) so this
/// function can be called from a plain `for` loop in tests without needing
/// a full filter table.
pub fn filter_matches(filter: &Filter, pkt: &ParsedPacket, pps: u64, bps: u64, cfg: &FirewallConfig) -> bool {
    if exclusivity_skips(filter, pkt, cfg) {
        return false;
    }
    passes_address(filter, pkt)
        && passes_tos_ttl_len(filter, pkt)
        && passes_rate(filter, pps, bps)
        && passes_l4(filter, pkt)
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::limits::{action, ip_proto, tcp_flags};

    fn base_filter() -> Filter {
        Filter { enabled: 1, action: action::DROP, ..Default::default() }
    }

    fn base_packet() -> ParsedPacket {
        ParsedPacket { is_ipv6: false, l4_proto: L4Proto::Tcp, ..Default::default() }
    }

    #[test]
    fn window_first_packet_publishes_zero_and_starts_accumulating() {
        let mut stats = IpStats::default();
        let (pps, bps) = update_window(&mut stats, 1_000, 100);
        assert_eq!((pps, bps), (0, 0));
        assert_eq!(stats.pkt_accum, 1);
        assert_eq!(stats.byte_accum, 100);
    }

    #[test]
    fn window_within_one_second_accumulates_without_publishing() {
        let mut stats = IpStats::default();
        update_window(&mut stats, 1_000, 100);
        let (pps, bps) = update_window(&mut stats, 500_000_000, 200);
        assert_eq!((pps, bps), (0, 0));
        assert_eq!(stats.pkt_accum, 2);
        assert_eq!(stats.byte_accum, 300);
    }

    #[test]
    fn window_past_one_second_publishes_prior_totals() {
        let mut stats = IpStats::default();
        update_window(&mut stats, 1_000, 100);
        update_window(&mut stats, 500_000_000, 100);
        let (pps, bps) = update_window(&mut stats, 1_500_000_001, 50);
        assert_eq!((pps, bps), (2, 200));
        assert_eq!(stats.pkt_accum, 1);
        assert_eq!(stats.byte_accum, 50);
    }

    #[test]
    fn tcp_syn_filter_matches_syn_only_packet() {
        let mut filter = base_filter();
        filter.do_src_ip4 = 1;
        filter.src_ip4 = 0x0A000001; // 10.0.0.1
        filter.src_cidr4 = 32;
        filter.l4_proto = 1;
        filter.tcp.flags_mask = tcp_flags::SYN;
        filter.tcp.flags_value = tcp_flags::SYN;
        filter.block_time = 5;

        let mut pkt = base_packet();
        pkt.src_ip4 = 0x0A000001;
        pkt.tcp_flags = tcp_flags::SYN;

        let cfg = FirewallConfig::default();
        assert!(filter_matches(&filter, &pkt, 0, 0, &cfg));

        pkt.tcp_flags = tcp_flags::ACK;
        assert!(!filter_matches(&filter, &pkt, 0, 0, &cfg));

        pkt.tcp_flags = tcp_flags::SYN;
        pkt.src_ip4 = 0x0A000002; // 10.0.0.2
        assert!(!filter_matches(&filter, &pkt, 0, 0, &cfg));
    }

    #[test]
    fn pps_threshold_is_a_trigger_not_a_limiter() {
        let mut filter = base_filter();
        filter.do_pps = 1;
        filter.pps = 1000;
        filter.l4_proto = 0;

        let pkt = base_packet();
        let cfg = FirewallConfig::default();
        assert!(!filter_matches(&filter, &pkt, 500, 0, &cfg));
        assert!(filter_matches(&filter, &pkt, 2000, 0, &cfg));
    }

    #[test]
    fn ipv4_ipv6_exclusivity_skips_mismatched_family() {
        let mut filter = base_filter();
        filter.do_src_ip6 = 1;
        filter.src_ip6 = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        filter.l4_proto = 0;

        let mut pkt = base_packet();
        pkt.is_ipv6 = false;
        pkt.src_ip4 = 0;

        let mut cfg = FirewallConfig::default();
        cfg.allow_single_ip_v4_v6 = true;
        assert!(!filter_matches(&filter, &pkt, 0, 0, &cfg));

        cfg.allow_single_ip_v4_v6 = false;
        // Without exclusivity the address predicate itself still applies
        // per-family; an IPv4 packet never satisfies a v6-only address
        // constraint because `passes_address` only checks v6 fields when
        // `pkt.is_ipv6` is true, so a v6 filter against a v4 packet simply
        // has no address constraint applied — it matches on everything
        // else it configures.
        pkt.is_ipv6 = true;
        pkt.src_ip6 = filter.src_ip6;
        assert!(filter_matches(&filter, &pkt, 0, 0, &cfg));
    }

    #[test]
    fn inclusive_min_max_length_thresholds() {
        let mut filter = base_filter();
        filter.do_min_len = 1;
        filter.min_len = 64;
        filter.do_max_len = 1;
        filter.max_len = 1500;
        filter.l4_proto = 0;

        let cfg = FirewallConfig::default();
        let mut pkt = base_packet();
        pkt.total_len = 64;
        assert!(filter_matches(&filter, &pkt, 0, 0, &cfg));
        pkt.total_len = 1500;
        assert!(filter_matches(&filter, &pkt, 0, 0, &cfg));
        pkt.total_len = 63;
        assert!(!filter_matches(&filter, &pkt, 0, 0, &cfg));
        pkt.total_len = 1501;
        assert!(!filter_matches(&filter, &pkt, 0, 0, &cfg));
    }

    #[test]
    fn icmp_subfilter_requires_icmp_protocol() {
        let mut filter = base_filter();
        filter.l4_proto = 3;
        filter.icmp.do_type = 1;
        filter.icmp.icmp_type = ip_proto::ICMP; // arbitrary nonzero type for the test

        let cfg = FirewallConfig::default();
        let mut pkt = base_packet();
        pkt.l4_proto = L4Proto::Tcp;
        assert!(!filter_matches(&filter, &pkt, 0, 0, &cfg));

        pkt.l4_proto = L4Proto::Icmp;
        pkt.icmp_type = ip_proto::ICMP;
        assert!(filter_matches(&filter, &pkt, 0, 0, &cfg));
    }
}
