//! Fixed-layout types written directly into BPF map value slots.
//!
//! Field order favors natural alignment (widest fields first) over source
//! read order, the same way `SynRawData` is laid out in
//! `huginn-proxy-ebpf-xdp`; there's no padding-sensitive wire compatibility
//! to preserve here beyond "kernel and userspace agree," so explicit
//! `_pad` fields are used only where a hole would otherwise be implicit and
//! worth naming.

/// TCP sub-filter: matches ports and a required subset of flag bits.
///
/// Exactly one of [`TcpSubFilter`], [`UdpSubFilter`] or [`IcmpSubFilter`] is
/// active per [`Filter`], selected by `Filter::l4_proto`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TcpSubFilter {
    pub do_src_port: u8,
    pub do_dst_port: u8,
    /// Bitmask of flag bits this filter cares about (subset of FIN/SYN/
    /// RST/PSH/ACK/URG/ECE/CWR).
    pub flags_mask: u8,
    /// Required value for each bit selected by `flags_mask`.
    pub flags_value: u8,
    /// Network byte order.
    pub src_port: u16,
    /// Network byte order.
    pub dst_port: u16,
}

/// UDP sub-filter: matches source and/or destination port.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UdpSubFilter {
    pub do_src_port: u8,
    pub do_dst_port: u8,
    pub _pad: [u8; 2],
    /// Network byte order.
    pub src_port: u16,
    /// Network byte order.
    pub dst_port: u16,
}

/// ICMP / ICMPv6 sub-filter: matches type and/or code.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IcmpSubFilter {
    pub do_code: u8,
    pub code: u8,
    pub do_type: u8,
    pub icmp_type: u8,
}

/// One rule in the ordered filter list. A slot with `enabled == 0`
/// terminates the DP's scan; no slot past it is read.
///
/// `min`/`max` fields are inclusive thresholds: a `do_max_*` flag requires
/// the observed value `<= max`, a `do_min_*` flag requires `>= min`. `pps`
/// and `bps`, when enabled, are rate *triggers*: the filter matches once the
/// observed window value is `>=` the configured threshold, not a limiter.
///
/// The length fields apply to IPv4 and IPv6 frames with different
/// definitions of "length" — see [`crate::packet::ParsedPacket::total_len`]
/// — this is an intentional, documented quirk inherited from the system
/// this firewall is modeled on, not a bug to silently normalize away.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    pub enabled: u8,
    /// 0 = drop, 1 = pass. See [`crate::limits::action`].
    pub action: u8,
    /// Nonzero: publish a `FilterLogEvent` on match, provided filter
    /// logging is enabled in [`FirewallConfig`].
    pub log: u8,
    /// 0 = none, 1 = TCP, 2 = UDP, 3 = ICMP/ICMPv6. Selects which of
    /// `tcp`/`udp`/`icmp` below is consulted.
    pub l4_proto: u8,

    /// Seconds to block the source for on a drop match. 0 = no block-table
    /// entry is installed (verdict is still DROP for this packet only).
    pub block_time: u32,

    pub do_src_ip4: u8,
    pub src_cidr4: u8,
    pub do_dst_ip4: u8,
    pub dst_cidr4: u8,
    /// Network byte order. 0 with `do_src_ip4` unset means "no constraint".
    pub src_ip4: u32,
    pub dst_ip4: u32,

    pub do_src_ip6: u8,
    pub do_dst_ip6: u8,
    pub _pad0: [u8; 2],
    pub src_ip6: [u8; 16],
    pub dst_ip6: [u8; 16],

    pub do_tos: u8,
    pub tos: u8,
    pub do_min_ttl: u8,
    pub min_ttl: u8,
    pub do_max_ttl: u8,
    pub max_ttl: u8,
    pub do_min_len: u8,
    pub do_max_len: u8,
    pub min_len: u16,
    pub max_len: u16,

    pub do_pps: u8,
    pub do_bps: u8,
    pub _pad1: [u8; 6],
    pub pps: u64,
    pub bps: u64,

    pub tcp: TcpSubFilter,
    pub udp: UdpSubFilter,
    pub icmp: IcmpSubFilter,
}

/// Per-source block-table value: an absolute `bpf_ktime_get_ns()` deadline.
/// `0` means permanent. Stored as a bare `u64` rather than a wrapper struct
/// so the block maps can use it as a BPF map value with no padding.
pub type BlockDeadline = u64;

/// Per-source (or, in a flow-granular build, per-5-tuple) sliding-window
/// packet/byte rate tracker. `pps`/`bps` are the most recently *published*
/// window values — see [`crate::classify::update_window`] — not the
/// in-progress accumulator.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IpStats {
    pub window_start_ns: u64,
    pub pkt_accum: u64,
    pub byte_accum: u64,
    pub pps: u64,
    pub bps: u64,
}

/// Per-CPU global counters. Aggregate reads must sum every CPU's slot.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlobalStats {
    pub passed: u64,
    pub dropped: u64,
    pub allowed: u64,
}

impl GlobalStats {
    pub fn merge(&mut self, other: &GlobalStats) {
        self.passed += other.passed;
        self.dropped += other.dropped;
        self.allowed += other.allowed;
    }
}

/// Record published to the filter-log ring buffer on a logged filter match.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterLogEvent {
    pub filter_id: u32,
    /// Network byte order; 0 if the packet was IPv6.
    pub src_ip4: u32,
    /// All-zero if the packet was IPv4.
    pub src_ip6: [u8; 16],
    pub src_port: u16,
    pub dst_port: u16,
    pub pps: u64,
    pub bps: u64,
}

#[cfg(feature = "aya-pod")]
mod pod_impls {
    use super::*;

    // SAFETY: every type here is `#[repr(C)]`, `Copy`, made only of
    // primitive integer fields or fixed-size arrays of them, and has no
    // padding-sensitive invariants — any bit pattern is valid.
    unsafe impl aya::Pod for Filter {}
    unsafe impl aya::Pod for IpStats {}
    unsafe impl aya::Pod for GlobalStats {}
    unsafe impl aya::Pod for FilterLogEvent {}
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use core::mem::size_of;

    #[test]
    fn filter_has_no_implicit_trailing_padding_beyond_u64_alignment() {
        assert_eq!(size_of::<Filter>() % 8, 0);
    }

    #[test]
    fn global_stats_merge_sums_fields() {
        let mut a = GlobalStats { passed: 1, dropped: 2, allowed: 3 };
        let b = GlobalStats { passed: 10, dropped: 20, allowed: 30 };
        a.merge(&b);
        assert_eq!(a, GlobalStats { passed: 11, dropped: 22, allowed: 33 });
    }
}
