//! Compile-time table sizes and shared numeric constants.

/// Size of the filter table. The DP stops scanning at the first slot whose
/// `enabled` flag is unset, so this is a hard upper bound on scan length,
/// not a count of rules actually in effect.
pub const MAX_FILTERS: u32 = 128;

/// Capacity of the LRU-bounded block and per-source-statistics tables.
pub const MAX_TRACK_IPS: u32 = 100_000;

/// Capacity of the IPv4 CIDR range-drop LPM trie.
pub const MAX_IP_RANGES: u32 = 1_024;

/// Capacity of the filter-match event ring buffer, in bytes.
pub const FILTER_LOG_RINGBUF_BYTES: u32 = 1 << 16;

/// Width of the `IpStats` sliding window, in nanoseconds.
pub const STATS_WINDOW_NS: u64 = 1_000_000_000;

/// Multiplier to convert a `block_time` given in whole seconds into the
/// nanosecond units `bpf_ktime_get_ns()` deadlines are expressed in.
pub const NANO_TO_SEC: u64 = 1_000_000_000;

/// L4 protocol numbers as they appear in the IPv4/IPv6 header.
pub mod ip_proto {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const ICMPV6: u8 = 58;
}

/// TCP flag bits, matching the byte at the `data_offset/reserved/flags`
/// position of the TCP header.
pub mod tcp_flags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
    pub const ECE: u8 = 0x40;
    pub const CWR: u8 = 0x80;
}

/// Filter `action` values.
pub mod action {
    pub const DROP: u8 = 0;
    pub const PASS: u8 = 1;
}
