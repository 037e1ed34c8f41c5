#![no_std]
#![no_main]

mod headers;

use aya_ebpf::{
    bindings::xdp_action,
    helpers::bpf_ktime_get_ns,
    macros::{map, xdp},
    maps::{lpm_trie::Key, LpmTrie, LruHashMap, PerCpuArray, RingBuf},
    programs::XdpContext,
};
use core::mem::size_of;

use headers::{EthHdr, IcmpHdr, Ipv4Hdr, Ipv6Hdr, TcpHdr, UdpHdr, ETH_P_IP, ETH_P_IPV6};
use xdpfw_common::{
    classify::{filter_matches, update_window},
    config::{map_names, FirewallConfig},
    limits::{action, ip_proto, MAX_FILTERS, MAX_IP_RANGES, MAX_TRACK_IPS, NANO_TO_SEC},
    packet::{L4Proto, ParsedPacket},
    types::{Filter, FilterLogEvent, GlobalStats, IpStats},
};

/// Runtime feature toggles, patched by the loader via `EbpfLoader::set_global`
/// before this object is loaded. Defaults here only matter if the loader is
/// skipped entirely (e.g. `bpftool prog load`), which is not a supported path.
#[no_mangle]
static ENABLE_FILTERS: bool = true;
#[no_mangle]
static ENABLE_FILTER_LOGGING: bool = false;
#[no_mangle]
static ENABLE_IP_RANGE_DROP: bool = false;
#[no_mangle]
static ALLOW_SINGLE_IP_V4_V6: bool = false;

#[map(name = "map_filters")]
static FILTERS: PerCpuArray<Filter> = PerCpuArray::with_max_entries(MAX_FILTERS, 0);

#[map(name = "map_stats")]
static GLOBAL_STATS: PerCpuArray<GlobalStats> = PerCpuArray::with_max_entries(1, 0);

#[map(name = "map_block")]
static BLOCK4: LruHashMap<u32, u64> = LruHashMap::with_max_entries(MAX_TRACK_IPS, 0);

#[map(name = "map_block6")]
static BLOCK6: LruHashMap<[u8; 16], u64> = LruHashMap::with_max_entries(MAX_TRACK_IPS, 0);

#[map(name = "map_ip_stats")]
static IP_STATS4: LruHashMap<u32, IpStats> = LruHashMap::with_max_entries(MAX_TRACK_IPS, 0);

#[map(name = "map_ip_stats6")]
static IP_STATS6: LruHashMap<[u8; 16], IpStats> = LruHashMap::with_max_entries(MAX_TRACK_IPS, 0);

#[map(name = "map_range_drop")]
static RANGE_DROP: LpmTrie<u32, u8> = LpmTrie::with_max_entries(MAX_IP_RANGES, 0);

#[map(name = "map_filter_log")]
static FILTER_LOG: RingBuf = RingBuf::with_byte_size(xdpfw_common::limits::FILTER_LOG_RINGBUF_BYTES, 0);

#[xdp]
pub fn xdpfw(ctx: XdpContext) -> u32 {
    try_xdpfw(ctx)
}

/// Bounds-checked read of a `T` at `offset` bytes into the frame. Every
/// caller treats `None` as an immediate DROP — the DP has no error channel,
/// and a failed bounds check on a malformed or truncated frame must never
/// fall through to PASS.
#[inline(always)]
unsafe fn ptr_at<T>(ctx: &XdpContext, offset: usize) -> Option<*const T> {
    let start = ctx.data();
    let end = ctx.data_end();
    let len = size_of::<T>();
    if start.checked_add(offset)?.checked_add(len)? > end {
        return None;
    }
    Some((start + offset) as *const T)
}

#[inline(always)]
fn bump_stats(f: impl FnOnce(&mut GlobalStats)) {
    if let Some(ptr) = unsafe { GLOBAL_STATS.get_ptr_mut(0) } {
        f(unsafe { &mut *ptr });
    }
}

fn try_xdpfw(ctx: XdpContext) -> u32 {
    let eth = match unsafe { ptr_at::<EthHdr>(&ctx, 0) } {
        Some(p) => unsafe { &*p },
        None => return xdp_action::XDP_DROP,
    };
    let ether_type = u16::from_be(eth.ether_type);
    if ether_type != ETH_P_IP && ether_type != ETH_P_IPV6 {
        return xdp_action::XDP_PASS;
    }

    let mut pkt = ParsedPacket::default();
    let l4_offset: usize;
    let l4_proto_num: u8;

    if ether_type == ETH_P_IP {
        let iph = match unsafe { ptr_at::<Ipv4Hdr>(&ctx, EthHdr::LEN) } {
            Some(p) => unsafe { &*p },
            None => return xdp_action::XDP_DROP,
        };
        let ihl = iph.ihl_bytes();
        if ihl < 20 {
            return xdp_action::XDP_DROP;
        }
        pkt.is_ipv6 = false;
        pkt.src_ip4 = u32::from_be(iph.src_addr);
        pkt.dst_ip4 = u32::from_be(iph.dst_addr);
        pkt.tos = iph.tos;
        pkt.ttl = iph.ttl;
        pkt.total_len = u16::from_be(iph.tot_len).saturating_add(EthHdr::LEN as u16);
        l4_proto_num = iph.protocol;
        l4_offset = EthHdr::LEN + ihl;
    } else {
        let iph6 = match unsafe { ptr_at::<Ipv6Hdr>(&ctx, EthHdr::LEN) } {
            Some(p) => unsafe { &*p },
            None => return xdp_action::XDP_DROP,
        };
        pkt.is_ipv6 = true;
        pkt.src_ip6 = iph6.src_addr;
        pkt.dst_ip6 = iph6.dst_addr;
        pkt.ttl = iph6.hop_limit;
        // Excludes the 40-byte IPv6 fixed header by design — see
        // SPEC_FULL.md §9 and `ParsedPacket::total_len`.
        pkt.total_len = u16::from_be(iph6.payload_len).saturating_add(EthHdr::LEN as u16);
        l4_proto_num = iph6.next_hdr;
        l4_offset = EthHdr::LEN + Ipv6Hdr::LEN;
    }

    pkt.l4_proto = match l4_proto_num {
        ip_proto::TCP => L4Proto::Tcp,
        ip_proto::UDP => L4Proto::Udp,
        ip_proto::ICMP | ip_proto::ICMPV6 => L4Proto::Icmp,
        _ => return xdp_action::XDP_PASS,
    };

    match pkt.l4_proto {
        L4Proto::Tcp => {
            let tcph = match unsafe { ptr_at::<TcpHdr>(&ctx, l4_offset) } {
                Some(p) => unsafe { &*p },
                None => return xdp_action::XDP_DROP,
            };
            pkt.src_port = u16::from_be(tcph.source);
            pkt.dst_port = u16::from_be(tcph.dest);
            pkt.tcp_flags = tcph.flags;
        }
        L4Proto::Udp => {
            let udph = match unsafe { ptr_at::<UdpHdr>(&ctx, l4_offset) } {
                Some(p) => unsafe { &*p },
                None => return xdp_action::XDP_DROP,
            };
            pkt.src_port = u16::from_be(udph.source);
            pkt.dst_port = u16::from_be(udph.dest);
        }
        L4Proto::Icmp => {
            let icmph = match unsafe { ptr_at::<IcmpHdr>(&ctx, l4_offset) } {
                Some(p) => unsafe { &*p },
                None => return xdp_action::XDP_DROP,
            };
            pkt.icmp_type = icmph.icmp_type;
            pkt.icmp_code = icmph.code;
        }
        L4Proto::None => {}
    }

    let now = unsafe { bpf_ktime_get_ns() };

    if pkt.is_ipv6 {
        if let Some(&deadline) = unsafe { BLOCK6.get(&pkt.src_ip6) } {
            if deadline != 0 && now > deadline {
                let _ = unsafe { BLOCK6.remove(&pkt.src_ip6) };
            } else {
                bump_stats(|s| s.dropped += 1);
                return xdp_action::XDP_DROP;
            }
        }
    } else {
        if let Some(&deadline) = unsafe { BLOCK4.get(&pkt.src_ip4) } {
            if deadline != 0 && now > deadline {
                let _ = unsafe { BLOCK4.remove(&pkt.src_ip4) };
            } else {
                bump_stats(|s| s.dropped += 1);
                return xdp_action::XDP_DROP;
            }
        }
    }

    if !pkt.is_ipv6 && unsafe { ENABLE_IP_RANGE_DROP } {
        let key = Key::new(32, pkt.src_ip4);
        if unsafe { RANGE_DROP.get(&key) }.is_some() {
            bump_stats(|s| s.dropped += 1);
            return xdp_action::XDP_DROP;
        }
    }

    let cfg = FirewallConfig {
        enable_filters: unsafe { ENABLE_FILTERS },
        enable_filter_logging: unsafe { ENABLE_FILTER_LOGGING },
        enable_ip_range_drop: unsafe { ENABLE_IP_RANGE_DROP },
        allow_single_ip_v4_v6: unsafe { ALLOW_SINGLE_IP_V4_V6 },
    };

    let mut matched: Option<(u8, u32)> = None;

    if cfg.enable_filters {
        let len = u32::from(pkt.total_len);
        let (pps, bps) = if pkt.is_ipv6 {
            match unsafe { IP_STATS6.get_ptr_mut(&pkt.src_ip6) } {
                Some(s) => update_window(unsafe { &mut *s }, now, len),
                None => {
                    let mut s = IpStats::default();
                    let v = update_window(&mut s, now, len);
                    let _ = unsafe { IP_STATS6.insert(&pkt.src_ip6, &s, 0) };
                    v
                }
            }
        } else {
            match unsafe { IP_STATS4.get_ptr_mut(&pkt.src_ip4) } {
                Some(s) => update_window(unsafe { &mut *s }, now, len),
                None => {
                    let mut s = IpStats::default();
                    let v = update_window(&mut s, now, len);
                    let _ = unsafe { IP_STATS4.insert(&pkt.src_ip4, &s, 0) };
                    v
                }
            }
        };

        for i in 0..MAX_FILTERS {
            let filter = match unsafe { FILTERS.get_ptr_mut(i) } {
                Some(p) => unsafe { &*p },
                None => break,
            };
            if filter.enabled == 0 {
                break;
            }
            if filter_matches(filter, &pkt, pps, bps, &cfg) {
                if filter.log != 0 && cfg.enable_filter_logging {
                    if let Some(mut entry) = FILTER_LOG.reserve::<FilterLogEvent>(0) {
                        let ev = FilterLogEvent {
                            filter_id: i,
                            src_ip4: if pkt.is_ipv6 { 0 } else { pkt.src_ip4.to_be() },
                            src_ip6: pkt.src_ip6,
                            src_port: pkt.src_port.to_be(),
                            dst_port: pkt.dst_port.to_be(),
                            pps,
                            bps,
                        };
                        entry.write(ev);
                        entry.submit(0);
                    }
                }
                matched = Some((filter.action, filter.block_time));
                break;
            }
        }
    }

    match matched {
        None => {
            bump_stats(|s| s.passed += 1);
            xdp_action::XDP_PASS
        }
        Some((act, block_time)) if act == action::DROP => {
            if block_time > 0 {
                let deadline = now + u64::from(block_time) * NANO_TO_SEC;
                if pkt.is_ipv6 {
                    let _ = unsafe { BLOCK6.insert(&pkt.src_ip6, &deadline, 0) };
                } else {
                    let _ = unsafe { BLOCK4.insert(&pkt.src_ip4, &deadline, 0) };
                }
            }
            bump_stats(|s| s.dropped += 1);
            xdp_action::XDP_DROP
        }
        Some(_) => {
            bump_stats(|s| s.allowed += 1);
            xdp_action::XDP_PASS
        }
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[unsafe(link_section = "license")]
#[unsafe(no_mangle)]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";

// Keep `map_names` referenced so the constant definitions stay in lockstep
// with the `#[map(name = "...")]` strings above even though no runtime code
// here reads them directly.
const _: &str = map_names::FILTERS;
