//! Ring-buffer consumer for `FilterLogEvent`. Drains non-blockingly: the CP
//! main loop's only suspension point is its inter-iteration sleep, so this
//! never awaits — it pulls whatever records are already queued and returns.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::fd::AsFd;

use aya::maps::{MapData, RingBuf};
use tracing::warn;

use xdpfw_common::config::map_names;
use xdpfw_common::types::FilterLogEvent;

pub struct EventConsumer {
    ring: RingBuf<MapData>,
}

/// Host-readable view of a `FilterLogEvent`, with addresses and ports
/// converted out of network byte order for display.
#[derive(Debug, Clone)]
pub struct FilterLogRecord {
    pub filter_id: u32,
    pub source: std::net::IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub pps: u64,
    pub bps: u64,
}

impl From<FilterLogEvent> for FilterLogRecord {
    fn from(ev: FilterLogEvent) -> Self {
        let source = if ev.src_ip4 != 0 {
            std::net::IpAddr::V4(Ipv4Addr::from(u32::from_be(ev.src_ip4)))
        } else {
            std::net::IpAddr::V6(Ipv6Addr::from(ev.src_ip6))
        };
        Self {
            filter_id: ev.filter_id,
            source,
            src_port: u16::from_be(ev.src_port),
            dst_port: u16::from_be(ev.dst_port),
            pps: ev.pps,
            bps: ev.bps,
        }
    }
}

impl EventConsumer {
    /// `None` if the loaded object has no filter-log ring buffer —
    /// optional per SPEC_FULL.md §4.3 item 3, degraded with a warning
    /// rather than aborting startup.
    pub fn open(ebpf: &mut aya::Ebpf) -> Option<Self> {
        let map_data = match ebpf.take_map(map_names::FILTER_LOG) {
            Some(m) => m,
            None => {
                warn!(map = map_names::FILTER_LOG, "filter-log ring buffer not present, filter-match logging disabled");
                return None;
            }
        };
        match RingBuf::try_from(map_data) {
            Ok(ring) => Some(Self { ring }),
            Err(e) => {
                warn!(map = map_names::FILTER_LOG, error = %e, "filter-log map has unexpected type, filter-match logging disabled");
                None
            }
        }
    }

    /// Exposed so the main loop can register this fd with an edge-triggered
    /// poller instead of spinning; draining itself never blocks regardless.
    pub fn as_fd(&self) -> impl AsFd + '_ {
        self.ring.as_fd()
    }

    /// Pulls every record currently queued, parsing each as a `FilterLogEvent`.
    /// A record whose length doesn't match is skipped rather than panicking —
    /// producer and consumer are built in lockstep, but a stale pinned map
    /// from a different binary version should degrade, not crash the CP.
    pub fn drain(&mut self) -> Vec<FilterLogRecord> {
        let mut out = Vec::new();
        while let Some(item) = self.ring.next() {
            if item.len() != std::mem::size_of::<FilterLogEvent>() {
                continue;
            }
            let ev = unsafe { item.as_ptr().cast::<FilterLogEvent>().read_unaligned() };
            out.push(ev.into());
        }
        out
    }
}
