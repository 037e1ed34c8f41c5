//! Wire types and pure classification logic shared between the `xdpfw-ebpf`
//! kernel program and the userspace control-plane crates.
//!
//! Every type here is `#[repr(C)]` and `Copy` so it can be written directly
//! into a BPF map value slot from either side of the user/kernel boundary.
//! Nothing in this crate allocates or touches `std`, which keeps it usable
//! unmodified from the `no_std` eBPF crate.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod classify;
pub mod config;
pub mod limits;
pub mod packet;
pub mod types;

pub use classify::filter_matches;
pub use config::{FirewallConfig, GlobalNames};
pub use limits::*;
pub use packet::{L4Proto, ParsedPacket};
pub use types::{Filter, FilterLogEvent, GlobalStats, IcmpSubFilter, IpStats, TcpSubFilter, UdpSubFilter};
