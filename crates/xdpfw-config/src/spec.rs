//! Human-readable TOML schema. Kept distinct from `xdpfw_common::Filter` —
//! the wire type the filter-sync routine writes into the BPF map — the same
//! way the original keeps its on-disk config syntax separate from the
//! `filter_t` struct the kernel program reads, following
//! `patronus-config`'s derive conventions for its own schema types.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use xdpfw_common::limits::{action, tcp_flags};
use xdpfw_common::types::{Filter, IcmpSubFilter, TcpSubFilter, UdpSubFilter};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TcpFilterSpec {
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    /// Names of flag bits required to be *set*: any of
    /// `fin`/`syn`/`rst`/`psh`/`ack`/`urg`/`ece`/`cwr`.
    pub flags_set: Vec<String>,
    /// Names of flag bits required to be *clear*. A name must not appear in
    /// both `flags_set` and `flags_clear`. Flags named in neither list are
    /// left unconstrained.
    pub flags_clear: Vec<String>,
}

impl Default for TcpFilterSpec {
    fn default() -> Self {
        Self { src_port: None, dst_port: None, flags_set: Vec::new(), flags_clear: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UdpFilterSpec {
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IcmpFilterSpec {
    pub code: Option<u8>,
    #[serde(rename = "type")]
    pub icmp_type: Option<u8>,
}

/// One rule as written in the config file. `src_ip4`/`dst_ip4` accept
/// `a.b.c.d` (implicit `/32`) or `a.b.c.d/prefix`; `src_ip6`/`dst_ip6`
/// accept a bare IPv6 literal (full-address match only, no prefix).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterSpec {
    pub enabled: bool,
    /// `"drop"` or `"pass"`.
    pub action: String,
    pub block_time: u32,
    pub log: bool,

    pub src_ip4: Option<String>,
    pub dst_ip4: Option<String>,
    pub src_ip6: Option<String>,
    pub dst_ip6: Option<String>,

    pub tos: Option<u8>,
    pub min_ttl: Option<u8>,
    pub max_ttl: Option<u8>,
    /// See SPEC_FULL.md §9: for IPv6 packets this is measured against
    /// Ethernet header + IPv6 payload length, excluding the 40-byte fixed
    /// header — an intentional, documented quirk, not an oversight.
    pub min_len: Option<u16>,
    pub max_len: Option<u16>,

    /// Rate *trigger*: matches once the observed 1-second window value is
    /// `>=` this threshold.
    pub pps: Option<u64>,
    pub bps: Option<u64>,

    pub tcp: Option<TcpFilterSpec>,
    pub udp: Option<UdpFilterSpec>,
    pub icmp: Option<IcmpFilterSpec>,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            action: "drop".to_string(),
            block_time: 0,
            log: false,
            src_ip4: None,
            dst_ip4: None,
            src_ip6: None,
            dst_ip6: None,
            tos: None,
            min_ttl: None,
            max_ttl: None,
            min_len: None,
            max_len: None,
            pps: None,
            bps: None,
            tcp: None,
            udp: None,
            icmp: None,
        }
    }
}

fn parse_ip4_cidr(index: usize, raw: &str) -> Result<(u32, u8)> {
    let (addr_part, cidr_part) = match raw.split_once('/') {
        Some((a, c)) => (a, Some(c)),
        None => (raw, None),
    };
    let addr: Ipv4Addr = addr_part.parse().map_err(|_| ConfigError::InvalidAddress {
        index,
        value: raw.to_string(),
        reason: "not a valid IPv4 address".to_string(),
    })?;
    let cidr = match cidr_part {
        Some(c) => c.parse::<u8>().map_err(|_| ConfigError::InvalidCidr { index, value: raw.to_string() })?,
        None => 32,
    };
    if cidr > 32 {
        return Err(ConfigError::InvalidCidr { index, value: raw.to_string() });
    }
    Ok((u32::from(addr), cidr))
}

fn parse_ip6(index: usize, raw: &str) -> Result<[u8; 16]> {
    let addr: Ipv6Addr = raw.parse().map_err(|_| ConfigError::InvalidAddress {
        index,
        value: raw.to_string(),
        reason: "not a valid IPv6 address".to_string(),
    })?;
    Ok(addr.octets())
}

fn flag_bit(name: &str) -> Option<u8> {
    Some(match name.to_ascii_lowercase().as_str() {
        "fin" => tcp_flags::FIN,
        "syn" => tcp_flags::SYN,
        "rst" => tcp_flags::RST,
        "psh" => tcp_flags::PSH,
        "ack" => tcp_flags::ACK,
        "urg" => tcp_flags::URG,
        "ece" => tcp_flags::ECE,
        "cwr" => tcp_flags::CWR,
        _ => return None,
    })
}

impl FilterSpec {
    pub fn to_filter(&self, index: usize) -> Result<Filter> {
        let mut f = Filter { enabled: u8::from(self.enabled), ..Default::default() };

        f.action = match self.action.as_str() {
            "drop" => action::DROP,
            "pass" => action::PASS,
            other => return Err(ConfigError::InvalidAction(other.to_string(), index)),
        };
        f.log = u8::from(self.log);
        f.block_time = self.block_time;

        if let Some(raw) = &self.src_ip4 {
            let (addr, cidr) = parse_ip4_cidr(index, raw)?;
            f.do_src_ip4 = 1;
            f.src_ip4 = addr;
            f.src_cidr4 = cidr;
        }
        if let Some(raw) = &self.dst_ip4 {
            let (addr, cidr) = parse_ip4_cidr(index, raw)?;
            f.do_dst_ip4 = 1;
            f.dst_ip4 = addr;
            f.dst_cidr4 = cidr;
        }
        if let Some(raw) = &self.src_ip6 {
            f.do_src_ip6 = 1;
            f.src_ip6 = parse_ip6(index, raw)?;
        }
        if let Some(raw) = &self.dst_ip6 {
            f.do_dst_ip6 = 1;
            f.dst_ip6 = parse_ip6(index, raw)?;
        }

        if let Some(tos) = self.tos {
            f.do_tos = 1;
            f.tos = tos;
        }
        if let Some(v) = self.min_ttl {
            f.do_min_ttl = 1;
            f.min_ttl = v;
        }
        if let Some(v) = self.max_ttl {
            f.do_max_ttl = 1;
            f.max_ttl = v;
        }
        if let Some(v) = self.min_len {
            f.do_min_len = 1;
            f.min_len = v;
        }
        if let Some(v) = self.max_len {
            f.do_max_len = 1;
            f.max_len = v;
        }
        if let Some(v) = self.pps {
            f.do_pps = 1;
            f.pps = v;
        }
        if let Some(v) = self.bps {
            f.do_bps = 1;
            f.bps = v;
        }

        let l4_count = [self.tcp.is_some(), self.udp.is_some(), self.icmp.is_some()]
            .iter()
            .filter(|x| **x)
            .count();
        debug_assert!(l4_count <= 1, "config loader should reject multiple L4 sub-filters earlier");

        if let Some(tcp) = &self.tcp {
            f.l4_proto = 1;
            let mut sub = TcpSubFilter::default();
            if let Some(p) = tcp.src_port {
                sub.do_src_port = 1;
                sub.src_port = p.to_be();
            }
            if let Some(p) = tcp.dst_port {
                sub.do_dst_port = 1;
                sub.dst_port = p.to_be();
            }
            for name in &tcp.flags_set {
                let bit = flag_bit(name).ok_or_else(|| ConfigError::InvalidTcpFlag(name.clone()))?;
                if sub.flags_mask & bit != 0 {
                    return Err(ConfigError::ConflictingTcpFlag(name.clone()));
                }
                sub.flags_mask |= bit;
                sub.flags_value |= bit;
            }
            for name in &tcp.flags_clear {
                let bit = flag_bit(name).ok_or_else(|| ConfigError::InvalidTcpFlag(name.clone()))?;
                if sub.flags_mask & bit != 0 {
                    return Err(ConfigError::ConflictingTcpFlag(name.clone()));
                }
                sub.flags_mask |= bit;
                // flags_value bit left unset: required-clear.
            }
            f.tcp = sub;
        } else if let Some(udp) = &self.udp {
            f.l4_proto = 2;
            let mut sub = UdpSubFilter::default();
            if let Some(p) = udp.src_port {
                sub.do_src_port = 1;
                sub.src_port = p.to_be();
            }
            if let Some(p) = udp.dst_port {
                sub.do_dst_port = 1;
                sub.dst_port = p.to_be();
            }
            f.udp = sub;
        } else if let Some(icmp) = &self.icmp {
            f.l4_proto = 3;
            let mut sub = IcmpSubFilter::default();
            if let Some(c) = icmp.code {
                sub.do_code = 1;
                sub.code = c;
            }
            if let Some(t) = icmp.icmp_type {
                sub.do_type = 1;
                sub.icmp_type = t;
            }
            f.icmp = sub;
        }

        Ok(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cidr_and_exact_ipv4() {
        assert_eq!(parse_ip4_cidr(0, "10.0.0.1").unwrap(), (u32::from(Ipv4Addr::new(10, 0, 0, 1)), 32));
        assert_eq!(parse_ip4_cidr(0, "10.0.0.0/24").unwrap().1, 24);
    }

    #[test]
    fn tcp_syn_filter_spec_round_trips_into_wire_filter() {
        let spec = FilterSpec {
            src_ip4: Some("10.0.0.1/32".to_string()),
            tcp: Some(TcpFilterSpec {
                src_port: None,
                dst_port: None,
                flags_set: vec!["syn".to_string()],
                flags_clear: Vec::new(),
            }),
            action: "drop".to_string(),
            block_time: 5,
            ..Default::default()
        };
        let f = spec.to_filter(0).unwrap();
        assert_eq!(f.do_src_ip4, 1);
        assert_eq!(f.src_cidr4, 32);
        assert_eq!(f.l4_proto, 1);
        assert_eq!(f.tcp.flags_mask, tcp_flags::SYN);
        assert_eq!(f.tcp.flags_value, tcp_flags::SYN);
        assert_eq!(f.block_time, 5);
        assert_eq!(f.action, action::DROP);
    }

    #[test]
    fn tcp_flags_clear_requires_the_bit_unset_without_setting_value() {
        let spec = FilterSpec {
            tcp: Some(TcpFilterSpec {
                src_port: None,
                dst_port: None,
                flags_set: vec!["syn".to_string()],
                flags_clear: vec!["ack".to_string()],
            }),
            ..Default::default()
        };
        let f = spec.to_filter(0).unwrap();
        assert_eq!(f.tcp.flags_mask, tcp_flags::SYN | tcp_flags::ACK);
        assert_eq!(f.tcp.flags_value, tcp_flags::SYN);
    }

    #[test]
    fn tcp_flag_in_both_set_and_clear_is_rejected() {
        let spec = FilterSpec {
            tcp: Some(TcpFilterSpec {
                src_port: None,
                dst_port: None,
                flags_set: vec!["syn".to_string()],
                flags_clear: vec!["syn".to_string()],
            }),
            ..Default::default()
        };
        assert!(matches!(spec.to_filter(0), Err(ConfigError::ConflictingTcpFlag(_))));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let spec = FilterSpec { action: "reject".to_string(), ..Default::default() };
        assert!(matches!(spec.to_filter(3), Err(ConfigError::InvalidAction(_, 3))));
    }

    #[test]
    fn unknown_tcp_flag_is_rejected() {
        let spec = FilterSpec {
            tcp: Some(TcpFilterSpec {
                src_port: None,
                dst_port: None,
                flags_set: vec!["xmas".to_string()],
                flags_clear: Vec::new(),
            }),
            ..Default::default()
        };
        assert!(spec.to_filter(0).is_err());
    }
}
