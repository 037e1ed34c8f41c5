//! TOML configuration schema and loader for `xdpfw`.
//!
//! Schema conventions (derive shape, `#[serde(default)]`, `impl Default`
//! supplying documented defaults) follow `patronus-config`; semantics
//! (what each field controls) follow the loader this project is modeled
//! on's `SetCfgDefaults`/`LoadConfig`.

pub mod error;
pub mod spec;
pub mod watch;

use std::path::Path;

use serde::{Deserialize, Serialize};
use xdpfw_common::limits::{MAX_FILTERS, MAX_IP_RANGES};
use xdpfw_common::types::Filter;
use xdpfw_common::FirewallConfig;

pub use error::{ConfigError, Result};
pub use spec::{FilterSpec, IcmpFilterSpec, TcpFilterSpec, UdpFilterSpec};
pub use watch::ConfigWatcher;

/// Default path the CLI's `-c/--config` flag defaults to.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/xdpfw/xdpfw.conf";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FirewallFileConfig {
    /// Network interface to attach to. No default — must be supplied here
    /// or overridden with `-i/--interface`.
    pub interface: Option<String>,

    /// Seconds between config-file mtime checks.
    pub update_time: u64,
    /// Milliseconds between stats reports and the CP loop's single sleep.
    pub stdout_update_time: u64,
    pub no_stats: bool,
    pub stats_per_second: bool,

    /// 0-5, mapped onto a `tracing::Level` by the CLI.
    pub verbose: u8,
    pub log_file: Option<String>,

    pub pin_maps: bool,

    pub enable_filters: bool,
    pub enable_filter_logging: bool,
    pub enable_ip_range_drop: bool,
    pub allow_single_ip_v4_v6: bool,

    /// CIDR strings, e.g. `"203.0.113.0/24"`, dropped unconditionally.
    pub range_drops: Vec<String>,

    pub filters: Vec<FilterSpec>,
}

impl Default for FirewallFileConfig {
    fn default() -> Self {
        Self {
            interface: None,
            update_time: 5,
            stdout_update_time: 1_000,
            no_stats: false,
            stats_per_second: false,
            verbose: 3,
            log_file: None,
            pin_maps: false,
            enable_filters: true,
            enable_filter_logging: false,
            enable_ip_range_drop: false,
            allow_single_ip_v4_v6: false,
            range_drops: Vec::new(),
            filters: Vec::new(),
        }
    }
}

impl FirewallFileConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        let cfg: Self = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })?;
        Ok(cfg)
    }

    pub fn runtime_toggles(&self) -> FirewallConfig {
        FirewallConfig {
            enable_filters: self.enable_filters,
            enable_filter_logging: self.enable_filter_logging,
            enable_ip_range_drop: self.enable_ip_range_drop,
            allow_single_ip_v4_v6: self.allow_single_ip_v4_v6,
        }
    }

    /// Build the wire `Filter` list in config order, validating against
    /// `MAX_FILTERS`. Does not perform table I/O — see `xdpfw-loader`'s
    /// filter-sync routine for writing these into the running program.
    pub fn wire_filters(&self) -> Result<Vec<Filter>> {
        if self.filters.len() > MAX_FILTERS as usize {
            return Err(ConfigError::TooManyFilters(self.filters.len(), MAX_FILTERS));
        }
        self.filters.iter().enumerate().map(|(i, spec)| spec.to_filter(i)).collect()
    }

    /// Parse `range_drops` into `(network, prefix_len)` pairs, network
    /// already in the same big-endian-numeric representation used
    /// everywhere else (`u32::from(Ipv4Addr)`).
    pub fn wire_range_drops(&self) -> Result<Vec<(u32, u8)>> {
        if self.range_drops.len() > MAX_IP_RANGES as usize {
            return Err(ConfigError::TooManyRanges(self.range_drops.len(), MAX_IP_RANGES));
        }
        self.range_drops
            .iter()
            .map(|raw| {
                let (addr_part, cidr_part) = raw.split_once('/').ok_or_else(|| {
                    ConfigError::InvalidRange(raw.clone(), "missing /prefix".to_string())
                })?;
                let addr: std::net::Ipv4Addr = addr_part
                    .parse()
                    .map_err(|_| ConfigError::InvalidRange(raw.clone(), "bad address".to_string()))?;
                let cidr: u8 = cidr_part
                    .parse()
                    .map_err(|_| ConfigError::InvalidRange(raw.clone(), "bad prefix".to_string()))?;
                if cidr > 32 {
                    return Err(ConfigError::InvalidRange(raw.clone(), "prefix > 32".to_string()));
                }
                Ok((u32::from(addr), cidr))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = FirewallFileConfig::default();
        assert_eq!(cfg.update_time, 5);
        assert_eq!(cfg.stdout_update_time, 1_000);
        assert_eq!(cfg.verbose, 3);
        assert!(cfg.enable_filters);
        assert!(!cfg.enable_filter_logging);
    }

    #[test]
    fn parses_minimal_toml() {
        let toml = r#"
            interface = "eth0"

            [[filters]]
            action = "drop"
            src_ip4 = "10.0.0.1/32"

            [filters.tcp]
            flags_set = ["syn"]
        "#;
        let cfg: FirewallFileConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.interface.as_deref(), Some("eth0"));
        assert_eq!(cfg.filters.len(), 1);
        let filters = cfg.wire_filters().unwrap();
        assert_eq!(filters[0].l4_proto, 1);
        assert_eq!(filters[0].tcp.flags_mask, xdpfw_common::limits::tcp_flags::SYN);
    }

    #[test]
    fn rejects_config_with_too_many_filters() {
        let mut cfg = FirewallFileConfig::default();
        cfg.filters = (0..(MAX_FILTERS as usize + 1)).map(|_| FilterSpec::default()).collect();
        assert!(matches!(cfg.wire_filters(), Err(ConfigError::TooManyFilters(_, _))));
    }

    #[test]
    fn parses_range_drop_cidr() {
        let mut cfg = FirewallFileConfig::default();
        cfg.range_drops.push("203.0.113.0/24".to_string());
        let ranges = cfg.wire_range_drops().unwrap();
        assert_eq!(ranges[0].1, 24);
    }
}
