//! Runtime feature toggles that replace the original's compile-time feature
//! macros (`ENABLE_FILTERS`, `ENABLE_FILTER_LOGGING`, `ENABLE_IP_RANGE_DROP`,
//! `ALLOW_SINGLE_IP_V4_V6`). The loader patches each field into the kernel
//! program's `.rodata` individually via `EbpfLoader::set_global`, one call
//! per field — see [`GlobalNames`] for the matching symbol names the
//! `xdpfw-ebpf` crate declares as `#[no_mangle] static` globals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FirewallConfig {
    pub enable_filters: bool,
    pub enable_filter_logging: bool,
    pub enable_ip_range_drop: bool,
    pub allow_single_ip_v4_v6: bool,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            enable_filters: true,
            enable_filter_logging: false,
            enable_ip_range_drop: false,
            allow_single_ip_v4_v6: false,
        }
    }
}

/// Symbol names of the `#[no_mangle] static` globals `xdpfw-ebpf` declares,
/// used as the key argument to `EbpfLoader::set_global` so the loader and
/// the kernel program can't drift apart silently.
pub struct GlobalNames;

impl GlobalNames {
    pub const ENABLE_FILTERS: &'static str = "ENABLE_FILTERS";
    pub const ENABLE_FILTER_LOGGING: &'static str = "ENABLE_FILTER_LOGGING";
    pub const ENABLE_IP_RANGE_DROP: &'static str = "ENABLE_IP_RANGE_DROP";
    pub const ALLOW_SINGLE_IP_V4_V6: &'static str = "ALLOW_SINGLE_IP_V4_V6";
}

/// Names of the BPF maps the loader looks up by name after loading the
/// object file. Centralized here so the kernel crate's `#[map]` names and
/// the loader's `ebpf.map(...)` calls can't drift apart silently.
pub mod map_names {
    pub const FILTERS: &str = "map_filters";
    pub const GLOBAL_STATS: &str = "map_stats";
    pub const BLOCK_V4: &str = "map_block";
    pub const BLOCK_V6: &str = "map_block6";
    pub const IP_STATS_V4: &str = "map_ip_stats";
    pub const IP_STATS_V6: &str = "map_ip_stats6";
    pub const RANGE_DROP: &str = "map_range_drop";
    pub const FILTER_LOG: &str = "map_filter_log";
}

/// Directory pinned tables are stored under when pinning is enabled.
pub const PIN_DIR: &str = "/sys/fs/bpf/xdpfw";

/// Well-known path the loader falls back to when `XDPFW_BPF_OBJ` isn't set
/// and no embedded object is usable — kept for operators who want to swap
/// the running program without rebuilding the `xdpfw` binary.
pub const DEFAULT_BPF_OBJ_PATH: &str = "/etc/xdpfw/xdp_prog.o";

/// Environment variable overriding `DEFAULT_BPF_OBJ_PATH`.
pub const BPF_OBJ_PATH_ENV: &str = "XDPFW_BPF_OBJ";
