use std::path::PathBuf;

use clap::Parser;

use xdpfw_config::DEFAULT_CONFIG_PATH;

#[derive(Debug, Parser)]
#[command(name = "xdpfw", about = "XDP packet filtering and rate-limiting firewall", version)]
pub struct Cli {
    /// Config file path.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Force HW/offload attach mode.
    #[arg(short = 'o', long, conflicts_with = "skb")]
    pub offload: bool,

    /// Force SKB/generic attach mode.
    #[arg(short = 's', long)]
    pub skb: bool,

    /// Run for N seconds then exit (0/unset = infinite).
    #[arg(short = 't', long, value_name = "SECONDS")]
    pub time: Option<u64>,

    /// Print parsed config to stdout and exit.
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Override verbose level (0-5).
    #[arg(short = 'v', long, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub verbose: Option<u8>,

    /// Override log-file path.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Override interface.
    #[arg(short = 'i', long, value_name = "NAME")]
    pub interface: Option<String>,

    /// Override config-reload poll interval, in seconds.
    #[arg(short = 'u', long, value_name = "SECONDS")]
    pub update_time: Option<u64>,

    /// Disable stats display.
    #[arg(short = 'n', long)]
    pub no_stats: bool,

    /// Report rates rather than totals.
    #[arg(long)]
    pub stats_ps: bool,

    /// Override main-loop sleep, in milliseconds.
    #[arg(long, value_name = "MILLIS")]
    pub stdout_ut: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offload_and_skb_are_mutually_exclusive() {
        let err = Cli::try_parse_from(["xdpfw", "-o", "-s"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn verbose_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["xdpfw", "-v", "9"]).is_err());
    }

    #[test]
    fn defaults_apply_when_only_required_flags_given() {
        let cli = Cli::try_parse_from(["xdpfw"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!cli.offload);
        assert!(!cli.skb);
        assert_eq!(cli.time, None);
    }
}
