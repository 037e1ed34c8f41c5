mod cli;
mod run;

use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;
use xdpfw_config::FirewallFileConfig;

fn main() {
    let cli = Cli::parse();

    let mut cfg = match FirewallFileConfig::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load config {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };
    apply_overrides(&mut cfg, &cli);

    // tracing-appender's non-blocking worker guard must outlive the run —
    // dropping it early would silently stop flushing the log file.
    let _log_guard = init_tracing(cfg.verbose, cfg.log_file.as_deref());

    if cli.list {
        match toml::to_string_pretty(&cfg) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("failed to render config: {e}"),
        }
        std::process::exit(0);
    }

    if let Err(e) = run::run(cli, cfg) {
        error!(error = %e, "xdpfw exited with error");
        std::process::exit(1);
    }
}

fn apply_overrides(cfg: &mut FirewallFileConfig, cli: &Cli) {
    if let Some(v) = &cli.interface {
        cfg.interface = Some(v.clone());
    }
    if let Some(v) = cli.verbose {
        cfg.verbose = v;
    }
    if let Some(v) = &cli.log_file {
        cfg.log_file = Some(v.display().to_string());
    }
    if let Some(v) = cli.update_time {
        cfg.update_time = v;
    }
    if cli.no_stats {
        cfg.no_stats = true;
    }
    if cli.stats_ps {
        cfg.stats_per_second = true;
    }
    if let Some(v) = cli.stdout_ut {
        cfg.stdout_update_time = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_overrides_win_over_file_config() {
        let mut cfg = FirewallFileConfig::default();
        cfg.interface = Some("eth0".to_string());
        cfg.verbose = 3;

        let cli = Cli::parse_from(["xdpfw", "-i", "eth1", "-v", "5", "--no-stats"]);
        apply_overrides(&mut cfg, &cli);

        assert_eq!(cfg.interface.as_deref(), Some("eth1"));
        assert_eq!(cfg.verbose, 5);
        assert!(cfg.no_stats);
    }

    #[test]
    fn absent_cli_flags_leave_file_config_untouched() {
        let mut cfg = FirewallFileConfig::default();
        cfg.interface = Some("eth0".to_string());

        let cli = Cli::parse_from(["xdpfw"]);
        apply_overrides(&mut cfg, &cli);

        assert_eq!(cfg.interface.as_deref(), Some("eth0"));
        assert!(!cfg.no_stats);
    }
}

/// Maps the 0-5 verbose scale onto a `tracing` level, the way the original
/// CLI's verbosity knob selected its own log level. Adds a second,
/// non-removing file-sink layer when `log_file` is set, so stdout keeps
/// receiving output even while also writing to disk.
fn init_tracing(verbose: u8, log_file: Option<&str>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let level = match verbose {
        0 => "off",
        1 => "error",
        2 => "warn",
        3 => "info",
        4 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false));

    match log_file {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().map(|f| f.to_owned()).unwrap_or_else(|| "xdpfw.log".into());
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            registry
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}
