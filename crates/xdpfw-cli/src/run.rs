//! The CP main loop: single-threaded, single suspension point (the
//! inter-iteration sleep). No worker threads, no async runtime — this
//! project's concurrency model explicitly departs from `patronus-cli`'s
//! `#[tokio::main]` convention because the DP/CP split here has nothing for
//! tokio to schedule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use xdpfw_config::{ConfigWatcher, FirewallFileConfig};
use xdpfw_loader::{FirewallLoader, ForcedMode, StatsReport};

use crate::cli::Cli;

pub fn run(cli: Cli, mut cfg: FirewallFileConfig) -> Result<()> {
    let interface = cfg.interface.clone().ok_or_else(|| anyhow!("no interface configured (set `interface` in the config file or pass -i/--interface)"))?;

    let forced = match (cli.offload, cli.skb) {
        (true, _) => Some(ForcedMode::Offload),
        (false, true) => Some(ForcedMode::Skb),
        (false, false) => None,
    };

    let pin_dir = xdpfw_loader::pin::default_pin_dir().to_path_buf();
    let mut loader = FirewallLoader::load(&interface, &cfg.runtime_toggles(), forced, cfg.pin_maps, pin_dir)
        .context("failed to load and attach the data plane")?;

    sync_tables(&mut loader, &cfg)?;

    let mut watcher = ConfigWatcher::new(cli.config.clone());
    watcher.arm().context("failed to stat config file after initial load")?;

    let term = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&term))
        .context("failed to register SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&term))
        .context("failed to register SIGTERM handler")?;

    let start = Instant::now();
    let deadline = cli.time.filter(|&s| s > 0).map(|s| start + Duration::from_secs(s));

    let mut last_config_check = Instant::now();
    let update_interval = Duration::from_secs(cfg.update_time.max(1));
    let sleep_interval = Duration::from_millis(cfg.stdout_update_time.max(1));

    info!(interface = %loader.interface, mode = ?loader.attach_mode, "xdpfw running");

    loop {
        if term.load(Ordering::Relaxed) {
            info!("shutdown signal received");
            break;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                info!("configured run time elapsed");
                break;
            }
        }

        if let Some(events) = loader.events.as_mut() {
            for record in events.drain() {
                info!(
                    filter_id = record.filter_id,
                    src = %record.source,
                    src_port = record.src_port,
                    dst_port = record.dst_port,
                    pps = record.pps,
                    bps = record.bps,
                    "filter match logged"
                );
            }
        }

        if last_config_check.elapsed() >= update_interval {
            last_config_check = Instant::now();
            match watcher.poll() {
                Ok(true) => match FirewallFileConfig::load(&cli.config) {
                    Ok(mut reloaded) => {
                        crate::apply_overrides(&mut reloaded, &cli);
                        if let Err(e) = sync_tables(&mut loader, &reloaded) {
                            warn!(error = %e, "config reload failed, keeping previous state");
                        } else {
                            cfg = reloaded;
                            info!("configuration reloaded");
                        }
                    }
                    Err(e) => warn!(error = %e, "failed to re-read changed config file, keeping previous state"),
                },
                Ok(false) => {}
                Err(e) => warn!(error = %e, "failed to stat config file, keeping previous state"),
            }
        }

        if !cfg.no_stats {
            match loader.stats.report(cfg.stats_per_second) {
                Ok(StatsReport::Totals(totals)) => {
                    info!(passed = totals.passed, dropped = totals.dropped, allowed = totals.allowed, "stats");
                }
                Ok(StatsReport::Rates { passed, dropped, allowed }) => {
                    info!(passed_ps = passed, dropped_ps = dropped, allowed_ps = allowed, "stats");
                }
                Err(e) => warn!(error = %e, "stats read failed"),
            }
        }

        std::thread::sleep(sleep_interval);
    }

    let mode = loader.attach_mode;
    loader.shutdown();
    info!(?mode, "data plane detached, shutdown complete");
    Ok(())
}

fn sync_tables(loader: &mut FirewallLoader, cfg: &FirewallFileConfig) -> Result<()> {
    let filters = cfg.wire_filters().context("invalid filter list")?;
    let ranges = cfg.wire_range_drops().context("invalid range-drop list")?;
    loader.filters.sync(&filters).context("filter table sync failed")?;
    match loader.ranges.as_mut() {
        Some(table) => table.sync(&ranges).context("range-drop table sync failed")?,
        None if !ranges.is_empty() => {
            warn!("range-drop entries configured but no range-drop map is loaded, ignoring them")
        }
        None => {}
    }
    Ok(())
}
