//! Periodic stats reporting: sum the per-CPU `GlobalStats` slot and either
//! report absolute totals or per-second rates against the previous snapshot.

use std::time::Instant;

use aya::maps::{MapData, PerCpuArray};

use xdpfw_common::config::map_names;
use xdpfw_common::types::GlobalStats;

use crate::error::{LoaderError, Result};

pub struct StatsReader {
    map: PerCpuArray<MapData, GlobalStats>,
    previous: Option<(Instant, GlobalStats)>,
}

/// What to display for one reporting tick.
#[derive(Debug, Clone, Copy)]
pub enum StatsReport {
    Totals(GlobalStats),
    /// Per-second rate, computed as `delta / elapsed_secs`.
    Rates { passed: f64, dropped: f64, allowed: f64 },
}

impl StatsReader {
    pub fn open(ebpf: &mut aya::Ebpf) -> Result<Self> {
        let map_data = ebpf
            .take_map(map_names::GLOBAL_STATS)
            .ok_or(LoaderError::RequiredMapMissing(map_names::GLOBAL_STATS))?;
        let map = PerCpuArray::try_from(map_data)
            .map_err(|e| LoaderError::Map(map_names::GLOBAL_STATS, e))?;
        Ok(Self { map, previous: None })
    }

    fn read_totals(&self) -> Result<GlobalStats> {
        let values = self
            .map
            .get(&0, 0)
            .map_err(|e| LoaderError::Map(map_names::GLOBAL_STATS, e))?;
        let mut total = GlobalStats::default();
        for per_cpu in values.iter() {
            total.merge(per_cpu);
        }
        Ok(total)
    }

    pub fn report(&mut self, as_rate: bool) -> Result<StatsReport> {
        let now = Instant::now();
        let totals = self.read_totals()?;

        if !as_rate {
            self.previous = Some((now, totals));
            return Ok(StatsReport::Totals(totals));
        }

        let report = match self.previous {
            Some((prev_time, prev_totals)) => {
                let elapsed = now.duration_since(prev_time).as_secs_f64().max(f64::EPSILON);
                StatsReport::Rates {
                    passed: (totals.passed.saturating_sub(prev_totals.passed)) as f64 / elapsed,
                    dropped: (totals.dropped.saturating_sub(prev_totals.dropped)) as f64 / elapsed,
                    allowed: (totals.allowed.saturating_sub(prev_totals.allowed)) as f64 / elapsed,
                }
            }
            None => StatsReport::Rates { passed: 0.0, dropped: 0.0, allowed: 0.0 },
        };
        self.previous = Some((now, totals));
        Ok(report)
    }
}
