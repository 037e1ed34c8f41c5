//! Filter-table and CIDR-range-drop synchronization. Grounded on
//! `huginn-proxy-ebpf`'s `probe.rs` map-handle pattern (`Ebpf::map`/`map_mut`
//! plus a typed `try_from`), generalized to the per-CPU, delete-then-rewrite
//! sync routine this project's loader requires.

use aya::maps::lpm_trie::{Key as LpmKey, LpmTrie};
use aya::maps::{MapData, PerCpuArray, PerCpuValues};
use aya::Ebpf;
use tracing::warn;

use xdpfw_common::config::map_names;
use xdpfw_common::limits::MAX_FILTERS;
use xdpfw_common::types::Filter;

use crate::error::{LoaderError, Result};

pub struct FilterTable {
    map: PerCpuArray<MapData, Filter>,
    num_cpus: usize,
}

impl FilterTable {
    pub fn open(ebpf: &mut Ebpf) -> Result<Self> {
        let map_data = ebpf
            .take_map(map_names::FILTERS)
            .ok_or(LoaderError::RequiredMapMissing(map_names::FILTERS))?;
        let map = PerCpuArray::try_from(map_data)
            .map_err(|e| LoaderError::Map(map_names::FILTERS, e))?;
        let num_cpus = aya::util::nr_cpus().map_err(|e| LoaderError::Io(e))?;
        Ok(Self { map, num_cpus })
    }

    /// Delete-then-rewrite pass: every config-position slot is cleared
    /// first, then enabled filters are written into a fresh contiguous run
    /// of indices starting at 0, in config order. Running this twice with
    /// the same `filters` produces an identical table (sync idempotence).
    pub fn sync(&mut self, filters: &[Filter]) -> Result<()> {
        let disabled = Filter::default();
        for i in 0..MAX_FILTERS {
            let values = self.replicate(disabled)?;
            self.map
                .set(i, values, 0)
                .map_err(|e| LoaderError::Map(map_names::FILTERS, e))?;
        }

        let mut next_index = 0u32;
        for filter in filters.iter().filter(|f| f.enabled != 0) {
            if next_index >= MAX_FILTERS {
                break;
            }
            let values = self.replicate(*filter)?;
            self.map
                .set(next_index, values, 0)
                .map_err(|e| LoaderError::Map(map_names::FILTERS, e))?;
            next_index += 1;
        }
        Ok(())
    }

    fn replicate(&self, value: Filter) -> Result<PerCpuValues<Filter>> {
        let values: Vec<Filter> = std::iter::repeat(value).take(self.num_cpus).collect();
        PerCpuValues::try_from(values).map_err(|e| LoaderError::Map(map_names::FILTERS, e))
    }
}

pub struct RangeDropTable {
    map: LpmTrie<MapData, u32, u8>,
}

impl RangeDropTable {
    /// `None` if the loaded object has no range-drop map — optional per
    /// SPEC_FULL.md §4.3 item 3, degraded with a warning rather than
    /// aborting startup.
    pub fn open(ebpf: &mut Ebpf) -> Option<Self> {
        let map_data = match ebpf.take_map(map_names::RANGE_DROP) {
            Some(m) => m,
            None => {
                warn!(map = map_names::RANGE_DROP, "range-drop map not present, CIDR drop disabled");
                return None;
            }
        };
        match LpmTrie::try_from(map_data) {
            Ok(map) => Some(Self { map }),
            Err(e) => {
                warn!(map = map_names::RANGE_DROP, error = %e, "range-drop map has unexpected type, CIDR drop disabled");
                None
            }
        }
    }

    /// Clears every existing entry, then inserts `ranges` as
    /// `(network, prefix_len)` pairs. Presence in the trie is the signal —
    /// the stored value is unused.
    pub fn sync(&mut self, ranges: &[(u32, u8)]) -> Result<()> {
        let existing: Vec<LpmKey<u32>> = self
            .map
            .keys()
            .filter_map(|k| k.ok())
            .collect();
        for key in existing {
            let _ = self.map.remove(&key);
        }
        for &(network, prefix_len) in ranges {
            let key = LpmKey::new(u32::from(prefix_len), network);
            self.map
                .insert(&key, 0u8, 0)
                .map_err(|e| LoaderError::Map(map_names::RANGE_DROP, e))?;
        }
        Ok(())
    }
}
