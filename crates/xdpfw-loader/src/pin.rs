//! Table pinning with a pre-pin unpin sweep. The sweep is load-bearing: a
//! prior unclean exit leaves pin files behind, and `Map::pin` on most
//! kernels refuses to overwrite an existing pin, so a fresh run would
//! otherwise fail to start against its own leftovers.

use std::path::Path;

use aya::Ebpf;
use tracing::warn;

use xdpfw_common::config::{map_names, PIN_DIR};

use crate::error::{LoaderError, Result};

const REQUIRED_PINNED_MAPS: &[&str] = &[map_names::FILTERS, map_names::BLOCK_V4, map_names::BLOCK_V6];

/// Optional maps: absent when a minimal operator-supplied object (loaded
/// via `XDPFW_BPF_OBJ`) doesn't carry them. Pinning skips these with a
/// warning rather than aborting, matching the same degrade-don't-abort
/// treatment `RangeDropTable::open`/`EventConsumer::open` give them.
const OPTIONAL_PINNED_MAPS: &[&str] = &[map_names::RANGE_DROP, map_names::FILTER_LOG];

fn all_pinned_maps() -> impl Iterator<Item = &'static str> {
    REQUIRED_PINNED_MAPS.iter().copied().chain(OPTIONAL_PINNED_MAPS.iter().copied())
}

/// Removes any leftover pin files under `PIN_DIR` from a prior unclean exit.
/// Errors (including "doesn't exist") are logged and ignored — this is a
/// best-effort sweep, not a precondition.
pub fn unpin_sweep(dir: &Path) {
    for name in all_pinned_maps() {
        let path = dir.join(name);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove leftover pin, continuing");
            }
        }
    }
}

pub fn pin_all(ebpf: &mut Ebpf, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for name in REQUIRED_PINNED_MAPS {
        let map = ebpf.map_mut(name).ok_or(LoaderError::RequiredMapMissing(name))?;
        map.pin(dir.join(name)).map_err(|e| LoaderError::Pin(name, io_err(e)))?;
    }
    for name in OPTIONAL_PINNED_MAPS {
        match ebpf.map_mut(name) {
            Some(map) => {
                if let Err(e) = map.pin(dir.join(name)) {
                    warn!(map = *name, error = %io_err(e), "failed to pin optional map, continuing");
                }
            }
            None => warn!(map = *name, "optional map not present, skipping pin"),
        }
    }
    Ok(())
}

fn io_err(e: aya::pin::PinError) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

pub fn default_pin_dir() -> &'static Path {
    Path::new(PIN_DIR)
}
