//! Resolves the bytes of the compiled DP object: either the copy embedded at
//! build time (via `build.rs` cross-compiling `xdpfw-ebpf`) or an operator
//! override, so the binary works standalone without a separate `.o` file on
//! disk, matching `huginn-proxy-ebpf`'s `probe.rs` embedding pattern.

use std::borrow::Cow;
use std::path::PathBuf;

use xdpfw_common::config::BPF_OBJ_PATH_ENV;

use crate::error::Result;

/// Bytes produced by `build.rs`, aligned to 8 bytes as aya's ELF parser
/// requires.
static EMBEDDED_BPF_OBJ: &[u8] = aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/xdpfw.bpf.o"));

/// Source the loader obtained the DP object bytes from, surfaced for
/// startup logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectSource {
    Embedded,
    File(PathBuf),
}

pub fn resolve_object() -> Result<(Cow<'static, [u8]>, ObjectSource)> {
    if let Ok(path) = std::env::var(BPF_OBJ_PATH_ENV) {
        let path = PathBuf::from(path);
        let bytes = std::fs::read(&path)?;
        return Ok((Cow::Owned(bytes), ObjectSource::File(path)));
    }
    Ok((Cow::Borrowed(EMBEDDED_BPF_OBJ), ObjectSource::Embedded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Serializes tests that touch the process-global BPF_OBJ_PATH_ENV var.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn env_override_wins_over_embedded_object() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a real ELF, just a marker").unwrap();
        std::env::set_var(BPF_OBJ_PATH_ENV, file.path());

        let (bytes, source) = resolve_object().unwrap();
        assert_eq!(&*bytes, b"not a real ELF, just a marker");
        assert_eq!(source, ObjectSource::File(file.path().to_path_buf()));

        std::env::remove_var(BPF_OBJ_PATH_ENV);
    }
}
