//! mtime-based config-change detection, used by the CP main loop to decide
//! when to re-read and re-sync the config file instead of polling a
//! filesystem-notify backend. Matches the original loader's
//! `update_time`-gated `stat()` check.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{ConfigError, Result};

#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_mtime: Option<SystemTime>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), last_mtime: None }
    }

    /// Records the file's current mtime without reporting a change. Call
    /// once right after the first successful load.
    pub fn arm(&mut self) -> Result<()> {
        self.last_mtime = Some(self.mtime()?);
        Ok(())
    }

    /// Returns `true` exactly once per mtime advance, updating the stored
    /// baseline as a side effect. A missing file is treated as "unchanged"
    /// rather than an error — the caller keeps running on the last-good
    /// config if the file is briefly absent mid-rewrite. Uses a strictly-
    /// advanced comparison rather than any-change: a clock regression (NTP
    /// step, restored backup) can otherwise produce an mtime that differs
    /// from the baseline without the file having meaningfully changed.
    pub fn poll(&mut self) -> Result<bool> {
        let current = match self.mtime() {
            Ok(m) => m,
            Err(_) => return Ok(false),
        };
        let changed = current > self.last_mtime.unwrap_or(SystemTime::UNIX_EPOCH);
        self.last_mtime = Some(current);
        Ok(changed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mtime(&self) -> Result<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|source| ConfigError::Read { path: self.path.display().to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn detects_rewrite() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interface = \"eth0\"").unwrap();
        let mut watcher = ConfigWatcher::new(file.path());
        watcher.arm().unwrap();
        assert!(!watcher.poll().unwrap());

        sleep(Duration::from_millis(10));
        writeln!(file, "update_time = 9").unwrap();
        file.flush().unwrap();
        assert!(watcher.poll().unwrap());
        assert!(!watcher.poll().unwrap());
    }

    #[test]
    fn missing_file_reports_unchanged() {
        let mut watcher = ConfigWatcher::new("/nonexistent/path/xdpfw.conf");
        assert!(!watcher.poll().unwrap());
    }
}
