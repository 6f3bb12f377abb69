//! Pid file reporting

use crate::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `pid` to `path` atomically.
///
/// The pid goes to a uniquely named temporary file in the same directory,
/// which is then renamed into place.
pub fn write_pid_file(path: impl AsRef<Path>, pid: u32) -> Result<()> {
    let path = path.as_ref();
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = NamedTempFile::new_in(parent)?;
    write!(file, "{}", pid)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    tracing::debug!(path = %path.display(), pid, "pid file written");
    Ok(())
}
