use crate::error::ArchiveError;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_FILE_NAME: &str = "sync.lock";

/// Exclusive advisory lock on the state directory, released on drop.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        fs::create_dir_all(state_dir)
            .with_context(|| format!("failed to create {}", state_dir.display()))?;
        let path = state_dir.join(LOCK_FILE_NAME);
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            return Err(ArchiveError::Locked(path.display().to_string()).into());
        }

        file.set_len(0)
            .with_context(|| format!("failed to truncate {}", path.display()))?;
        writeln!(file, "{}", std::process::id())
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_lock_on_same_state_dir_is_refused() {
        let tmp = tempdir().expect("tempdir");
        let held = StateLock::acquire(tmp.path()).expect("first lock");
        let err = StateLock::acquire(tmp.path()).expect_err("second lock");
        let archive_err = err.downcast_ref::<ArchiveError>().expect("archive error");
        assert_eq!(archive_err.code(), "E007_LOCKED");

        drop(held);
        StateLock::acquire(tmp.path()).expect("lock after release");
    }

    #[test]
    fn lock_file_records_pid() {
        let tmp = tempdir().expect("tempdir");
        let lock = StateLock::acquire(&tmp.path().join("state")).expect("lock");
        let raw = fs::read_to_string(lock.path()).expect("read");
        assert_eq!(raw.trim(), std::process::id().to_string());
    }
}
