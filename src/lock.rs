//! Cross-process advisory locking, scoped to a repository's shared git
//! directory.
//!
//! An exclusive `fs2` lock is taken on a `.lock` file sibling to whatever
//! it's guarding. `fs2` has no built-in timeout, so acquisition polls
//! `try_lock_exclusive` with a short sleep instead of blocking forever.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::WtError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// An acquired advisory lock. Releases on drop; release is a no-op (and
/// therefore idempotent) if called more than once via `drop`.
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!("failed to release lock {}: {e}", self.path.display());
        }
    }
}

/// Acquire an exclusive lock on `path`, creating it if necessary, polling
/// until `timeout` elapses. `cancelled` is checked between polls so a
/// signal-coordinator cancellation can abort the wait promptly.
pub fn lock_with_timeout(
    path: &Path,
    timeout: Duration,
    cancelled: &Arc<AtomicBool>,
) -> anyhow::Result<LockGuard> {
    if let Some(parent) = path.parent() {
        crate::fs::mkdir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).write(true).open(path)?;

    let deadline = Instant::now() + timeout;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => {
                log::debug!("acquired lock {}", path.display());
                return Ok(LockGuard { file, path: path.to_path_buf() });
            }
            Err(_) => {
                if cancelled.load(Ordering::SeqCst) {
                    return Err(WtError::Interrupted.into());
                }
                if Instant::now() >= deadline {
                    return Err(WtError::LockTimedOut { path: path.to_path_buf() }.into());
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;

    #[test]
    fn lock_then_unlock_allows_reacquire() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wt.lock");
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let _guard = lock_with_timeout(&path, Duration::from_secs(1), &cancelled).unwrap();
        }
        let _guard2 = lock_with_timeout(&path, Duration::from_secs(1), &cancelled).unwrap();
    }

    #[test]
    fn contended_lock_times_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wt.lock");
        let cancelled = Arc::new(AtomicBool::new(false));
        let _held = lock_with_timeout(&path, Duration::from_secs(1), &cancelled).unwrap();

        let result = lock_with_timeout(&path, Duration::from_millis(150), &cancelled);
        assert!(matches!(
            result.unwrap_err().downcast_ref::<WtError>(),
            Some(WtError::LockTimedOut { .. })
        ));
    }

    #[test]
    fn cancelled_wait_returns_interrupted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wt.lock");
        let cancelled = Arc::new(AtomicBool::new(true));
        let _held = lock_with_timeout(&path, Duration::from_secs(5), &cancelled).unwrap();
        drop(_held);

        let held2 = OpenOptions::new().create(true).write(true).open(&path).unwrap();
        held2.lock_exclusive().unwrap();

        let result = lock_with_timeout(&path, Duration::from_secs(5), &cancelled);
        assert!(matches!(
            result.unwrap_err().downcast_ref::<WtError>(),
            Some(WtError::Interrupted)
        ));
    }
}
