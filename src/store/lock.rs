use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::store::StoreError;

/// How long a save waits for another writer before giving up
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

const POLL: Duration = Duration::from_millis(10);

/// Exclusive hold on a store file for the span of one read-modify-write.
///
/// The hold lives on a sibling `<file>.lock`, never on the store file itself,
/// because the store file is replaced by rename on every write. The sibling
/// is left in place after release: unlinking it would let a waiter lock a
/// stale inode while a newcomer locks a fresh one.
pub struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Take the hold for `store_path`, polling for up to `wait`
    pub fn hold(store_path: &Path, wait: Duration) -> Result<Self, StoreError> {
        let path = sibling_lock_path(store_path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::LockOpen {
                path: path.clone(),
                source: e,
            })?;

        let deadline = Instant::now() + wait;
        while !try_exclusive(&file) {
            if Instant::now() >= deadline {
                return Err(StoreError::LockBusy { path });
            }
            std::thread::sleep(POLL);
        }
        debug!(path = %path.display(), "store lock held");
        Ok(StoreLock { _file: file })
    }
}

fn sibling_lock_path(store_path: &Path) -> PathBuf {
    let mut name: OsString = store_path.file_name().map(Into::into).unwrap_or_default();
    name.push(".lock");
    store_path.with_file_name(name)
}

/// Non-blocking exclusive flock; released when the file closes
#[cfg(unix)]
fn try_exclusive(file: &File) -> bool {
    use std::os::unix::io::AsRawFd;
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
}

#[cfg(not(unix))]
fn try_exclusive(_file: &File) -> bool {
    true
}
