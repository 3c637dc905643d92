//! Exclusive per-tenant advisory lock
//!
//! One lock file per tenant at `{store_root}/{tenant_id}.lock`. The lock is
//! advisory and process-external, so it also serializes against other
//! processes sharing the same store root. Scope is the whole tenant, not a
//! single competition: a score replace in one competition blocks aggregation
//! reads for every competition of that tenant.
//!
//! Acquisition polls a non-blocking exclusive lock until a deadline and then
//! fails with a distinct timeout error; the guarded section must not start
//! without the lock. Release happens on drop, on every exit path.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use podium_core::{Error, Result, TenantId};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lock file path for a tenant, a pure function of the numeric ID.
pub fn lock_path(store_root: &Path, tenant_id: TenantId) -> PathBuf {
    store_root.join(format!("{tenant_id}.lock"))
}

/// Held exclusive lock for one tenant. Dropping the guard releases it.
#[derive(Debug)]
pub struct TenantLock {
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl TenantLock {
    /// Acquire the tenant's exclusive lock, waiting up to `timeout`.
    ///
    /// The wait is a poll loop over a non-blocking lock so the async runtime
    /// is never parked on a blocking syscall.
    pub async fn acquire(
        store_root: &Path,
        tenant_id: TenantId,
        timeout: Duration,
    ) -> Result<Self> {
        let path = lock_path(store_root, tenant_id);
        let file = Self::open_lock_file(&path)?;
        let deadline = Instant::now() + timeout;

        loop {
            if Self::try_lock_file(&file)? {
                debug!(path = %path.display(), "acquired tenant lock");
                return Ok(Self { file, path });
            }
            if Instant::now() >= deadline {
                return Err(Error::LockTimeout(path.display().to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Try to acquire without waiting. `None` means another holder exists.
    pub fn try_acquire(store_root: &Path, tenant_id: TenantId) -> Result<Option<Self>> {
        let path = lock_path(store_root, tenant_id);
        let file = Self::open_lock_file(&path)?;
        if Self::try_lock_file(&file)? {
            Ok(Some(Self { file, path }))
        } else {
            Ok(None)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_lock_file(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // The lock file is never truncated or removed: holders lock the
        // inode, and unlinking it would let two holders lock different
        // inodes under the same path.
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }

    #[cfg(unix)]
    fn try_lock_file(file: &File) -> Result<bool> {
        use std::os::unix::io::AsRawFd;

        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if result == 0 {
            Ok(true)
        } else {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::WouldBlock {
                Ok(false)
            } else {
                Err(Error::Io(err))
            }
        }
    }

    #[cfg(windows)]
    fn try_lock_file(file: &File) -> Result<bool> {
        use std::os::windows::io::AsRawHandle;
        use winapi::um::fileapi::LockFileEx;
        use winapi::um::minwinbase::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY};

        let handle = file.as_raw_handle();
        let result = unsafe {
            LockFileEx(
                handle as _,
                LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
                0,
                !0,
                !0,
                std::ptr::null_mut(),
            )
        };
        if result != 0 {
            Ok(true)
        } else {
            let err = std::io::Error::last_os_error();
            // ERROR_LOCK_VIOLATION when the lock is held
            if err.raw_os_error() == Some(33) {
                Ok(false)
            } else {
                Err(Error::Io(err))
            }
        }
    }

    #[cfg(unix)]
    fn unlock(&self) {
        use std::os::unix::io::AsRawFd;
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }

    #[cfg(windows)]
    fn unlock(&self) {
        use std::os::windows::io::AsRawHandle;
        use winapi::um::fileapi::UnlockFileEx;
        unsafe {
            UnlockFileEx(self.file.as_raw_handle() as _, 0, !0, !0, std::ptr::null_mut());
        }
    }
}

impl Drop for TenantLock {
    fn drop(&mut self) {
        self.unlock();
    }
}
