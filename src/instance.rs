//! One running instance per base directory.
//!
//! The instance holds an exclusive `flock` on `run/cert-renewer.pid`. A new
//! instance that finds the lock taken reads the holder's PID, sends it
//! `SIGTERM` once, and retries until the holder exits or the wait runs out.
//! The kernel drops the lock when the holder's process ends, so a crashed
//! instance never blocks its successor.

use nix::errno::Errno;
use nix::fcntl::{flock, FlockArg};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::InstanceError;

pub const LOCK_FILE_NAME: &str = "cert-renewer.pid";

const RETRY_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    // Held for the lifetime of the process; closing it releases the flock.
    _file: File,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the lock if it is free, without waiting
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, InstanceError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|source| InstanceError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
            Ok(()) => {}
            Err(Errno::EWOULDBLOCK) => return Ok(None),
            Err(e) => return Err(InstanceError::Lock(e)),
        }

        file.set_len(0).map_err(InstanceError::Write)?;
        file.seek(SeekFrom::Start(0)).map_err(InstanceError::Write)?;
        writeln!(file, "{}", std::process::id()).map_err(InstanceError::Write)?;
        file.flush().map_err(InstanceError::Write)?;

        Ok(Some(Self {
            path: path.to_path_buf(),
            _file: file,
        }))
    }

    /// Take the lock, asking a running holder to terminate first
    pub async fn acquire(path: &Path, wait: Duration) -> Result<Self, InstanceError> {
        let started = Instant::now();
        let mut signalled = false;

        loop {
            if let Some(lock) = Self::try_acquire(path)? {
                info!("Acquired instance lock {}", path.display());
                return Ok(lock);
            }

            let holder = read_holder_pid(path);
            if !signalled {
                if let Some(pid) = holder.filter(|pid| *pid as u32 != std::process::id()) {
                    warn!("Instance {} holds {}, sending SIGTERM", pid, path.display());
                    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
                        warn!("Failed to signal instance {}: {}", pid, e);
                    }
                }
                signalled = true;
            }

            let waited = started.elapsed();
            if waited >= wait {
                return Err(InstanceError::Contended {
                    path: path.to_path_buf(),
                    pid: holder.unwrap_or(0),
                    waited,
                });
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }
}

fn read_holder_pid(path: &Path) -> Option<i32> {
    let mut contents = String::new();
    File::open(path).ok()?.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok().filter(|pid| *pid > 0)
}
