/// Single-instance guard
///
/// Two markers live in the lock directory: the lock marker, created with
/// exclusive-create semantics so only one process can install it, and the PID
/// marker naming the holder. Both carry the holder's PID. A marker pair whose
/// PID is no longer alive is stale and gets reclaimed; with `force`, a live
/// holder is killed (SIGKILL) first.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessStatus, System};
use tracing::{debug, error, info, warn};

use crate::core::config::RunConfig;
use crate::core::error::LockError;

const MAX_ATTEMPTS: usize = 3;
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Grace for a holder that has created the lock marker but not yet written its PID
const INSTALL_GRACE: Duration = Duration::from_millis(100);

/// Whether `pid` names a running process (zombies count as dead)
pub fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return false;
    }

    system
        .process(pid)
        .map(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
        .unwrap_or(false)
}

/// Send SIGKILL to `pid`; returns false if the signal could not be delivered
pub fn kill_process(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return false;
    }

    system.process(pid).map(|p| p.kill()).unwrap_or(false)
}

fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if !process_alive(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn remove_if_present(path: &Path) -> Result<(), LockError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LockError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct InstanceLock {
    lock_file: PathBuf,
    pid_file: PathBuf,
    owner: u32,
    force: bool,
    kill_timeout: Duration,
    killer: fn(u32) -> bool,
}

impl InstanceLock {
    pub fn new(lock_file: impl Into<PathBuf>, pid_file: impl Into<PathBuf>) -> Self {
        Self {
            lock_file: lock_file.into(),
            pid_file: pid_file.into(),
            owner: std::process::id(),
            force: false,
            kill_timeout: Duration::from_secs(5),
            killer: kill_process,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.lock_file(), config.pid_file())
            .force(config.force)
            .kill_timeout(config.kill_timeout)
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    /// Acquire on behalf of another process id
    pub fn owner(mut self, pid: u32) -> Self {
        self.owner = pid;
        self
    }

    /// PID currently recorded by the markers, if any
    pub fn holder(&self) -> Option<u32> {
        read_pid(&self.pid_file).or_else(|| read_pid(&self.lock_file))
    }

    /// Acquire the lock, evicting stale or (with force) live holders.
    ///
    /// Returns a guard that removes both markers when dropped.
    pub fn acquire(&self) -> Result<LockGuard, LockError> {
        if let Some(dir) = self.lock_file.parent() {
            fs::create_dir_all(dir).map_err(|source| LockError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        for _ in 0..MAX_ATTEMPTS {
            match self.try_install() {
                Ok(guard) => {
                    debug!("Lock acquired by PID {}", self.owner);
                    return Ok(guard);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(source) => {
                    return Err(LockError::Io {
                        path: self.lock_file.clone(),
                        source,
                    })
                }
            }

            let holder = self.holder().or_else(|| {
                thread::sleep(INSTALL_GRACE);
                self.holder()
            });

            match holder {
                Some(pid) if pid != self.owner && process_alive(pid) => {
                    if !self.force {
                        error!("Another instance is already running (PID {}). Exiting.", pid);
                        return Err(LockError::Conflict { pid });
                    }

                    warn!("Force mode enabled. Killing running instance (PID {})", pid);
                    if !(self.killer)(pid) && process_alive(pid) {
                        error!("Could not signal PID {}", pid);
                        return Err(LockError::HolderSurvived { pid });
                    }
                    if !wait_for_exit(pid, self.kill_timeout) {
                        error!("PID {} is still running after kill", pid);
                        return Err(LockError::HolderSurvived { pid });
                    }
                    self.clear_markers(Some(pid))?;
                }
                Some(pid) => {
                    info!("Removing stale lock left by PID {}", pid);
                    self.clear_markers(Some(pid))?;
                }
                None => {
                    warn!("Lock file {} has no readable PID. Removing it", self.lock_file.display());
                    self.clear_markers(None)?;
                }
            }
        }

        Err(LockError::Contended)
    }

    /// Exclusively create the lock marker, then publish the PID marker
    fn try_install(&self) -> std::io::Result<LockGuard> {
        let mut lock = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_file)?;

        let published = writeln!(lock, "{}", self.owner).and_then(|_| self.write_pid_file());
        if let Err(e) = published {
            let _ = fs::remove_file(&self.lock_file);
            return Err(e);
        }

        Ok(LockGuard {
            lock_file: self.lock_file.clone(),
            pid_file: self.pid_file.clone(),
            owner: self.owner,
        })
    }

    fn write_pid_file(&self) -> std::io::Result<()> {
        let staging = self.pid_file.with_extension("pid.tmp");
        fs::write(&staging, format!("{}\n", self.owner))?;
        fs::rename(&staging, &self.pid_file)
    }

    /// Remove both markers, unless they changed hands since `expected` was read
    fn clear_markers(&self, expected: Option<u32>) -> Result<(), LockError> {
        if let Some(pid) = expected {
            if self.holder() != Some(pid) {
                debug!("Lock changed hands while clearing; retrying");
                return Ok(());
            }
        }

        remove_if_present(&self.pid_file)?;
        remove_if_present(&self.lock_file)
    }
}

/// Held lock; dropping it removes both markers
#[derive(Debug)]
pub struct LockGuard {
    lock_file: PathBuf,
    pid_file: PathBuf,
    owner: u32,
}

impl LockGuard {
    pub fn owner(&self) -> u32 {
        self.owner
    }

    pub fn lock_file(&self) -> &Path {
        &self.lock_file
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Leave markers alone if a forced run has taken them over
        let recorded = read_pid(&self.pid_file).or_else(|| read_pid(&self.lock_file));
        if recorded.is_some() && recorded != Some(self.owner) {
            warn!("Lock now held by PID {:?}; not removing it", recorded);
            return;
        }

        for path in [&self.pid_file, &self.lock_file] {
            if let Err(e) = remove_if_present(path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
        debug!("Lock released by PID {}", self.owner);
    }
}
