//! Cross-process lock serializing access to one I2C bus

use std::fs::{File, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Shared by every user of the bus, whoever created it first
const LOCK_MODE: u32 = 0o666;

/// Guard that holds the lock file open. Lock is released when dropped.
pub struct BusLock {
    file: File,
    path: PathBuf,
}

impl BusLock {
    /// Block until this process owns the bus.
    pub fn acquire(device: &Path) -> io::Result<Self> {
        Self::acquire_at(Self::path(device))
    }

    fn acquire_at(path: PathBuf) -> io::Result<Self> {
        let (mut file, writable) = Self::open(&path)?;

        if file.try_lock().is_err() {
            log::debug!("waiting for bus lock {}", path.display());
            file.lock()?;
        }

        // PID of the holder, for whoever is waiting
        if writable {
            file.set_len(0)?;
            writeln!(file, "{}", std::process::id())?;
        }

        Ok(Self { file, path })
    }

    /// Open for writing when allowed, otherwise read-only: flock does not
    /// care about the access mode.
    fn open(path: &Path) -> io::Result<(File, bool)> {
        let opened = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(LOCK_MODE)
            .open(path);
        match opened {
            Ok(file) => {
                // creation mode is masked by the umask
                if let Err(e) = file.set_permissions(Permissions::from_mode(LOCK_MODE)) {
                    log::debug!("leaving mode of {} as is: {e}", path.display());
                }
                Ok((file, true))
            },
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                log::debug!("{} is not writable, locking read-only", path.display());
                Ok((File::open(path)?, false))
            },
            Err(e) => Err(e),
        }
    }

    pub fn path_held(&self) -> &Path {
        &self.path
    }

    /// Lock file for a bus device, e.g. `/dev/i2c-1` -> `$TMP/hatctl-dev-i2c-1.lock`
    fn path(device: &Path) -> PathBuf {
        let name: String = device
            .to_string_lossy()
            .trim_start_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        std::env::temp_dir().join(format!("hatctl-{name}.lock"))
    }
}

impl Drop for BusLock {
    fn drop(&mut self) {
        // The file is left in place: a waiter may already hold it open.
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn path_is_derived_from_device() {
        let path = BusLock::path(Path::new("/dev/i2c-1"));
        assert_eq!(path.file_name().unwrap(), "hatctl-dev-i2c-1.lock");
    }

    #[test]
    fn second_holder_waits_for_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bus.lock");

        let first = BusLock::acquire_at(path.clone()).unwrap();
        assert_eq!(first.path_held(), path);

        let (tx, rx) = mpsc::channel();
        let waiter = thread::spawn(move || {
            let _second = BusLock::acquire_at(path).unwrap();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(first);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
    }

    #[test]
    fn lock_file_is_shared_between_users() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bus.lock");
        drop(BusLock::acquire_at(path.clone()).unwrap());
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, LOCK_MODE);
    }

    #[test]
    fn read_only_lock_file_still_locks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bus.lock");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, Permissions::from_mode(0o444)).unwrap();

        let (file, _) = BusLock::open(&path).unwrap();
        file.try_lock().unwrap();
        let (other, _) = BusLock::open(&path).unwrap();
        assert!(other.try_lock().is_err());
    }
}
