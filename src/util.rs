use crate::config::HarvestOptions;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install the global fmt subscriber once. `RUST_LOG` wins over `opts.log_level`;
/// with `opts.log_file` set, events are appended to that file instead of stderr.
pub fn init_tracing_once(opts: &HarvestOptions) {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| opts.log_level.clone());
        let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
        match opts.log_file.as_deref() {
            Some(path) => match open_log_file(path) {
                Ok(file) => {
                    let _ = builder.with_ansi(false).with_writer(Mutex::new(file)).try_init();
                }
                Err(e) => {
                    let _ = builder.try_init();
                    tracing::warn!("Cannot open log file {}, logging to stderr: {:#}", path.display(), e);
                }
            },
            None => {
                let _ = builder.try_init();
            }
        }
    });
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))
}

// -------- robust open/create with backoff --------

/// Return true for transient I/O errors seen on Windows when filter drivers
/// (AV/backup), network volumes or sharing violations get in the way.
#[cfg(windows)]
fn is_retriable_io_error(e: &io::Error) -> bool {
    //   5    = access denied (often AV/share)
    //   21   = device not ready
    //   32   = sharing violation
    //   33   = lock violation
    //   1224 = user-mapped section open
    matches!(e.raw_os_error(), Some(5 | 21 | 32 | 33 | 1224))
}

/// Elsewhere the same raw codes mean real failures (EIO, EISDIR); never retry.
#[cfg(not(windows))]
fn is_retriable_io_error(_e: &io::Error) -> bool {
    false
}

/// Create a file with retries/backoff for transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match File::create(path) {
            Ok(f) => return Ok(f),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "create failed")))
}

/// Remove a file with retries/backoff for transient errors.
/// Succeeds if the file doesn't exist.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match fs::remove_file(path) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "remove failed")))
        .with_context(|| format!("remove (retries) {}", path.display()))
}

/// Rename a file with retries/backoff for transient errors.
fn rename_with_backoff(src: &Path, dest: &Path, tries: usize, delay_ms: u64) -> Result<()> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match fs::rename(src, dest) {
            Ok(_) => return Ok(()),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e).with_context(|| format!("rename {} -> {}", src.display(), dest.display())),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "rename failed")))
        .with_context(|| format!("rename (retries) {} -> {}", src.display(), dest.display()))
}

/// Atomically replace `dest` with `tmp`. The destination either keeps its old
/// content or gets the complete new one; a crash never leaves a torn file there.
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    let tries = 20usize;
    let delay_ms = 50u64;
    match rename_with_backoff(tmp, dest, tries, delay_ms) {
        Ok(()) => Ok(()),
        Err(e) => {
            remove_with_backoff(tmp, tries, delay_ms)?;
            Err(e)
        }
    }
}
