use crate::error::{IoContext, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Once;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: Once = Once::new();

/// Install the fmt subscriber once per process. `RUST_LOG` wins over `verbose`.
pub fn init_tracing_once(verbose: bool) {
    INIT_ONCE.call_once(|| {
        let default = if verbose { "debug" } else { "info" };
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default.to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .try_init();
    });
}

const TRIES: usize = 16;
const DELAY_MS: u64 = 50;

/// Transient errors worth retrying: sharing/lock violations from AV scanners,
/// sync clients and network volumes.
fn is_retriable_io_error(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(5) | Some(21) | Some(32) | Some(33) | Some(1224))
        || e.kind() == io::ErrorKind::Interrupted
}

/// Run `op` until it succeeds, fails with a non-retriable error, or `TRIES` is exhausted.
fn with_backoff<T>(mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut last_err = None;
    for i in 0..TRIES {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(DELAY_MS.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "retries exhausted")))
}

pub fn open_with_backoff(path: &Path) -> io::Result<File> {
    with_backoff(|| File::open(path))
}

pub fn create_with_backoff(path: &Path) -> io::Result<File> {
    with_backoff(|| File::create(path))
}

/// Remove a file; a missing file counts as success.
pub fn remove_with_backoff(path: &Path) -> Result<()> {
    match with_backoff(|| fs::remove_file(path)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).io_context(|| format!("remove {}", path.display())),
    }
}

/// Make sure the parent directory of `path` exists.
pub fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).io_context(|| format!("create dir {}", dir.display()))
        }
        _ => Ok(()),
    }
}

/// Promote `tmp` to `dest`, replacing any existing file.
/// Falls back to copy+remove when rename is refused (e.g. across devices).
pub fn replace_file_atomic_backoff(tmp: &Path, dest: &Path) -> Result<()> {
    match with_backoff(|| fs::rename(tmp, dest)) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!("rename {} -> {} failed ({rename_err}); copying", tmp.display(), dest.display());
            with_backoff(|| fs::copy(tmp, dest))
                .io_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
            remove_with_backoff(tmp)
        }
    }
}
