//! Background relay-list refresh.
//!
//! The query handler never waits for the refresh: it spawns the
//! `mullvad-refresh` binary detached and exits.  The refresher claims a
//! marker file in the cache directory so that rapid successive queries
//! start at most one refresher at a time.

use crate::cache::{store_data, CacheError, RELAY_LIST_KEY};
use crate::config::Config;
use crate::relay::RelayList;
use crate::traits::{CacheStore, VpnClient};
use crate::workflow::{fetch_relay_list, invoke, WorkflowError};
use log::{debug, info, warn};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, SystemTime};

/// Name of the refresher executable, installed next to the main binary.
pub const REFRESH_BIN: &str = "mullvad-refresh";

pub const MARKER_FILE: &str = "mullvad_refresh.pid";

/// A marker older than this belongs to a refresher that died.
const MARKER_MAX_AGE: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("failed to store relay list: {0}")]
    Cache(#[from] CacheError),
}

/// Re-read the relay list and overwrite its cache entry.
///
/// A malformed dump leaves the previous entry untouched.  Unchanged client
/// output produces a byte-identical entry.
pub fn refresh_caches<C: VpnClient, S: CacheStore>(
    client: &C,
    cache: &S,
    config: &Config,
) -> Result<RelayList, RefreshError> {
    if config.update_relays_on_refresh {
        match invoke(client, &["relay", "update"]) {
            Ok(_) => debug!("relay update done"),
            Err(e) => warn!("relay update failed, refreshing anyway: {}", e),
        }
    }

    let list = fetch_relay_list(client)?;
    store_data(cache, RELAY_LIST_KEY, &list)?;
    info!("cached {} relay countries", list.countries.len());
    Ok(list)
}

//  Single-instance marker

/// Held by the running refresher; removes the marker when dropped.
#[derive(Debug)]
pub struct RefreshGuard {
    path: PathBuf,
}

impl RefreshGuard {
    /// Claim the marker in `dir`, or `None` if a recent refresher holds it.
    ///
    /// The marker is created exclusively; a stale one is removed and the
    /// claim retried once.
    pub fn acquire(dir: &Path) -> std::io::Result<Option<Self>> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(MARKER_FILE);
        match claim(&path) {
            Ok(()) => return Ok(Some(Self { path })),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }

        if is_running(dir) {
            return Ok(None);
        }
        debug!("replacing stale {}", path.display());
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        match claim(&path) {
            Ok(()) => Ok(Some(Self { path })),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn claim(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    write!(file, "{}", std::process::id())
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Whether a refresher claimed `dir` less than a minute ago.
pub fn is_running(dir: &Path) -> bool {
    let modified = match std::fs::metadata(dir.join(MARKER_FILE)).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age < MARKER_MAX_AGE)
        .unwrap_or(true)
}

/// Start the refresher detached, unless one is already running.
///
/// Returns whether a process was spawned.
pub fn spawn_in_background(cache_dir: &Path) -> std::io::Result<bool> {
    if is_running(cache_dir) {
        debug!("refresh already running");
        return Ok(false);
    }
    let exe = std::env::current_exe()?
        .with_file_name(format!("{}{}", REFRESH_BIN, std::env::consts::EXE_SUFFIX));
    Command::new(&exe)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    debug!("spawned {}", exe.display());
    Ok(true)
}
