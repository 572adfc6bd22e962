//! Core traits that decouple the workflow from the Mullvad binary and from
//! the on-disk cache.
//!
//! The [`Workflow`](crate::workflow::Workflow) only depends on these
//! abstractions; [`MullvadCli`](crate::mullvad::cli::MullvadCli) and
//! [`FileCache`](crate::cache::FileCache) are the production backends.

use std::time::Duration;

/// Abstraction over the external VPN command-line client.
///
/// An implementation might spawn the real `mullvad` binary, or it might be
/// a scripted stub used in tests.
pub trait VpnClient {
    /// The error type produced by this client.
    type Error: std::error::Error + Send + 'static;

    /// Whether the client binary is available at all.
    fn is_installed(&self) -> bool;

    /// Run one subcommand (e.g. `["relay", "list"]`) and return its
    /// standard output.
    ///
    /// A failed invocation must surface as `Err`, never as output text.
    fn run(&self, args: &[&str]) -> Result<String, Self::Error>;

    /// Shell command line that performs `args` when the user selects an
    /// item.  The launcher executes it; the workflow never does.
    fn command_line(&self, args: &[&str]) -> String;
}

/// Keyed string store with per-key expiry.
///
/// Values are opaque text; typed access goes through
/// [`cached_data`](crate::cache::cached_data).
pub trait CacheStore {
    /// The error type produced by this store.
    type Error: std::error::Error + Send + 'static;

    /// Return the value for `key` if present and younger than `max_age`.
    fn load(&self, key: &str, max_age: Duration) -> Option<String>;

    /// Overwrite the value for `key`.
    fn store(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Delete every entry.
    fn clear(&self) -> Result<(), Self::Error>;
}
