//! **alfred-mullvad**: an Alfred workflow for the Mullvad VPN client.
//!
//! Each keystroke in the launcher runs the `alfred-mullvad` binary with the
//! current query.  The query is parsed into a [`command::QueryKind`], the
//! `mullvad` command-line client is consulted, and a list of launcher items
//! is printed as JSON.  Selecting an item runs the shell command stored in
//! its `arg`.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::VpnClient`]: runs client subcommands so the rendering logic
//!   is not coupled to a real `mullvad` binary.
//! * [`traits::CacheStore`]: keyed text store with expiry, used for the
//!   relay list, version and account information.
//!
//! [`mullvad`] holds the production client and the parsers for its text
//! output; [`relay`] parses the `relay list` hierarchy.  The slow relay
//! list is re-read by the detached `mullvad-refresh` binary (see
//! [`refresh`]).

pub mod actions;
pub mod cache;
pub mod command;
pub mod config;
pub mod feedback;
pub mod mullvad;
pub mod refresh;
pub mod relay;
pub mod traits;
pub mod workflow;
