//! Query vocabulary shared by every component.
//!
//! The launcher hands the workflow a single free-text query.  It is parsed
//! exactly once into a [`QueryKind`], and the
//! [`Workflow`](crate::workflow::Workflow) dispatches on that value with a
//! single exhaustive `match`.
//!
//! Prefixes are tested in a fixed priority order and the first match wins:
//!
//! | Prefix                                         | Kind                      |
//! |------------------------------------------------|---------------------------|
//! | `check`                                        | [`QueryKind::Check`]      |
//! | `always-require-vpn`, `block-when-disconnected`, `kill-switch` | [`QueryKind::KillSwitch`] |
//! | `relay`                                        | [`QueryKind::Relay`]      |
//! | `country:`                                     | [`QueryKind::Country`]    |
//! | `lan`                                          | [`QueryKind::Lan`]        |
//! | `auto-connect`                                 | [`QueryKind::AutoConnect`]|
//! | `reconnect`                                    | [`QueryKind::Reconnect`]  |
//! | `protocol`, `tunnel`                           | [`QueryKind::Protocol`]   |
//! | `account`                                      | [`QueryKind::Account`]    |
//! | `workflow:delcache`                            | [`QueryKind::ClearCache`] |
//! | anything else                                  | [`QueryKind::Search`]     |
//!
//! An absent or blank query is [`QueryKind::Home`].

use std::fmt;

const KILL_SWITCH_PREFIXES: &[&str] = &["always-require-vpn", "block-when-disconnected", "kill-switch"];
const PROTOCOL_PREFIXES: &[&str] = &["protocol", "tunnel"];

/// Autocomplete token that triggers a cache wipe.
pub const CLEAR_CACHE_TOKEN: &str = "workflow:delcache";

/// Every screen the workflow can render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// No query: the composite home screen.
    Home,
    /// Link to the connection-check web page.
    Check,
    /// Kill-switch (always-require-vpn) status and toggle.
    KillSwitch,
    /// Country list, optionally filtered by the second query word.
    Relay { filter: Option<String> },
    /// City list of one country, optionally filtered.
    Country { code: String, filter: Option<String> },
    /// Local network sharing status and toggle.
    Lan,
    /// Auto-connect setting.
    AutoConnect,
    /// Reconnect the tunnel.
    Reconnect,
    /// Tunnel protocol chooser, optionally filtered.
    Protocol { filter: Option<String> },
    /// Account number and expiry.
    Account,
    /// Wipe every cache entry.
    ClearCache,
    /// Substring search over the static action catalog.
    Search(String),
}

impl QueryKind {
    /// Derive the kind from the raw launcher query.
    pub fn parse(query: Option<&str>) -> Self {
        let query = match query {
            Some(q) if !q.trim().is_empty() => q,
            _ => return QueryKind::Home,
        };

        if query.starts_with("check") {
            QueryKind::Check
        } else if KILL_SWITCH_PREFIXES.iter().any(|p| query.starts_with(p)) {
            QueryKind::KillSwitch
        } else if query.starts_with("relay") {
            QueryKind::Relay {
                filter: second_word(query),
            }
        } else if let Some(rest) = query.strip_prefix("country:") {
            QueryKind::Country {
                code: rest.split_whitespace().next().unwrap_or_default().to_string(),
                filter: second_word(query),
            }
        } else if query.starts_with("lan") {
            QueryKind::Lan
        } else if query.starts_with("auto-connect") {
            QueryKind::AutoConnect
        } else if query.starts_with("reconnect") {
            QueryKind::Reconnect
        } else if PROTOCOL_PREFIXES.iter().any(|p| query.starts_with(p)) {
            QueryKind::Protocol {
                filter: second_word(query),
            }
        } else if query.starts_with("account") {
            QueryKind::Account
        } else if query.starts_with(CLEAR_CACHE_TOKEN) {
            QueryKind::ClearCache
        } else {
            QueryKind::Search(query.to_string())
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Home => write!(f, "home"),
            QueryKind::Check => write!(f, "check"),
            QueryKind::KillSwitch => write!(f, "kill-switch"),
            QueryKind::Relay { .. } => write!(f, "relay"),
            QueryKind::Country { code, .. } => write!(f, "country:{}", code),
            QueryKind::Lan => write!(f, "lan"),
            QueryKind::AutoConnect => write!(f, "auto-connect"),
            QueryKind::Reconnect => write!(f, "reconnect"),
            QueryKind::Protocol { .. } => write!(f, "protocol"),
            QueryKind::Account => write!(f, "account"),
            QueryKind::ClearCache => write!(f, "clear-cache"),
            QueryKind::Search(q) => write!(f, "search {:?}", q),
        }
    }
}

/// The whitespace-delimited word after the command word, if any.
fn second_word(query: &str) -> Option<String> {
    query.split_whitespace().nth(1).map(str::to_string)
}
