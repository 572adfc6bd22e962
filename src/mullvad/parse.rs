//! Typed views of the `mullvad` client's line-oriented text output.
//!
//! The client prints free text meant for humans, so every parser here is
//! coupled to its phrasing.  [`RelayConstraints::parse`] is the most
//! fragile: it reads the location codes from fixed token positions.  Any
//! change in the client's wording makes these parsers return
//! [`UnexpectedOutput`] rather than guessing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Output did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected `{what}` output: {text:?}")]
pub struct UnexpectedOutput {
    pub what: &'static str,
    pub text: String,
}

impl UnexpectedOutput {
    fn new(what: &'static str, text: &str) -> Self {
        Self {
            what,
            text: text.trim().to_string(),
        }
    }
}

//  status

/// Tunnel state tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Connecting,
    Disconnected,
    Disconnecting,
    Blocked,
}

/// Parsed `mullvad status`.  Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Everything after the state word (minus a leading `to`).
    pub detail: String,
}

impl ConnectionStatus {
    /// Parse the first line that carries a recognizable state.
    ///
    /// Accepts both `Tunnel status: Connected to ...` and a bare
    /// `Connected to ...`.
    pub fn parse(text: &str) -> Result<Self, UnexpectedOutput> {
        text.lines()
            .find_map(parse_status_line)
            .ok_or_else(|| UnexpectedOutput::new("status", text))
    }
}

fn parse_status_line(line: &str) -> Option<ConnectionStatus> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let rest = match tokens.as_slice() {
        ["Tunnel", "status:", rest @ ..] => rest,
        rest => rest,
    };
    let (word, rest) = rest.split_first()?;
    let state = match word.trim_end_matches([':', '.']) {
        "Connected" => ConnectionState::Connected,
        "Connecting" => ConnectionState::Connecting,
        "Disconnected" => ConnectionState::Disconnected,
        "Disconnecting" => ConnectionState::Disconnecting,
        "Blocked" => ConnectionState::Blocked,
        _ => return None,
    };
    let rest = match rest {
        ["to", tail @ ..] => tail,
        tail => tail,
    };
    Some(ConnectionStatus {
        state,
        detail: rest.join(" "),
    })
}

//  always-require-vpn get

/// Parsed `mullvad always-require-vpn get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillSwitch {
    pub enabled: bool,
    /// The line the client printed.
    pub description: String,
}

impl KillSwitch {
    pub fn parse(text: &str) -> Result<Self, UnexpectedOutput> {
        for line in text.lines().map(str::trim) {
            let lower = line.to_lowercase();
            let enabled = if lower.contains("will be blocked") || lower.ends_with(": on") {
                true
            } else if lower.contains("will be allowed") || lower.ends_with(": off") {
                false
            } else {
                continue;
            };
            return Ok(Self {
                enabled,
                description: line.to_string(),
            });
        }
        Err(UnexpectedOutput::new("always-require-vpn get", text))
    }
}

//  lan get

/// Parsed `mullvad lan get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanSharing {
    pub allowed: bool,
    pub description: String,
}

impl LanSharing {
    pub fn parse(text: &str) -> Result<Self, UnexpectedOutput> {
        for line in text.lines().map(str::trim) {
            let allowed = match line.rsplit(':').next().map(str::trim) {
                Some("allow") => true,
                Some("block") => false,
                _ => continue,
            };
            return Ok(Self {
                allowed,
                description: line.to_string(),
            });
        }
        Err(UnexpectedOutput::new("lan get", text))
    }
}

//  relay get

/// Parsed `mullvad relay get`, e.g.
/// `Current constraints: WireGuard over any port in got, se`.
///
/// The protocol is the third token.  The country code is the last token;
/// the city code is the token before it when that token ends in a comma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConstraints {
    pub protocol: String,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl RelayConstraints {
    pub fn parse(text: &str) -> Result<Self, UnexpectedOutput> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(UnexpectedOutput::new("relay get", text));
        }
        let protocol = tokens[2].trim_end_matches(',').to_string();

        let (country, city) = if tokens.len() > 3 {
            let last = tokens[tokens.len() - 1];
            let before = tokens[tokens.len() - 2];
            let country = Some(strip_code(last)).filter(|c| !c.is_empty());
            let city = before
                .strip_suffix(',')
                .map(strip_code)
                .filter(|c| !c.is_empty());
            (country, city)
        } else {
            (None, None)
        };

        Ok(Self {
            protocol,
            country,
            city,
        })
    }
}

fn strip_code(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
        .to_string()
}

//  version

/// Parsed `mullvad version`.  Cached for a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub supported: bool,
    pub current: String,
    pub latest: Option<String>,
}

impl VersionInfo {
    /// Parse `key: value` lines.  `Current version` is required; a missing
    /// `Is supported` counts as supported.
    ///
    /// The update target is `Suggested upgrade` (`none` means up to date),
    /// falling back to `Latest stable version` only when no suggestion is
    /// printed.  Beta versions are never offered.  `Is up to date: true`
    /// clears the target.
    pub fn parse(text: &str) -> Result<Self, UnexpectedOutput> {
        let mut current = None;
        let mut supported = true;
        let mut suggested: Option<Option<String>> = None;
        let mut latest_stable = None;
        let mut up_to_date = None;

        for (key, value) in key_values(text) {
            if key.contains("current version") {
                current = first_word(value);
            } else if key.contains("supported") {
                supported = value != "false";
            } else if key.contains("up to date") {
                up_to_date = Some(value != "false");
            } else if key.contains("suggested upgrade") {
                suggested = Some(first_word(value).filter(|v| v != "none"));
            } else if key.contains("latest stable") {
                latest_stable = first_word(value).filter(|v| v != "none");
            }
        }

        let current = current.ok_or_else(|| UnexpectedOutput::new("version", text))?;
        let latest = match up_to_date {
            Some(true) => None,
            _ => suggested.unwrap_or(latest_stable),
        };
        Ok(Self {
            supported,
            current,
            latest,
        })
    }

    /// A newer release than the installed one exists.
    pub fn update_available(&self) -> bool {
        self.latest.as_ref().is_some_and(|l| *l != self.current)
    }
}

//  account get

/// Parsed `mullvad account get`.  Cached for a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub number: String,
    pub expires: NaiveDate,
}

impl AccountInfo {
    pub fn parse(text: &str) -> Result<Self, UnexpectedOutput> {
        let mut number = None;
        let mut expires = None;

        for (key, value) in key_values(text) {
            if key.contains("expire") {
                expires = value
                    .get(..10)
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            } else if key.contains("account") {
                number = first_word(value);
            }
        }

        match (number, expires) {
            (Some(number), Some(expires)) => Ok(Self { number, expires }),
            _ => Err(UnexpectedOutput::new("account get", text)),
        }
    }

    /// Whole days from `today` until expiry; negative once expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expires - today).num_days()
    }
}

/// Yield `(lowercased key, trimmed value)` for every `key: value` line.
fn key_values(text: &str) -> impl Iterator<Item = (String, &str)> {
    text.lines().filter_map(|line| {
        let (key, value) = line.split_once(':')?;
        Some((key.trim().to_lowercase(), value.trim()))
    })
}

fn first_word(value: &str) -> Option<String> {
    value.split_whitespace().next().map(str::to_string)
}
