//! Static action catalog and substring filtering.

use crate::command::CLEAR_CACHE_TOKEN;
use crate::feedback::{icons, Item};

/// One entry of the searchable catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub name: &'static str,
    pub description: &'static str,
    pub autocomplete: &'static str,
    /// Shell command, if selecting the entry should run something directly.
    pub command: Option<&'static str>,
    pub icon: &'static str,
}

impl Action {
    /// Name and description, the text searches match against.
    pub fn search_key(&self) -> String {
        format!("{} {}", self.name, self.description)
    }

    pub fn to_item(&self) -> Item {
        let item = Item::new(self.name)
            .uid(self.name)
            .subtitle(self.description)
            .autocomplete(self.autocomplete)
            .icon(self.icon);
        match self.command {
            Some(cmd) => item.action(cmd),
            None => item,
        }
    }
}

pub const ACTIONS: &[Action] = &[
    Action {
        name: "always-require-vpn",
        description: "Always-require-vpn settings",
        autocomplete: "always-require-vpn ",
        command: None,
        icon: "icons/skull_green.png",
    },
    Action {
        name: "check",
        description: "Check security of connection",
        autocomplete: "check ",
        command: None,
        icon: icons::CHECK,
    },
    Action {
        name: "relay",
        description: "Manage relay and tunnel constraints",
        autocomplete: "relay ",
        command: None,
        icon: icons::BROWSER,
    },
    Action {
        name: "reconnect",
        description: "Reconnect to VPN",
        autocomplete: "reconnect ",
        command: None,
        icon: icons::CHEVRON,
    },
    Action {
        name: "lan",
        description: "Allow local network sharing",
        autocomplete: "lan ",
        command: None,
        icon: icons::CHEVRON,
    },
    Action {
        name: "auto-connect",
        description: "Automatically connect when app launches",
        autocomplete: "auto-connect ",
        command: None,
        icon: icons::CHEVRON,
    },
    Action {
        name: "protocol",
        description: "Display and alter tunnel-protocol",
        autocomplete: "protocol ",
        command: None,
        icon: "icons/any.png",
    },
    Action {
        name: "account",
        description: "Display and alter account information",
        autocomplete: "account ",
        command: None,
        icon: icons::CHEVRON,
    },
    Action {
        name: "Clear workflow cache",
        description: "",
        autocomplete: CLEAR_CACHE_TOKEN,
        command: None,
        icon: icons::INFO,
    },
];

/// Case-insensitive substring match.
pub fn matches(query: &str, haystack: &str) -> bool {
    haystack.to_lowercase().contains(&query.trim().to_lowercase())
}

/// Keep the elements whose `key` contains `query`, preserving order.
///
/// A missing or blank query keeps everything.
pub fn filter<'a, T>(query: Option<&str>, items: &'a [T], key: impl Fn(&T) -> String) -> Vec<&'a T> {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => items.iter().filter(|i| matches(q, &key(i))).collect(),
        None => items.iter().collect(),
    }
}

/// Catalog entries whose name or description contains `query`.
pub fn search(query: &str) -> Vec<&'static Action> {
    filter(Some(query), ACTIONS, Action::search_key)
}
