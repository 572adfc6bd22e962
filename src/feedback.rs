//! Launcher result items.
//!
//! The launcher reads one JSON document from stdout:
//!
//! ```json
//! {"items": [{"title": "Disconnected", "subtitle": "Select to Connect",
//!             "arg": "/usr/local/bin/mullvad connect", "valid": true,
//!             "icon": {"path": "icons/mullvad_red.png"}}]}
//! ```

use serde::Serialize;
use std::io::Write;

/// Icon file names shipped with the workflow.
pub mod icons {
    pub const CONNECTED: &str = "icons/mullvad_green.png";
    pub const DISCONNECTED: &str = "icons/mullvad_red.png";
    pub const CHECK: &str = "icons/mullvad_yellow.png";
    pub const CHEVRON: &str = "icons/chevron-right-dark.png";
    pub const DOWNLOAD: &str = "icons/cloud-download-dark.png";
    pub const BROWSER: &str = "icons/browser.png";
    pub const INFO: &str = "icons/info-dark.png";

    /// `icons/skull_green.png` when the kill switch is on.
    pub fn kill_switch(enabled: bool) -> String {
        format!("icons/skull_{}.png", if enabled { "green" } else { "red" })
    }

    /// `icons/lan_green.png` when LAN sharing is allowed.
    pub fn lan(allowed: bool) -> String {
        format!("icons/lan_{}.png", if allowed { "green" } else { "red" })
    }

    /// `icons/wireguard.png`, `icons/openvpn.png`, `icons/any.png`.
    pub fn protocol(name: &str) -> String {
        format!("icons/{}.png", name.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Icon {
    pub path: String,
}

/// One selectable result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub title: String,
    pub subtitle: String,
    /// Shell command run when the item is actioned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    /// Text inserted into the query box on tab.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autocomplete: Option<String>,
    pub valid: bool,
    pub icon: Icon,
}

impl Item {
    /// A non-actionable item with the default icon.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            uid: None,
            title: title.into(),
            subtitle: String::new(),
            arg: None,
            autocomplete: None,
            valid: false,
            icon: Icon {
                path: icons::CHEVRON.into(),
            },
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    /// Set the action and mark the item valid.
    pub fn action(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self.valid = true;
        self
    }

    pub fn autocomplete(mut self, text: impl Into<String>) -> Self {
        self.autocomplete = Some(text.into());
        self
    }

    pub fn icon(mut self, path: impl Into<String>) -> Self {
        self.icon = Icon { path: path.into() };
        self
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }
}

/// The full response for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub items: Vec<Item>,
}

impl Feedback {
    pub fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.title.as_str()).collect()
    }

    /// Serialize to `out` as a single JSON document.
    pub fn write_to(&self, mut out: impl Write) -> Result<(), serde_json::Error> {
        serde_json::to_writer(&mut out, self)?;
        out.write_all(b"\n").map_err(serde_json::Error::io)
    }
}
