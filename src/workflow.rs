//! The request-scoped orchestrator.
//!
//! [`Workflow`] bundles the client, the cache, the configuration and the
//! accumulating [`Feedback`] for one launcher invocation.  It parses the
//! query into a [`QueryKind`] once and renders exactly one screen for it.
//!
//! Any client, parse or lookup failure becomes a visible, non-actionable
//! item; nothing here panics on unexpected client output.

use crate::actions;
use crate::cache::{cached_data, ACCOUNT_KEY, RELAY_LIST_KEY, VERSION_KEY};
use crate::command::QueryKind;
use crate::config::Config;
use crate::feedback::{icons, Feedback, Item};
use crate::mullvad::parse::{
    AccountInfo, ConnectionState, ConnectionStatus, KillSwitch, LanSharing, RelayConstraints,
    UnexpectedOutput, VersionInfo,
};
use crate::relay::{self, LookupError, RelayList};
use crate::traits::{CacheStore, VpnClient};
use chrono::NaiveDate;
use log::{debug, info, warn};

const PROTOCOLS: &[&str] = &["WireGuard", "OpenVPN", "Any"];

const CHECK_URL: &str = "https://mullvad.net/check/";
const ACCOUNT_URL: &str = "https://mullvad.net/en/account/";
const DOWNLOAD_URL: &str = "https://mullvad.net/download/";
const SUPPORT_URL: &str = "https://mullvad.net/en/help/tag/mullvad-app/";
const RELEASES_URL: &str = "https://github.com/mullvad/mullvadvpn-app/releases/download";

/// Possible errors while rendering a screen.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The client could not be run or exited with an error.
    #[error("{0}")]
    Client(String),
    #[error(transparent)]
    Output(#[from] UnexpectedOutput),
    #[error("bad relay list: {0}")]
    RelayList(#[from] relay::ParseError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("cache: {0}")]
    Cache(String),
}

/// Run `args` and map the client's error into a [`WorkflowError`].
pub fn invoke<C: VpnClient>(client: &C, args: &[&str]) -> Result<String, WorkflowError> {
    client
        .run(args)
        .map_err(|e| WorkflowError::Client(e.to_string()))
}

pub fn fetch_relay_list<C: VpnClient>(client: &C) -> Result<RelayList, WorkflowError> {
    Ok(RelayList::parse(&invoke(client, &["relay", "list"])?)?)
}

pub fn fetch_version<C: VpnClient>(client: &C) -> Result<VersionInfo, WorkflowError> {
    Ok(VersionInfo::parse(&invoke(client, &["version"])?)?)
}

pub fn fetch_account<C: VpnClient>(client: &C) -> Result<AccountInfo, WorkflowError> {
    Ok(AccountInfo::parse(&invoke(client, &["account", "get"])?)?)
}

/// Renders launcher items for one query.
///
/// Generic over any [`VpnClient`] and [`CacheStore`], so it can run
/// against scripted doubles in tests.
pub struct Workflow<C: VpnClient, S: CacheStore> {
    client: C,
    cache: S,
    config: Config,
    today: NaiveDate,
    feedback: Feedback,
}

impl<C: VpnClient, S: CacheStore> Workflow<C, S> {
    pub fn new(client: C, cache: S, config: Config) -> Self {
        Self {
            client,
            cache,
            config,
            today: chrono::Local::now().date_naive(),
            feedback: Feedback::default(),
        }
    }

    /// Override the date account expiry is measured from.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache(&self) -> &S {
        &self.cache
    }

    /// Render the items for `query`.
    ///
    /// Never returns an empty list: when nothing else matched, a single
    /// "no result" item derived from the query is emitted.
    pub fn handle(&mut self, query: Option<&str>) -> Feedback {
        if !self.client.is_installed() {
            warn!("mullvad binary not found");
            self.not_installed();
            return std::mem::take(&mut self.feedback);
        }

        let kind = QueryKind::parse(query);
        info!("query {:?} -> {}", query.unwrap_or_default(), kind);

        match kind {
            QueryKind::Home => self.home(),
            QueryKind::Check => self.check(),
            QueryKind::KillSwitch => self.kill_switch(),
            QueryKind::Relay { filter } => self.countries(filter.as_deref()),
            QueryKind::Country { code, filter } => self.cities(&code, filter.as_deref()),
            QueryKind::Lan => self.lan(),
            QueryKind::AutoConnect => self.auto_connect(),
            QueryKind::Reconnect => self.reconnect(),
            QueryKind::Protocol { filter } => self.protocols(filter.as_deref()),
            QueryKind::Account => self.account(),
            QueryKind::ClearCache => self.clear_cache(),
            QueryKind::Search(q) => self.search(&q),
        }

        if self.feedback.is_empty() {
            self.no_result(query.unwrap_or_default());
        }
        std::mem::take(&mut self.feedback)
    }

    //  Data access

    fn run(&self, args: &[&str]) -> Result<String, WorkflowError> {
        invoke(&self.client, args)
    }

    fn relay_list(&self) -> Result<RelayList, WorkflowError> {
        cached_data(
            &self.cache,
            RELAY_LIST_KEY,
            self.config.cache.relay_list_max_age(),
            || fetch_relay_list(&self.client),
        )
    }

    fn version(&self) -> Result<VersionInfo, WorkflowError> {
        cached_data(
            &self.cache,
            VERSION_KEY,
            self.config.cache.version_max_age(),
            || fetch_version(&self.client),
        )
    }

    fn account_info(&self) -> Result<AccountInfo, WorkflowError> {
        cached_data(
            &self.cache,
            ACCOUNT_KEY,
            self.config.cache.account_max_age(),
            || fetch_account(&self.client),
        )
    }

    /// `City Country` (or just `Country`) of the active relay constraint.
    ///
    /// Depends on [`RelayConstraints::parse`] reading codes from fixed token
    /// positions of `relay get`.
    fn current_location(&self) -> Result<String, WorkflowError> {
        let constraints = RelayConstraints::parse(&self.run(&["relay", "get"])?)?;
        let list = self.relay_list()?;
        let country_code = constraints.country.ok_or_else(|| UnexpectedOutput {
            what: "relay get",
            text: "no country code".into(),
        })?;
        match constraints.city {
            Some(city_code) => {
                let loc = list.locate(&country_code, &city_code)?;
                Ok(format!("{} {}", loc.city, loc.country))
            }
            None => Ok(list.country(&country_code)?.name.clone()),
        }
    }

    //  Item helpers

    fn push(&mut self, item: Item) {
        self.feedback.push(item);
    }

    fn failed(&mut self, what: &str, err: &WorkflowError) {
        warn!("could not {}: {}", what, err);
        self.push(
            Item::new(format!("Could not {}", what))
                .subtitle(err.to_string())
                .icon(icons::INFO),
        );
    }

    fn command(&self, args: &[&str]) -> String {
        self.client.command_line(args)
    }

    //  Screens

    fn home(&mut self) {
        match self.version() {
            Ok(v) => {
                if let Some(latest) = v.latest.as_deref().filter(|_| v.update_available()) {
                    self.update_banner(latest);
                }
                if !v.supported {
                    self.unsupported_banner();
                }
            }
            Err(e) => warn!("version check skipped: {}", e),
        }

        match self.account_info() {
            Ok(a) if a.days_until_expiry(self.today) <= self.config.account_warning_days => {
                self.account_item(&a)
            }
            Ok(_) => {}
            Err(e) => warn!("account check skipped: {}", e),
        }

        self.connection_status();
        self.kill_switch();
        self.protocol_status();
        self.lan();
        self.push(
            Item::new("Change location")
                .subtitle("List relay countries")
                .autocomplete("relay ")
                .icon(icons::BROWSER),
        );
    }

    fn update_banner(&mut self, latest: &str) {
        let pkg = format!("~/Downloads/MullvadVPN-{}.pkg", latest);
        let arg = format!(
            "curl -fL {}/{}/MullvadVPN-{}.pkg -o {} && open {}",
            RELEASES_URL, latest, latest, pkg, pkg
        );
        self.push(
            Item::new("Update Mullvad")
                .subtitle("The currently installed version of Mullvad is out-of-date")
                .action(arg)
                .icon(icons::DOWNLOAD),
        );
    }

    fn unsupported_banner(&mut self) {
        self.push(
            Item::new("Mullvad app is not supported")
                .subtitle("The currently installed version of this app is not supported")
                .action(format!("open {}", SUPPORT_URL))
                .icon(icons::CHEVRON),
        );
    }

    fn connection_status(&mut self) {
        let status = match self
            .run(&["status"])
            .and_then(|t| Ok(ConnectionStatus::parse(&t)?))
        {
            Ok(s) => s,
            Err(e) => return self.failed("read connection status", &e),
        };
        debug!("status {:?}", status);

        let item = match status.state {
            ConnectionState::Connected => {
                let title = match self.current_location() {
                    Ok(location) => format!("Connected to: {}", location),
                    Err(e) => {
                        warn!("could not resolve location: {}", e);
                        "Connected".to_string()
                    }
                };
                Item::new(title)
                    .subtitle(format!("{}. Select to Disconnect.", status.detail))
                    .action(self.command(&["disconnect"]))
                    .icon(icons::CONNECTED)
            }
            ConnectionState::Connecting => {
                let subtitle = match status.detail.as_str() {
                    "" => "Select to Cancel".to_string(),
                    detail => format!("{}. Select to Cancel.", detail),
                };
                Item::new("Connecting...")
                    .subtitle(subtitle)
                    .action(self.command(&["disconnect"]))
                    .icon(icons::CHECK)
            }
            ConnectionState::Disconnected => Item::new("Disconnected")
                .subtitle("Select to Connect")
                .action(self.command(&["connect"]))
                .icon(icons::DISCONNECTED),
            ConnectionState::Disconnecting => Item::new("Disconnecting...")
                .subtitle("Select to Connect")
                .action(self.command(&["connect"]))
                .icon(icons::DISCONNECTED),
            ConnectionState::Blocked => Item::new("Blocked")
                .subtitle("This device is offline, no tunnels can be established...")
                .action(self.command(&["reconnect"]))
                .icon(icons::DISCONNECTED),
        };
        self.push(item);
    }

    fn kill_switch(&mut self) {
        let ks = match self
            .run(&["always-require-vpn", "get"])
            .and_then(|t| Ok(KillSwitch::parse(&t)?))
        {
            Ok(ks) => ks,
            Err(e) => return self.failed("read kill switch", &e),
        };
        let (label, toggle) = if ks.enabled { ("Enabled", "off") } else { ("Disabled", "on") };
        self.push(
            Item::new(format!("Kill switch: {}", label))
                .subtitle(format!("{}. Select to switch", ks.description))
                .action(self.command(&["always-require-vpn", "set", toggle]))
                .icon(icons::kill_switch(ks.enabled)),
        );
    }

    fn protocol_status(&mut self) {
        let constraints = match self
            .run(&["relay", "get"])
            .and_then(|t| Ok(RelayConstraints::parse(&t)?))
        {
            Ok(c) => c,
            Err(e) => return self.failed("read tunnel protocol", &e),
        };
        self.push(
            Item::new(format!("Tunnel-protocol: {}", constraints.protocol))
                .subtitle("Change tunnel-protocol")
                .autocomplete("protocol ")
                .icon(icons::protocol(&constraints.protocol)),
        );
    }

    fn lan(&mut self) {
        let lan = match self
            .run(&["lan", "get"])
            .and_then(|t| Ok(LanSharing::parse(&t)?))
        {
            Ok(l) => l,
            Err(e) => return self.failed("read LAN sharing", &e),
        };
        let (label, toggle) = if lan.allowed { ("Allowed", "block") } else { ("Blocked", "allow") };
        self.push(
            Item::new(format!("LAN: {}", label))
                .subtitle(format!("{}. Select to switch", lan.description))
                .action(self.command(&["lan", "set", toggle]))
                .icon(icons::lan(lan.allowed)),
        );
    }

    fn check(&mut self) {
        self.push(
            Item::new("Check")
                .subtitle("Check security of connection")
                .action(format!("open {}", CHECK_URL))
                .icon(icons::CHECK),
        );
    }

    fn countries(&mut self, filter: Option<&str>) {
        let list = match self.relay_list() {
            Ok(l) => l,
            Err(e) => return self.failed("list relays", &e),
        };
        for country in actions::filter(filter, &list.countries, |c| c.header.clone()) {
            self.push(
                Item::new(country.header.as_str())
                    .subtitle(format!("List cities in {}", country.name))
                    .autocomplete(format!("country:{} ", country.code))
                    .icon(icons::CHEVRON),
            );
        }
    }

    fn cities(&mut self, code: &str, filter: Option<&str>) {
        let list = match self.relay_list() {
            Ok(l) => l,
            Err(e) => return self.failed("list relays", &e),
        };
        let country = match list.country(code) {
            Ok(c) => c,
            Err(e) => return self.failed("find country", &WorkflowError::from(e)),
        };
        let items: Vec<Item> = actions::filter(filter, &country.cities, |c| c.label.clone())
            .into_iter()
            .map(|city| {
                Item::new(city.label.as_str())
                    .subtitle("Connect to servers in this city")
                    .action(self.command(&["relay", "set", "location", code, city.code.as_str()]))
                    .icon(icons::CHEVRON)
            })
            .collect();
        for item in items {
            self.push(item);
        }
    }

    fn auto_connect(&mut self) {
        let text = match self.run(&["auto-connect", "get"]) {
            Ok(t) => t,
            Err(e) => return self.failed("read auto-connect", &e),
        };
        let arg = self.command(&["auto-connect", "get"]);
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            self.push(
                Item::new(line)
                    .subtitle("Current auto-connect status.")
                    .action(arg.as_str())
                    .icon(icons::CHEVRON),
            );
        }
    }

    fn reconnect(&mut self) {
        let text = match self.run(&["status"]) {
            Ok(t) => t,
            Err(e) => return self.failed("read connection status", &e),
        };
        let arg = self.command(&["reconnect"]);
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            self.push(
                Item::new("Reconnect")
                    .subtitle(line)
                    .action(arg.as_str())
                    .icon(icons::CHEVRON),
            );
        }
    }

    fn protocols(&mut self, filter: Option<&str>) {
        for proto in actions::filter(filter, PROTOCOLS, |p| p.to_string()) {
            let lower = proto.to_lowercase();
            let arg = self.command(&["relay", "set", "tunnel-protocol", lower.as_str()]);
            self.push(
                Item::new(*proto)
                    .subtitle(format!("Change protocol to {}", proto))
                    .action(arg)
                    .icon(icons::protocol(proto)),
            );
        }
    }

    fn account(&mut self) {
        match self.account_info() {
            Ok(a) => self.account_item(&a),
            Err(e) => self.failed("read account", &e),
        }
    }

    fn account_item(&mut self, account: &AccountInfo) {
        self.push(
            Item::new(format!(
                "Account: {} expires in: {} days",
                account.number,
                account.days_until_expiry(self.today)
            ))
            .subtitle("Open mullvad account website and copy account number to clipboard")
            .action(format!("echo {} | pbcopy && open {}", account.number, ACCOUNT_URL))
            .icon(icons::BROWSER),
        );
    }

    fn clear_cache(&mut self) {
        match self.cache.clear() {
            Ok(()) => self.push(
                Item::new("Workflow cache cleared")
                    .subtitle("Relay, version and account data will be re-read")
                    .icon(icons::INFO),
            ),
            Err(e) => self.failed("clear cache", &WorkflowError::Cache(e.to_string())),
        }
    }

    fn search(&mut self, query: &str) {
        for action in actions::search(query) {
            self.push(action.to_item());
        }
    }

    fn no_result(&mut self, query: &str) {
        let (head, rest) = query.split_once(' ').unwrap_or((query, query));
        self.push(
            Item::new(format!("No result for \"{}\"", rest.trim()))
                .autocomplete(format!("{} ", head))
                .icon(icons::CHEVRON),
        );
    }

    fn not_installed(&mut self) {
        self.push(
            Item::new("Mullvad VPN is not installed")
                .subtitle("Select to open the download page")
                .action(format!("open {}", DOWNLOAD_URL))
                .icon(icons::INFO),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::cell::RefCell;
    use std::collections::HashMap;

    //  Scripted client

    /// A test double answering each subcommand with canned text and
    /// recording every invocation.
    #[derive(Debug, Default)]
    struct ScriptedClient {
        missing: bool,
        replies: HashMap<String, Result<String, String>>,
        calls: RefCell<Vec<String>>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct ScriptError(String);

    impl ScriptedClient {
        fn reply(mut self, args: &str, out: &str) -> Self {
            self.replies.insert(args.into(), Ok(out.into()));
            self
        }

        fn fail(mut self, args: &str, err: &str) -> Self {
            self.replies.insert(args.into(), Err(err.into()));
            self
        }

        fn called(&self, args: &str) -> usize {
            self.calls.borrow().iter().filter(|c| *c == args).count()
        }
    }

    impl VpnClient for ScriptedClient {
        type Error = ScriptError;

        fn is_installed(&self) -> bool {
            !self.missing
        }

        fn run(&self, args: &[&str]) -> Result<String, ScriptError> {
            let key = args.join(" ");
            self.calls.borrow_mut().push(key.clone());
            match self.replies.get(&key) {
                Some(Ok(out)) => Ok(out.clone()),
                Some(Err(e)) => Err(ScriptError(e.clone())),
                None => Err(ScriptError(format!("unscripted: {}", key))),
            }
        }

        fn command_line(&self, args: &[&str]) -> String {
            format!("mullvad {}", args.join(" "))
        }
    }

    const RELAYS: &str = "\
Albania (al)
\tTirana (tia) @ 41.32795°N, 19.81902°W
\t\tal-tia-wg-001 (31.171.153.66) - WireGuard, hosted by iRegister (rented)
Serbia (rs)
\tBelgrade (beg) @ 44.78657°N, 20.44892°W
\t\trs-beg-wg-101 (37.120.193.210) - WireGuard, hosted by M247 (rented)
Sweden (se)
\tGothenburg (got) @ 57.70887°N, 11.97456°W
\t\tse-got-wg-001 (185.213.154.66) - WireGuard, hosted by 31173 (Mullvad-owned)
\tStockholm (sto) @ 59.32938°N, 18.06871°W
\t\tse-sto-wg-001 (193.138.218.220) - WireGuard, hosted by 31173 (Mullvad-owned)
";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    /// A disconnected client that is up to date with a long-lived account.
    fn healthy_client() -> ScriptedClient {
        ScriptedClient::default()
            .reply("status", "Tunnel status: Disconnected\n")
            .reply(
                "always-require-vpn get",
                "Network traffic will be blocked when the VPN is disconnected\n",
            )
            .reply("relay get", "Current constraints: WireGuard over any port in got, se\n")
            .reply("lan get", "Local network sharing setting: allow\n")
            .reply(
                "version",
                "Current version: 2024.1\n\tIs supported: true\n\tSuggested upgrade: none\n",
            )
            .reply(
                "account get",
                "Mullvad account: 1234567890123456\nExpires at: 2024-12-31 00:00:00 UTC\n",
            )
            .reply("relay list", RELAYS)
            .reply("auto-connect get", "Autoconnect: on\n")
    }

    fn make_workflow(client: ScriptedClient) -> Workflow<ScriptedClient, MemoryCache> {
        Workflow::new(client, MemoryCache::default(), Config::default()).with_today(today())
    }

    //  Home screen

    #[test]
    fn home_when_disconnected_and_up_to_date() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(None);
        assert_eq!(
            fb.titles(),
            vec![
                "Disconnected",
                "Kill switch: Enabled",
                "Tunnel-protocol: WireGuard",
                "LAN: Allowed",
                "Change location",
            ]
        );
        assert_eq!(fb.items[0].arg.as_deref(), Some("mullvad connect"));
        assert_eq!(
            fb.items[1].arg.as_deref(),
            Some("mullvad always-require-vpn set off")
        );
        assert_eq!(fb.items[3].arg.as_deref(), Some("mullvad lan set block"));
        assert!(!fb.items[2].valid);
        assert_eq!(fb.items[2].autocomplete.as_deref(), Some("protocol "));
    }

    #[test]
    fn empty_query_is_the_home_screen() {
        let mut wf = make_workflow(healthy_client());
        assert_eq!(wf.handle(Some("")).len(), 5);
    }

    #[test]
    fn home_shows_banners_first() {
        let client = healthy_client()
            .reply(
                "version",
                "Current version: 2019.1\n\tIs supported: false\n\tSuggested upgrade: 2024.1\n",
            )
            .reply(
                "account get",
                "Mullvad account: 1234567890123456\nExpires at: 2024-05-04 00:00:00 UTC\n",
            );
        let mut wf = make_workflow(client);
        let fb = wf.handle(None);
        assert_eq!(
            &fb.titles()[..3],
            &[
                "Update Mullvad",
                "Mullvad app is not supported",
                "Account: 1234567890123456 expires in: 3 days",
            ]
        );
        assert!(fb.items[0]
            .arg
            .as_deref()
            .unwrap()
            .contains("/2024.1/MullvadVPN-2024.1.pkg"));
        assert_eq!(fb.len(), 8);
    }

    #[test]
    fn beta_release_does_not_raise_update_banner() {
        let client = healthy_client().reply(
            "version",
            "Current version: 2024.1\n\tIs supported: true\n\tSuggested upgrade: none\n\tLatest stable version: 2024.1\n\tLatest beta version: 2024.2-beta1\n",
        );
        let mut wf = make_workflow(client);
        let fb = wf.handle(None);
        assert_eq!(fb.len(), 5);
        assert_eq!(fb.items[0].title, "Disconnected");
    }

    #[test]
    fn home_connected_resolves_location_from_cached_relays() {
        let client = healthy_client().reply(
            "status",
            "Tunnel status: Connected to WireGuard se-got-wg-001 in Gothenburg, Sweden\n",
        );
        let mut wf = make_workflow(client);
        let fb = wf.handle(None);
        let item = &fb.items[0];
        assert_eq!(item.title, "Connected to: Gothenburg Sweden");
        assert!(item.subtitle.ends_with("Select to Disconnect."));
        assert_eq!(item.arg.as_deref(), Some("mullvad disconnect"));
        assert!(wf.cache().get(RELAY_LIST_KEY).is_some());
    }

    #[test]
    fn connected_with_unknown_location_still_renders() {
        let client = healthy_client()
            .reply("status", "Connected to WireGuard\n")
            .reply("relay get", "Current constraints: WireGuard over any port in xyz, zz\n");
        let mut wf = make_workflow(client);
        let fb = wf.handle(None);
        assert_eq!(fb.items[0].title, "Connected");
    }

    #[test]
    fn connecting_is_a_normal_item() {
        let client = healthy_client().reply(
            "status",
            "Tunnel status: Connecting to se-got-wg-001 in Gothenburg, Sweden\n",
        );
        let mut wf = make_workflow(client);
        let fb = wf.handle(None);
        assert_eq!(fb.len(), 5);
        let item = &fb.items[0];
        assert_eq!(item.title, "Connecting...");
        assert_eq!(item.subtitle, "se-got-wg-001 in Gothenburg, Sweden. Select to Cancel.");
        assert_eq!(item.arg.as_deref(), Some("mullvad disconnect"));
    }

    #[test]
    fn disconnecting_offers_connect() {
        let client = healthy_client().reply("status", "Disconnecting...\n");
        let mut wf = make_workflow(client);
        let fb = wf.handle(None);
        assert_eq!(fb.items[0].title, "Disconnecting...");
        assert_eq!(fb.items[0].arg.as_deref(), Some("mullvad connect"));
    }

    #[test]
    fn blocked_offers_reconnect() {
        let client = healthy_client().reply("status", "Tunnel status: Blocked: offline\n");
        let mut wf = make_workflow(client);
        let fb = wf.handle(None);
        assert_eq!(fb.items[0].title, "Blocked");
        assert_eq!(fb.items[0].arg.as_deref(), Some("mullvad reconnect"));
    }

    #[test]
    fn failed_command_is_shown_not_misparsed() {
        let client = healthy_client().fail("status", "Error: daemon is not running");
        let mut wf = make_workflow(client);
        let fb = wf.handle(None);
        let item = &fb.items[0];
        assert_eq!(item.title, "Could not read connection status");
        assert_eq!(item.subtitle, "Error: daemon is not running");
        assert!(!item.valid);
        // The other sections still render.
        assert_eq!(fb.len(), 5);
    }

    #[test]
    fn version_and_account_are_cached() {
        let mut wf = make_workflow(healthy_client());
        wf.handle(None);
        wf.handle(None);
        assert_eq!(wf.client().called("version"), 1);
        assert_eq!(wf.client().called("account get"), 1);
        assert_eq!(wf.client().called("status"), 2);
    }

    #[test]
    fn not_installed_is_a_single_item() {
        let client = ScriptedClient {
            missing: true,
            ..Default::default()
        };
        let mut wf = make_workflow(client);
        let fb = wf.handle(Some("relay"));
        assert_eq!(fb.titles(), vec!["Mullvad VPN is not installed"]);
        assert!(wf.client().calls.borrow().is_empty());
    }

    //  Relay navigation

    #[test]
    fn relay_filter_keeps_substring_matches() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("relay se"));
        assert_eq!(fb.titles(), vec!["Serbia (rs)", "Sweden (se)"]);
        assert_eq!(fb.items[1].autocomplete.as_deref(), Some("country:se "));
        assert_eq!(fb.items[1].subtitle, "List cities in Sweden");
        assert!(!fb.items[1].valid);
    }

    #[test]
    fn relay_without_filter_lists_all_countries() {
        let mut wf = make_workflow(healthy_client());
        assert_eq!(wf.handle(Some("relay ")).len(), 3);
    }

    #[test]
    fn cities_of_a_country() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("country:se "));
        assert_eq!(fb.titles(), vec!["Gothenburg (got)", "Stockholm (sto)"]);
        assert_eq!(
            fb.items[1].arg.as_deref(),
            Some("mullvad relay set location se sto")
        );
    }

    #[test]
    fn cities_filtered() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("country:se sto"));
        assert_eq!(fb.titles(), vec!["Stockholm (sto)"]);
    }

    #[test]
    fn unknown_country_is_a_lookup_miss() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("country:zz "));
        assert_eq!(fb.titles(), vec!["Could not find country"]);
        assert_eq!(fb.items[0].subtitle, "no country matches (zz)");
    }

    #[test]
    fn malformed_relay_list_is_reported() {
        let client = healthy_client().reply("relay list", "\t\torphan-server\n");
        let mut wf = make_workflow(client);
        let fb = wf.handle(Some("relay"));
        assert_eq!(fb.titles(), vec!["Could not list relays"]);
        assert!(wf.cache().get(RELAY_LIST_KEY).is_none());
    }

    //  Other routes

    #[test]
    fn check_route() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("check "));
        assert_eq!(fb.items[0].arg.as_deref(), Some("open https://mullvad.net/check/"));
    }

    #[test]
    fn kill_switch_route() {
        let client = healthy_client().reply(
            "always-require-vpn get",
            "Network traffic will be allowed when the VPN is disconnected\n",
        );
        let mut wf = make_workflow(client);
        let fb = wf.handle(Some("block-when-disconnected"));
        assert_eq!(fb.titles(), vec!["Kill switch: Disabled"]);
        assert_eq!(
            fb.items[0].arg.as_deref(),
            Some("mullvad always-require-vpn set on")
        );
        assert_eq!(fb.items[0].icon.path, "icons/skull_red.png");
    }

    #[test]
    fn protocol_route_filters() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("protocol wire"));
        assert_eq!(fb.titles(), vec!["WireGuard"]);
        assert_eq!(
            fb.items[0].arg.as_deref(),
            Some("mullvad relay set tunnel-protocol wireguard")
        );
        assert_eq!(wf.handle(Some("tunnel")).len(), 3);
    }

    #[test]
    fn auto_connect_route() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("auto-connect"));
        assert_eq!(fb.titles(), vec!["Autoconnect: on"]);
    }

    #[test]
    fn reconnect_route() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("reconnect"));
        assert_eq!(fb.titles(), vec!["Reconnect"]);
        assert_eq!(fb.items[0].subtitle, "Tunnel status: Disconnected");
    }

    #[test]
    fn account_route_ignores_threshold() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("account"));
        assert_eq!(fb.len(), 1);
        assert!(fb.items[0].title.starts_with("Account: 1234567890123456 expires in: "));
        assert_eq!(
            fb.items[0].arg.as_deref(),
            Some("echo 1234567890123456 | pbcopy && open https://mullvad.net/en/account/")
        );
    }

    #[test]
    fn clear_cache_route_empties_the_store() {
        let mut wf = make_workflow(healthy_client());
        wf.handle(Some("relay"));
        assert!(wf.cache().get(RELAY_LIST_KEY).is_some());
        let fb = wf.handle(Some("workflow:delcache"));
        assert_eq!(fb.titles(), vec!["Workflow cache cleared"]);
        assert!(wf.cache().get(RELAY_LIST_KEY).is_none());
    }

    //  Search and fallback

    #[test]
    fn search_lists_matching_actions() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("vpn"));
        assert_eq!(fb.titles(), vec!["always-require-vpn", "reconnect"]);
    }

    #[test]
    fn search_without_hits_falls_back() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("zzz"));
        assert_eq!(fb.titles(), vec!["No result for \"zzz\""]);
        assert_eq!(fb.items[0].autocomplete.as_deref(), Some("zzz "));
    }

    #[test]
    fn fallback_splits_on_first_space() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("foo bar"));
        assert_eq!(fb.titles(), vec!["No result for \"bar\""]);
        assert_eq!(fb.items[0].autocomplete.as_deref(), Some("foo "));
    }

    #[test]
    fn empty_filter_result_falls_back() {
        let mut wf = make_workflow(healthy_client());
        let fb = wf.handle(Some("relay qq"));
        assert_eq!(fb.titles(), vec!["No result for \"qq\""]);
        assert_eq!(fb.items[0].autocomplete.as_deref(), Some("relay "));
    }
}
