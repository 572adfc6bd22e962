//! Detached relay-list refresher.
//!
//! Started by `alfred-mullvad` after it has printed its results.  Exits
//! immediately when another refresher claimed the cache directory less
//! than a minute ago.
//!
//! Run by hand with:
//!     RUST_LOG=debug mullvad-refresh

use alfred_mullvad::cache::FileCache;
use alfred_mullvad::config;
use alfred_mullvad::mullvad::cli::MullvadCli;
use alfred_mullvad::refresh::{self, RefreshGuard};
use alfred_mullvad::traits::VpnClient;
use log::{error, info};

fn main() {
    env_logger::init();

    let config = config::load_or_default();
    let cache_dir = config::cache_dir();

    let guard = match RefreshGuard::acquire(&cache_dir) {
        Ok(Some(guard)) => guard,
        Ok(None) => {
            info!("another refresh is running");
            return;
        }
        Err(e) => {
            error!("cannot claim {}: {}", cache_dir.display(), e);
            std::process::exit(1);
        }
    };

    let client = MullvadCli::locate(&config.mullvad_path, config.command_timeout());
    if !client.is_installed() {
        info!("mullvad not installed, nothing to refresh");
        return;
    }

    let cache = FileCache::new(&cache_dir);
    let result = refresh::refresh_caches(&client, &cache, &config);
    drop(guard);
    if let Err(e) = result {
        error!("refresh failed: {}", e);
        std::process::exit(1);
    }
}
