//! Entry point for the **alfred-mullvad** script filter.
//!
//! Reads the launcher query from the first argument, prints the item list
//! as JSON on stdout and, when the client is installed, kicks off a
//! detached relay-list refresh.

use alfred_mullvad::cache::FileCache;
use alfred_mullvad::config::{self, Config};
use alfred_mullvad::mullvad::cli::MullvadCli;
use alfred_mullvad::refresh;
use alfred_mullvad::traits::VpnClient;
use alfred_mullvad::workflow::Workflow;
use log::{error, info, warn};

fn main() {
    env_logger::init();

    let config = config::load_or_default();
    let query = std::env::args().nth(1);

    if let Err(e) = run(config, query.as_deref()) {
        error!("failed to write results: {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, query: Option<&str>) -> Result<(), serde_json::Error> {
    let cache_dir = config::cache_dir();
    let client = MullvadCli::locate(&config.mullvad_path, config.command_timeout());
    let installed = client.is_installed();
    match client.binary() {
        Some(path) => info!("using {}", path.display()),
        None => info!("mullvad not found"),
    }

    let mut workflow = Workflow::new(client, FileCache::new(&cache_dir), config);
    let feedback = workflow.handle(query);
    feedback.write_to(std::io::stdout().lock())?;

    if installed {
        if let Err(e) = refresh::spawn_in_background(&cache_dir) {
            warn!("could not start relay refresh: {}", e);
        }
    }
    Ok(())
}
