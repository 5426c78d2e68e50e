mod browser;
mod dispatcher;
mod distro;
mod error;
mod host;
mod installation;
mod menu;
mod package_manager;
mod prober;
mod session;
mod util;

use clap::{ArgAction, Parser};
use host::LiveHost;
use session::Session;
use std::sync::OnceLock;
use tracing::debug;
use util::logging::setup_logging;

/// Detect, install and uninstall web browsers through the system's package managers.
#[derive(Parser, Default)]
#[command(version, about)]
pub struct Args {
    /// Log more detail, repeat for more (-v, -vv, -vvv)
    #[clap(short, long, action = ArgAction::Count)]
    pub verbose: u8
}

pub static ARGS: OnceLock<Args> = OnceLock::new();

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    ARGS.get_or_init(Args::parse);
    setup_logging()?;

    let mut session = Session::start(LiveHost)?;
    debug!(
        family = %session.info.family,
        managers = %session.caps,
        installed = session.installed.len(),
        "Session started"
    );

    menu::run(&mut session);
    Ok(())
}
