// CLI module for contact-relay
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// contact-relay - Local HTTP(S) server relaying contact submissions to Google Sheets
#[derive(Parser, Debug)]
#[command(name = "contact-relay", version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "CONTACT_RELAY_CONFIG", default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Open the OAuth consent URL in the default browser
    #[arg(long)]
    pub open_browser: bool,

    /// Validate the configuration, print it with secrets masked, and exit
    #[arg(long)]
    pub check_config: bool,
}
