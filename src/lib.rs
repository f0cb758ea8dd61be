// contact-relay - Local HTTP(S) server relaying contact submissions to Google Sheets
// Author: kelexine (https://github.com/kelexine)

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod oauth;
pub mod server;
pub mod sheets;
pub mod shutdown;
pub mod utils;
