//! Utility functions and helpers for contact-relay.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and token redaction.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod logging;
