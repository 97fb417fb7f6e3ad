#![doc(test(attr(deny(warnings))))]

//! Care Portal wizards: multi-step registration and consent forms with
//! per-step validation, payload assembly and submission to the portal API.

pub mod cli;
pub mod config;
pub mod errors;
pub mod forms;
pub mod gateway;
pub mod registration;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Care Portal tracing initialized.");
    });
}
