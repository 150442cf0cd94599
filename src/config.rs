use std::collections::HashMap;

use anyhow::{Context, Result};

// ============================================================================
// Service Configuration
// ============================================================================

pub const ENV_FIRST_ID: &str = "ORDERS_FIRST_ID";
pub const ENV_ARCHIVE_TERMINAL: &str = "ORDERS_ARCHIVE_TERMINAL";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderServiceConfig {
    /// First id the order sequencer hands out
    pub first_order_id: u64,
    /// Move orders out of the live set once they reach PAID or CANCELLED
    pub archive_terminal_orders: bool,
    /// `tracing` filter directive used when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for OrderServiceConfig {
    fn default() -> Self {
        Self {
            first_order_id: 1,
            archive_terminal_orders: true,
            log_filter: "info,restaurant_orders=debug".to_string(),
        }
    }
}

impl OrderServiceConfig {
    /// Defaults overridden by whatever is set in the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = vars.get(ENV_FIRST_ID) {
            config.first_order_id = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_FIRST_ID} must be an unsigned integer, got {raw:?}"))?;
        }

        if let Some(raw) = vars.get(ENV_ARCHIVE_TERMINAL) {
            config.archive_terminal_orders = parse_flag(raw)
                .with_context(|| format!("{ENV_ARCHIVE_TERMINAL} must be a boolean, got {raw:?}"))?;
        }

        if let Some(raw) = vars.get(ENV_LOG_FILTER) {
            if !raw.trim().is_empty() {
                config.log_filter = raw.clone();
            }
        }

        Ok(config)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
