use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::poller::PollerConfig;

/* =======================
CLI ARGS
======================= */

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "storefront.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List products from the inventory service
    Products,
    /// Show a single product
    Product { id: Uuid },
    /// Add a product to the cart
    Add {
        id: Uuid,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product line from the cart
    Remove { id: Uuid },
    /// Show the cart and its total
    Cart,
    /// Empty the cart
    Clear,
    /// Place an order for the cart contents
    Checkout {
        /// Follow the created order's status until it settles
        #[arg(short, long)]
        watch: bool,
    },
    /// Follow an order's status until it settles
    Status { order_id: Uuid },
}

/* =======================
MAIN CONFIG
======================= */

pub const DEFAULT_ORDER_SERVICE_URL: &str = "http://localhost:8081";
pub const DEFAULT_INVENTORY_SERVICE_URL: &str = "http://localhost:8082";
pub const DEFAULT_CUSTOMER_ID: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub order_service_url: String,
    pub inventory_service_url: String,
    pub cart_dir: PathBuf,
    pub customer_id: Uuid,
    pub poll_interval_ms: u64,
    pub poll_error_retries: u32,
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            order_service_url: DEFAULT_ORDER_SERVICE_URL.to_string(),
            inventory_service_url: DEFAULT_INVENTORY_SERVICE_URL.to_string(),
            cart_dir: PathBuf::from(".storefront"),
            customer_id: DEFAULT_CUSTOMER_ID,
            poll_interval_ms: 2000,
            poll_error_retries: 0,
            http_timeout_secs: 10,
        }
    }
}

/* =======================
LOAD
======================= */

impl Config {
    /// File (if present) → environment overrides → validation.
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            Config::default()
        };

        cfg.apply_overrides(|name| env::var(name).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ORDER_SERVICE_URL") {
            self.order_service_url = v;
        }
        if let Some(v) = lookup("INVENTORY_SERVICE_URL") {
            self.inventory_service_url = v;
        }
        if let Some(v) = lookup("STOREFRONT_CART_DIR") {
            self.cart_dir = PathBuf::from(v);
        }
        if let Some(v) = parsed(&lookup, "STOREFRONT_CUSTOMER_ID")? {
            self.customer_id = v;
        }
        if let Some(v) = parsed(&lookup, "POLL_INTERVAL_MS")? {
            self.poll_interval_ms = v;
        }
        if let Some(v) = parsed(&lookup, "POLL_ERROR_RETRIES")? {
            self.poll_error_retries = v;
        }
        if let Some(v) = parsed(&lookup, "HTTP_TIMEOUT_SECS")? {
            self.http_timeout_secs = v;
        }
        Ok(())
    }

    pub fn validate(&mut self) -> Result<()> {
        for (name, value) in [
            ("order_service_url", &mut self.order_service_url),
            ("inventory_service_url", &mut self.inventory_service_url),
        ] {
            url::Url::parse(value).with_context(|| format!("invalid {}: {:?}", name, value))?;
            let trimmed = value.trim_end_matches('/').to_string();
            *value = trimmed;
        }

        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be positive");
        }
        if self.http_timeout_secs == 0 {
            bail!("http_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poller(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            error_retries: self.poll_error_retries,
        }
    }
}

fn parsed<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", name, raw, e)),
        None => Ok(None),
    }
}
