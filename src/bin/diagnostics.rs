use anyhow::Result;
use colored::{ColoredString, Colorize};
use std::path::Path;
use storefront_client::cart::{CartStore, FileStorage};
use storefront_client::client::{InventoryApi, InventoryClient, OrderApi, OrderClient};
use storefront_client::config::Config;
use uuid::Uuid;

// ==================================================
// CHECK RESULTS
// ==================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Pass,
    Warn,
    Fail,
}

impl Outcome {
    fn label(self) -> ColoredString {
        match self {
            Outcome::Pass => "PASS".green().bold(),
            Outcome::Warn => "WARN".yellow().bold(),
            Outcome::Fail => "FAIL".red().bold(),
        }
    }
}

struct Check {
    name: &'static str,
    outcome: Outcome,
    detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            outcome: Outcome::Pass,
            detail: detail.into(),
        }
    }

    fn warn(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            outcome: Outcome::Warn,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl ToString) -> Self {
        Self {
            name,
            outcome: Outcome::Fail,
            detail: detail.to_string(),
        }
    }
}

// ==================================================
// RUNNER
// ==================================================
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    println!("{}", "Storefront client diagnostics".bold());

    let config = match Config::load(Path::new("storefront.json")) {
        Ok(cfg) => cfg,
        Err(e) => {
            report(&[Check::fail("configuration", format!("{:#}", e))]);
            return Ok(());
        }
    };

    let checks = vec![
        Check::pass(
            "configuration",
            format!(
                "orders at {}, inventory at {}",
                config.order_service_url, config.inventory_service_url
            ),
        ),
        check_cart(&config),
        check_inventory(&config).await,
        check_orders(&config).await,
    ];

    report(&checks);
    Ok(())
}

// ==================================================
// CHECKS
// ==================================================
fn check_cart(config: &Config) -> Check {
    let cart = CartStore::load(FileStorage::new(&config.cart_dir));
    Check::pass(
        "cart snapshot",
        format!("{} line(s) under {}", cart.len(), config.cart_dir.display()),
    )
}

async fn check_inventory(config: &Config) -> Check {
    const NAME: &str = "inventory service";
    let client = match InventoryClient::new(&config.inventory_service_url, config.http_timeout()) {
        Ok(c) => c,
        Err(e) => return Check::fail(NAME, e),
    };

    match client.list_products().await {
        Ok(products) if products.is_empty() => Check::warn(NAME, "reachable, catalog is empty"),
        Ok(products) => {
            let in_stock = products.iter().filter(|p| p.in_stock()).count();
            Check::pass(NAME, format!("{} products, {} in stock", products.len(), in_stock))
        }
        Err(e) => Check::fail(NAME, e),
    }
}

/// A random order id should come back as not found.
async fn check_orders(config: &Config) -> Check {
    const NAME: &str = "order service";
    let client = match OrderClient::new(&config.order_service_url, config.http_timeout()) {
        Ok(c) => c,
        Err(e) => return Check::fail(NAME, e),
    };

    let unknown = Uuid::new_v4();
    match client.get_order(unknown).await {
        Ok(None) => Check::pass(NAME, format!("reachable, unknown order {} not found", unknown)),
        Ok(Some(order)) => Check::warn(NAME, format!("random id resolved to order {}", order.id)),
        Err(e) => Check::fail(NAME, e),
    }
}

// ==================================================
// OUTPUT
// ==================================================
fn report(checks: &[Check]) {
    for check in checks {
        println!("  {}  {:<18} {}", check.outcome.label(), check.name, check.detail);
    }
    println!("\n{}", summary(checks));
}

fn summary(checks: &[Check]) -> String {
    let count = |outcome: Outcome| checks.iter().filter(|c| c.outcome == outcome).count();
    format!(
        "{} passed, {} warned, {} failed",
        count(Outcome::Pass),
        count(Outcome::Warn),
        count(Outcome::Fail)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_each_outcome() {
        let checks = [
            Check::pass("configuration", "ok"),
            Check::pass("cart snapshot", "0 line(s)"),
            Check::warn("inventory service", "catalog is empty"),
            Check::fail("order service", "connection refused"),
        ];
        assert_eq!(summary(&checks), "2 passed, 1 warned, 1 failed");
    }
}
