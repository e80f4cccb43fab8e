use storefront_client::*;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::{Args, Command, Config};
use log::info;
use std::sync::Arc;

use cart::{CartStore, FileStorage};
use checkout::{CheckoutController, CheckoutError};
use client::{InventoryApi, InventoryClient, OrderApi, OrderClient};
use domain::OrderId;
use poller::OrderStatusPoller;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    // ===============================
    // SERVICE CLIENTS
    // ===============================
    let inventory = InventoryClient::new(&config.inventory_service_url, config.http_timeout())
        .context("inventory service client")?;
    let orders: Arc<dyn OrderApi> = Arc::new(
        OrderClient::new(&config.order_service_url, config.http_timeout())
            .context("order service client")?,
    );

    let mut cart = CartStore::load(FileStorage::new(&config.cart_dir));

    match args.command {
        Command::Products => {
            let products = inventory
                .list_products()
                .await
                .context("Error loading products")?;
            print!("{}", render::products_view(&products));
        }

        Command::Product { id } => match inventory.get_product(id).await? {
            Some(product) => print!("{}", render::product_view(&product)),
            None => println!("Product {} not found", id),
        },

        Command::Add { id, quantity } => {
            let Some(product) = inventory.get_product(id).await? else {
                bail!("product {} not found", id);
            };
            if !product.in_stock() {
                bail!("{} is out of stock", product.name);
            }
            cart.add_to_cart(&product, quantity)?;
            println!(
                "Added {} x {} — cart has {} item(s), total {}",
                quantity,
                product.name,
                cart.len(),
                render::money(cart.get_total())
            );
        }

        Command::Remove { id } => {
            cart.remove_from_cart(id)?;
            print!("{}", render::cart_view(cart.items(), cart.get_total()));
        }

        Command::Cart => {
            print!("{}", render::cart_view(cart.items(), cart.get_total()));
        }

        Command::Clear => {
            cart.clear_cart()?;
            println!("Cart cleared.");
        }

        Command::Checkout { watch } => {
            print!("{}", render::cart_view(cart.items(), cart.get_total()));

            let mut controller = CheckoutController::new(orders.clone(), config.customer_id);
            let order = match controller.checkout(&mut cart).await {
                Ok(order) => order,
                Err(CheckoutError::EmptyCart) => bail!("Your cart is empty; nothing to order."),
                Err(e) => return Err(e.into()),
            };

            println!("Order placed: {}", order.id);
            if watch {
                follow_order(orders, order.id, &config).await;
            } else {
                println!("Track it with `storefront status {}`.", order.id);
            }
        }

        Command::Status { order_id } => {
            follow_order(orders, order_id, &config).await;
        }
    }

    Ok(())
}

// ===============================
// ORDER STATUS VIEW
// ===============================
async fn follow_order(api: Arc<dyn OrderApi>, order_id: OrderId, config: &Config) {
    let mut handle = OrderStatusPoller::start(api, order_id, config.poller());

    let mut last_view = render::poll_state_view(&handle.state());
    print!("{}", last_view);

    loop {
        tokio::select! {
            next = handle.next_state() => {
                let Some(state) = next else { break };
                let view = render::poll_state_view(&state);
                if view != last_view {
                    print!("{}", view);
                    last_view = view;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted — stopping status polling");
                handle.cancel();
                break;
            }
        }
    }
}
