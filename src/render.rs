//! Terminal views of products, the cart and order status.

use colored::{ColoredString, Colorize};
use rust_decimal::Decimal;

use crate::domain::{CartItem, Order, OrderStatus, Product};
use crate::poller::PollState;

pub fn money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

fn status_badge(status: OrderStatus) -> ColoredString {
    let label = status.as_str();
    match status {
        OrderStatus::Completed => label.green().bold(),
        OrderStatus::Cancelled | OrderStatus::Failed => label.red().bold(),
        OrderStatus::Processing => label.cyan(),
        OrderStatus::Pending => label.yellow(),
        OrderStatus::Unknown => label.normal(),
    }
}

// ==================================================
// PRODUCTS
// ==================================================

pub fn stock_label(product: &Product) -> String {
    if product.in_stock() {
        format!("In Stock: {}", product.stock_quantity)
    } else {
        "Out of Stock".to_string()
    }
}

pub fn product_view(product: &Product) -> String {
    let mut out = format!("{}  {}\n", product.name.bold(), money(product.price));
    if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
        out.push_str(&format!("  {}\n", description));
    }
    let stock = stock_label(product);
    let stock = if product.in_stock() {
        stock.green()
    } else {
        stock.red()
    };
    out.push_str(&format!("  {}  [{}]\n", stock, product.id));
    out
}

pub fn products_view(products: &[Product]) -> String {
    if products.is_empty() {
        return "No products available.\n".to_string();
    }
    products.iter().map(product_view).collect::<Vec<_>>().join("\n")
}

// ==================================================
// CART
// ==================================================

pub fn cart_view(items: &[CartItem], total: Decimal) -> String {
    if items.is_empty() {
        return "Your cart is empty.\n".to_string();
    }

    let mut out = format!("Cart ({})\n", items.len());
    for item in items {
        out.push_str(&format!(
            "  {}  {} x {} = {}  [{}]\n",
            item.name,
            money(item.price),
            item.quantity,
            item.line_total()
                .map(money)
                .unwrap_or_else(|| "overflow".to_string()),
            item.id
        ));
    }
    out.push_str(&format!("Total: {}\n", money(total).bold()));
    out
}

// ==================================================
// ORDERS
// ==================================================

pub fn order_view(order: &Order) -> String {
    let mut out = format!("Order ID: {}\n", order.id);
    out.push_str(&format!("Status: {}\n", status_badge(order.status)));
    out.push_str(&format!("Total Amount: {}\n", money(order.total_amount)));

    if !order.items.is_empty() {
        out.push_str("Items:\n");
        for item in &order.items {
            out.push_str(&format!(
                "  {} - {} x {}\n",
                item.product_name,
                money(item.unit_price),
                item.quantity
            ));
        }
    }

    if order.status.is_terminal() {
        out.push_str("Continue shopping with `storefront products`.\n");
    }
    out
}

pub fn poll_state_view(state: &PollState) -> String {
    match state {
        PollState::Loading => "Loading order status...\n".to_string(),
        PollState::Loaded(order) => order_view(order),
        PollState::NotFound => format!("{}\n", "Order not found".red()),
        PollState::Error(message) => {
            format!("{} {}\n", "Error loading order:".red(), message)
        }
    }
}
