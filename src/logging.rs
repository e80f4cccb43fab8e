use log::{error, info, warn};

use crate::domain::{IdempotencyKey, OrderId, OrderStatus};

pub fn log_checkout_rejected(reason: &str) {
    warn!("🛒 Checkout rejected: {}", reason);
}

pub fn log_checkout_failed(key: &IdempotencyKey, reason: &str) {
    error!("❌ Order creation failed (key {}): {}", key, reason);
}

pub fn log_order_created(order_id: OrderId, status: OrderStatus) {
    info!("✅ Order {} created — {}", order_id, status);
}

pub fn log_poll_error(order_id: OrderId, attempt: u32, reason: &str) {
    warn!("🔁 Status fetch {} for order {} failed: {}", attempt, order_id, reason);
}

pub fn log_terminal(order_id: OrderId, status: OrderStatus) {
    info!("🏁 Order {} reached {}; polling stopped", order_id, status);
}
