//! Checkout flow: cart snapshot → order request → order service.

use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::cart::{CartStorage, CartStore};
use crate::client::{ApiError, OrderApi};
use crate::domain::{IdempotencyKey, Order, OrderId, OrderRequest};
use crate::logging::{log_checkout_failed, log_checkout_rejected, log_order_created};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    Submitting,
    Succeeded { order_id: OrderId },
    Failed { message: String },
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cannot check out an empty cart")]
    EmptyCart,
    #[error("Error creating order: {0}")]
    Api(#[from] ApiError),
}

/// Drives one checkout at a time: `checkout` borrows the controller
/// mutably for the whole submission.
pub struct CheckoutController {
    api: Arc<dyn OrderApi>,
    customer_id: Uuid,
    state: CheckoutState,
    last_key: Option<IdempotencyKey>,
}

impl CheckoutController {
    pub fn new(api: Arc<dyn OrderApi>, customer_id: Uuid) -> Self {
        Self {
            api,
            customer_id,
            state: CheckoutState::Idle,
            last_key: None,
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Key of the most recent attempt.
    pub fn last_idempotency_key(&self) -> Option<&IdempotencyKey> {
        self.last_key.as_ref()
    }

    /// Submits the current cart as a new order.
    ///
    /// Every call is a new logical attempt with a fresh idempotency key,
    /// including a retry after `Failed`. On success the cart is cleared; on
    /// failure it is left untouched. An empty cart is rejected before any
    /// request is made and leaves the state unchanged.
    pub async fn checkout<S: CartStorage>(
        &mut self,
        cart: &mut CartStore<S>,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            log_checkout_rejected("cart is empty");
            return Err(CheckoutError::EmptyCart);
        }

        let key = IdempotencyKey::generate();
        let request = OrderRequest::from_cart(self.customer_id, cart.items());
        self.last_key = Some(key.clone());
        self.state = CheckoutState::Submitting;

        info!(
            "🧾 Submitting order: {} line(s), total {} (key {})",
            request.items.len(),
            cart.get_total(),
            key
        );

        match self.api.create_order(&request, Some(&key)).await {
            Ok(order) => {
                if let Err(e) = cart.clear_cart() {
                    warn!("order {} created but cart not cleared: {}", order.id, e);
                }
                log_order_created(order.id, order.status);
                self.state = CheckoutState::Succeeded { order_id: order.id };
                Ok(order)
            }
            Err(e) => {
                let message = e.to_string();
                log_checkout_failed(&key, &message);
                self.state = CheckoutState::Failed { message };
                Err(e.into())
            }
        }
    }
}
