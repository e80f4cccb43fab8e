//! Persisted cart store.
//!
//! The cart is an insertion-ordered list of [`CartItem`]s with at most one
//! line per product and every quantity at least 1. Each mutation rewrites
//! the complete snapshot through the injected [`CartStorage`] backend
//! before returning. Loading never fails: an absent, unreadable or
//! malformed snapshot yields an empty cart.

use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::{checked_total, CartItem, Product, ProductId};

pub mod storage;

pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};

/// Fixed key the snapshot lives under.
pub const CART_STORAGE_KEY: &str = "cart";

#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("price of {0} is negative")]
    NegativePrice(ProductId),
    #[error("quantity of {0} exceeds the maximum line quantity")]
    QuantityOverflow(ProductId),
    #[error("cart total would overflow")]
    TotalOverflow,
    #[error("failed to persist cart: {0}")]
    Storage(#[from] StorageError),
}

pub struct CartStore<S: CartStorage> {
    storage: S,
    items: Vec<CartItem>,
}

impl<S: CartStorage> CartStore<S> {
    /// Rehydrates from the backend.
    pub fn load(storage: S) -> Self {
        let items = restore(&storage);
        Self { storage, items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Increments the existing line for `product` or appends a new one.
    /// Stock is not checked here; the order service enforces it. On error
    /// the cart is left unchanged.
    pub fn add_to_cart(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if product.price < Decimal::ZERO {
            return Err(CartError::NegativePrice(product.id));
        }

        let mut next = self.items.clone();
        match next.iter_mut().find(|item| item.id == product.id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::QuantityOverflow(product.id))?;
            }
            None => next.push(CartItem::from_product(product, quantity)),
        }

        if checked_total(&next).is_none() {
            return Err(CartError::TotalOverflow);
        }

        self.items = next;
        self.persist()
    }

    /// Removing an absent product is a no-op.
    pub fn remove_from_cart(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|item| item.id != product_id);

        if self.items.len() == before {
            return Ok(());
        }
        self.persist()
    }

    pub fn clear_cart(&mut self) -> Result<(), CartError> {
        self.items.clear();
        self.persist()
    }

    pub fn get_total(&self) -> Decimal {
        // add_to_cart and parse_snapshot both reject carts whose total overflows
        checked_total(&self.items).unwrap_or(Decimal::MAX)
    }

    fn persist(&self) -> Result<(), CartError> {
        let snapshot = serde_json::to_string(&self.items).map_err(StorageError::from)?;
        self.storage.write(CART_STORAGE_KEY, &snapshot)?;
        debug!("cart persisted ({} lines)", self.items.len());
        Ok(())
    }
}

// ==================================================
// REHYDRATION
// ==================================================

fn restore<S: CartStorage>(storage: &S) -> Vec<CartItem> {
    let raw = match storage.read(CART_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("cart snapshot unreadable, starting empty: {}", e);
            return Vec::new();
        }
    };

    match parse_snapshot(&raw) {
        Ok(items) => items,
        Err(reason) => {
            warn!("cart snapshot malformed, starting empty: {}", reason);
            Vec::new()
        }
    }
}

/// A snapshot that decodes but breaks a cart invariant counts as malformed.
fn parse_snapshot(raw: &str) -> Result<Vec<CartItem>, String> {
    let items: Vec<CartItem> = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    let mut seen = HashSet::new();
    for item in &items {
        if item.quantity == 0 {
            return Err(format!("zero quantity for {}", item.id));
        }
        if item.price < Decimal::ZERO {
            return Err(format!("negative price for {}", item.id));
        }
        if !seen.insert(item.id) {
            return Err(format!("duplicate line for {}", item.id));
        }
    }

    if checked_total(&items).is_none() {
        return Err("cart total overflows".to_string());
    }

    Ok(items)
}
