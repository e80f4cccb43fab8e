//! HTTP clients for the inventory and order services.
//!
//! Each service gets its own [`ServiceClient`] bound to a base URL. No
//! retries happen here: transport and non-2xx failures come back as
//! [`ApiError`] carrying the underlying message.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::domain::{IdempotencyKey, Order, OrderId, OrderRequest, Product, ProductId};

pub mod error;
pub mod mock;

pub use error::ApiError;

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

// ==================================================
// SERVICE SEAMS
// ==================================================

#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;

    /// `Ok(None)` when the service has no such product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, ApiError>;
}

#[async_trait]
pub trait OrderApi: Send + Sync {
    /// The key, when given, goes out as the `Idempotency-Key` header.
    async fn create_order(
        &self,
        request: &OrderRequest,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Result<Order, ApiError>;

    /// `Ok(None)` when the service reports no such order.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, ApiError>;
}

// ==================================================
// SHARED HTTP PLUMBING
// ==================================================

#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        url::Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Decodes a response body. With `missing_is_none`, a 404 or an empty/`null`
/// body becomes `Ok(None)`.
async fn read_json<T: DeserializeOwned>(
    response: Response,
    missing_is_none: bool,
) -> Result<Option<T>, ApiError> {
    let status = response.status();
    let url = response.url().to_string();

    if missing_is_none && status == StatusCode::NOT_FOUND {
        debug!("GET {} → not found", url);
        return Ok(None);
    }

    let body = response.text().await?;

    if !status.is_success() {
        warn!("{} → HTTP {}", url, status.as_u16());
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }

    if body.trim().is_empty() {
        if missing_is_none {
            return Ok(None);
        }
        return Err(ApiError::Decode("empty response body".to_string()));
    }

    let value: Option<T> =
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;

    if value.is_none() && !missing_is_none {
        return Err(ApiError::Decode("null response body".to_string()));
    }
    Ok(value)
}

/// Prefers the `message`/`error` fields of a JSON error body, then the raw
/// body, then the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(text) = json.get(field).and_then(|v| v.as_str()) {
                if !text.trim().is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

// ==================================================
// INVENTORY SERVICE
// ==================================================

#[derive(Debug, Clone)]
pub struct InventoryClient {
    service: ServiceClient,
}

impl InventoryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            service: ServiceClient::new(base_url, timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.service.base_url()
    }
}

#[async_trait]
impl InventoryApi for InventoryClient {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.service.url("/products");
        debug!("GET {}", url);

        let response = self.service.http.get(&url).send().await?;
        let products: Option<Vec<Product>> = read_json(response, false).await?;
        Ok(products.unwrap_or_default())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, ApiError> {
        let url = self.service.url(&format!("/products/{}", id));
        debug!("GET {}", url);

        let response = self.service.http.get(&url).send().await?;
        read_json(response, true).await
    }
}

// ==================================================
// ORDER SERVICE
// ==================================================

#[derive(Debug, Clone)]
pub struct OrderClient {
    service: ServiceClient,
}

impl OrderClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Ok(Self {
            service: ServiceClient::new(base_url, timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.service.base_url()
    }
}

#[async_trait]
impl OrderApi for OrderClient {
    async fn create_order(
        &self,
        request: &OrderRequest,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Result<Order, ApiError> {
        let url = self.service.url("/orders");
        let mut builder = self.service.http.post(&url).json(request);

        match idempotency_key {
            Some(key) => {
                debug!("POST {} (idempotency key {})", url, key);
                builder = builder.header(IDEMPOTENCY_KEY_HEADER, key.as_str());
            }
            None => debug!("POST {} (no idempotency key)", url),
        }

        let response = builder.send().await?;
        read_json(response, false)
            .await?
            .ok_or_else(|| ApiError::Decode("empty order response".to_string()))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, ApiError> {
        let url = self.service.url(&format!("/orders/{}", id));
        debug!("GET {}", url);

        let response = self.service.http.get(&url).send().await?;
        read_json(response, true).await
    }
}
