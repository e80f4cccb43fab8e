use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use storefront_client::cart::{CartStore, MemoryStorage};
use storefront_client::checkout::{CheckoutController, CheckoutState};
use storefront_client::client::{ApiError, InventoryApi, InventoryClient, OrderApi, OrderClient};
use storefront_client::domain::{IdempotencyKey, OrderRequest, OrderStatus};
use storefront_client::poller::{OrderStatusPoller, PollState, PollerConfig};

const ORDER_ID: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";
const BROKEN_ORDER_ID: &str = "00000000-0000-0000-0000-00000000dead";
const MUG_ID: &str = "f47ac10b-58cc-4372-a567-0e02b2c3d479";
const CUSTOMER: Uuid = Uuid::from_u128(0x550e8400_e29b_41d4_a716_446655440000);

/// What the fake order service saw on `POST /orders`.
#[derive(Debug, Clone)]
struct SeenOrder {
    idempotency_key: Option<String>,
    content_type: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Services {
    seen: Arc<Mutex<Vec<SeenOrder>>>,
    status_reads: Arc<AtomicUsize>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn create_order(
    State(services): State<Services>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    services.seen.lock().unwrap().push(SeenOrder {
        idempotency_key: header(&headers, "idempotency-key"),
        content_type: header(&headers, "content-type"),
        body: body.clone(),
    });

    (
        StatusCode::CREATED,
        Json(json!({
            "id": ORDER_ID,
            "customerId": body["customerId"],
            "status": "PENDING",
            "totalAmount": 25.0,
            "items": body["items"],
        })),
    )
}

/// PENDING, PROCESSING, then COMPLETED for the known order.
async fn get_order(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    if id == BROKEN_ORDER_ID {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": 500, "error": "Internal Server Error", "message": "Database unavailable"})),
        );
    }
    if id != ORDER_ID {
        return (StatusCode::NOT_FOUND, Json(Value::Null));
    }

    let read = services.status_reads.fetch_add(1, Ordering::SeqCst);
    let status = match read {
        0 => "PENDING",
        1 => "PROCESSING",
        _ => "COMPLETED",
    };
    (
        StatusCode::OK,
        Json(json!({"id": ORDER_ID, "status": status, "totalAmount": 25.0, "items": []})),
    )
}

fn mug() -> Value {
    json!({
        "id": MUG_ID,
        "sku": "MUG-1",
        "name": "Mug",
        "description": "Ceramic, 350ml",
        "price": 12.5,
        "stockQuantity": 3
    })
}

async fn list_products() -> Json<Value> {
    Json(json!([
        mug(),
        {
            "id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
            "sku": "TEE-1",
            "name": "T-Shirt",
            "description": "Cotton",
            "price": 19.99,
            "stockQuantity": 0
        }
    ]))
}

async fn get_product(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == MUG_ID {
        (StatusCode::OK, Json(mug()))
    } else {
        (StatusCode::NOT_FOUND, Json(Value::Null))
    }
}

async fn spawn_services() -> (String, Services) {
    let services = Services::default();
    let app = Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .with_state(services.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), services)
}

fn timeout() -> Duration {
    Duration::from_secs(5)
}

fn one_mug_request() -> OrderRequest {
    serde_json::from_value(json!({
        "customerId": CUSTOMER,
        "items": [{"productId": MUG_ID, "productName": "Mug", "quantity": 2, "unitPrice": 12.5}]
    }))
    .unwrap()
}

#[tokio::test]
async fn create_order_sends_idempotency_key_header() {
    let (base, services) = spawn_services().await;
    let client = OrderClient::new(&base, timeout()).unwrap();
    let key = IdempotencyKey::new("order-123-abc").unwrap();

    let order = client
        .create_order(&one_mug_request(), Some(&key))
        .await
        .unwrap();

    assert_eq!(order.id.to_string(), ORDER_ID);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items[0].unit_price, dec!(12.5));

    let seen = services.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].idempotency_key.as_deref(), Some("order-123-abc"));
    assert_eq!(seen[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(seen[0].body["customerId"], CUSTOMER.to_string());
    assert_eq!(seen[0].body["items"][0]["quantity"], 2);
    assert_eq!(seen[0].body["items"][0]["unitPrice"], 12.5);
}

#[tokio::test]
async fn create_order_without_key_omits_header() {
    let (base, services) = spawn_services().await;
    let client = OrderClient::new(&base, timeout()).unwrap();

    client.create_order(&one_mug_request(), None).await.unwrap();

    let seen = services.seen.lock().unwrap().clone();
    assert_eq!(seen[0].idempotency_key, None);
}

#[tokio::test]
async fn get_order_maps_404_to_none() {
    let (base, _) = spawn_services().await;
    let client = OrderClient::new(&base, timeout()).unwrap();

    let missing = client.get_order(Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn server_error_carries_service_message() {
    let (base, _) = spawn_services().await;
    let client = OrderClient::new(&base, timeout()).unwrap();

    let err = client
        .get_order(BROKEN_ORDER_ID.parse().unwrap())
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Database unavailable");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn transport_failure_propagates() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OrderClient::new(&format!("http://{}", addr), timeout()).unwrap();
    let err = client.get_order(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}

#[tokio::test]
async fn inventory_lists_and_fetches_products() {
    let (base, _) = spawn_services().await;
    let client = InventoryClient::new(&base, timeout()).unwrap();

    let products = client.list_products().await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[1].price, dec!(19.99));
    assert!(products[0].in_stock());
    assert!(!products[1].in_stock());

    let mug = client.get_product(MUG_ID.parse().unwrap()).await.unwrap();
    assert_eq!(mug.unwrap().sku.as_deref(), Some("MUG-1"));

    let missing = client.get_product(Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn cart_to_checkout_to_completed_status() {
    let (base, services) = spawn_services().await;
    let inventory = InventoryClient::new(&base, timeout()).unwrap();
    let orders: Arc<dyn OrderApi> = Arc::new(OrderClient::new(&base, timeout()).unwrap());

    let mug = inventory
        .get_product(MUG_ID.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    let mut cart = CartStore::load(MemoryStorage::new());
    cart.add_to_cart(&mug, 1).unwrap();
    cart.add_to_cart(&mug, 1).unwrap();

    let mut controller = CheckoutController::new(orders.clone(), CUSTOMER);
    let order = controller.checkout(&mut cart).await.unwrap();

    assert!(cart.is_empty());
    assert_eq!(
        controller.state(),
        &CheckoutState::Succeeded { order_id: order.id }
    );
    let seen = services.seen.lock().unwrap().clone();
    assert!(seen[0].idempotency_key.is_some());
    assert_eq!(seen[0].body["items"][0]["quantity"], 2);

    let config = PollerConfig {
        interval: Duration::from_millis(100),
        error_retries: 0,
    };
    let mut handle = OrderStatusPoller::start(orders, order.id, config);

    let mut last = handle.state();
    while let Some(state) = handle.next_state().await {
        last = state;
    }

    match last {
        PollState::Loaded(order) => assert_eq!(order.status, OrderStatus::Completed),
        other => panic!("unexpected final state {:?}", other),
    }
    assert!(services.status_reads.load(Ordering::SeqCst) >= 3);
}
