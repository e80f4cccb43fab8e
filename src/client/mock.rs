//! Scripted [`OrderApi`] for exercising checkout and polling without a
//! running order service.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{ApiError, OrderApi};
use crate::domain::{IdempotencyKey, Order, OrderId, OrderRequest, OrderStatus};

#[derive(Debug, Clone)]
pub enum MockReply {
    Status(OrderStatus),
    NotFound,
    Error(String),
}

/// One recorded `create_order` call.
#[derive(Debug, Clone)]
pub struct Submission {
    pub request: OrderRequest,
    pub idempotency_key: Option<IdempotencyKey>,
}

/// `get_order` replies are consumed in call order, each after its delay;
/// once the script runs out the last entry repeats. `create_order` replies
/// are consumed the same way and default to a PENDING order.
#[derive(Debug)]
pub struct MockOrderApi {
    order_id: OrderId,
    gets: Mutex<VecDeque<(Duration, MockReply)>>,
    last_get: Mutex<Option<(Duration, MockReply)>>,
    creates: Mutex<VecDeque<MockReply>>,
    get_calls: AtomicUsize,
    submissions: Mutex<Vec<Submission>>,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockOrderApi {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            gets: Mutex::new(VecDeque::new()),
            last_get: Mutex::new(None),
            creates: Mutex::new(VecDeque::new()),
            get_calls: AtomicUsize::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn then_get(self, delay: Duration, reply: MockReply) -> Self {
        locked(&self.gets).push_back((delay, reply));
        self
    }

    pub fn then_create(self, reply: MockReply) -> Self {
        locked(&self.creates).push_back(reply);
        self
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        locked(&self.submissions).clone()
    }

    fn order(&self, status: OrderStatus, total: Decimal) -> Order {
        Order {
            id: self.order_id,
            customer_id: None,
            status,
            total_amount: total,
            items: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[async_trait]
impl OrderApi for MockOrderApi {
    async fn create_order(
        &self,
        request: &OrderRequest,
        idempotency_key: Option<&IdempotencyKey>,
    ) -> Result<Order, ApiError> {
        locked(&self.submissions).push(Submission {
            request: request.clone(),
            idempotency_key: idempotency_key.cloned(),
        });

        let reply = locked(&self.creates)
            .pop_front()
            .unwrap_or(MockReply::Status(OrderStatus::Pending));

        let total: Decimal = request
            .items
            .iter()
            .fold(Decimal::ZERO, |sum, item| {
                sum.saturating_add(item.unit_price.saturating_mul(Decimal::from(item.quantity)))
            });

        match reply {
            MockReply::Status(status) => Ok(self.order(status, total)),
            MockReply::NotFound => Err(ApiError::Status {
                status: 404,
                message: "Not Found".to_string(),
            }),
            MockReply::Error(message) => Err(ApiError::Status {
                status: 500,
                message,
            }),
        }
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, ApiError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        let next = locked(&self.gets).pop_front();
        let (delay, reply) = match next {
            Some(step) => {
                *locked(&self.last_get) = Some(step.clone());
                step
            }
            None => locked(&self.last_get)
                .clone()
                .unwrap_or((Duration::ZERO, MockReply::NotFound)),
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if id != self.order_id {
            return Ok(None);
        }

        match reply {
            MockReply::Status(status) => Ok(Some(self.order(status, Decimal::ZERO))),
            MockReply::NotFound => Ok(None),
            MockReply::Error(message) => Err(ApiError::Status {
                status: 503,
                message,
            }),
        }
    }
}
