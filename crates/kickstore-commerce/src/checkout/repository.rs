//! Order persistence collaborator.

use crate::checkout::Order;
use crate::error::CommerceError;
use crate::ids::{OrderId, UserId};
use crate::pagination::{Page, Pagination};
use async_trait::async_trait;
use mockall::automock;
use parking_lot::RwLock;
use std::collections::HashMap;

/// `POST /orders`, `GET /orders/:id`, `PATCH /orders/:id`, `GET /orders/user`.
#[automock]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: &Order) -> Result<Order, CommerceError>;

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, CommerceError>;

    async fn update(&self, order: &Order) -> Result<Order, CommerceError>;

    /// A user's orders, newest first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Order>, CommerceError>;
}

/// In-memory order store for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryOrders {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn create(&self, order: &Order) -> Result<Order, CommerceError> {
        self.orders.write().insert(order.id.clone(), order.clone());
        Ok(order.clone())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, CommerceError> {
        Ok(self.orders.read().get(order_id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<Order, CommerceError> {
        let mut orders = self.orders.write();
        match orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(order.clone())
            }
            None => Err(CommerceError::OrderNotFound(order.id.to_string())),
        }
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Order>, CommerceError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .values()
            .filter(|o| &o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id.cmp(&b.id))
        });

        let pagination = Pagination::new(page.max(1), per_page, orders.len() as u64);
        let items = orders
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.per_page as usize)
            .collect();
        Ok(Page { items, pagination })
    }
}
