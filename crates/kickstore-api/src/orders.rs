//! `POST /orders`, `GET /orders/:id`, `PATCH /orders/:id`, `GET /orders/user`.

use crate::{ApiClient, ApiError};
use async_trait::async_trait;
use kickstore_commerce::checkout::{Order, OrderRepository};
use kickstore_commerce::ids::{OrderId, UserId};
use kickstore_commerce::pagination::{Page, Pagination};
use kickstore_commerce::CommerceError;
use serde::{Deserialize, Serialize};

/// `GET /orders/user` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPageDto {
    pub orders: Vec<Order>,
    pub page: u32,
    pub pages: u32,
    #[serde(default)]
    pub total: Option<u64>,
}

impl OrderPageDto {
    /// Page metadata, trusting the server's page count when it sends no total.
    pub fn into_page(self, per_page: u32) -> Page<Order> {
        let total = self.total.unwrap_or_else(|| {
            let full_pages = u64::from(self.pages.saturating_sub(1)) * u64::from(per_page);
            if self.page >= self.pages {
                full_pages + self.orders.len() as u64
            } else {
                u64::from(self.pages) * u64::from(per_page)
            }
        });
        Page {
            pagination: Pagination::new(self.page, per_page, total),
            items: self.orders,
        }
    }
}

/// Order persistence over HTTP.
#[derive(Debug, Clone)]
pub struct HttpOrders {
    client: ApiClient,
}

impl HttpOrders {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub(crate) fn order_path(order_id: &OrderId) -> String {
        format!("/orders/{}", order_id)
    }

    pub(crate) fn user_orders_path(page: u32, per_page: u32) -> String {
        format!("/orders/user?page={}&limit={}", page.max(1), per_page.max(1))
    }
}

fn not_found_as(e: ApiError, order_id: &OrderId) -> CommerceError {
    if e.is_not_found() {
        CommerceError::OrderNotFound(order_id.to_string())
    } else {
        e.into()
    }
}

#[async_trait]
impl OrderRepository for HttpOrders {
    async fn create(&self, order: &Order) -> Result<Order, CommerceError> {
        let created: Order = self.client.post("/orders", order).await?;
        tracing::debug!(order_id = %created.id, "order stored");
        Ok(created)
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>, CommerceError> {
        match self.client.get(&Self::order_path(order_id)).await {
            Ok(order) => Ok(Some(order)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, order: &Order) -> Result<Order, CommerceError> {
        self.client
            .patch(&Self::order_path(&order.id), order)
            .await
            .map_err(|e| not_found_as(e, &order.id))
    }

    async fn list_for_user(
        &self,
        _user_id: &UserId,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Order>, CommerceError> {
        let dto: OrderPageDto = self
            .client
            .get(&Self::user_orders_path(page, per_page))
            .await?;
        Ok(dto.into_page(per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(HttpOrders::order_path(&OrderId::new("o1")), "/orders/o1");
        assert_eq!(
            HttpOrders::user_orders_path(0, 10),
            "/orders/user?page=1&limit=10"
        );
    }

    #[test]
    fn test_page_without_total() {
        let dto = OrderPageDto {
            orders: Vec::new(),
            page: 1,
            pages: 3,
            total: None,
        };
        let page = dto.into_page(5);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_next());
    }

    #[test]
    fn test_missing_order_maps_to_not_found() {
        let err = not_found_as(
            ApiError::Http {
                status: 404,
                message: "Order not found".into(),
            },
            &OrderId::new("o1"),
        );
        assert!(matches!(err, CommerceError::OrderNotFound(_)));
    }
}
