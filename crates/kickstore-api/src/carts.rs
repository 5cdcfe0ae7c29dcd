//! `GET/POST/PATCH/DELETE /carts[/:cartItemId]`.

use crate::wire::{AddItemBody, CartDto, CouponRefDto};
use crate::{ApiClient, ApiError};
use async_trait::async_trait;
use kickstore_commerce::cart::{Cart, NewCartItem};
use kickstore_commerce::coupon::AppliedCoupon;
use kickstore_commerce::ids::{CartItemId, UserId};
use kickstore_commerce::sync::CartApi;
use kickstore_commerce::CommerceError;
use serde::Serialize;

#[derive(Serialize)]
struct QuantityBody {
    quantity: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CouponBody {
    applied_coupon: CouponRefDto,
}

/// Server cart of the authenticated caller.
///
/// The API identifies the cart by the bearer token; `user_id` only
/// labels the returned cart.
#[derive(Debug, Clone)]
pub struct HttpCartApi {
    client: ApiClient,
}

impl HttpCartApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub(crate) fn item_path(cart_item_id: &CartItemId) -> String {
        format!("/carts/{}", cart_item_id)
    }

    fn finish(
        user_id: &UserId,
        result: Result<CartDto, ApiError>,
        missing: Option<&CartItemId>,
    ) -> Result<Cart, CommerceError> {
        match (result, missing) {
            (Ok(dto), _) => dto.into_cart(user_id),
            (Err(e), Some(id)) if e.is_not_found() => {
                Err(CommerceError::ItemNotInCart(id.to_string()))
            }
            (Err(e), _) => {
                tracing::warn!(user_id = %user_id, error = %e, "cart request failed");
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl CartApi for HttpCartApi {
    async fn fetch_cart(&self, user_id: &UserId) -> Result<Cart, CommerceError> {
        Self::finish(user_id, self.client.get("/carts").await, None)
    }

    async fn add_item(&self, user_id: &UserId, item: &NewCartItem) -> Result<Cart, CommerceError> {
        let body = AddItemBody::from(item);
        Self::finish(user_id, self.client.post("/carts", &body).await, None)
    }

    async fn update_quantity(
        &self,
        user_id: &UserId,
        cart_item_id: &CartItemId,
        quantity: i64,
    ) -> Result<Cart, CommerceError> {
        let result = self
            .client
            .patch(&Self::item_path(cart_item_id), &QuantityBody { quantity })
            .await;
        Self::finish(user_id, result, Some(cart_item_id))
    }

    async fn remove_item(
        &self,
        user_id: &UserId,
        cart_item_id: &CartItemId,
    ) -> Result<Cart, CommerceError> {
        let result = self.client.delete(&Self::item_path(cart_item_id)).await;
        Self::finish(user_id, result, Some(cart_item_id))
    }

    async fn apply_coupon(
        &self,
        user_id: &UserId,
        coupon: &AppliedCoupon,
    ) -> Result<Cart, CommerceError> {
        let body = CouponBody {
            applied_coupon: CouponRefDto::from_applied(coupon),
        };
        Self::finish(user_id, self.client.patch("/carts", &body).await, None)
    }

    async fn clear(&self, user_id: &UserId) -> Result<Cart, CommerceError> {
        Self::finish(user_id, self.client.delete("/carts").await, None)
    }
}
