//! Single-call commerce operations
//!
//! [`CommerceApi`] is the seam between the orchestration logic (basket
//! conflict recovery, order polling) and the HTTP transport. Each method is
//! one request with no retry of its own.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::CommerceClient;
use crate::error::CommerceResult;
use crate::models::{Basket, BasketPayload, Checkout, Order};

#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// Fetch an order by id
    async fn get_order(&self, order_id: &str) -> CommerceResult<Order>;

    /// Submit one basket-creation request
    async fn submit_basket(&self, payload: &BasketPayload) -> CommerceResult<Basket>;

    /// Remove one line item from the open basket
    async fn delete_basket_item(&self, item_id: i64) -> CommerceResult<()>;

    /// Turn a basket into an order
    async fn checkout_basket(&self, basket: &Basket) -> CommerceResult<Checkout>;

    /// Whether the session credential has outlived its advertised lifetime
    fn session_expired(&self) -> bool {
        false
    }
}

#[async_trait]
impl CommerceApi for CommerceClient {
    async fn get_order(&self, order_id: &str) -> CommerceResult<Order> {
        CommerceClient::get_order(self, order_id).await
    }

    async fn submit_basket(&self, payload: &BasketPayload) -> CommerceResult<Basket> {
        CommerceClient::submit_basket(self, payload).await
    }

    async fn delete_basket_item(&self, item_id: i64) -> CommerceResult<()> {
        CommerceClient::delete_basket_item(self, item_id).await
    }

    async fn checkout_basket(&self, basket: &Basket) -> CommerceResult<Checkout> {
        CommerceClient::checkout_basket(self, basket).await
    }

    fn session_expired(&self) -> bool {
        self.token().is_expired()
    }
}

#[async_trait]
impl<T: CommerceApi + ?Sized> CommerceApi for Arc<T> {
    async fn get_order(&self, order_id: &str) -> CommerceResult<Order> {
        (**self).get_order(order_id).await
    }

    async fn submit_basket(&self, payload: &BasketPayload) -> CommerceResult<Basket> {
        (**self).submit_basket(payload).await
    }

    async fn delete_basket_item(&self, item_id: i64) -> CommerceResult<()> {
        (**self).delete_basket_item(item_id).await
    }

    async fn checkout_basket(&self, basket: &Basket) -> CommerceResult<Checkout> {
        (**self).checkout_basket(basket).await
    }

    fn session_expired(&self) -> bool {
        (**self).session_expired()
    }
}
