//! Basket creation and conflict recovery
//!
//! The commerce backend keeps a single open basket per contract until it is
//! checked out or emptied. A run that died between basket creation and
//! checkout leaves its line item behind, and the next creation call returns a
//! basket holding both. [`BasketManager`] detects that from the item count,
//! deletes every item and tries again, up to a fixed ceiling.

use reqwest::StatusCode;
use serde::Serialize;

use crate::api::CommerceApi;
use crate::client::CommerceClient;
use crate::error::{CommerceError, CommerceResult};
use crate::models::{Basket, BasketPayload, SubscriptionRequest};

/// How many times a contaminated basket is purged and re-created before giving up
pub const MAX_BASKET_RETRIES: u32 = 3;

const DELETE_BASKET_ITEM_PATH: &str = "/api/v1/CloudDashboard/DeleteBasketItem";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBasketItemPayload {
    basket_item_id: i64,
}

impl CommerceClient {
    /// POST one basket-creation request.
    ///
    /// A non-200 answer is returned as [`CommerceError::Basket`]; conflicts
    /// are never inferred from the status code.
    pub async fn submit_basket(&self, payload: &BasketPayload) -> CommerceResult<Basket> {
        let url = self.contract_endpoint("/baskets");
        let response = self.post_json(&url, payload).await?;

        if response.status != StatusCode::OK {
            tracing::error!(status = %response.status, "Basket creation rejected");
            return Err(CommerceError::Basket {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let basket: Basket = response.decode("basket")?;
        tracing::debug!(
            basket_id = basket.id,
            item_count = basket.items.len(),
            "Basket created"
        );
        Ok(basket)
    }

    pub async fn delete_basket_item(&self, item_id: i64) -> CommerceResult<()> {
        let url = self.commerce_endpoint(DELETE_BASKET_ITEM_PATH);
        let payload = DeleteBasketItemPayload {
            basket_item_id: item_id,
        };
        let response = self.post_json(&url, &payload).await?;

        if response.status != StatusCode::OK {
            return Err(CommerceError::BasketCleanup {
                item_id,
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        tracing::debug!(item_id, "Deleted basket item");
        Ok(())
    }
}

/// Creates a basket holding exactly one item for the current request
pub struct BasketManager<'a, A: CommerceApi + ?Sized> {
    api: &'a A,
    max_retries: u32,
}

impl<'a, A: CommerceApi + ?Sized> BasketManager<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            max_retries: MAX_BASKET_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Create a basket for `request`, purging leftovers from earlier runs.
    ///
    /// Makes at most `max_retries + 1` creation calls. Every contaminated
    /// basket is emptied before the next call, including the last one, so
    /// a failed run does not leave more behind than it found.
    pub async fn create_basket(&self, request: &SubscriptionRequest) -> CommerceResult<Basket> {
        let payload = BasketPayload::from(request);
        let mut retries = 0;

        loop {
            let basket = self.api.submit_basket(&payload).await?;

            if basket.items.is_empty() {
                return Err(CommerceError::EmptyBasket {
                    basket_id: basket.id,
                });
            }

            if !basket.is_contaminated() {
                tracing::info!(
                    basket_id = basket.id,
                    retries,
                    "Basket ready for checkout"
                );
                return Ok(basket);
            }

            tracing::warn!(
                basket_id = basket.id,
                item_count = basket.items.len(),
                retries,
                "Basket holds items from a previous run, clearing it"
            );
            self.purge(&basket).await?;

            if retries >= self.max_retries {
                return Err(CommerceError::BasketConflictExceeded {
                    attempts: retries + 1,
                });
            }
            retries += 1;
        }
    }

    /// Delete every item in `basket`, stopping at the first failure
    async fn purge(&self, basket: &Basket) -> CommerceResult<()> {
        for item in &basket.items {
            tracing::info!(basket_id = basket.id, item_id = item.id, "Deleting basket item");
            self.api.delete_basket_item(item.id).await?;
        }
        Ok(())
    }
}
