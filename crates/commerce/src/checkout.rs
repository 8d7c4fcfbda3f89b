//! Basket checkout

use reqwest::StatusCode;

use crate::client::CommerceClient;
use crate::error::{CommerceError, CommerceResult};
use crate::models::{Basket, Checkout};

impl CommerceClient {
    /// Check out a basket, producing the order that will later be polled.
    ///
    /// The API answers 200 or 202 (accepted, processing continues in the
    /// background); both decode the same way.
    pub async fn checkout_basket(&self, basket: &Basket) -> CommerceResult<Checkout> {
        let url = self.contract_endpoint(&format!("/baskets/{}/checkout", basket.id));
        let response = self.post_empty(&url).await?;

        if !matches!(response.status, StatusCode::OK | StatusCode::ACCEPTED) {
            tracing::error!(
                basket_id = basket.id,
                status = %response.status,
                "Checkout rejected"
            );
            return Err(CommerceError::Checkout {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let checkout: Checkout = response.decode("checkout")?;
        tracing::info!(
            basket_id = basket.id,
            order_id = checkout.id,
            status = %response.status,
            "Checked out basket"
        );
        Ok(checkout)
    }
}
