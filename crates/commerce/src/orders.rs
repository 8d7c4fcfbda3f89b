//! Order status lookup

use reqwest::StatusCode;

use crate::client::CommerceClient;
use crate::error::{CommerceError, CommerceResult};
use crate::models::Order;

impl CommerceClient {
    /// Fetch an order by id.
    ///
    /// Pure read. Anything other than 200 is an error carrying the response
    /// body; retry policy is left to the caller.
    pub async fn get_order(&self, order_id: &str) -> CommerceResult<Order> {
        let url = self.contract_resource("/orders", order_id)?;
        let response = self.get(url).await?;

        if response.status != StatusCode::OK {
            tracing::warn!(
                order_id = %order_id,
                status = %response.status,
                "Order lookup returned unexpected status"
            );
            return Err(CommerceError::Query {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let order: Order = response.decode("order")?;
        tracing::debug!(
            order_id = %order_id,
            provisioned = order.is_provisioned(),
            "Fetched order"
        );
        Ok(order)
    }
}
