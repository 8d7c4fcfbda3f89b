//! Subscription provisioning
//!
//! Provisioning is basket → checkout → poll. The backend fills in the
//! subscription id out of band after checkout, so the last step re-reads the
//! order on a fixed schedule until the id shows up or the budget runs out.
//!
//! Only "not provisioned yet" is retried. Any error from the order lookup
//! ends the run immediately.

use std::time::Duration;

use tokio_retry::strategy::FixedInterval;

use crate::api::CommerceApi;
use crate::baskets::{BasketManager, MAX_BASKET_RETRIES};
use crate::cancel::CancelToken;
use crate::client::CommerceClient;
use crate::error::{CommerceError, CommerceResult, ProvisioningStage};
use crate::models::{Basket, Checkout, Order, SubscriptionRequest};

/// Default number of order status checks (20 minutes at the default interval)
pub const DEFAULT_POLL_ATTEMPTS: u32 = 40;

/// Default pause between order status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Schedule for re-reading an order until it is provisioned
///
/// Always allows at least one status check, so a checked-out order is read
/// back at least once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    max_attempts: u32,
    interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Total number of status checks, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between two consecutive checks
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Pauses between checks: one fewer than the number of checks
    fn delays(&self) -> impl Iterator<Item = Duration> {
        FixedInterval::new(self.interval).take(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// End-to-end subscription provisioning over a [`CommerceApi`]
pub struct SubscriptionService<A: CommerceApi = CommerceClient> {
    api: A,
    poll: PollPolicy,
    max_basket_retries: u32,
}

impl<A: CommerceApi> SubscriptionService<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            poll: PollPolicy::default(),
            max_basket_retries: MAX_BASKET_RETRIES,
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_max_basket_retries(mut self, retries: u32) -> Self {
        self.max_basket_retries = retries;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Look up a known order
    pub async fn get_order_details(&self, order_id: &str) -> CommerceResult<Order> {
        self.api.get_order(order_id).await
    }

    /// Create a basket holding exactly one item for `request`
    pub async fn create_basket(&self, request: &SubscriptionRequest) -> CommerceResult<Basket> {
        BasketManager::new(&self.api)
            .with_max_retries(self.max_basket_retries)
            .create_basket(request)
            .await
    }

    pub async fn checkout(&self, basket: &Basket) -> CommerceResult<Checkout> {
        self.api.checkout_basket(basket).await
    }

    /// Provision a subscription and wait until its id is known
    pub async fn create_subscription(&self, request: &SubscriptionRequest) -> CommerceResult<Order> {
        self.create_subscription_with_cancel(request, &CancelToken::new())
            .await
    }

    /// Same as [`create_subscription`](Self::create_subscription), but the
    /// polling waits end early with [`CommerceError::Cancelled`] when
    /// `cancel` fires.
    pub async fn create_subscription_with_cancel(
        &self,
        request: &SubscriptionRequest,
        cancel: &CancelToken,
    ) -> CommerceResult<Order> {
        if cancel.is_cancelled() {
            return Err(CommerceError::Cancelled);
        }

        tracing::info!(
            friendly_name = %request.friendly_name,
            po_number = %request.po_number,
            "Provisioning subscription"
        );

        let basket = self
            .create_basket(request)
            .await
            .map_err(|e| e.at_stage(ProvisioningStage::CreatingBasket))?;

        let checkout = self
            .checkout(&basket)
            .await
            .map_err(|e| e.at_stage(ProvisioningStage::CheckingOut))?;

        self.wait_for_subscription(&checkout.id.to_string(), cancel)
            .await
    }

    /// Re-read `order_id` until its first item carries a subscription id
    pub async fn wait_for_subscription(
        &self,
        order_id: &str,
        cancel: &CancelToken,
    ) -> CommerceResult<Order> {
        let mut delays = self.poll.delays();
        let mut expiry_reported = false;

        for attempt in 1..=self.poll.max_attempts {
            // TODO: re-authenticate here once the identity host documents refresh semantics
            if !expiry_reported && self.api.session_expired() {
                tracing::warn!(
                    order_id = %order_id,
                    attempt,
                    "Session token has outlived its advertised lifetime, requests may be rejected"
                );
                expiry_reported = true;
            }

            let order = self
                .api
                .get_order(order_id)
                .await
                .map_err(|e| e.at_stage(ProvisioningStage::Polling))?;

            if let Some(subscription_id) = order.subscription_id() {
                tracing::info!(
                    order_id = %order_id,
                    subscription_id = %subscription_id,
                    attempt,
                    "Subscription provisioned"
                );
                return Ok(order);
            }

            tracing::debug!(
                order_id = %order_id,
                attempt,
                max_attempts = self.poll.max_attempts,
                "Subscription id still blank, waiting"
            );

            if let Some(delay) = delays.next() {
                cancel.sleep(delay).await?;
            }
        }

        tracing::error!(
            order_id = %order_id,
            attempts = self.poll.max_attempts,
            "Subscription id never populated"
        );
        Err(CommerceError::ProvisioningTimeout {
            order_id: order_id.to_string(),
            attempts: self.poll.max_attempts,
        })
    }
}
