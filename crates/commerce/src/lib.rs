// Commerce crate clippy configuration
#![allow(clippy::result_large_err)] // CommerceError carries raw response bodies
// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Commerce Subscription Provisioning
//!
//! Client and orchestration layer for provisioning subscriptions through the
//! commerce API.
//!
//! ## Features
//!
//! - **Authentication**: Client-credentials token, fetched once per session
//! - **Baskets**: Single-item basket creation with stale-basket recovery
//! - **Checkout**: Basket to order conversion
//! - **Orders**: Order status lookup
//! - **Provisioning**: Basket, checkout and bounded, cancellable polling in one call
//! - **Resource facade**: Create/read/delete entry points for configuration hosts
//!
//! ## Concurrency
//!
//! [`CommerceClient`] is cheap to clone and immutable after configuration, so
//! several provisioning runs may share it. Runs against the same contract
//! from different processes fight over the contract's single open basket;
//! that has to be prevented by whoever schedules them.

pub mod api;
pub mod auth;
pub mod baskets;
pub mod cancel;
pub mod checkout;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod orders;
pub mod resource;
pub mod subscriptions;

#[cfg(test)]
mod http_tests;

// API seam
pub use api::CommerceApi;

// Auth
pub use auth::{authenticate, Credentials, SessionToken};

// Baskets
pub use baskets::{BasketManager, MAX_BASKET_RETRIES};

// Cancellation
pub use cancel::CancelToken;

// Client
pub use client::CommerceClient;

// Config
pub use config::{CommerceConfig, DEFAULT_REQUEST_TIMEOUT};

// Error
pub use error::{CommerceError, CommerceResult, ProvisioningStage};

// Models
pub use models::{
    Basket, BasketItem, BasketPayload, Checkout, CheckoutItem, Order, OrderItem,
    SubscriptionRequest,
};

// Resource
pub use resource::{OrderRecord, SubscriptionRecord, SubscriptionResource, SubscriptionSpec};

// Subscriptions
pub use subscriptions::{
    PollPolicy, SubscriptionService, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};

/// Configure a session and wrap it in a provisioning service
pub async fn connect(config: CommerceConfig) -> CommerceResult<SubscriptionService> {
    let client = CommerceClient::configure(config).await?;
    Ok(SubscriptionService::new(client))
}
