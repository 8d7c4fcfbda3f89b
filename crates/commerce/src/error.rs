//! Commerce error types

use std::fmt;

use thiserror::Error;

/// Stage of a provisioning run, used to label orchestration failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStage {
    CreatingBasket,
    CheckingOut,
    Polling,
}

impl fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningStage::CreatingBasket => write!(f, "failed to create basket"),
            ProvisioningStage::CheckingOut => write!(f, "failed to checkout basket"),
            ProvisioningStage::Polling => write!(f, "failed to fetch order details"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommerceError {
    /// Missing or invalid configuration. Raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication failed with status {status}, body: {body}")]
    Auth { status: u16, body: String },

    #[error("order query failed with status {status}, response body: {body}")]
    Query { status: u16, body: String },

    #[error("basket creation failed with status {status}, response body: {body}")]
    Basket { status: u16, body: String },

    #[error("failed to delete basket item with id {item_id}: status {status}, response body: {body}")]
    BasketCleanup {
        item_id: i64,
        status: u16,
        body: String,
    },

    #[error("checkout failed with status {status}, response body: {body}")]
    Checkout { status: u16, body: String },

    #[error("failed to decode {context} response: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {context} request body: {source}")]
    Encode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid order id {0:?}")]
    InvalidOrderId(String),

    #[error("basket {basket_id} was created without any items")]
    EmptyBasket { basket_id: i64 },

    #[error("max retries reached while trying to create basket ({attempts} conflicting baskets purged)")]
    BasketConflictExceeded { attempts: u32 },

    #[error("subscriptionId for order {order_id} did not update after {attempts} status checks")]
    ProvisioningTimeout { order_id: String, attempts: u32 },

    #[error("{stage}: {source}")]
    ProvisioningFailed {
        stage: ProvisioningStage,
        #[source]
        source: Box<CommerceError>,
    },

    #[error("provisioning cancelled")]
    Cancelled,
}

impl CommerceError {
    pub(crate) fn decode(context: &'static str, source: serde_json::Error) -> Self {
        CommerceError::Decode { context, source }
    }

    pub(crate) fn at_stage(self, stage: ProvisioningStage) -> Self {
        CommerceError::ProvisioningFailed {
            stage,
            source: Box::new(self),
        }
    }

    /// HTTP status carried by the error, if the failure came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            CommerceError::Auth { status, .. }
            | CommerceError::Query { status, .. }
            | CommerceError::Basket { status, .. }
            | CommerceError::BasketCleanup { status, .. }
            | CommerceError::Checkout { status, .. } => Some(*status),
            CommerceError::Transport(e) => e.status().map(|s| s.as_u16()),
            CommerceError::ProvisioningFailed { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Stage at which an orchestration failed
    pub fn stage(&self) -> Option<ProvisioningStage> {
        match self {
            CommerceError::ProvisioningFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type CommerceResult<T> = Result<T, CommerceError>;
