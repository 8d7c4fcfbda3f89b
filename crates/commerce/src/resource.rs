//! Lifecycle entry points for configuration hosts
//!
//! Maps host-level create/read/delete calls onto [`SubscriptionService`] and
//! flattens API responses into state records. Subscriptions cannot be
//! modified or removed remotely, so there is no update and delete only
//! forgets the record locally.

use serde::{Deserialize, Serialize};

use crate::api::CommerceApi;
use crate::cancel::CancelToken;
use crate::client::CommerceClient;
use crate::error::CommerceResult;
use crate::models::{Order, SubscriptionRequest};
use crate::subscriptions::SubscriptionService;

/// Desired subscription as declared by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    pub friendly_name: String,
    pub po_number: String,
    #[serde(default)]
    pub default_admin: Option<String>,
    pub budget_code: String,
    #[serde(default)]
    pub division_id: Option<i64>,
}

impl From<&SubscriptionSpec> for SubscriptionRequest {
    fn from(spec: &SubscriptionSpec) -> Self {
        Self {
            friendly_name: spec.friendly_name.clone(),
            principal_id: spec.default_admin.clone(),
            po_number: spec.po_number.clone(),
            budget_code: spec.budget_code.clone(),
            division_id: spec.division_id,
        }
    }
}

/// State stored for a provisioned subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Order id assigned at checkout
    pub id: String,
    pub contract_name: String,
    pub create_date: String,
    pub subscription_id: String,
    pub friendly_name: String,
    pub po_number: String,
    pub default_admin: Option<String>,
    pub budget_code: String,
    pub division_id: Option<i64>,
}

impl SubscriptionRecord {
    fn from_order(spec: &SubscriptionSpec, order: &Order) -> Self {
        let mut record = Self {
            id: order.id.to_string(),
            contract_name: order.contract_name.clone(),
            create_date: order.create_date.clone(),
            subscription_id: String::new(),
            friendly_name: spec.friendly_name.clone(),
            po_number: spec.po_number.clone(),
            default_admin: spec.default_admin.clone(),
            budget_code: spec.budget_code.clone(),
            division_id: spec.division_id,
        };

        if let Some(item) = order.items.first() {
            record.subscription_id = item.subscription_id.clone();
            record.friendly_name = item.friendly_name.clone();
            record.po_number = item.po_number.clone();
            if !item.principal_id.is_empty() {
                record.default_admin = Some(item.principal_id.clone());
            }
        }

        record
    }
}

/// Read-only view of an existing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub contract_name: String,
    pub create_date: String,
    pub subscription_id: String,
    pub friendly_name: String,
    pub po_number: String,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        let first = order.items.first();
        Self {
            id: order.id,
            contract_name: order.contract_name.clone(),
            create_date: order.create_date.clone(),
            subscription_id: first.map(|i| i.subscription_id.clone()).unwrap_or_default(),
            friendly_name: first.map(|i| i.friendly_name.clone()).unwrap_or_default(),
            po_number: first.map(|i| i.po_number.clone()).unwrap_or_default(),
        }
    }
}

pub struct SubscriptionResource<A: CommerceApi = CommerceClient> {
    service: SubscriptionService<A>,
}

impl<A: CommerceApi> SubscriptionResource<A> {
    pub fn new(service: SubscriptionService<A>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &SubscriptionService<A> {
        &self.service
    }

    pub async fn create(&self, spec: &SubscriptionSpec) -> CommerceResult<SubscriptionRecord> {
        self.create_with_cancel(spec, &CancelToken::new()).await
    }

    pub async fn create_with_cancel(
        &self,
        spec: &SubscriptionSpec,
        cancel: &CancelToken,
    ) -> CommerceResult<SubscriptionRecord> {
        let request = SubscriptionRequest::from(spec);
        let order = self
            .service
            .create_subscription_with_cancel(&request, cancel)
            .await?;
        Ok(SubscriptionRecord::from_order(spec, &order))
    }

    /// Current state of the order behind `id`
    pub async fn read(&self, id: &str) -> CommerceResult<OrderRecord> {
        let order = self.service.get_order_details(id).await?;
        Ok(OrderRecord::from(&order))
    }

    /// The API has no delete call; the host just drops its record.
    pub fn delete(&self, id: &str) -> CommerceResult<()> {
        tracing::info!(
            order_id = %id,
            "Subscription removed from state only, the commerce API has no delete operation"
        );
        Ok(())
    }
}
