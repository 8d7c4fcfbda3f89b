//! Wire types for the commerce API

use serde::{Deserialize, Deserializer, Serialize};

/// Product line item every basket is created for
pub const PRODUCT_ID: &str = "ENTITLEMENT";
pub const SKU_ID: &str = "ENTITLEMENT";
pub const PRICE_ID: i64 = 24492277;
pub const BILLING_FREQUENCY: &str = "monthly";
pub const TERM: &str = "Perpetual";

/// Treat a JSON `null` string as empty
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// What the caller asks to provision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub friendly_name: String,
    /// Default admin of the new subscription
    pub principal_id: Option<String>,
    pub po_number: String,
    pub budget_code: String,
    pub division_id: Option<i64>,
}

/// Body of the basket-creation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketPayload {
    pub quantity: u32,
    pub friendly_name: String,
    pub product_id: String,
    pub sku_id: String,
    pub principal_id: String,
    pub price_id: i64,
    pub po_number: String,
    pub billing_frequency: String,
    pub term: String,
    pub division_id: Option<i64>,
    pub budget_code: String,
}

impl From<&SubscriptionRequest> for BasketPayload {
    fn from(request: &SubscriptionRequest) -> Self {
        Self {
            quantity: 1,
            friendly_name: request.friendly_name.clone(),
            product_id: PRODUCT_ID.to_string(),
            sku_id: SKU_ID.to_string(),
            principal_id: request.principal_id.clone().unwrap_or_default(),
            price_id: PRICE_ID,
            po_number: request.po_number.clone(),
            billing_frequency: BILLING_FREQUENCY.to_string(),
            term: TERM.to_string(),
            division_id: request.division_id,
            budget_code: request.budget_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketItem {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub po_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub principal_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub budget_code: String,
}

/// Server-side cart. At most one is open per contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    pub id: i64,
    #[serde(default)]
    pub items: Vec<BasketItem>,
}

impl Basket {
    /// More than one line item means a previous run left items behind
    pub fn is_contaminated(&self) -> bool {
        self.items.len() >= 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub po_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub friendly_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub principal_id: String,
}

/// Record produced by checking out a basket. Its id doubles as the order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub id: i64,
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Filled in asynchronously once backend provisioning completes
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subscription_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub po_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub friendly_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub principal_id: String,
    #[serde(default)]
    pub cloud_subscription_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contract_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub create_date: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Subscription id of the first line item, if provisioning has finished
    pub fn subscription_id(&self) -> Option<&str> {
        self.items
            .first()
            .map(|item| item.subscription_id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn is_provisioned(&self) -> bool {
        self.subscription_id().is_some()
    }
}
