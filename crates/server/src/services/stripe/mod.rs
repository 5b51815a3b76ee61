//! Stripe API client for subscription billing.
//!
//! Covers the handful of calls the billing flow needs: customer lookup
//! and creation, Checkout session creation for the paid plan, and
//! toggling cancel-at-period-end. Webhook signature verification lives
//! in [`webhook`].

pub mod webhook;

use lineup_core::UserId;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::StripeConfig;

/// Stripe REST API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Webhook payload failed verification.
    #[error("webhook verification failed: {0}")]
    Webhook(#[from] webhook::WebhookError),
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    price_starter: String,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| StripeError::Parse(format!("Invalid secret key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            price_starter: config.price_starter.clone(),
        })
    }

    /// Price id charged for the starter plan.
    #[must_use]
    pub fn starter_price_id(&self) -> &str {
        &self.price_starter
    }

    /// Find an existing customer by email address.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, StripeError> {
        let url = format!(
            "{BASE_URL}/customers?email={}&limit=1",
            urlencoding::encode(email)
        );

        let response = self.client.get(&url).send().await?;
        let list: ApiListResponse<Customer> = Self::parse(response).await?;
        Ok(list.data.into_iter().next())
    }

    /// Create a customer tagged with the owning account id.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_customer(
        &self,
        email: &str,
        owner_id: UserId,
    ) -> Result<Customer, StripeError> {
        let owner = owner_id.to_string();
        let params = [("email", email), ("metadata[owner_id]", owner.as_str())];

        let response = self
            .client
            .post(format!("{BASE_URL}/customers"))
            .form(&params)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Create a Checkout session for the starter plan subscription.
    ///
    /// `client_reference_id` carries the account id so the webhook can
    /// attribute the completed session even if customer metadata is lost.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn create_checkout_session(
        &self,
        customer_id: &str,
        owner_id: UserId,
        success_url: &str,
        cancel_url: &str,
        coupon: Option<&str>,
    ) -> Result<CheckoutSession, StripeError> {
        let owner = owner_id.to_string();
        let mut params = vec![
            ("mode", "subscription"),
            ("customer", customer_id),
            ("client_reference_id", owner.as_str()),
            ("line_items[0][price]", self.price_starter.as_str()),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
        ];
        if let Some(coupon) = coupon {
            params.push(("discounts[0][coupon]", coupon));
        }

        let response = self
            .client
            .post(format!("{BASE_URL}/checkout/sessions"))
            .form(&params)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Fetch a subscription by id.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionObject, StripeError> {
        let response = self
            .client
            .get(format!("{BASE_URL}/subscriptions/{subscription_id}"))
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Schedule a subscription to end at the current period boundary.
    /// The account keeps paid entitlements until Stripe sends the
    /// `customer.subscription.deleted` event.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn cancel_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionObject, StripeError> {
        let response = self
            .client
            .post(format!("{BASE_URL}/subscriptions/{subscription_id}"))
            .form(&[("cancel_at_period_end", "true")])
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StripeError::Api {
                status: status.as_u16(),
                message: message.chars().take(512).collect(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| StripeError::Parse(e.to_string()))
    }
}

/// Wrapper for Stripe list responses.
#[derive(Debug, Deserialize)]
struct ApiListResponse<T> {
    data: Vec<T>,
}

/// Customer resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
}

/// Checkout session resource. `url` is where the browser gets redirected.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Subscription resource, trimmed to the fields the app reads.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

impl SubscriptionObject {
    /// Price id of the first line item, if any.
    #[must_use]
    pub fn price_id(&self) -> Option<&str> {
        self.items
            .data
            .first()
            .map(|item| item.price.id.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_object_parses_api_shape() {
        let json = r#"{
            "id": "sub_123",
            "customer": "cus_456",
            "status": "active",
            "cancel_at_period_end": false,
            "current_period_start": 1764547200,
            "current_period_end": 1767225600,
            "items": {"data": [{"price": {"id": "price_789"}}]}
        }"#;

        let sub: SubscriptionObject = serde_json::from_str(json).unwrap();
        assert_eq!(sub.id, "sub_123");
        assert_eq!(sub.customer, "cus_456");
        assert_eq!(sub.status, "active");
        assert_eq!(sub.price_id(), Some("price_789"));
        assert_eq!(sub.current_period_end, Some(1_767_225_600));
    }

    #[test]
    fn test_subscription_object_tolerates_missing_items() {
        let json = r#"{"id": "sub_1", "customer": "cus_1", "status": "canceled"}"#;
        let sub: SubscriptionObject = serde_json::from_str(json).unwrap();
        assert!(sub.price_id().is_none());
        assert!(!sub.cancel_at_period_end);
    }
}
