//! Billing route handlers.
//!
//! Checkout flows through Stripe-hosted pages; this service only creates
//! the session and hands back its URL. Subscription state is never
//! written here, only by the webhook handler, so a completed checkout
//! takes effect when Stripe confirms it.

use axum::{Json, extract::State};
use lineup_core::{PLANS, Plan};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::db::{SubscriptionRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::Subscription;
use crate::services::entitlements::{self, UsageSummary};
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutBody {
    /// Optional Stripe coupon id applied to the session.
    #[serde(default)]
    pub coupon: Option<String>,
}

/// `POST /api/billing/checkout` - start a Stripe Checkout session for the
/// starter plan. Returns the hosted page URL.
pub async fn checkout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<Value>> {
    // Reject a second checkout while a paid subscription is live
    let existing = SubscriptionRepository::new(state.pool())
        .get(user.id)
        .await?;
    if let Some(sub) = &existing
        && sub.status.is_entitled()
        && sub.effective_plan().id != lineup_core::PlanId::Free
    {
        return Err(AppError::BadRequest(
            "account already has an active subscription".into(),
        ));
    }

    let account = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".into()))?;

    let stripe = state.stripe();
    let customer = match stripe.find_customer_by_email(account.email.as_str()).await? {
        Some(customer) => customer,
        None => stripe.create_customer(account.email.as_str(), user.id).await?,
    };

    let base = state.config().base_url.trim_end_matches('/');
    let success_url = format!("{base}/billing?status=success");
    let cancel_url = format!("{base}/billing?status=canceled");

    let session = stripe
        .create_checkout_session(
            &customer.id,
            user.id,
            &success_url,
            &cancel_url,
            body.coupon.as_deref(),
        )
        .await?;
    let url = session.url.ok_or_else(|| {
        AppError::Internal("checkout session created without a redirect URL".into())
    })?;

    tracing::info!(user_id = %user.id, session_id = session.id, "checkout session created");
    Ok(Json(json!({"url": url})))
}

/// `POST /api/billing/cancel` - schedule the subscription to end at the
/// period boundary. Entitlements persist until the deletion webhook lands.
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Value>> {
    let subscription = SubscriptionRepository::new(state.pool())
        .get(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("subscription".into()))?;

    if !subscription.status.is_entitled() {
        return Err(AppError::BadRequest("subscription is not active".into()));
    }

    let updated = state
        .stripe()
        .cancel_at_period_end(&subscription.stripe_subscription_id)
        .await?;

    tracing::info!(
        user_id = %user.id,
        subscription_id = updated.id,
        "cancellation scheduled at period end"
    );
    Ok(Json(json!({
        "ok": true,
        "cancel_at_period_end": updated.cancel_at_period_end,
        "current_period_end": updated.current_period_end,
    })))
}

/// Subscription state as the dashboard sees it.
#[derive(Debug, Serialize)]
pub struct SubscriptionBody {
    pub plan: &'static Plan,
    pub subscription: Option<Subscription>,
    /// All plans, so the dashboard can render an upgrade table.
    pub plans: &'static [Plan],
}

/// `GET /api/billing/subscription` - effective plan plus the raw
/// subscription row, if any.
pub async fn subscription(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<SubscriptionBody>> {
    let subscription = SubscriptionRepository::new(state.pool())
        .get(user.id)
        .await?;
    let plan = crate::models::subscription::effective_plan(subscription.as_ref());

    Ok(Json(SubscriptionBody {
        plan,
        subscription,
        plans: PLANS,
    }))
}

/// `GET /api/usage` - counts against the current plan's limits.
pub async fn usage(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<UsageSummary>> {
    let summary = entitlements::usage_for(state.pool(), user.id).await?;
    Ok(Json(summary))
}
