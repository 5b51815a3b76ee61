//! Stripe webhook handler.
//!
//! The only writer of subscription state. Every delivery is verified
//! against the signing secret, recorded in an event ledger so replays are
//! no-ops, and then applied as an idempotent upsert. If applying fails,
//! the ledger entry is dropped again so Stripe's retry is not mistaken
//! for a duplicate.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use lineup_core::{Plan, PlanId, SubscriptionStatus, UserId};
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use crate::db::{SubscriptionRepository, SubscriptionUpsert};
use crate::error::{AppError, Result};
use crate::services::entitlements;
use crate::services::stripe::{
    SubscriptionObject,
    webhook::{self, CheckoutSessionCompleted, DEFAULT_TOLERANCE_SECS, Event},
};
use crate::state::AppState;

/// `POST /webhooks/stripe` - apply a Stripe event.
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing stripe-signature header".into()))?;

    webhook::verify_signature(
        &body,
        signature,
        state.config().stripe.webhook_secret.expose_secret(),
        DEFAULT_TOLERANCE_SECS,
        Utc::now().timestamp(),
    )
    .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let event: Event = serde_json::from_slice(&body)
        .map_err(|err| AppError::BadRequest(format!("malformed event payload: {err}")))?;

    let subscriptions = SubscriptionRepository::new(state.pool());
    if !subscriptions.record_event(&event.id, &event.event_type).await? {
        tracing::debug!(event_id = event.id, "duplicate webhook delivery skipped");
        return Ok(Json(json!({"received": true, "duplicate": true})));
    }

    if let Err(err) = apply_event(&state, &event).await {
        subscriptions.forget_event(&event.id).await?;
        return Err(err);
    }

    Ok(Json(json!({"received": true})))
}

async fn apply_event(state: &AppState, event: &Event) -> Result<()> {
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionCompleted =
                serde_json::from_value(event.data.object.clone())
                    .map_err(|err| AppError::BadRequest(format!("malformed session: {err}")))?;
            handle_checkout_completed(state, &session).await
        }
        "customer.subscription.created"
        | "customer.subscription.updated"
        | "customer.subscription.deleted" => {
            let subscription: SubscriptionObject =
                serde_json::from_value(event.data.object.clone())
                    .map_err(|err| AppError::BadRequest(format!("malformed subscription: {err}")))?;
            handle_subscription_event(state, &event.event_type, &subscription).await
        }
        other => {
            tracing::debug!(event_type = other, "unhandled webhook event type");
            Ok(())
        }
    }
}

/// A completed checkout carries our account id as `client_reference_id`;
/// the subscription itself is fetched from the API so the first upsert
/// already has full period data.
async fn handle_checkout_completed(
    state: &AppState,
    session: &CheckoutSessionCompleted,
) -> Result<()> {
    let owner_id = session
        .client_reference_id
        .as_deref()
        .and_then(|raw| raw.parse::<i32>().ok())
        .map(UserId::new)
        .ok_or_else(|| {
            AppError::BadRequest("checkout session has no usable client_reference_id".into())
        })?;
    let subscription_id = session
        .subscription
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("checkout session has no subscription".into()))?;

    let subscription = state.stripe().get_subscription(subscription_id).await?;
    upsert_subscription(state, owner_id, &subscription, false).await?;

    tracing::info!(owner_id = %owner_id, subscription_id, "checkout completed");
    Ok(())
}

async fn handle_subscription_event(
    state: &AppState,
    event_type: &str,
    subscription: &SubscriptionObject,
) -> Result<()> {
    let repo = SubscriptionRepository::new(state.pool());
    let Some(owner_id) = repo.owner_for_customer(&subscription.customer).await? else {
        // Subscription for a customer we never checkout'd; nothing to attach it to
        tracing::warn!(
            customer = subscription.customer,
            event_type,
            "subscription event for unknown customer"
        );
        return Ok(());
    };

    let deleted = event_type == "customer.subscription.deleted";
    upsert_subscription(state, owner_id, subscription, deleted).await
}

async fn upsert_subscription(
    state: &AppState,
    owner_id: UserId,
    subscription: &SubscriptionObject,
    deleted: bool,
) -> Result<()> {
    let status = if deleted {
        SubscriptionStatus::Canceled
    } else {
        SubscriptionStatus::parse(&subscription.status)
    };
    let plan_id = plan_for_price(state, subscription.price_id());

    let upsert = SubscriptionUpsert {
        plan_id,
        status,
        stripe_customer_id: subscription.customer.clone(),
        stripe_subscription_id: subscription.id.clone(),
        current_period_start: subscription.current_period_start.and_then(timestamp),
        current_period_end: subscription.current_period_end.and_then(timestamp),
        cancel_at_period_end: subscription.cancel_at_period_end,
    };

    let row = SubscriptionRepository::new(state.pool())
        .upsert(owner_id, &upsert)
        .await?;

    // A lapse back to free archives whatever exceeds the free limits
    let plan = row.effective_plan();
    if plan.id == PlanId::Free {
        enforce_downgrade(state, owner_id, plan).await?;
    }

    tracing::info!(
        owner_id = %owner_id,
        plan = %row.plan_id,
        status = ?row.status,
        "subscription state updated"
    );
    Ok(())
}

async fn enforce_downgrade(state: &AppState, owner_id: UserId, plan: &Plan) -> Result<()> {
    let outcome = entitlements::enforce_plan_limits(state.pool(), owner_id, plan).await?;
    for slug in &outcome.archived_catalog_slugs {
        state.invalidate_share_page(slug.as_str()).await;
    }
    Ok(())
}

/// Map a Stripe price id onto a plan. Unknown prices downgrade to free
/// rather than granting entitlements nobody configured.
fn plan_for_price(state: &AppState, price_id: Option<&str>) -> PlanId {
    match price_id {
        Some(price) if price == state.config().stripe.price_starter => PlanId::Starter,
        Some(price) => {
            tracing::warn!(price, "unrecognized price id on subscription");
            PlanId::Free
        }
        None => PlanId::Free,
    }
}

fn timestamp(unix: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(unix, 0)
}
