//! Subscription domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use lineup_core::{Plan, PlanId, SubscriptionStatus, UserId};

/// Billing subscription state for an account.
///
/// One row per account, upserted from Stripe webhooks. An account with no
/// row is on the free plan; an account with a row whose status is no longer
/// entitled is also treated as free.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Subscription {
    /// Owning account (primary key).
    pub owner_id: UserId,
    /// Plan the subscription is for.
    pub plan_id: PlanId,
    /// Stripe lifecycle status.
    pub status: SubscriptionStatus,
    /// Stripe customer id (`cus_...`).
    pub stripe_customer_id: String,
    /// Stripe subscription id (`sub_...`).
    pub stripe_subscription_id: String,
    /// Start of the current billing period.
    pub current_period_start: Option<DateTime<Utc>>,
    /// End of the current billing period.
    pub current_period_end: Option<DateTime<Utc>>,
    /// Whether the subscription ends (rather than renews) at period end.
    pub cancel_at_period_end: bool,
    /// When this row was last written.
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// The plan this subscription currently entitles the account to.
    ///
    /// Falls back to free when the status is not entitled.
    #[must_use]
    pub fn effective_plan(&self) -> &'static Plan {
        if self.status.is_entitled() {
            Plan::for_id(self.plan_id)
        } else {
            Plan::for_id(PlanId::Free)
        }
    }
}

/// The plan an optional subscription row resolves to.
#[must_use]
pub fn effective_plan(subscription: Option<&Subscription>) -> &'static Plan {
    subscription.map_or_else(|| Plan::for_id(PlanId::Free), Subscription::effective_plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(status: SubscriptionStatus) -> Subscription {
        Subscription {
            owner_id: UserId::new(1),
            plan_id: PlanId::Starter,
            status,
            stripe_customer_id: "cus_1".to_string(),
            stripe_subscription_id: "sub_1".to_string(),
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_missing_row_is_free() {
        assert_eq!(effective_plan(None).id, PlanId::Free);
    }

    #[test]
    fn test_active_starter_is_starter() {
        let sub = subscription(SubscriptionStatus::Active);
        assert_eq!(effective_plan(Some(&sub)).id, PlanId::Starter);
    }

    #[test]
    fn test_canceled_starter_falls_back_to_free() {
        let sub = subscription(SubscriptionStatus::Canceled);
        assert_eq!(effective_plan(Some(&sub)).id, PlanId::Free);
    }

    #[test]
    fn test_past_due_keeps_entitlement() {
        let sub = subscription(SubscriptionStatus::PastDue);
        assert_eq!(effective_plan(Some(&sub)).id, PlanId::Starter);
    }
}
