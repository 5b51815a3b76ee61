//! Integration tests for the plan table and entitlement resolution.

#![allow(clippy::unwrap_used)]

use chrono::Utc;

use lineup_core::{PLANS, Plan, PlanId, SubscriptionStatus, UserId};
use lineup_server::models::{Subscription, subscription::effective_plan};

fn starter_subscription(status: SubscriptionStatus) -> Subscription {
    Subscription {
        owner_id: UserId::new(1),
        plan_id: PlanId::Starter,
        status,
        stripe_customer_id: "cus_test".to_string(),
        stripe_subscription_id: "sub_test".to_string(),
        current_period_start: None,
        current_period_end: Some(Utc::now()),
        cancel_at_period_end: false,
        updated_at: Utc::now(),
    }
}

// =============================================================================
// Plan Table Tests
// =============================================================================

#[test]
fn test_plan_table_is_ordered_by_tier() {
    let prices: Vec<i64> = PLANS.iter().map(|p| p.monthly_price_cents).collect();
    let mut sorted = prices.clone();
    sorted.sort_unstable();
    assert_eq!(prices, sorted, "plans should be listed lowest tier first");
}

#[test]
fn test_free_plan_limits() {
    let free = Plan::for_id(PlanId::Free);
    assert_eq!(free.monthly_price_cents, 0);
    assert_eq!(free.limits.max_images, 25);
    assert_eq!(free.limits.max_catalogs, 2);
}

#[test]
fn test_starter_plan_limits() {
    let starter = Plan::for_id(PlanId::Starter);
    assert_eq!(starter.monthly_price_cents, 1900);
    assert_eq!(starter.limits.max_images, 500);
    assert_eq!(starter.limits.max_catalogs, 20);
}

#[test]
fn test_every_plan_id_resolves() {
    for plan in PLANS {
        assert_eq!(Plan::for_id(plan.id).id, plan.id);
    }
}

#[test]
fn test_monthly_price_is_dollars() {
    let starter = Plan::for_id(PlanId::Starter);
    assert_eq!(starter.monthly_price().to_string(), "19.00");
}

// =============================================================================
// Entitlement Resolution Tests
// =============================================================================

#[test]
fn test_no_subscription_row_means_free() {
    assert_eq!(effective_plan(None).id, PlanId::Free);
}

#[test]
fn test_entitled_statuses_keep_the_paid_plan() {
    for status in [
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
    ] {
        let sub = starter_subscription(status);
        assert_eq!(
            effective_plan(Some(&sub)).id,
            PlanId::Starter,
            "{status:?} should stay entitled"
        );
    }
}

#[test]
fn test_lapsed_statuses_fall_back_to_free() {
    for status in [
        SubscriptionStatus::Canceled,
        SubscriptionStatus::Unpaid,
        SubscriptionStatus::Incomplete,
        SubscriptionStatus::IncompleteExpired,
        SubscriptionStatus::Paused,
    ] {
        let sub = starter_subscription(status);
        assert_eq!(
            effective_plan(Some(&sub)).id,
            PlanId::Free,
            "{status:?} should not be entitled"
        );
    }
}

#[test]
fn test_cancel_at_period_end_does_not_lapse_early() {
    // The flag only means "do not renew"; the account stays paid until
    // Stripe flips the status itself.
    let mut sub = starter_subscription(SubscriptionStatus::Active);
    sub.cancel_at_period_end = true;
    assert_eq!(effective_plan(Some(&sub)).id, PlanId::Starter);
}
