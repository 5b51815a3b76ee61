//! Subscription repository and Stripe webhook event ledger.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use lineup_core::{PlanId, SubscriptionStatus, UserId};

use super::RepositoryError;
use crate::models::Subscription;

/// Full subscription state as derived from a Stripe event.
#[derive(Debug, Clone)]
pub struct SubscriptionUpsert {
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

/// Repository for subscription state.
pub struct SubscriptionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubscriptionRepository<'a> {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the owner's subscription row, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, owner_id: UserId) -> Result<Option<Subscription>, RepositoryError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r"
            SELECT owner_id, plan_id, status, stripe_customer_id, stripe_subscription_id,
                   current_period_start, current_period_end, cancel_at_period_end, updated_at
            FROM subscription
            WHERE owner_id = $1
            ",
        )
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(subscription)
    }

    /// Resolve an owner from a Stripe customer id.
    ///
    /// Used by `customer.subscription.*` events, which carry the customer
    /// id but not our `client_reference_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn owner_for_customer(
        &self,
        stripe_customer_id: &str,
    ) -> Result<Option<UserId>, RepositoryError> {
        let owner: Option<UserId> = sqlx::query_scalar(
            "SELECT owner_id FROM subscription WHERE stripe_customer_id = $1",
        )
        .bind(stripe_customer_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(owner)
    }

    /// Create or replace the owner's subscription row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(
        &self,
        owner_id: UserId,
        state: &SubscriptionUpsert,
    ) -> Result<Subscription, RepositoryError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r"
            INSERT INTO subscription
                (owner_id, plan_id, status, stripe_customer_id, stripe_subscription_id,
                 current_period_start, current_period_end, cancel_at_period_end, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (owner_id) DO UPDATE SET
                plan_id = EXCLUDED.plan_id,
                status = EXCLUDED.status,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                updated_at = now()
            RETURNING owner_id, plan_id, status, stripe_customer_id, stripe_subscription_id,
                      current_period_start, current_period_end, cancel_at_period_end, updated_at
            ",
        )
        .bind(owner_id)
        .bind(state.plan_id)
        .bind(state.status)
        .bind(&state.stripe_customer_id)
        .bind(&state.stripe_subscription_id)
        .bind(state.current_period_start)
        .bind(state.current_period_end)
        .bind(state.cancel_at_period_end)
        .fetch_one(self.pool)
        .await?;

        Ok(subscription)
    }

    /// Record a webhook event id. Returns `false` when the id was already
    /// recorded, i.e. this delivery is a duplicate and must be a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record_event(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO stripe_event (event_id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            ",
        )
        .bind(event_id)
        .bind(event_type)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Drop an event from the ledger. Called when handling failed after
    /// the id was recorded, so Stripe's retry is not skipped as a
    /// duplicate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn forget_event(&self, event_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM stripe_event WHERE event_id = $1")
            .bind(event_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Count subscriptions currently entitled to a paid plan.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_active_paid(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM subscription
            WHERE plan_id <> 'free' AND status IN ('trialing', 'active', 'past_due')
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}
