//! Subscription status.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a billing subscription.
///
/// Mirrors Stripe's subscription status values. Statuses arrive from webhook
/// payloads; anything unrecognized maps to [`SubscriptionStatus::Unknown`]
/// rather than failing the webhook, since Stripe adds statuses over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    #[default]
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
    /// A status this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Whether this status entitles the account to its paid plan's limits.
    ///
    /// `past_due` stays entitled: Stripe retries the charge for days before
    /// moving the subscription to `unpaid` or `canceled`.
    #[must_use]
    pub const fn is_entitled(&self) -> bool {
        matches!(self, Self::Trialing | Self::Active | Self::PastDue)
    }

    /// Stable string form stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Paused => "paused",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from the wire/database form. Unrecognized input becomes
    /// [`SubscriptionStatus::Unknown`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "trialing" => Self::Trialing,
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "paused" => Self::Paused,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// SQLx support (with postgres feature): statuses are stored as TEXT.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for SubscriptionStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SubscriptionStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for SubscriptionStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for status in [
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Unpaid,
            SubscriptionStatus::Incomplete,
            SubscriptionStatus::IncompleteExpired,
            SubscriptionStatus::Paused,
        ] {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_parse_unknown_is_lossy() {
        assert_eq!(
            SubscriptionStatus::parse("some_future_status"),
            SubscriptionStatus::Unknown
        );
    }

    #[test]
    fn test_entitlement() {
        assert!(SubscriptionStatus::Active.is_entitled());
        assert!(SubscriptionStatus::Trialing.is_entitled());
        assert!(SubscriptionStatus::PastDue.is_entitled());
        assert!(!SubscriptionStatus::Canceled.is_entitled());
        assert!(!SubscriptionStatus::Unpaid.is_entitled());
        assert!(!SubscriptionStatus::Unknown.is_entitled());
    }

    #[test]
    fn test_serde_matches_stripe_wire_form() {
        let status: SubscriptionStatus = serde_json::from_str("\"past_due\"").unwrap();
        assert_eq!(status, SubscriptionStatus::PastDue);
        // Unknown statuses deserialize via #[serde(other)] instead of erroring
        let status: SubscriptionStatus = serde_json::from_str("\"brand_new\"").unwrap();
        assert_eq!(status, SubscriptionStatus::Unknown);
    }
}
