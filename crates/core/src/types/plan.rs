//! Subscription plans and entitlement limits.
//!
//! Plan limits live in a static table keyed by [`PlanId`] rather than in the
//! database: a subscription row records which plan an account is on, and the
//! limits for that plan are looked up here. Changing a plan's limits is a
//! deploy, not a migration.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier for a subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanId {
    /// The default tier every account starts on.
    #[default]
    Free,
    /// The paid tier.
    Starter,
}

/// Error parsing a [`PlanId`] from a string.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown plan id: {0}")]
pub struct PlanIdParseError(pub String);

impl PlanId {
    /// Returns the stable string form stored in the database and sent to
    /// clients.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
        }
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanId {
    type Err = PlanIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "starter" => Ok(Self::Starter),
            other => Err(PlanIdParseError(other.to_owned())),
        }
    }
}

/// Usage ceilings for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Maximum number of processed (non-archived) products.
    pub max_images: i64,
    /// Maximum number of catalogs.
    pub max_catalogs: i64,
}

/// A subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Plan identifier.
    pub id: PlanId,
    /// Display name.
    pub name: &'static str,
    /// Monthly price in cents (USD).
    pub monthly_price_cents: i64,
    /// Usage ceilings.
    pub limits: PlanLimits,
}

/// The full plan table, lowest tier first.
pub const PLANS: &[Plan] = &[
    Plan {
        id: PlanId::Free,
        name: "Free",
        monthly_price_cents: 0,
        limits: PlanLimits {
            max_images: 25,
            max_catalogs: 2,
        },
    },
    Plan {
        id: PlanId::Starter,
        name: "Starter",
        monthly_price_cents: 1900,
        limits: PlanLimits {
            max_images: 500,
            max_catalogs: 20,
        },
    },
];

impl Plan {
    /// Look up the plan for a given id.
    #[must_use]
    pub fn for_id(id: PlanId) -> &'static Self {
        // PLANS covers every PlanId variant; fall back to the first entry
        // (free) so a table edit can never panic at runtime.
        PLANS
            .iter()
            .find(|p| p.id == id)
            .or_else(|| PLANS.first())
            .unwrap_or(&FREE_PLAN)
    }

    /// Monthly price as a decimal dollar amount.
    #[must_use]
    pub fn monthly_price(&self) -> Decimal {
        Decimal::new(self.monthly_price_cents, 2)
    }
}

const FREE_PLAN: Plan = Plan {
    id: PlanId::Free,
    name: "Free",
    monthly_price_cents: 0,
    limits: PlanLimits {
        max_images: 25,
        max_catalogs: 2,
    },
};

// SQLx support (with postgres feature): plan ids are stored as TEXT.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PlanId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PlanId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse::<Self>()?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PlanId {
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
    fn test_plan_id_round_trip() {
        for plan in PLANS {
            let parsed: PlanId = plan.id.as_str().parse().unwrap();
            assert_eq!(parsed, plan.id);
        }
    }

    #[test]
    fn test_plan_table_reachable_from_crate_root() {
        // Consumers import the table as `lineup_core::PLANS`.
        assert_eq!(crate::PLANS.len(), PLANS.len());
    }

    #[test]
    fn test_plan_id_parse_unknown() {
        assert!("enterprise".parse::<PlanId>().is_err());
    }

    #[test]
    fn test_for_id_covers_every_variant() {
        assert_eq!(Plan::for_id(PlanId::Free).id, PlanId::Free);
        assert_eq!(Plan::for_id(PlanId::Starter).id, PlanId::Starter);
    }

    #[test]
    fn test_limits_monotone_across_tiers() {
        // Each successive tier must allow at least as much as the one below,
        // otherwise an upgrade could strand a user over their new limits.
        for pair in PLANS.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            assert!(upper.limits.max_images >= lower.limits.max_images);
            assert!(upper.limits.max_catalogs >= lower.limits.max_catalogs);
            assert!(upper.monthly_price_cents >= lower.monthly_price_cents);
        }
    }

    #[test]
    fn test_free_plan_is_free() {
        let free = Plan::for_id(PlanId::Free);
        assert_eq!(free.monthly_price_cents, 0);
        assert_eq!(free.monthly_price(), Decimal::ZERO);
    }

    #[test]
    fn test_monthly_price_decimal_places() {
        let starter = Plan::for_id(PlanId::Starter);
        assert_eq!(starter.monthly_price().to_string(), "19.00");
    }

    #[test]
    fn test_plan_id_serde_snake_case() {
        assert_eq!(serde_json::to_string(&PlanId::Starter).unwrap(), "\"starter\"");
        let id: PlanId = serde_json::from_str("\"free\"").unwrap();
        assert_eq!(id, PlanId::Free);
    }
}
