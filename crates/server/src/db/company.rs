//! Company profile repository.

use sqlx::PgPool;

use lineup_core::UserId;

use super::RepositoryError;
use crate::models::CompanyProfile;

/// Fields for writing a company profile. The profile is one row per owner
/// and is always replaced wholesale.
#[derive(Debug, Clone)]
pub struct CompanyProfileInput {
    pub company_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub logo_url: Option<String>,
}

/// Repository for company profiles.
pub struct CompanyProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CompanyProfileRepository<'a> {
    /// Create a new company profile repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the owner's company profile, if one has been saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, owner_id: UserId) -> Result<Option<CompanyProfile>, RepositoryError> {
        let profile = sqlx::query_as::<_, CompanyProfile>(
            r"
            SELECT owner_id, company_name, contact_email, contact_phone, logo_url, updated_at
            FROM company_profile
            WHERE owner_id = $1
            ",
        )
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(profile)
    }

    /// Create or replace the owner's company profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(
        &self,
        owner_id: UserId,
        input: &CompanyProfileInput,
    ) -> Result<CompanyProfile, RepositoryError> {
        let profile = sqlx::query_as::<_, CompanyProfile>(
            r"
            INSERT INTO company_profile
                (owner_id, company_name, contact_email, contact_phone, logo_url, updated_at)
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (owner_id) DO UPDATE SET
                company_name = EXCLUDED.company_name,
                contact_email = EXCLUDED.contact_email,
                contact_phone = EXCLUDED.contact_phone,
                logo_url = EXCLUDED.logo_url,
                updated_at = now()
            RETURNING owner_id, company_name, contact_email, contact_phone, logo_url, updated_at
            ",
        )
        .bind(owner_id)
        .bind(&input.company_name)
        .bind(input.contact_email.as_deref())
        .bind(input.contact_phone.as_deref())
        .bind(input.logo_url.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(profile)
    }
}
