//! Shareable catalog slug type.
//!
//! A slug is the public identifier in a catalog share link
//! (`https://example.com/c/{slug}`). Slugs are generated server-side from an
//! unambiguous charset; the type also accepts hyphens so hand-assigned
//! vanity slugs remain valid.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum SlugError {
    /// The input string is too short.
    #[error("slug must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// The input string is too long.
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[a-z0-9-]`.
    #[error("slug may only contain lowercase letters, digits, and hyphens")]
    InvalidCharacter,
    /// The input starts or ends with a hyphen.
    #[error("slug cannot start or end with a hyphen")]
    EdgeHyphen,
}

/// A catalog share-link slug.
///
/// ## Constraints
///
/// - Length: 4-64 characters
/// - Characters: `a-z`, `0-9`, `-`
/// - Must not start or end with a hyphen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Minimum slug length.
    pub const MIN_LENGTH: usize = 4;
    /// Maximum slug length.
    pub const MAX_LENGTH: usize = 64;

    /// Length of generated slugs.
    pub const GENERATED_LENGTH: usize = 10;

    /// Charset used for generated slugs.
    ///
    /// Lowercase alphanumeric with the ambiguous `l`, `o`, `0`, and `1`
    /// removed, since these links are read aloud and retyped from phones.
    pub const GENERATED_CHARSET: &'static [u8] = b"abcdefghijkmnpqrstuvwxyz23456789";

    /// Parse a `Slug` from a string.
    ///
    /// # Errors
    ///
    /// Returns `SlugError` if the input violates the length or charset
    /// constraints.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.len() < Self::MIN_LENGTH {
            return Err(SlugError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if !s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(SlugError::InvalidCharacter);
        }

        if s.starts_with('-') || s.ends_with('-') {
            return Err(SlugError::EdgeHyphen);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Slug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Slug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_slugs() {
        assert!(Slug::parse("abcd").is_ok());
        assert!(Slug::parse("spring-2026").is_ok());
        assert!(Slug::parse("x7k2m9qe4w").is_ok());
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(Slug::parse("abc"), Err(SlugError::TooShort { .. })));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(65);
        assert!(matches!(
            Slug::parse(&long),
            Err(SlugError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_uppercase_and_symbols() {
        assert!(matches!(
            Slug::parse("Spring"),
            Err(SlugError::InvalidCharacter)
        ));
        assert!(matches!(
            Slug::parse("a b c d"),
            Err(SlugError::InvalidCharacter)
        ));
        assert!(matches!(
            Slug::parse("a/b/cd"),
            Err(SlugError::InvalidCharacter)
        ));
    }

    #[test]
    fn test_parse_rejects_edge_hyphens() {
        assert!(matches!(Slug::parse("-abcd"), Err(SlugError::EdgeHyphen)));
        assert!(matches!(Slug::parse("abcd-"), Err(SlugError::EdgeHyphen)));
    }

    #[test]
    fn test_generated_charset_is_unambiguous() {
        for banned in [b'l', b'o', b'0', b'1'] {
            assert!(!Slug::GENERATED_CHARSET.contains(&banned));
        }
        // Every generated character must survive parse()
        for &b in Slug::GENERATED_CHARSET {
            assert!(b.is_ascii_lowercase() || b.is_ascii_digit());
        }
    }

    #[test]
    fn test_generated_length_within_bounds() {
        assert!(Slug::GENERATED_LENGTH >= Slug::MIN_LENGTH);
        assert!(Slug::GENERATED_LENGTH <= Slug::MAX_LENGTH);
    }
}
