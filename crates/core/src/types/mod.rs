//! Core types for Lineup.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod plan;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use plan::{PLANS, Plan, PlanId, PlanIdParseError, PlanLimits};
pub use slug::{Slug, SlugError};
pub use status::SubscriptionStatus;
