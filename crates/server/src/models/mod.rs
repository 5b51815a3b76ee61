//! Domain models for the Lineup server.
//!
//! Row types derive `sqlx::FromRow` and are returned by the repositories;
//! most also derive `Serialize` because the dashboard surface is JSON.

pub mod catalog;
pub mod company;
pub mod product;
pub mod session;
pub mod subscription;
pub mod user;

pub use catalog::{Catalog, CustomerResponse};
pub use company::CompanyProfile;
pub use product::{Product, UnprocessedProduct};
pub use session::{CurrentUser, keys as session_keys};
pub use subscription::Subscription;
pub use user::User;
