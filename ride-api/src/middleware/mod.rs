//! Middleware
//!
//! - `auth` - JWT validation, the admin guard and the `AuthUser` extractor

pub mod auth;

pub use auth::*;
