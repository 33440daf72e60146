//! Remote service clients for admin.
//!
//! # Services
//!
//! - `backend` - Authenticated coupon and business card endpoints
//! - `identity` - Password sign-in against the identity provider

pub mod backend;
pub mod identity;

pub use backend::{AdminBackendClient, BackendError, BusinessCardPage, CouponPage, ListQuery};
pub use identity::{IdentityClient, IdentityError};
