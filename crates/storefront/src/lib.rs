//! EventConnect Storefront library.
//!
//! Public event-code redemption, email verification, and business card
//! capture. Exposed as a library so the router can be driven from tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
