//! EventConnect Admin library.
//!
//! This crate provides the admin console as a library, allowing it to be
//! tested and driven by the integration tests.
//!
//! # Security
//!
//! Every page except the login page requires the `authToken` cookie. The
//! console holds the identity provider API key; the backend holds the
//! authority over coupons and cards.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
