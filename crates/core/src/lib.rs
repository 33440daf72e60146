//! EventConnect Core - Shared types library.
//!
//! This crate provides the types used by both EventConnect binaries:
//! - `storefront` - Public event-code redemption, verification, and card capture
//! - `admin` - Coupon management and submitted-card browsing
//!
//! # Architecture
//!
//! The core crate contains only types, validation, and state machines - no
//! I/O and no HTTP clients. Handlers in the binaries drive these types and
//! perform the remote calls themselves.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers and wire records (emails, codes, coupons, cards)
//! - [`flow`] - Redemption gate outcomes and the verification state machine
//! - [`pagination`] - Paging metadata and the shared page-link window

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod flow;
pub mod pagination;
pub mod types;

pub use flow::{FlowError, GateOutcome, Generation, Phase, ResendCooldown, VerificationSession};
pub use types::*;
