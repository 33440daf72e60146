//! Domain types shared by the storefront and admin binaries.
//!
//! Parsing happens once at the edge; handlers pass these types around
//! instead of raw strings.

pub mod business_card;
pub mod coupon;
pub mod email;
pub mod form;
pub mod id;
pub mod notice;
pub mod otp;
pub mod redemption;

pub use business_card::{BusinessCard, BusinessCardDraft, BusinessCardSubmission, Certification};
pub use coupon::{Coupon, CouponForm, NewCoupon, PublishChange};
pub use email::{Email, EmailError};
pub use form::FieldErrors;
pub use id::*;
pub use notice::{Notice, NoticeLevel};
pub use otp::OtpCode;
pub use redemption::{RedemptionCode, RedemptionCodeError};
