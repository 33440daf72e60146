//! Visitor-facing state machines: the redemption gate and OTP verification.

pub mod gate;
pub mod verification;

pub use gate::GateOutcome;
pub use verification::{FlowError, Generation, Phase, ResendCooldown, VerificationSession};
