//! Email and one-time-code verification for a single redemption flow.
//!
//! The session moves through these phases:
//!
//! ```text
//! EnteringEmail --code sent--> EnteringCode --code verified--> Verified
//!       ^                           |                          |    ^
//!       +-------- back to email ----+                 claim card  save failed
//!                                                              v    |
//!                                                            Submitting
//! ```
//!
//! A successful save closes the whole flow, so `Submitting` has no way
//! forward inside the session.
//!
//! Remote calls are made outside the session lock. Each call starts by
//! taking a [`Generation`] ticket and finishes by handing the ticket back;
//! any transition made in between (a newer call, "back to email") bumps the
//! generation so the older completion is refused with
//! [`FlowError::Superseded`].

use core::fmt;
use std::time::{Duration, Instant};

use crate::types::{Email, OtpCode, RedemptionCode};

/// Length of the resend cooldown.
pub const RESEND_COOLDOWN: Duration = Duration::from_secs(30);

pub const CODE_SENT: &str = "Verification code sent successfully";
pub const CODE_VERIFIED: &str = "Code verified successfully";
pub const SEND_FAILED: &str = "Failed to send verification code";
pub const INVALID_CODE: &str = "Invalid verification code";

/// Shown when the backend could not be asked to check a code.
pub const VERIFY_UNAVAILABLE: &str = "We could not verify your code right now. Please try again.";

/// Countdown gating the "resend code" action.
///
/// Before the first start there is nothing to wait for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResendCooldown {
    started_at: Option<Instant>,
}

impl ResendCooldown {
    /// (Re)start the countdown at the full 30 seconds.
    pub fn start(&mut self, now: Instant) {
        self.started_at = Some(now);
    }

    /// Clear the countdown entirely.
    pub fn reset(&mut self) {
        self.started_at = None;
    }

    /// Whole seconds left, from 30 down to 0.
    #[must_use]
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        self.started_at.map_or(0, |started| {
            let elapsed = now.saturating_duration_since(started).as_secs();
            RESEND_COOLDOWN.as_secs().saturating_sub(elapsed)
        })
    }

    #[must_use]
    pub fn can_resend(&self, now: Instant) -> bool {
        self.remaining_secs(now) == 0
    }
}

/// Where the visitor is in the verification flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    EnteringEmail,
    EnteringCode,
    Verified,
    /// A business card save is in flight; only one per flow.
    Submitting,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnteringEmail => "entering_email",
            Self::EnteringCode => "entering_code",
            Self::Verified => "verified",
            Self::Submitting => "submitting",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket identifying one in-flight remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation(u64);

/// Why a verification step was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowError {
    #[error("{action} is not allowed while {phase}")]
    WrongPhase {
        action: &'static str,
        phase: Phase,
    },

    #[error("resend available in {remaining}s")]
    CooldownActive { remaining: u64 },

    #[error("a newer request superseded this one")]
    Superseded,
}

/// Transient state of one visitor's verification.
#[derive(Debug, Clone)]
pub struct VerificationSession {
    redemption_code: RedemptionCode,
    phase: Phase,
    email: Option<Email>,
    pending_email: Option<Email>,
    code: OtpCode,
    cooldown: ResendCooldown,
    generation: u64,
}

impl VerificationSession {
    /// A fresh session for a code accepted at the gate.
    #[must_use]
    pub fn new(redemption_code: RedemptionCode) -> Self {
        Self {
            redemption_code,
            phase: Phase::EnteringEmail,
            email: None,
            pending_email: None,
            code: OtpCode::default(),
            cooldown: ResendCooldown::default(),
            generation: 0,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn redemption_code(&self) -> &RedemptionCode {
        &self.redemption_code
    }

    /// The address the code was sent to (Phase B and later).
    #[must_use]
    pub const fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    /// The last code the visitor entered.
    #[must_use]
    pub const fn code(&self) -> &OtpCode {
        &self.code
    }

    #[must_use]
    pub fn resend_remaining_secs(&self, now: Instant) -> u64 {
        self.cooldown.remaining_secs(now)
    }

    #[must_use]
    pub fn can_resend(&self, now: Instant) -> bool {
        self.cooldown.can_resend(now)
    }

    fn next_generation(&mut self) -> Generation {
        self.generation = self.generation.wrapping_add(1);
        Generation(self.generation)
    }

    fn check_current(&self, ticket: Generation) -> Result<(), FlowError> {
        if ticket.0 == self.generation {
            Ok(())
        } else {
            Err(FlowError::Superseded)
        }
    }

    fn require(&self, phase: Phase, action: &'static str) -> Result<(), FlowError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(FlowError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }

    /// Begin requesting a code for `email`.
    ///
    /// # Errors
    ///
    /// [`FlowError::WrongPhase`] unless the visitor is entering an email.
    pub fn begin_code_request(&mut self, email: Email) -> Result<Generation, FlowError> {
        self.require(Phase::EnteringEmail, "requesting a code")?;
        self.pending_email = Some(email);
        Ok(self.next_generation())
    }

    /// The backend sent the code: move to code entry and start the cooldown.
    ///
    /// # Errors
    ///
    /// [`FlowError::Superseded`] if another call started since `ticket`.
    pub fn code_sent(&mut self, ticket: Generation, now: Instant) -> Result<(), FlowError> {
        self.check_current(ticket)?;
        self.email = self.pending_email.take();
        self.phase = Phase::EnteringCode;
        self.code = OtpCode::default();
        self.cooldown.start(now);
        Ok(())
    }

    /// The code request failed; the visitor stays on the email step.
    ///
    /// # Errors
    ///
    /// [`FlowError::Superseded`] if another call started since `ticket`.
    pub fn code_request_failed(&mut self, ticket: Generation) -> Result<(), FlowError> {
        self.check_current(ticket)?;
        self.pending_email = None;
        Ok(())
    }

    /// Begin a resend to the known address.
    ///
    /// The cooldown restarts at 30 seconds before the call goes out, whatever
    /// its outcome.
    ///
    /// # Errors
    ///
    /// [`FlowError::WrongPhase`] outside code entry and
    /// [`FlowError::CooldownActive`] while the countdown is running.
    pub fn begin_resend(&mut self, now: Instant) -> Result<(Generation, Email), FlowError> {
        self.require(Phase::EnteringCode, "resending a code")?;
        let remaining = self.cooldown.remaining_secs(now);
        if remaining > 0 {
            return Err(FlowError::CooldownActive { remaining });
        }
        let email = self.email.clone().ok_or(FlowError::WrongPhase {
            action: "resending a code",
            phase: self.phase,
        })?;
        self.cooldown.start(now);
        Ok((self.next_generation(), email))
    }

    /// Finish a resend. Nothing changes on either outcome beyond the ticket
    /// check; the cooldown was already restarted.
    ///
    /// # Errors
    ///
    /// [`FlowError::Superseded`] if another call started since `ticket`.
    pub fn resend_finished(&self, ticket: Generation) -> Result<(), FlowError> {
        self.check_current(ticket)
    }

    /// Begin verifying `code` for the known address.
    ///
    /// # Errors
    ///
    /// [`FlowError::WrongPhase`] outside code entry.
    pub fn begin_verify(&mut self, code: OtpCode) -> Result<(Generation, Email), FlowError> {
        self.require(Phase::EnteringCode, "verifying a code")?;
        let email = self.email.clone().ok_or(FlowError::WrongPhase {
            action: "verifying a code",
            phase: self.phase,
        })?;
        self.code = code;
        Ok((self.next_generation(), email))
    }

    /// The backend accepted the code.
    ///
    /// # Errors
    ///
    /// [`FlowError::Superseded`] if another call started since `ticket`.
    pub fn code_verified(&mut self, ticket: Generation) -> Result<(), FlowError> {
        self.check_current(ticket)?;
        self.phase = Phase::Verified;
        Ok(())
    }

    /// The backend rejected the code; the visitor stays on code entry.
    ///
    /// # Errors
    ///
    /// [`FlowError::Superseded`] if another call started since `ticket`.
    pub fn code_rejected(&mut self, ticket: Generation) -> Result<(), FlowError> {
        self.check_current(ticket)
    }

    /// Return to the email step, discarding every code-entry detail.
    ///
    /// In-flight calls become stale.
    ///
    /// # Errors
    ///
    /// [`FlowError::WrongPhase`] once verified.
    pub fn back_to_email(&mut self) -> Result<(), FlowError> {
        if matches!(self.phase, Phase::Verified | Phase::Submitting) {
            return Err(FlowError::WrongPhase {
                action: "changing the email",
                phase: self.phase,
            });
        }
        self.phase = Phase::EnteringEmail;
        self.email = None;
        self.pending_email = None;
        self.code = OtpCode::default();
        self.cooldown.reset();
        self.next_generation();
        Ok(())
    }

    /// The verified identity a business card is saved under.
    ///
    /// # Errors
    ///
    /// [`FlowError::WrongPhase`] until the code has been verified.
    pub fn verified_identity(&self) -> Result<(Email, RedemptionCode), FlowError> {
        self.require(Phase::Verified, "saving a business card")?;
        self.email
            .clone()
            .map(|email| (email, self.redemption_code.clone()))
            .ok_or(FlowError::WrongPhase {
                action: "saving a business card",
                phase: self.phase,
            })
    }

    /// Claim the flow for a business card save.
    ///
    /// Only one claim can be held at a time, so two submissions racing on
    /// the same flow cannot both reach the backend.
    ///
    /// # Errors
    ///
    /// [`FlowError::WrongPhase`] unless verified and not already submitting.
    pub fn begin_submission(&mut self) -> Result<(Generation, Email, RedemptionCode), FlowError> {
        let (email, code) = self.verified_identity()?;
        self.phase = Phase::Submitting;
        Ok((self.next_generation(), email, code))
    }

    /// The save failed; the card form is open again.
    ///
    /// # Errors
    ///
    /// [`FlowError::Superseded`] if another call started since `ticket`.
    pub fn submission_failed(&mut self, ticket: Generation) -> Result<(), FlowError> {
        self.check_current(ticket)?;
        self.phase = Phase::Verified;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn session() -> VerificationSession {
        VerificationSession::new(RedemptionCode::parse("EVT1").unwrap())
    }

    fn email() -> Email {
        Email::parse("a@b.com").unwrap()
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn at_code_entry(t0: Instant) -> VerificationSession {
        let mut s = session();
        let ticket = s.begin_code_request(email()).unwrap();
        s.code_sent(ticket, t0).unwrap();
        s
    }

    #[test]
    fn test_cooldown_counts_down_to_zero_at_thirty_seconds() {
        let t0 = Instant::now();
        let mut cooldown = ResendCooldown::default();
        assert_eq!(cooldown.remaining_secs(t0), 0);
        assert!(cooldown.can_resend(t0));

        cooldown.start(t0);
        assert_eq!(cooldown.remaining_secs(t0), 30);
        assert_eq!(cooldown.remaining_secs(t0 + Duration::from_millis(999)), 30);
        assert_eq!(cooldown.remaining_secs(t0 + secs(1)), 29);
        assert_eq!(cooldown.remaining_secs(t0 + secs(29)), 1);
        assert!(!cooldown.can_resend(t0 + Duration::from_millis(29_999)));
        assert_eq!(cooldown.remaining_secs(t0 + secs(30)), 0);
        assert!(cooldown.can_resend(t0 + secs(30)));
        assert_eq!(cooldown.remaining_secs(t0 + secs(300)), 0);
    }

    #[test]
    fn test_code_sent_moves_to_code_entry() {
        let t0 = Instant::now();
        let s = at_code_entry(t0);
        assert_eq!(s.phase(), Phase::EnteringCode);
        assert_eq!(s.email().unwrap().as_str(), "a@b.com");
        assert_eq!(s.resend_remaining_secs(t0), 30);
    }

    #[test]
    fn test_request_failure_stays_on_email() {
        let mut s = session();
        let ticket = s.begin_code_request(email()).unwrap();
        s.code_request_failed(ticket).unwrap();
        assert_eq!(s.phase(), Phase::EnteringEmail);
        assert!(s.email().is_none());
    }

    #[test]
    fn test_resend_blocked_until_cooldown_ends() {
        let t0 = Instant::now();
        let mut s = at_code_entry(t0);
        assert_eq!(
            s.begin_resend(t0 + secs(10)).unwrap_err(),
            FlowError::CooldownActive { remaining: 20 }
        );
        let (ticket, to) = s.begin_resend(t0 + secs(30)).unwrap();
        assert_eq!(to, email());
        assert_eq!(s.resend_remaining_secs(t0 + secs(30)), 30);
        s.resend_finished(ticket).unwrap();
    }

    #[test]
    fn test_verify_success_and_failure() {
        let t0 = Instant::now();
        let mut s = at_code_entry(t0);

        let (ticket, _) = s.begin_verify(OtpCode::from_input("000000")).unwrap();
        s.code_rejected(ticket).unwrap();
        assert_eq!(s.phase(), Phase::EnteringCode);
        assert_eq!(s.code().as_str(), "000000");

        let (ticket, to) = s.begin_verify(OtpCode::from_input("123456")).unwrap();
        assert_eq!(to.as_str(), "a@b.com");
        s.code_verified(ticket).unwrap();
        assert_eq!(s.phase(), Phase::Verified);

        let (email, code) = s.verified_identity().unwrap();
        assert_eq!(email.as_str(), "a@b.com");
        assert_eq!(code.as_str(), "EVT1");
    }

    #[test]
    fn test_back_to_email_resets_code_entry() {
        let t0 = Instant::now();
        let mut s = at_code_entry(t0);
        let (stale, _) = s.begin_verify(OtpCode::from_input("123456")).unwrap();

        s.back_to_email().unwrap();
        assert_eq!(s.phase(), Phase::EnteringEmail);
        assert!(s.email().is_none());
        assert!(s.code().is_empty());
        assert!(s.can_resend(t0));

        // The verify call that was in flight must not flip the phase.
        assert_eq!(s.code_verified(stale), Err(FlowError::Superseded));
        assert_eq!(s.phase(), Phase::EnteringEmail);
    }

    #[test]
    fn test_newer_call_supersedes_older() {
        let t0 = Instant::now();
        let mut s = at_code_entry(t0);
        let (first, _) = s.begin_verify(OtpCode::from_input("111111")).unwrap();
        let (second, _) = s.begin_verify(OtpCode::from_input("222222")).unwrap();
        assert_eq!(s.code_verified(first), Err(FlowError::Superseded));
        s.code_rejected(second).unwrap();
        assert_eq!(s.phase(), Phase::EnteringCode);
    }

    #[test]
    fn test_phase_guards() {
        let mut s = session();
        assert!(matches!(
            s.begin_verify(OtpCode::from_input("1")),
            Err(FlowError::WrongPhase { .. })
        ));
        assert!(matches!(
            s.verified_identity(),
            Err(FlowError::WrongPhase { .. })
        ));
        assert!(matches!(
            s.begin_resend(Instant::now()),
            Err(FlowError::WrongPhase { .. })
        ));
    }

    fn verified(t0: Instant) -> VerificationSession {
        let mut s = at_code_entry(t0);
        let (ticket, _) = s.begin_verify(OtpCode::from_input("123456")).unwrap();
        s.code_verified(ticket).unwrap();
        s
    }

    #[test]
    fn test_only_one_submission_claim() {
        let mut s = verified(Instant::now());
        let (_, email, code) = s.begin_submission().unwrap();
        assert_eq!(email.as_str(), "a@b.com");
        assert_eq!(code.as_str(), "EVT1");
        assert_eq!(s.phase(), Phase::Submitting);

        assert!(matches!(
            s.begin_submission(),
            Err(FlowError::WrongPhase {
                phase: Phase::Submitting,
                ..
            })
        ));
        assert!(s.back_to_email().is_err());
    }

    #[test]
    fn test_failed_submission_reopens_form() {
        let mut s = verified(Instant::now());
        let (ticket, _, _) = s.begin_submission().unwrap();
        s.submission_failed(ticket).unwrap();
        assert_eq!(s.phase(), Phase::Verified);
        assert!(s.begin_submission().is_ok());
    }
}
