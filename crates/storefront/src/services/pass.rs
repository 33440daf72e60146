//! Signed redemption passes.
//!
//! A pass carries an accepted event code from the gate to the verification
//! pages without any server-side session:
//!
//! ```text
//! <flow_id>.<expires_unix>.<b64url(code)>.<b64url(hmac_sha256)>
//! ```
//!
//! The MAC covers the first three segments. A pass is only honoured while
//! its flow is still open in the [`FlowStore`](super::flows::FlowStore), so
//! closing the flow revokes it.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use eventconnect_core::RedemptionCode;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Why a pass was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PassError {
    #[error("malformed pass")]
    Malformed,
    #[error("pass signature mismatch")]
    BadSignature,
    #[error("pass expired")]
    Expired,
    #[error("signing key rejected: {0}")]
    Key(String),
}

/// The verified contents of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionPass {
    pub flow_id: Uuid,
    pub code: RedemptionCode,
}

/// Issues and checks redemption passes.
#[derive(Clone)]
pub struct PassSigner {
    secret: SecretString,
    ttl: Duration,
}

impl PassSigner {
    #[must_use]
    pub const fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    fn mac(&self) -> Result<HmacSha256, PassError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| PassError::Key(e.to_string()))
    }

    /// Issue a pass for `flow_id` that expires `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`PassError::Key`] if the HMAC key cannot be used.
    pub fn issue(&self, flow_id: Uuid, code: &RedemptionCode) -> Result<String, PassError> {
        self.issue_at(flow_id, code, chrono::Utc::now().timestamp())
    }

    /// Issue a pass as if the current time were `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns [`PassError::Key`] if the HMAC key cannot be used.
    pub fn issue_at(
        &self,
        flow_id: Uuid,
        code: &RedemptionCode,
        now: i64,
    ) -> Result<String, PassError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl);
        let payload = format!(
            "{}.{}.{}",
            flow_id.simple(),
            expires_at,
            URL_SAFE_NO_PAD.encode(code.as_str())
        );

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Check a pass against the current time.
    ///
    /// # Errors
    ///
    /// Returns why the pass cannot be honoured.
    pub fn verify(&self, token: &str) -> Result<RedemptionPass, PassError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Check a pass as if the current time were `now` (unix seconds).
    ///
    /// The signature is checked before any field is trusted; the comparison
    /// is constant-time.
    ///
    /// # Errors
    ///
    /// Returns why the pass cannot be honoured.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<RedemptionPass, PassError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(PassError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| PassError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| PassError::BadSignature)?;

        let mut parts = payload.splitn(3, '.');
        let (Some(flow_id), Some(expires_at), Some(code)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(PassError::Malformed);
        };

        let flow_id = Uuid::parse_str(flow_id).map_err(|_| PassError::Malformed)?;
        let expires_at: i64 = expires_at.parse().map_err(|_| PassError::Malformed)?;
        let code = URL_SAFE_NO_PAD
            .decode(code)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .and_then(|s| RedemptionCode::parse(&s).ok())
            .ok_or(PassError::Malformed)?;

        if now >= expires_at {
            return Err(PassError::Expired);
        }

        Ok(RedemptionPass { flow_id, code })
    }
}
