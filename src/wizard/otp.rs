//! One-time signature codes: format, server expiry and resend cooldown.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::SignatureRequest;

/// Number of digits in a code.
pub const OTP_LENGTH: usize = 6;

/// Minimum time between two code requests (seconds).
pub const RESEND_COOLDOWN_SECS: i64 = 60;

/// Reasons a code cannot be submitted or resent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    /// Not exactly six digits.
    #[error("code must be 6 digits")]
    Format,

    /// The server-issued expiry has passed.
    #[error("code has expired, request a new one")]
    Expired,

    /// A new code was requested too soon.
    #[error("wait {remaining_secs} s before requesting a new code")]
    Cooldown {
        /// Seconds until a resend is allowed.
        remaining_secs: i64,
    },
}

/// Returns `true` if `code` is exactly six ASCII digits.
#[must_use]
pub fn is_valid_code_format(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// An outstanding signature code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpChallenge {
    /// Signature request id.
    pub request_id: String,
    /// Phone the code was sent to, masked.
    pub masked_phone: String,
    /// Server expiry.
    pub expires_at: DateTime<Utc>,
    /// When the code was requested.
    pub sent_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// Builds a challenge from the service answer.
    #[must_use]
    pub fn from_request(request: SignatureRequest, sent_at: DateTime<Utc>) -> Self {
        Self {
            request_id: request.signature_request_id,
            masked_phone: request.masked_phone,
            expires_at: request.expires_at,
            sent_at,
        }
    }

    /// Returns `true` once the server expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Seconds until a resend is allowed, rounded up (0 when allowed).
    #[must_use]
    pub fn resend_in(&self, now: DateTime<Utc>) -> i64 {
        let ready = self.sent_at + Duration::seconds(RESEND_COOLDOWN_SECS);
        let millis = (ready - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis + 999) / 1000
        }
    }

    /// Checks that a new code may be requested.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Cooldown`] within 60 s of the last request.
    pub fn check_resend(&self, now: DateTime<Utc>) -> Result<(), OtpError> {
        match self.resend_in(now) {
            0 => Ok(()),
            remaining_secs => Err(OtpError::Cooldown { remaining_secs }),
        }
    }

    /// Checks a code before it is sent for verification.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Format`] or [`OtpError::Expired`].
    pub fn check_code(&self, code: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        if !is_valid_code_format(code) {
            return Err(OtpError::Format);
        }
        if self.is_expired(now) {
            return Err(OtpError::Expired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(now: DateTime<Utc>) -> OtpChallenge {
        OtpChallenge {
            request_id: "sig-1".to_string(),
            masked_phone: "+41 ** *** ** 67".to_string(),
            expires_at: now + Duration::minutes(5),
            sent_at: now,
        }
    }

    #[test]
    fn code_format() {
        assert!(is_valid_code_format("012345"));
        assert!(!is_valid_code_format("12345"));
        assert!(!is_valid_code_format("1234567"));
        assert!(!is_valid_code_format("12a456"));
        assert!(!is_valid_code_format("１２３４５６"));
    }

    #[test]
    fn expiry_follows_server_timestamp() {
        let now = Utc::now();
        let c = challenge(now);
        assert!(c.check_code("123456", now).is_ok());
        assert_eq!(
            c.check_code("123456", now + Duration::minutes(5)),
            Err(OtpError::Expired)
        );
        assert_eq!(c.check_code("12", now), Err(OtpError::Format));
    }

    #[test]
    fn resend_cooldown() {
        let now = Utc::now();
        let c = challenge(now);
        assert_eq!(
            c.check_resend(now + Duration::seconds(15)),
            Err(OtpError::Cooldown { remaining_secs: 45 })
        );
        assert!(c.check_resend(now + Duration::seconds(60)).is_ok());
        assert_eq!(c.resend_in(now + Duration::hours(1)), 0);
    }

    #[test]
    fn resend_cooldown_rounds_up_partial_seconds() {
        let now = Utc::now();
        let c = challenge(now);
        let almost = now + Duration::milliseconds(59_400);
        assert_eq!(c.resend_in(almost), 1);
        assert_eq!(
            c.check_resend(almost),
            Err(OtpError::Cooldown { remaining_secs: 1 })
        );
        assert_eq!(c.resend_in(now + Duration::milliseconds(59_999)), 1);
        assert_eq!(c.resend_in(now + Duration::milliseconds(15_500)), 45);
    }
}
