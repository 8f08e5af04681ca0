//! CSRF token issuance and validation.

pub mod clock;
pub mod provider;

pub use clock::{Clock, ManualClock, SystemClock};
pub use provider::TokenProvider;

use serde::{Deserialize, Serialize};

/// Number of random bytes behind every token value.
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(i64),
}

impl Expiry {
    /// Session representation: `0` for tokens that never expire.
    pub fn as_timestamp(self) -> i64 {
        match self {
            Expiry::Never => 0,
            Expiry::At(ts) => ts,
        }
    }

    pub fn from_timestamp(ts: i64) -> Self {
        if ts == 0 {
            Expiry::Never
        } else {
            Expiry::At(ts)
        }
    }

    /// Valid while `now <= expiry`.
    pub fn is_expired(self, now: i64) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(ts) => now > ts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    /// Form name the token protects
    pub name: String,
    /// `prefix:name`, the session key
    pub token_name: String,
    pub value: String,
    pub issued_at: i64,
    pub expires_at: Expiry,
}

impl CsrfToken {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// What is written to the session under the token name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TokenRecord {
    pub token: String,
    pub expire: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_round_trip_through_session_form() {
        assert_eq!(Expiry::from_timestamp(0), Expiry::Never);
        assert_eq!(Expiry::from_timestamp(4600).as_timestamp(), 4600);
    }

    #[test]
    fn test_expiry_boundary() {
        let expiry = Expiry::At(4600);
        assert!(!expiry.is_expired(4599));
        assert!(!expiry.is_expired(4600));
        assert!(expiry.is_expired(4601));
        assert!(!Expiry::Never.is_expired(i64::MAX));
    }
}
