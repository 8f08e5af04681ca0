use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;

use super::clock::{Clock, SystemClock};
use super::{CsrfToken, Expiry, TokenRecord, TOKEN_BYTES};
use crate::config::CsrfConfig;
use crate::error::Result;
use crate::observability::SecurityMetrics;
use crate::random::ValueGenerator;
use crate::security::compare_str;
use crate::storage::SessionStore;

/// Issues CSRF tokens into a session and validates submitted ones.
///
/// `issue_token` is the only operation that writes to the store. Validation
/// never fails loudly: a missing session, a missing or malformed record, an
/// expired token and a mismatch all come back as `false`.
pub struct TokenProvider {
    config: CsrfConfig,
    generator: Arc<ValueGenerator>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    metrics: Option<SecurityMetrics>,
    token: Option<CsrfToken>,
}

impl TokenProvider {
    pub fn new(config: CsrfConfig, store: Arc<dyn SessionStore>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            generator: Arc::new(ValueGenerator::default()),
            store,
            clock: Arc::new(SystemClock),
            metrics: None,
            token: None,
        })
    }

    pub fn with_generator(mut self, generator: Arc<ValueGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: SecurityMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// `prefix:name`, the session key the token lives under.
    pub fn token_name(&self) -> String {
        format!("{}:{}", self.config.token_name_prefix, self.config.name)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn timeout(&self) -> u64 {
        self.config.timeout
    }

    /// Returns the cached token unless `refresh` is set or none exists yet,
    /// in which case a new one is generated and stored.
    pub fn issue_token(&mut self, refresh: bool) -> Result<CsrfToken> {
        if let Some(token) = &self.token {
            if !refresh {
                return Ok(token.clone());
            }
        }

        let token_name = self.token_name();
        let bytes = self.generator.bytes(TOKEN_BYTES, true)?;
        let issued_at = self.clock.now();
        let expires_at = if self.config.timeout > 0 {
            Expiry::At(issued_at.saturating_add(i64::try_from(self.config.timeout).unwrap_or(i64::MAX)))
        } else {
            Expiry::Never
        };

        let token = CsrfToken {
            name: self.config.name.clone(),
            token_name: token_name.clone(),
            value: URL_SAFE_NO_PAD.encode(bytes),
            issued_at,
            expires_at,
        };

        let record = TokenRecord {
            token: token.value.clone(),
            expire: expires_at.as_timestamp(),
        };
        self.store.set(&token_name, serde_json::to_value(record)?)?;

        crate::log_token!(debug, token_name.as_str(), refresh, expire = expires_at.as_timestamp(), "issued csrf token");
        if let Some(metrics) = &self.metrics {
            metrics.record_issue();
        }

        self.token = Some(token.clone());
        Ok(token)
    }

    pub fn refresh_token(&mut self) -> Result<CsrfToken> {
        self.issue_token(true)
    }

    pub fn validate(&self, candidate: &str) -> bool {
        self.validate_named(candidate, &self.token_name())
    }

    pub fn validate_named(&self, candidate: &str, token_name: &str) -> bool {
        let accepted = match self.check(candidate, token_name) {
            Ok(()) => true,
            Err(reason) => {
                crate::log_token!(debug, token_name, reason, "csrf validation failed");
                false
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_validation(accepted);
        }
        accepted
    }

    /// The unexpired token the session currently holds for this form, without
    /// issuing a new one.
    ///
    /// The session keeps only the value and expiry, so `issued_at` is derived
    /// as `expire - timeout`; tokens that never expire report 0.
    pub fn stored_token(&self) -> Option<CsrfToken> {
        let token_name = self.token_name();
        let record = self.live_record(&token_name).ok()?;
        let expires_at = Expiry::from_timestamp(record.expire);
        let issued_at = match expires_at {
            Expiry::At(ts) => ts.saturating_sub(i64::try_from(self.config.timeout).unwrap_or(i64::MAX)),
            Expiry::Never => 0,
        };

        Some(CsrfToken {
            name: self.config.name.clone(),
            token_name,
            value: record.token,
            issued_at,
            expires_at,
        })
    }

    /// Reads the record under `token_name` and rejects it once expired.
    fn live_record(&self, token_name: &str) -> std::result::Result<TokenRecord, &'static str> {
        let entry = match self.store.get(token_name) {
            Ok(Some(entry)) => entry,
            Ok(None) => return Err("no token stored under this name"),
            Err(_) => return Err("session unavailable"),
        };

        let record = parse_record(entry).ok_or("malformed session record")?;

        if Expiry::from_timestamp(record.expire).is_expired(self.clock.now()) {
            return Err("token expired");
        }

        Ok(record)
    }

    fn check(&self, candidate: &str, token_name: &str) -> std::result::Result<(), &'static str> {
        // One read: value and expiry always come from the same record
        let record = self.live_record(token_name)?;

        if !compare_str(candidate, &record.token) {
            return Err("token mismatch");
        }

        Ok(())
    }
}

fn parse_record(entry: Value) -> Option<TokenRecord> {
    serde_json::from_value(entry).ok()
}
