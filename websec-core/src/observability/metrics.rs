use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::error::{Result, SecurityError};

/// Counters for token and entropy activity. Cloning shares the counters.
#[derive(Clone)]
pub struct SecurityMetrics {
    registry: Arc<Registry>,
    tokens_issued: IntCounter,
    validations_accepted: IntCounter,
    validations_rejected: IntCounter,
    best_effort_draws: IntCounter,
}

impl SecurityMetrics {
    pub fn new() -> Self {
        Self::try_new().expect("metric definitions are static and unique")
    }

    pub fn try_new() -> Result<Self> {
        let registry = Registry::new();

        let tokens_issued = IntCounter::with_opts(
            Opts::new("websec_csrf_tokens_issued_total", "Total number of CSRF tokens issued")
                .const_label("component", "csrf")
        ).map_err(metrics_error)?;

        let validations_accepted = IntCounter::with_opts(
            Opts::new("websec_csrf_validations_accepted_total", "CSRF validations that succeeded")
                .const_label("component", "csrf")
        ).map_err(metrics_error)?;

        let validations_rejected = IntCounter::with_opts(
            Opts::new("websec_csrf_validations_rejected_total", "CSRF validations that failed")
                .const_label("component", "csrf")
        ).map_err(metrics_error)?;

        let best_effort_draws = IntCounter::with_opts(
            Opts::new("websec_entropy_best_effort_total", "Requests served by a non-audited source")
                .const_label("component", "entropy")
        ).map_err(metrics_error)?;

        registry.register(Box::new(tokens_issued.clone())).map_err(metrics_error)?;
        registry.register(Box::new(validations_accepted.clone())).map_err(metrics_error)?;
        registry.register(Box::new(validations_rejected.clone())).map_err(metrics_error)?;
        registry.register(Box::new(best_effort_draws.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry: Arc::new(registry),
            tokens_issued,
            validations_accepted,
            validations_rejected,
            best_effort_draws,
        })
    }

    pub fn record_issue(&self) {
        self.tokens_issued.inc();
    }

    pub fn record_validation(&self, accepted: bool) {
        if accepted {
            self.validations_accepted.inc();
        } else {
            self.validations_rejected.inc();
        }
    }

    pub fn record_best_effort_draw(&self) {
        self.best_effort_draws.inc();
    }

    pub fn tokens_issued(&self) -> u64 {
        self.tokens_issued.get()
    }

    pub fn validations_accepted(&self) -> u64 {
        self.validations_accepted.get()
    }

    pub fn validations_rejected(&self) -> u64 {
        self.validations_rejected.get()
    }

    pub fn best_effort_draws(&self) -> u64 {
        self.best_effort_draws.get()
    }

    /// Prometheus text exposition of every counter.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer).map_err(metrics_error)?;
        String::from_utf8(buffer)
            .map_err(|e| SecurityError::Metrics(e.to_string()))
    }
}

fn metrics_error(err: prometheus::Error) -> SecurityError {
    SecurityError::Metrics(err.to_string())
}

impl Default for SecurityMetrics {
    fn default() -> Self {
        Self::new()
    }
}
