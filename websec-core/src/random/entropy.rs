use super::source::{
    BestEffortRandom, DeviceProbe, EntropyProbe, OsRandom, RandomSource, RingRandom,
    SourceStrength,
};
use crate::error::{Result, SecurityError};
use crate::observability::SecurityMetrics;

/// A single request for raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomRequest {
    pub length: usize,
    /// Forbids falling through to a best-effort source unless an entropy
    /// device is known to be present
    pub strong: bool,
}

impl RandomRequest {
    pub fn new(length: usize, strong: bool) -> Self {
        Self { length, strong }
    }
}

/// Ordered chain of randomness sources.
///
/// Audited sources are tried first, in insertion order, and the first one
/// that returns exactly the requested number of usable bytes wins. Best-effort
/// sources are only reached for weak requests, or for strong requests on a
/// host where the probe confirms an entropy device.
pub struct EntropySource {
    audited: Vec<Box<dyn RandomSource>>,
    best_effort: Vec<Box<dyn RandomSource>>,
    probe: Box<dyn EntropyProbe>,
    metrics: Option<SecurityMetrics>,
}

impl EntropySource {
    /// An empty chain; every request fails until sources are added.
    pub fn new(probe: impl EntropyProbe + 'static) -> Self {
        Self {
            audited: Vec::new(),
            best_effort: Vec::new(),
            probe: Box::new(probe),
            metrics: None,
        }
    }

    /// OS generator, then ring, then the seeded fallback.
    pub fn system() -> Self {
        Self::new(DeviceProbe)
            .with_source(OsRandom)
            .with_source(RingRandom::new())
            .with_source(BestEffortRandom::new())
    }

    pub fn with_source(mut self, source: impl RandomSource + 'static) -> Self {
        match source.strength() {
            SourceStrength::Audited => self.audited.push(Box::new(source)),
            SourceStrength::BestEffort => self.best_effort.push(Box::new(source)),
        }
        self
    }

    pub fn with_metrics(mut self, metrics: SecurityMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn obtain(&self, length: usize, strong: bool) -> Result<Vec<u8>> {
        self.fulfil(RandomRequest::new(length, strong))
    }

    pub fn fulfil(&self, request: RandomRequest) -> Result<Vec<u8>> {
        if request.length == 0 {
            return Err(SecurityError::InvalidLength(0));
        }

        for source in &self.audited {
            match source.generate(request.length) {
                Some(out) if out.usable && out.bytes.len() == request.length => {
                    return Ok(out.bytes);
                }
                Some(out) => {
                    tracing::debug!(
                        target: "entropy",
                        source = source.name(),
                        requested = request.length,
                        returned = out.bytes.len(),
                        usable = out.usable,
                        "rejected audited output"
                    );
                }
                None => {
                    tracing::debug!(target: "entropy", source = source.name(), "source failed");
                }
            }
        }

        if request.strong && !self.probe.entropy_device_available() {
            tracing::error!(
                target: "entropy",
                length = request.length,
                "no audited source and no entropy device for strong request"
            );
            return Err(SecurityError::EntropyUnavailable(
                "unable to generate sufficiently strong random bytes: no source with sufficient entropy".to_string()
            ));
        }

        for source in &self.best_effort {
            if let Some(out) = source.generate(request.length) {
                if out.bytes.len() == request.length {
                    tracing::warn!(
                        target: "entropy",
                        source = source.name(),
                        strong = request.strong,
                        "using best-effort randomness"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_best_effort_draw();
                    }
                    return Ok(out.bytes);
                }
            }
        }

        Err(SecurityError::EntropyUnavailable(format!(
            "no source produced {} random bytes",
            request.length
        )))
    }
}

impl Default for EntropySource {
    fn default() -> Self {
        Self::system()
    }
}
