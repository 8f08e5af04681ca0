//! Secure random generation.
//!
//! Raw bytes come from an [`EntropySource`] that walks an ordered chain of
//! platform generators; [`ValueGenerator`] turns those bytes into typed
//! values without modulo bias.

pub mod entropy;
pub mod generator;
pub mod source;

pub use entropy::{EntropySource, RandomRequest};
pub use generator::ValueGenerator;
pub use source::{
    BestEffortRandom, DeviceProbe, EntropyProbe, OsRandom, RandomSource, RingRandom,
    SourceOutput, SourceStrength,
};
