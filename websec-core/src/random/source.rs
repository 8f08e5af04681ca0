//! Individual randomness sources and the entropy device probe.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use ring::rand::{SecureRandom, SystemRandom};
#[cfg(unix)]
use std::fs::File;
#[cfg(unix)]
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(unix)]
pub const URANDOM_PATH: &str = "/dev/urandom";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStrength {
    /// Cryptographic quality is guaranteed by the platform
    Audited,
    /// Statistically random but not suitable for secrets on its own
    BestEffort,
}

/// Bytes produced by a single source attempt.
#[derive(Debug, Clone)]
pub struct SourceOutput {
    pub bytes: Vec<u8>,
    /// Whether the source vouches for the cryptographic quality of `bytes`
    pub usable: bool,
}

/// A candidate source in the entropy chain.
pub trait RandomSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn strength(&self) -> SourceStrength;

    /// Returns `None` when the source failed outright. Short output is
    /// returned as-is and rejected by the caller.
    fn generate(&self, length: usize) -> Option<SourceOutput>;
}

/// Decides whether a recognised entropy device is present on this host.
pub trait EntropyProbe: Send + Sync {
    fn entropy_device_available(&self) -> bool;
}

/// Operating system CSPRNG (`getrandom(2)`, `BCryptGenRandom`, ...).
#[derive(Debug, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn name(&self) -> &'static str {
        "os"
    }

    fn strength(&self) -> SourceStrength {
        SourceStrength::Audited
    }

    fn generate(&self, length: usize) -> Option<SourceOutput> {
        let mut bytes = vec![0u8; length];
        match getrandom::getrandom(&mut bytes) {
            Ok(()) => Some(SourceOutput { bytes, usable: true }),
            Err(e) => {
                tracing::debug!(target: "entropy", error = %e, "getrandom failed");
                None
            }
        }
    }
}

/// ring's system generator, used when the primary OS call is unavailable.
pub struct RingRandom {
    rng: SystemRandom,
}

impl RingRandom {
    pub fn new() -> Self {
        Self { rng: SystemRandom::new() }
    }
}

impl Default for RingRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for RingRandom {
    fn name(&self) -> &'static str {
        "ring"
    }

    fn strength(&self) -> SourceStrength {
        SourceStrength::Audited
    }

    fn generate(&self, length: usize) -> Option<SourceOutput> {
        let mut bytes = vec![0u8; length];
        self.rng.fill(&mut bytes).ok()?;
        Some(SourceOutput { bytes, usable: true })
    }
}

/// Seeded PRNG of last resort.
///
/// Seeded once, lazily, from the entropy device when it can be read and from
/// clock and process state otherwise.
#[derive(Default)]
pub struct BestEffortRandom {
    rng: Mutex<Option<StdRng>>,
}

impl BestEffortRandom {
    pub fn new() -> Self {
        Self::default()
    }

    fn seed() -> [u8; 32] {
        let mut seed = [0u8; 32];
        if read_device_seed(&mut seed) {
            return seed;
        }

        static CALLS: AtomicU64 = AtomicU64::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let local = 0u8;
        let mut state = nanos
            ^ (u64::from(std::process::id()) << 32)
            ^ (&local as *const u8 as u64)
            ^ CALLS.fetch_add(1, Ordering::Relaxed).rotate_left(17);

        for chunk in seed.chunks_mut(8) {
            let word = splitmix64(&mut state);
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        seed
    }
}

impl RandomSource for BestEffortRandom {
    fn name(&self) -> &'static str {
        "best-effort"
    }

    fn strength(&self) -> SourceStrength {
        SourceStrength::BestEffort
    }

    fn generate(&self, length: usize) -> Option<SourceOutput> {
        let mut guard = self.rng.lock().ok()?;
        let rng = guard.get_or_insert_with(|| StdRng::from_seed(Self::seed()));

        let mut bytes = vec![0u8; length];
        rng.fill_bytes(&mut bytes);
        Some(SourceOutput { bytes, usable: false })
    }
}

/// Checks for the host's entropy device.
#[derive(Debug, Default)]
pub struct DeviceProbe;

impl EntropyProbe for DeviceProbe {
    #[cfg(unix)]
    fn entropy_device_available(&self) -> bool {
        File::open(URANDOM_PATH).is_ok()
    }

    #[cfg(windows)]
    fn entropy_device_available(&self) -> bool {
        // The system crypto provider ships with every supported Windows release
        true
    }

    #[cfg(not(any(unix, windows)))]
    fn entropy_device_available(&self) -> bool {
        false
    }
}

#[cfg(unix)]
fn read_device_seed(seed: &mut [u8; 32]) -> bool {
    File::open(URANDOM_PATH)
        .and_then(|mut f| f.read_exact(seed))
        .is_ok()
}

#[cfg(not(unix))]
fn read_device_seed(_seed: &mut [u8; 32]) -> bool {
    false
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
