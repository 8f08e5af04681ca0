//! Typed random values derived from raw entropy.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::entropy::EntropySource;
use crate::error::{Result, SecurityError};

/// Exponent byte that places an IEEE-754 double in `[1, 2)`.
const FLOAT_EXPONENT_BYTE: u8 = 0x3F;

/// Derives booleans, bounded integers, floats and strings from an
/// [`EntropySource`]. Every method takes a `strong` flag that is passed
/// through to the source unchanged.
pub struct ValueGenerator {
    entropy: EntropySource,
}

impl ValueGenerator {
    pub fn new(entropy: EntropySource) -> Self {
        Self { entropy }
    }

    pub fn entropy(&self) -> &EntropySource {
        &self.entropy
    }

    pub fn bytes(&self, length: usize, strong: bool) -> Result<Vec<u8>> {
        self.entropy.obtain(length, strong)
    }

    pub fn boolean(&self, strong: bool) -> Result<bool> {
        let byte = self.entropy.obtain(1, strong)?[0];
        Ok(byte & 1 == 1)
    }

    /// Uniform integer in `[min, max]`.
    ///
    /// Uses rejection sampling over the smallest bit mask covering the range,
    /// so every candidate is accepted with probability above one half and the
    /// expected number of draws is below two.
    pub fn integer(&self, min: i64, max: i64, strong: bool) -> Result<i64> {
        if min > max {
            return Err(SecurityError::InvalidRange(format!(
                "min ({}) must not be greater than max ({})",
                min, max
            )));
        }

        let range = max.checked_sub(min).ok_or_else(|| {
            SecurityError::InvalidRange(format!(
                "range between {} and {} does not fit in a signed 64-bit integer",
                min, max
            ))
        })? as u64;

        if range == 0 {
            return Ok(max);
        }

        // range <= i64::MAX, so bits <= 63 and byte_len <= 8
        let bits = u64::BITS - range.leading_zeros();
        let byte_len = (bits / 8 + 1) as usize;
        let mask = (1u64 << bits) - 1;

        loop {
            let bytes = self.entropy.obtain(byte_len, strong)?;
            let candidate = bytes
                .iter()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
                & mask;

            if candidate <= range {
                return Ok(min + candidate as i64);
            }
        }
    }

    /// Float in `[0, 1)` with 52 random mantissa bits.
    pub fn float(&self, strong: bool) -> Result<f64> {
        let bytes = self.entropy.obtain(7, strong)?;

        let mut raw = [0u8; 8];
        raw[..7].copy_from_slice(&bytes);
        raw[6] |= 0xF0;
        raw[7] = FLOAT_EXPONENT_BYTE;

        Ok(f64::from_le_bytes(raw) - 1.0)
    }

    /// Random string of `length` characters.
    ///
    /// An empty alphabet yields URL-safe base64 text. Otherwise each position
    /// advances a running index by one random byte modulo the alphabet size.
    /// That walk is not exactly uniform over the alphabet; use
    /// [`ValueGenerator::uniform_string`] when strict uniformity matters.
    pub fn string(&self, length: usize, alphabet: &str, strong: bool) -> Result<String> {
        if length < 1 {
            return Err(SecurityError::InvalidLength(length));
        }

        if alphabet.is_empty() {
            let byte_count = (length * 3 + 3) / 4;
            let bytes = self.entropy.obtain(byte_count, strong)?;
            let mut encoded = URL_SAFE_NO_PAD.encode(bytes);
            encoded.truncate(length);
            return Ok(encoded);
        }

        let symbols: Vec<char> = alphabet.chars().collect();
        if symbols.len() == 1 {
            return Ok(alphabet.repeat(length));
        }

        let bytes = self.entropy.obtain(length, strong)?;
        let mut idx = 0usize;

        Ok(bytes
            .iter()
            .map(|&b| {
                idx = (idx + usize::from(b)) % symbols.len();
                symbols[idx]
            })
            .collect())
    }

    /// Random string where every character is drawn uniformly from `alphabet`.
    pub fn uniform_string(&self, length: usize, alphabet: &str, strong: bool) -> Result<String> {
        if length < 1 {
            return Err(SecurityError::InvalidLength(length));
        }

        let symbols: Vec<char> = alphabet.chars().collect();
        match symbols.len() {
            0 => Err(SecurityError::InvalidAlphabet),
            1 => Ok(alphabet.repeat(length)),
            n => {
                let upper = n as i64 - 1;
                (0..length)
                    .map(|_| Ok(symbols[self.integer(0, upper, strong)? as usize]))
                    .collect()
            }
        }
    }
}

impl Default for ValueGenerator {
    fn default() -> Self {
        Self::new(EntropySource::system())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::entropy::testing::scripted_entropy;
    use proptest::prelude::*;

    fn scripted(data: Vec<u8>) -> ValueGenerator {
        ValueGenerator::new(scripted_entropy(data))
    }

    #[test]
    fn test_boolean_uses_low_bit() {
        let gen = scripted(vec![0x02, 0x03]);
        assert!(!gen.boolean(true).unwrap());
        assert!(gen.boolean(true).unwrap());
    }

    #[test]
    fn test_integer_degenerate_range() {
        let gen = ValueGenerator::default();
        assert_eq!(gen.integer(5, 5, true).unwrap(), 5);
        assert_eq!(gen.integer(-7, -7, false).unwrap(), -7);
    }

    #[test]
    fn test_integer_rejects_inverted_range() {
        let gen = ValueGenerator::default();
        assert!(matches!(gen.integer(10, 5, true), Err(SecurityError::InvalidRange(_))));
    }

    #[test]
    fn test_integer_rejects_unrepresentable_range() {
        let gen = ValueGenerator::default();
        assert!(matches!(
            gen.integer(i64::MIN, i64::MAX, true),
            Err(SecurityError::InvalidRange(_))
        ));
        assert!(gen.integer(0, i64::MAX, true).is_ok());
    }

    #[test]
    fn test_integer_rejection_sampling() {
        // range 5 -> 3-bit mask; 7 and 6 are rejected, 4 accepted
        let gen = scripted(vec![0xFF, 0x06, 0x04]);
        assert_eq!(gen.integer(10, 15, true).unwrap(), 14);
    }

    #[test]
    fn test_integer_reads_big_endian() {
        // range 256 -> 9 bits over 2 bytes; 0x01 0x00 == 256
        let gen = scripted(vec![0x01, 0x00]);
        assert_eq!(gen.integer(0, 256, true).unwrap(), 256);
    }

    #[test]
    fn test_integer_is_uniform() {
        let gen = ValueGenerator::default();
        let buckets = 6usize;
        let samples = 60_000usize;
        let mut counts = vec![0usize; buckets];

        for _ in 0..samples {
            let v = gen.integer(1, buckets as i64, false).unwrap();
            counts[(v - 1) as usize] += 1;
        }

        let expected = samples as f64 / buckets as f64;
        let chi_square: f64 = counts
            .iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum();

        // 5 degrees of freedom; 20.5 is the 0.999 quantile
        assert!(chi_square < 20.5, "chi-square {} counts {:?}", chi_square, counts);
    }

    #[test]
    fn test_integer_has_no_modulo_bias() {
        // A naive `byte % 3` over 0..=255 favours 0 (86 of 256 values).
        // Rejection sampling over every byte value must not.
        let data: Vec<u8> = (0..=255u8).collect();
        let gen = scripted(data);
        let mut counts = [0usize; 3];

        // Each accepted draw consumes one scripted byte; 0..=255 masked to
        // two bits accepts exactly 3 of every 4 bytes, evenly.
        for _ in 0..192 {
            counts[gen.integer(0, 2, true).unwrap() as usize] += 1;
        }

        assert_eq!(counts, [64, 64, 64]);

        let mut naive = [0usize; 3];
        for b in 0..=255u8 {
            naive[(b % 3) as usize] += 1;
        }
        assert_ne!(naive[0], naive[2]);
    }

    #[test]
    fn test_float_bounds() {
        assert_eq!(scripted(vec![0x00]).float(true).unwrap(), 0.0);

        let high = scripted(vec![0xFF]).float(true).unwrap();
        assert!(high < 1.0 && high > 0.999);

        let gen = ValueGenerator::default();
        for _ in 0..1000 {
            let f = gen.float(false).unwrap();
            assert!((0.0..1.0).contains(&f));
        }
    }

    #[test]
    fn test_string_zero_length() {
        let gen = ValueGenerator::default();
        assert!(matches!(gen.string(0, "", true), Err(SecurityError::InvalidLength(0))));
        assert!(matches!(gen.uniform_string(0, "ab", true), Err(SecurityError::InvalidLength(0))));
    }

    #[test]
    fn test_string_default_alphabet() {
        let gen = ValueGenerator::default();
        for length in [1usize, 2, 3, 4, 7, 32, 43, 100] {
            let s = gen.string(length, "", true).unwrap();
            assert_eq!(s.len(), length);
            assert!(s
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
        }
    }

    #[test]
    fn test_string_single_symbol() {
        let gen = ValueGenerator::default();
        assert_eq!(gen.string(5, "A", true).unwrap(), "AAAAA");
        assert_eq!(gen.uniform_string(3, "é", true).unwrap(), "ééé");
    }

    #[test]
    fn test_string_running_index_walk() {
        // idx: (0+1)%3=1, (1+1)%3=2, (2+2)%3=1, (1+5)%3=0
        let gen = scripted(vec![1, 1, 2, 5]);
        assert_eq!(gen.string(4, "abc", true).unwrap(), "bcba");
    }

    #[test]
    fn test_string_multibyte_alphabet() {
        let gen = ValueGenerator::default();
        let s = gen.string(16, "αβγ", true).unwrap();
        assert_eq!(s.chars().count(), 16);
        assert!(s.chars().all(|c| "αβγ".contains(c)));
    }

    #[test]
    fn test_uniform_string_alphabet() {
        let gen = ValueGenerator::default();
        assert!(matches!(gen.uniform_string(4, "", true), Err(SecurityError::InvalidAlphabet)));

        let s = gen.uniform_string(64, "0123456789abcdef", true).unwrap();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    proptest! {
        #[test]
        fn prop_integer_within_bounds(a in any::<i32>(), b in any::<i32>()) {
            let (min, max) = if a <= b { (a as i64, b as i64) } else { (b as i64, a as i64) };
            let gen = ValueGenerator::default();
            let v = gen.integer(min, max, false).unwrap();
            prop_assert!(v >= min && v <= max);
        }

        #[test]
        fn prop_integer_wide_ranges(min in -(1i64 << 62)..0i64, span in 0i64..(1i64 << 62)) {
            let gen = ValueGenerator::default();
            let v = gen.integer(min, min + span, true).unwrap();
            prop_assert!(v >= min && v <= min + span);
        }
    }
}
