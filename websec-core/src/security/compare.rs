//! Fixed-time equality for secrets.
//!
//! The loop always runs over the longer of the two inputs and never exits
//! early, so the time taken does not depend on where the inputs first differ
//! or on a length mismatch being noticed.

use subtle::{Choice, ConstantTimeEq};

/// Compares two byte sequences without leaking the first mismatch position.
pub fn compare(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());

    // A length mismatch is folded into the result instead of returning early
    let mut equal: Choice = (a.len() as u64).ct_eq(&(b.len() as u64));

    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        equal &= x.ct_eq(&y);
    }

    equal.into()
}

pub fn compare_str(a: &str, b: &str) -> bool {
    compare(a.as_bytes(), b.as_bytes())
}
