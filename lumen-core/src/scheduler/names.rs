//! Collision suffixes for widget names
//!
//! A colliding name gets `_` plus a digit and a lowercase letter. The
//! generator is a 32-bit xorshift; it only needs to spread suffixes, not
//! be unpredictable.

use crate::widget::{bounded_name, WidgetName, MAX_NAME_LEN};

/// Length of `_<digit><letter>`
const SUFFIX_LEN: usize = 3;

/// Pseudo-random suffix source
#[derive(Debug, Clone)]
pub struct SuffixGenerator {
    state: u32,
}

impl SuffixGenerator {
    /// Seed the generator; a zero seed is replaced with a fixed constant
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Next `(digit, letter)` pair
    pub fn next_suffix(&mut self) -> (char, char) {
        let r = self.next_u32();
        let digit = char::from(b'0' + (r % 10) as u8);
        let letter = char::from(b'a' + ((r / 10) % 26) as u8);
        (digit, letter)
    }
}

/// `base` with `_<digit><letter>` appended, truncating `base` to fit
pub fn suffixed(base: &str, digit: char, letter: char) -> WidgetName {
    let mut cut = base.len().min(MAX_NAME_LEN - SUFFIX_LEN);
    while !base.is_char_boundary(cut) {
        cut -= 1;
    }

    let mut name = bounded_name(&base[..cut]);
    for ch in ['_', digit, letter] {
        let _ = name.push(ch);
    }
    name
}

/// Every suffix in a fixed order, for when random draws keep colliding
pub fn all_suffixes() -> impl Iterator<Item = (char, char)> {
    (b'0'..=b'9').flat_map(|d| (b'a'..=b'z').map(move |l| (char::from(d), char::from(l))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_shape() {
        let mut gen = SuffixGenerator::new(42);
        for _ in 0..100 {
            let (d, l) = gen.next_suffix();
            assert!(d.is_ascii_digit());
            assert!(l.is_ascii_lowercase());
        }
    }

    #[test]
    fn test_zero_seed_still_varies() {
        let mut gen = SuffixGenerator::new(0);
        let first = gen.next_suffix();
        let varied = (0..50).any(|_| gen.next_suffix() != first);
        assert!(varied);
    }

    #[test]
    fn test_suffixed_fits() {
        assert_eq!(suffixed("Clock", '3', 'k').as_str(), "Clock_3k");

        let long = "abcdefghijklmnopqrstuvwxyz";
        let name = suffixed(long, '1', 'b');
        assert_eq!(name.len(), MAX_NAME_LEN);
        assert!(name.ends_with("_1b"));
    }

    #[test]
    fn test_suffixed_respects_char_boundaries() {
        // 'ü' is two bytes and straddles the cut point
        let base = "aaaaaaaaaaaaaaaaaaaaü";
        let name = suffixed(base, '0', 'a');
        assert!(name.ends_with("_0a"));
        assert!(name.len() <= MAX_NAME_LEN);
    }

    #[test]
    fn test_all_suffixes_enumerates_every_pair() {
        assert_eq!(all_suffixes().count(), 260);
    }
}
