//! Pluggable sources for the values that go into generated reports.

use rand::prelude::*;

/// Supplies numbers for parameter readings and serial number draws.
///
/// The load generator uses [`RandomValues`]; tests substitute
/// [`SequenceValues`] to get deterministic reports.
pub trait ValueSource: Send + Sync {
    /// Next value in the inclusive range `min..=max`.
    fn next_in_range(&mut self, min: u64, max: u64) -> u64;

    /// Next index into a collection of `len` elements. `len` must be non-zero.
    fn next_index(&mut self, len: usize) -> usize;
}

/// Uniformly distributed values from a `StdRng`.
pub struct RandomValues {
    rng: StdRng,
}

impl RandomValues {
    /// Use seed if provided for reproducible runs, otherwise use entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl Default for RandomValues {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ValueSource for RandomValues {
    fn next_in_range(&mut self, min: u64, max: u64) -> u64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(lo..=hi)
    }

    fn next_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len.max(1))
    }
}

/// Replays a fixed sequence, wrapping around when exhausted.
///
/// Values outside the requested range are clamped into it.
#[derive(Debug, Clone)]
pub struct SequenceValues {
    values: Vec<u64>,
    position: usize,
}

impl SequenceValues {
    pub fn new(values: Vec<u64>) -> Self {
        Self {
            values,
            position: 0,
        }
    }

    fn next_raw(&mut self) -> u64 {
        if self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.position % self.values.len()];
        self.position += 1;
        value
    }
}

impl ValueSource for SequenceValues {
    fn next_in_range(&mut self, min: u64, max: u64) -> u64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.next_raw().clamp(lo, hi)
    }

    fn next_index(&mut self, len: usize) -> usize {
        (self.next_raw() as usize) % len.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_values_are_reproducible() {
        let mut a = RandomValues::new(Some(42));
        let mut b = RandomValues::new(Some(42));
        for _ in 0..100 {
            assert_eq!(a.next_in_range(0, 10_000), b.next_in_range(0, 10_000));
        }
    }

    #[test]
    fn test_random_range_is_inclusive() {
        let mut values = RandomValues::new(Some(7));
        let mut seen_max = false;
        for _ in 0..1000 {
            let v = values.next_in_range(0, 1);
            assert!(v <= 1);
            seen_max |= v == 1;
        }
        assert!(seen_max);
    }

    #[test]
    fn test_sequence_wraps_and_clamps() {
        let mut values = SequenceValues::new(vec![5, 500]);
        assert_eq!(values.next_in_range(0, 100), 5);
        assert_eq!(values.next_in_range(0, 100), 100);
        assert_eq!(values.next_in_range(0, 100), 5);
    }

    #[test]
    fn test_sequence_index_wraps() {
        let mut values = SequenceValues::new(vec![12]);
        assert_eq!(values.next_index(10), 2);
        assert_eq!(SequenceValues::new(vec![]).next_index(3), 0);
    }
}
