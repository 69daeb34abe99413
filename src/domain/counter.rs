// ============================================================
// Layer 3 — Checkpoint Counter
// ============================================================
// Counts completed checkpoint cycles within one process.
// It starts at 0, names each cycle's sample artifact, and
// only moves forward. It is deliberately NOT restored on
// resume: a restarted run begins counting from 0 again and
// may overwrite sample artifacts of an earlier run.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointCounter(u64);

impl CheckpointCounter {
    pub fn new() -> Self {
        Self(0)
    }

    /// Number of cycles completed so far.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The number the next cycle will be recorded under.
    pub fn next(&self) -> u64 {
        self.0 + 1
    }

    /// Commit a successful cycle and return its number.
    pub fn advance(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_strictly_increases_by_one() {
        let mut counter = CheckpointCounter::new();
        let mut seen    = Vec::new();
        for _ in 0..5 {
            let expected = counter.next();
            assert_eq!(counter.advance(), expected);
            seen.push(counter.value());
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_next_does_not_advance() {
        let counter = CheckpointCounter::new();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.value(), 0);
    }
}
