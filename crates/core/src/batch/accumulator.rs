//! Size-bounded accumulation of converted artifacts.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use super::types::{AccumulatorSnapshot, Batch, RegisterOutcome};

#[derive(Debug, Default)]
struct Pending {
    files: Vec<PathBuf>,
    bytes: u64,
    index: u64,
}

/// Collects artifacts into batches whose total stays below a byte limit.
///
/// A batch only reaches the limit when it holds a single artifact that is
/// on its own at or above it. Methods are synchronous and never hold the
/// lock across an await point.
#[derive(Debug)]
pub struct BatchAccumulator {
    max_bytes: u64,
    pending: Mutex<Pending>,
}

impl BatchAccumulator {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            pending: Mutex::new(Pending::default()),
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        // A panic while holding the lock leaves the plain data consistent.
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Offers an artifact of `size_bytes`.
    ///
    /// Returns [`RegisterOutcome::MustFlush`] without adding when the batch
    /// is non-empty and the artifact would bring it to the limit.
    pub fn register(&self, path: PathBuf, size_bytes: u64) -> RegisterOutcome {
        let mut pending = self.lock();
        if !pending.files.is_empty() && pending.bytes.saturating_add(size_bytes) >= self.max_bytes
        {
            return RegisterOutcome::MustFlush;
        }
        pending.files.push(path);
        pending.bytes = pending.bytes.saturating_add(size_bytes);
        RegisterOutcome::Added
    }

    /// Takes the pending batch, leaving an empty one behind.
    ///
    /// Indices start at 0 and advance only when a non-empty batch is taken,
    /// so delivered batches are numbered without gaps.
    pub fn take_and_reset(&self) -> Batch {
        let mut pending = self.lock();
        let index = pending.index;
        if !pending.files.is_empty() {
            pending.index += 1;
        }
        Batch {
            index,
            artifacts: std::mem::take(&mut pending.files),
            size_bytes: std::mem::take(&mut pending.bytes),
        }
    }

    pub fn snapshot(&self) -> AccumulatorSnapshot {
        let pending = self.lock();
        AccumulatorSnapshot {
            index: pending.index,
            pending_files: pending.files.len(),
            pending_bytes: pending.bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MB: u64 = 1024 * 1024;

    fn path(n: usize) -> PathBuf {
        PathBuf::from(format!("/run/{n}.gif"))
    }

    #[test]
    fn test_empty_batch_admits_oversized_artifact() {
        let acc = BatchAccumulator::new(10 * MB);
        assert_eq!(acc.register(path(0), 25 * MB), RegisterOutcome::Added);
        assert_eq!(acc.register(path(1), 1), RegisterOutcome::MustFlush);

        let batch = acc.take_and_reset();
        assert_eq!(batch.artifacts, vec![path(0)]);
        assert_eq!(batch.size_bytes, 25 * MB);
        assert_eq!(acc.register(path(1), 1), RegisterOutcome::Added);
    }

    #[test]
    fn test_reaching_limit_exactly_requires_flush() {
        let acc = BatchAccumulator::new(10);
        assert_eq!(acc.register(path(0), 4), RegisterOutcome::Added);
        assert_eq!(acc.register(path(1), 5), RegisterOutcome::Added);
        assert_eq!(acc.register(path(2), 1), RegisterOutcome::MustFlush);
        assert_eq!(acc.snapshot().pending_bytes, 9);
    }

    #[test]
    fn test_six_megabyte_items_pack_eight_per_batch() {
        let acc = BatchAccumulator::new(50 * MB);
        let mut batches = Vec::new();
        for n in 0..120 {
            while acc.register(path(n), 6 * MB) == RegisterOutcome::MustFlush {
                batches.push(acc.take_and_reset());
            }
        }
        let last = acc.take_and_reset();

        assert_eq!(batches.len(), 14);
        assert!(batches.iter().all(|b| b.artifacts.len() == 8));
        assert_eq!(last.artifacts.len(), 8);
        assert_eq!(batches.first().map(|b| b.index), Some(0));
        assert_eq!(last.index, 14);
    }

    #[test]
    fn test_empty_take_does_not_consume_an_index() {
        let acc = BatchAccumulator::new(100);
        assert_eq!(acc.snapshot().index, 0);

        let empty = acc.take_and_reset();
        assert!(empty.is_empty());
        assert_eq!(empty.index, 0);

        acc.register(path(0), 10);
        assert_eq!(acc.take_and_reset().index, 0);
        assert!(acc.take_and_reset().is_empty());
        acc.register(path(1), 10);
        assert_eq!(acc.take_and_reset().index, 1);
        assert_eq!(
            acc.snapshot(),
            AccumulatorSnapshot {
                index: 2,
                pending_files: 0,
                pending_bytes: 0
            }
        );
    }

    #[test]
    fn test_concurrent_registration_never_overfills() {
        let acc = Arc::new(BatchAccumulator::new(1000));
        let taken = Arc::new(Mutex::new(Vec::<Batch>::new()));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let acc = Arc::clone(&acc);
                let taken = Arc::clone(&taken);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        let size = 37 + ((worker * 50 + n) % 90) as u64;
                        while acc.register(path(worker * 50 + n), size)
                            == RegisterOutcome::MustFlush
                        {
                            taken.lock().unwrap().push(acc.take_and_reset());
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        taken.lock().unwrap().push(acc.take_and_reset());

        let batches = taken.lock().unwrap();
        let total_files: usize = batches.iter().map(|b| b.artifacts.len()).sum();
        assert_eq!(total_files, 400);
        for batch in batches.iter().filter(|b| b.artifacts.len() > 1) {
            assert!(batch.size_bytes < 1000, "batch {} overfilled", batch.index);
        }

        let mut indices: Vec<u64> = batches
            .iter()
            .filter(|b| !b.is_empty())
            .map(|b| b.index)
            .collect();
        indices.sort_unstable();
        let expected: Vec<u64> = (0..indices.len() as u64).collect();
        assert_eq!(indices, expected);
    }
}
