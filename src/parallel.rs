use crate::error::{Result, TokfreakError};
use crate::types::{ByteRange, WorkerId};

/// Bytes handed to each worker: `ceil(total_size / workers)`.
pub fn bytes_per_worker(workers: usize, total_size: u64) -> u64 {
    let workers = workers as u64;
    (total_size + workers - 1) / workers
}

/// The slice of the corpus a worker is responsible for. Ranges are cut
/// purely by byte count, without regard to documents or tokens. Trailing
/// workers get an empty range when there are fewer bytes than workers.
pub fn assign_range(worker_id: WorkerId, workers: usize, total_size: u64) -> Result<ByteRange> {
    if workers == 0 {
        return Err(TokfreakError::InvalidConfig("worker count must be greater than zero".into()));
    }
    if worker_id >= workers {
        return Err(TokfreakError::InvalidConfig(format!(
            "worker id {} is out of range for {} workers",
            worker_id, workers
        )));
    }
    let per_worker = bytes_per_worker(workers, total_size);
    let start = per_worker.saturating_mul(worker_id as u64).min(total_size);
    let end = start.saturating_add(per_worker).min(total_size);
    Ok(ByteRange::new(start, end))
}

pub fn plan_ranges(workers: usize, total_size: u64) -> Result<Vec<ByteRange>> {
    (0..workers).map(|worker_id| assign_range(worker_id, workers, total_size)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_workers_over_twelve_bytes() {
        assert_eq!(
            plan_ranges(2, 12).unwrap(),
            vec![ByteRange::new(0, 6), ByteRange::new(6, 12)]
        );
    }

    #[test]
    fn last_range_is_clamped() {
        assert_eq!(
            plan_ranges(3, 10).unwrap(),
            vec![ByteRange::new(0, 4), ByteRange::new(4, 8), ByteRange::new(8, 10)]
        );
    }

    #[test]
    fn more_workers_than_bytes_leaves_empty_ranges() {
        let ranges = plan_ranges(5, 3).unwrap();
        assert_eq!(&ranges[..3], &[ByteRange::new(0, 1), ByteRange::new(1, 2), ByteRange::new(2, 3)]);
        assert!(ranges[3].is_empty() && ranges[4].is_empty());
        assert_eq!(ranges[4].start, 3);
    }

    #[test]
    fn every_byte_has_one_owner() {
        let ranges = plan_ranges(7, 100).unwrap();
        assert_eq!(ranges.iter().map(ByteRange::len).sum::<u64>(), 100);
        for offset in 0..100 {
            assert_eq!(ranges.iter().filter(|r| r.contains(offset)).count(), 1, "offset {}", offset);
        }
        assert!(!ranges.iter().any(|r| r.contains(100)));
    }

    #[test]
    fn empty_corpus() {
        assert!(plan_ranges(4, 0).unwrap().iter().all(|r| r.is_empty()));
    }

    #[test]
    fn rejects_bad_worker_ids() {
        assert!(matches!(assign_range(0, 0, 10), Err(TokfreakError::InvalidConfig(_))));
        assert!(matches!(assign_range(3, 3, 10), Err(TokfreakError::InvalidConfig(_))));
    }
}
