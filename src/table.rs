//! Dense document-by-vocabulary count matrices and their reduction.

use crate::error::{Result, TokfreakError};
use crate::types::DocIdx;

/// Row-major `documents x vocabulary` counts. A worker's local table only
/// holds what it saw in its own range; the root's global table is the sum of
/// all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyTable {
    rows: usize,
    cols: usize,
    counts: Vec<u64>,
}

impl FrequencyTable {
    pub fn new(rows: usize, cols: usize) -> FrequencyTable {
        FrequencyTable { rows, cols, counts: vec![0; rows * cols] }
    }

    pub fn from_rows(rows: Vec<Vec<u64>>) -> Result<FrequencyTable> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|row| row.len() != cols) {
            return Err(TokfreakError::Internal(format!(
                "row {} has {} columns, expected {}",
                bad,
                rows[bad].len(),
                cols
            )));
        }
        let n_rows = rows.len();
        Ok(FrequencyTable { rows: n_rows, cols, counts: rows.into_iter().flatten().collect() })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, doc: DocIdx, col: usize) -> u64 {
        self.counts[doc * self.cols + col]
    }

    pub fn row(&self, doc: DocIdx) -> &[u64] {
        &self.counts[doc * self.cols..(doc + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[u64]> + '_ {
        (0..self.rows).map(move |doc| self.row(doc))
    }

    pub fn increment(&mut self, doc: DocIdx, col: usize) {
        self.counts[doc * self.cols + col] += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_zero(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Element-wise sum. Commutative and associative, so the order in which
    /// worker tables arrive never matters.
    pub fn merge(&mut self, other: &FrequencyTable) -> Result<()> {
        if (self.rows, self.cols) != (other.rows, other.cols) {
            return Err(TokfreakError::Internal(format!(
                "cannot merge a {}x{} table into a {}x{} table",
                other.rows, other.cols, self.rows, self.cols
            )));
        }
        for (acc, cnt) in self.counts.iter_mut().zip(other.counts.iter()) {
            *acc += cnt;
        }
        Ok(())
    }
}

/// Sums every local table into the global one.
pub fn reduce<I>(rows: usize, cols: usize, tables: I) -> Result<FrequencyTable>
where
    I: IntoIterator<Item = FrequencyTable>,
{
    tables.into_iter().try_fold(FrequencyTable::new(rows, cols), |mut acc, table| {
        acc.merge(&table)?;
        Ok(acc)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_sums_cells() {
        let mut left = FrequencyTable::from_rows(vec![vec![1, 0], vec![0, 0]]).unwrap();
        let right = FrequencyTable::from_rows(vec![vec![1, 0], vec![0, 2]]).unwrap();
        left.merge(&right).unwrap();
        assert_eq!(left, FrequencyTable::from_rows(vec![vec![2, 0], vec![0, 2]]).unwrap());
        assert_eq!(left.total(), 4);
    }

    #[test]
    fn reduce_is_order_independent() {
        let a = FrequencyTable::from_rows(vec![vec![3, 1]]).unwrap();
        let b = FrequencyTable::from_rows(vec![vec![0, 5]]).unwrap();
        let c = FrequencyTable::from_rows(vec![vec![7, 0]]).unwrap();
        let forward = reduce(1, 2, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let backward = reduce(1, 2, vec![c, b, a]).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.row(0), &[10, 6]);
    }

    #[test]
    fn reduce_of_nothing_is_zero() {
        let table = reduce(3, 2, Vec::new()).unwrap();
        assert!(table.is_zero());
        assert_eq!((table.rows(), table.cols()), (3, 2));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut left = FrequencyTable::new(2, 2);
        assert!(left.merge(&FrequencyTable::new(2, 3)).is_err());
        assert!(FrequencyTable::from_rows(vec![vec![1], vec![1, 2]]).is_err());
    }
}
