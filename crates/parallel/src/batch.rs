//! Cooperative batching of independent work items

use std::ops::Range;

/// Iterator over contiguous index batches covering `0..total`.
///
/// Work is dispatched one batch at a time so that a caller can check for
/// cancellation or report progress between batches.
#[derive(Debug, Clone)]
pub struct BatchIterator {
    total: usize,
    batch_size: usize,
    current: usize,
}

impl BatchIterator {
    /// Create a new batch iterator. A zero batch size is treated as one.
    pub fn new(total: usize, batch_size: usize) -> Self {
        Self {
            total,
            batch_size: batch_size.max(1),
            current: 0,
        }
    }

    /// Number of batches still to be yielded
    pub fn remaining(&self) -> usize {
        (self.total - self.current).div_ceil(self.batch_size)
    }
}

impl Iterator for BatchIterator {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.total {
            return None;
        }
        let start = self.current;
        let end = (start + self.batch_size).min(self.total);
        self.current = end;
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for BatchIterator {}
