//! Bounded in-memory sample history
//!
//! The history keeps the most recent `N` samples in chronological order. When
//! it is full, appending a new sample first evicts the oldest one, so memory
//! use is fixed for the lifetime of the device and the retained window always
//! ends at the latest reading.
//!
//! ```text
//! N = 3:   append A, B, C   -> [A, B, C]
//!          append D         -> [B, C, D]   (A evicted)
//! ```

use core::iter::Chain;
use core::slice;

use heapless::Deque;

use crate::config::HISTORY_CAPACITY;
use crate::sample::Sample;

/// History sized for the logger (one day at the default ten-minute cadence).
pub type SensorHistory = History<HISTORY_CAPACITY>;

/// Fixed-capacity FIFO of samples, oldest first.
pub struct History<const N: usize> {
    samples: Deque<Sample, N>,
}

impl<const N: usize> Default for History<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> History<N> {
    /// Create an empty history
    pub const fn new() -> Self {
        Self {
            samples: Deque::new(),
        }
    }

    /// Append a sample at the newest end, evicting the oldest sample if full.
    pub fn append(&mut self, sample: Sample) {
        if self.samples.is_full() {
            self.samples.pop_front();
        }
        // Cannot fail: a slot was freed above if there was none.
        let _ = self.samples.push_back(sample);
    }

    /// The most recently appended sample, `None` while the history is empty.
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Read-only view of every retained sample in chronological order.
    ///
    /// The view borrows the history, so no append can happen while it is alive
    /// and every traversal sees the contents as of this call.
    pub fn all(&self) -> Snapshot<'_> {
        let (older, newer) = self.samples.as_slices();
        Snapshot { older, newer }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

/// Chronological view over a [`History`].
///
/// `Snapshot` is `Copy`; each call to [`Snapshot::iter`] restarts from the
/// oldest sample.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    // The deque may wrap around its storage, giving two contiguous runs.
    older: &'a [Sample],
    newer: &'a [Sample],
}

impl<'a> Snapshot<'a> {
    pub fn iter(&self) -> Chain<slice::Iter<'a, Sample>, slice::Iter<'a, Sample>> {
        self.older.iter().chain(self.newer.iter())
    }

    pub fn len(&self) -> usize {
        self.older.len() + self.newer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<&'a Sample> {
        self.older.first().or_else(|| self.newer.first())
    }
}

impl<'a> IntoIterator for Snapshot<'a> {
    type Item = &'a Sample;
    type IntoIter = Chain<slice::Iter<'a, Sample>, slice::Iter<'a, Sample>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
