//! Parallel processing strategies

use std::ops::Range;

use markcorr_core::{Error, Result};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Processing mode for algorithms
///
/// The mode governs every rayon call made under an [`Executor`]: with
/// `Sequential` both replicate dispatch and the chunked reductions inside
/// each replicate run on one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for an optional thread count: `None` uses all cores, `Some(1)`
    /// runs sequentially.
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            None => ProcessingMode::Parallel,
            Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    /// Number of worker threads this mode runs on
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => *n,
        }
    }

    fn check(&self) -> Result<()> {
        if let ProcessingMode::ParallelWith(0) = self {
            return Err(Error::InvalidParameter {
                name: "threads",
                value: "0".into(),
                reason: "thread count must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Build the executor for this mode. Dedicated pools are created here
    /// once, so callers should reuse the executor across batches.
    pub fn executor(&self) -> Result<Executor> {
        self.check()?;
        #[cfg(feature = "parallel")]
        let pool = match self {
            ProcessingMode::Parallel => None,
            ProcessingMode::Sequential | ProcessingMode::ParallelWith(_) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(self.threads())
                    .build()
                    .map_err(|e| Error::ThreadPool(e.to_string()))?,
            ),
        };
        Ok(Executor {
            mode: *self,
            #[cfg(feature = "parallel")]
            pool,
        })
    }
}

/// A [`ProcessingMode`] bound to its thread pool
#[derive(Debug)]
pub struct Executor {
    mode: ProcessingMode,
    /// `None` runs on rayon's global pool
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl Executor {
    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Run `op` inside this executor's pool. Parallel iterators started by
    /// `op` use that pool's threads.
    #[cfg(feature = "parallel")]
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    /// Run `op` on the calling thread
    #[cfg(not(feature = "parallel"))]
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        op()
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        self.try_par_map(range, |i| Ok(f(i)))
    }

    /// Map a fallible function over indices. The first error (in index
    /// order) aborts the whole call.
    fn try_par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send;
}

impl ParallelStrategy for Executor {
    #[cfg(feature = "parallel")]
    fn try_par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        match self.mode {
            ProcessingMode::Sequential => self.install(|| range.map(f).collect()),
            _ => self.install(|| range.into_par_iter().map(f).collect()),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn try_par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        range.map(f).collect()
    }
}

impl ParallelStrategy for ProcessingMode {
    /// One-shot map; builds a fresh [`Executor`] per call.
    fn try_par_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        self.executor()?.try_par_map(range, f)
    }
}

/// Get the number of available CPU cores
#[cfg(feature = "parallel")]
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}

/// Get the number of available CPU cores
#[cfg(not(feature = "parallel"))]
pub fn num_cpus() -> usize {
    1
}
