//! Parallel processing strategies

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use fwdet_core::{Error, Result};

/// How region tasks are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel on a dedicated pool of the given number of threads, at least one
    ParallelWith(usize),
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map `f` over `items`, preserving order.
    ///
    /// Fails only when a dedicated thread pool cannot be created.
    fn par_map<I, T, F>(&self, items: &[I], f: F) -> Result<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map<I, T, F>(&self, items: &[I], f: F) -> Result<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(items.iter().map(f).collect()),
            ProcessingMode::Parallel => Ok(items.par_iter().map(f).collect()),
            ProcessingMode::ParallelWith(threads) => {
                self.validate()?;
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Other(format!("thread pool: {e}")))?;
                Ok(pool.install(|| items.par_iter().map(f).collect()))
            }
        }
    }
}

impl ProcessingMode {
    /// A dedicated pool needs at least one thread.
    pub fn validate(&self) -> Result<()> {
        match self {
            ProcessingMode::ParallelWith(0) => Err(Error::InvalidParameter {
                name: "parallel_with",
                value: "0".into(),
                reason: "a dedicated pool needs at least one thread".into(),
            }),
            _ => Ok(()),
        }
    }

    /// Threads the mode will use
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(n) => *n,
        }
    }
}

/// Get the number of available CPU cores
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}
