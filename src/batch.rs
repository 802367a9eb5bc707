//! Parallel Batches
//!
//! Runs independent synthesis or contagion units on a bounded rayon pool.
//! Results line up with the input, and a shared flag stops further units
//! from starting: units that never ran come back as `None`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads; `None` uses the available parallelism.
    pub threads: Option<usize>,
}

/// Cloneable handle that cancels the batch it was taken from.
#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BatchRunner {
    config: BatchConfig,
    cancelled: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    pub fn run<T, R, F>(&self, items: &[T], work: F) -> Result<Vec<Option<R>>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let mut builder = ThreadPoolBuilder::new();
        if let Some(threads) = self.config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;
        let completed = AtomicUsize::new(0);

        info!(
            units = items.len(),
            threads = pool.current_num_threads(),
            "starting batch"
        );
        let results: Vec<Option<R>> = pool.install(|| {
            items
                .par_iter()
                .enumerate()
                .map(|(index, item)| {
                    if self.cancelled.load(Ordering::SeqCst) {
                        debug!(index, "unit skipped after cancellation");
                        return None;
                    }
                    let result = work(item);
                    completed.fetch_add(1, Ordering::Relaxed);
                    Some(result)
                })
                .collect()
        });
        info!(
            completed = completed.load(Ordering::Relaxed),
            units = items.len(),
            "batch finished"
        );
        Ok(results)
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_input_order() {
        let runner = BatchRunner::new(BatchConfig { threads: Some(4) });
        let items: Vec<u64> = (0..200).collect();
        let results = runner.run(&items, |&x| x * x).unwrap();
        let expected: Vec<Option<u64>> = items.iter().map(|&x| Some(x * x)).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn test_cancelled_before_start() {
        let runner = BatchRunner::default();
        runner.cancel_handle().cancel();
        let results = runner.run(&[1, 2, 3], |&x: &i32| x + 1).unwrap();
        assert_eq!(results, vec![None, None, None]);
    }

    #[test]
    fn test_cancel_from_worker() {
        let runner = BatchRunner::new(BatchConfig { threads: Some(1) });
        let handle = runner.cancel_handle();
        let items: Vec<usize> = (0..50).collect();
        let results = runner
            .run(&items, |&x| {
                if x == 0 {
                    handle.cancel();
                }
                x
            })
            .unwrap();
        assert_eq!(results.len(), 50);
        assert_eq!(results[0], Some(0));
        assert!(results.iter().any(Option::is_none));
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_empty_batch() {
        let results = BatchRunner::default().run(&[] as &[u8], |&x| x).unwrap();
        assert!(results.is_empty());
    }
}
