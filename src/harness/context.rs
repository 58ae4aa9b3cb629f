//! Shared state for one harness run.
//!
//! Every worker writes here concurrently. Counters are atomics; the execution log and the slowest-test
//! record sit behind mutexes. The scheduler joins all workers before anyone reads the final values, so
//! the join is the synchronization barrier.
//!
//! A context is built fresh for each run and consumed by [`TestRunContext::into_stats`], so nothing
//! leaks into the next run.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Per-run state visible to all workers.
#[derive(Debug, Default)]
pub struct TestRunContext {
    started: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    execution_log: Mutex<Vec<String>>,
    slowest: Mutex<Option<(String, Duration)>>,
}

/// Final counters of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextStats {
    pub started: usize,
    pub completed: usize,
    pub failed: usize,
    /// Test names in the order they started.
    pub execution_log: Vec<String>,
    pub slowest: Option<(String, Duration)>,
}

impl TestRunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a test has started; returns its 1-based start position.
    pub fn record_start(&self, name: &str) -> usize {
        // A poisoned log only means another worker panicked mid-push; the data is still usable.
        let mut log = self.execution_log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        log.push(name.to_string());
        self.started.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record that a test has finished; returns the 1-based completion count.
    pub fn record_finish(&self, name: &str, elapsed: Duration, failed: bool) -> usize {
        if failed {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        {
            let mut slowest = self.slowest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let is_slower = slowest.as_ref().is_none_or(|(_, best)| *best < elapsed);
            if is_slower {
                *slowest = Some((name.to_string(), elapsed));
            }
        }

        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Consume the context after all workers have joined.
    pub fn into_stats(self) -> ContextStats {
        ContextStats {
            started: self.started.into_inner(),
            completed: self.completed.into_inner(),
            failed: self.failed.into_inner(),
            execution_log: self
                .execution_log
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
            slowest: self.slowest.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let context = TestRunContext::new();

        thread::scope(|scope| {
            for worker in 0..8 {
                let context = &context;
                scope.spawn(move || {
                    for i in 0..100 {
                        let name = format!("w{worker}_{i}");
                        context.record_start(&name);
                        context.record_finish(&name, Duration::from_micros(i), i % 10 == 0);
                    }
                });
            }
        });

        let stats = context.into_stats();
        assert_eq!(stats.started, 800);
        assert_eq!(stats.completed, 800);
        assert_eq!(stats.failed, 80);
        assert_eq!(stats.execution_log.len(), 800);
        assert_eq!(stats.slowest.map(|(_, d)| d), Some(Duration::from_micros(99)));
    }

    #[test]
    fn test_fresh_context_is_empty() {
        let stats = TestRunContext::new().into_stats();
        assert_eq!(stats, ContextStats::default());
    }
}
