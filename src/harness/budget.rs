//! Process-wide cap on extra worker threads.
//!
//! A test body may itself fan out into parallel sub-tests while the top-level run already keeps every
//! core busy. Sharing one `ThreadBudget` between those nested runs bounds the total thread count.
//! Permits are only ever taken with [`ThreadBudget::try_acquire`], so a nested run that finds the
//! budget exhausted degrades to sequential execution instead of waiting on its parent.
//!
//! [`ThreadBudget::shared`] is the budget every run uses unless told otherwise: the driver passes it to
//! the top-level run and [`CaseRunner`](super::cases::CaseRunner) picks it up by default, so a test body
//! reaches the same permits as the run that started it.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::task_runner::hardware_concurrency;

#[derive(Debug)]
pub struct ThreadBudget {
    available: AtomicUsize,
    capacity: usize,
}

static SHARED: OnceLock<ThreadBudget> = OnceLock::new();

impl ThreadBudget {
    pub const fn new(capacity: usize) -> Self {
        Self {
            available: AtomicUsize::new(capacity),
            capacity,
        }
    }

    /// A budget of one permit per hardware thread.
    pub fn from_hardware() -> Self {
        Self::new(hardware_concurrency())
    }

    /// The process-wide budget, sized from the hardware on first use.
    pub fn shared() -> &'static ThreadBudget {
        SHARED.get_or_init(Self::from_hardware)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.available.load(Ordering::SeqCst)
    }

    /// Take one permit if any is left. Never blocks.
    pub fn try_acquire(&self) -> Option<BudgetPermit<'_>> {
        let mut current = self.available.load(Ordering::SeqCst);
        loop {
            if current == 0 {
                return None;
            }
            match self
                .available
                .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Some(BudgetPermit { budget: self }),
                Err(actual) => current = actual,
            }
        }
    }

    /// Take up to `wanted` permits.
    pub fn acquire_up_to(&self, wanted: usize) -> Vec<BudgetPermit<'_>> {
        std::iter::from_fn(|| self.try_acquire()).take(wanted).collect()
    }
}

/// Returned to the budget on drop.
#[derive(Debug)]
pub struct BudgetPermit<'a> {
    budget: &'a ThreadBudget,
}

impl Drop for BudgetPermit<'_> {
    fn drop(&mut self) {
        self.budget.available.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permits_are_returned_on_drop() {
        let budget = ThreadBudget::new(2);
        {
            let permits = budget.acquire_up_to(5);
            assert_eq!(permits.len(), 2);
            assert_eq!(budget.available(), 0);
            assert!(budget.try_acquire().is_none());
        }
        assert_eq!(budget.available(), 2);
    }

    #[test]
    fn test_shared_budget_is_one_instance() {
        let budget = ThreadBudget::shared();
        assert!(std::ptr::eq(budget, ThreadBudget::shared()));
        assert_eq!(budget.capacity(), hardware_concurrency());
    }

    #[test]
    fn test_zero_capacity_never_grants() {
        let budget = ThreadBudget::new(0);
        assert!(budget.try_acquire().is_none());
        assert!(budget.acquire_up_to(3).is_empty());
    }
}
