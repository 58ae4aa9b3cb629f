//! Explicit test registry.
//!
//! The driver builds a [`TestRegistry`] and passes it in; there is no global registration. Before a run
//! the registry is validated (no function registered twice, no empty names) and ordered: by name in
//! parallel mode, by registration order in sequential mode.

use std::collections::HashSet;
use std::hash::Hash;

use testrun_core::TestResult;

use super::config::RunMode;
use super::error::HarnessError;

/// Signature of every registered test.
pub type TestFn = fn() -> TestResult;

/// A named test function.
#[derive(Debug, Clone)]
pub struct TestFunction {
    pub name: String,
    pub func: TestFn,
}

impl TestFunction {
    pub fn new(name: impl Into<String>, func: TestFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Function pointer address, the identity used for duplicate detection.
    pub fn address(&self) -> usize {
        self.func as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestRegistry {
    tests: Vec<TestFunction>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, func: TestFn) -> &mut Self {
        self.tests.push(TestFunction::new(name, func));
        self
    }

    /// Builder-style [`TestRegistry::register`].
    pub fn with(mut self, name: impl Into<String>, func: TestFn) -> Self {
        self.register(name, func);
        self
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestFunction> {
        self.tests.iter()
    }

    /// Keep only tests whose name contains `keyword`.
    pub fn filtered(self, keyword: &str) -> Self {
        let tests = self.tests.into_iter().filter(|t| t.name.contains(keyword)).collect();
        Self { tests }
    }

    /// Validate and order the tests for a run.
    pub fn prepared(self, mode: RunMode) -> Result<Vec<TestFunction>, HarnessError> {
        let mut tests = self.tests;

        if let Some(index) = tests.iter().position(|t| t.name.is_empty()) {
            return Err(HarnessError::EmptyName { index });
        }

        require_unique_function_pointers(&tests)?;

        if !mode.is_sequential() {
            tests.sort_by(|one, two| one.name.cmp(&two.name));
        }

        Ok(tests)
    }
}

impl FromIterator<TestFunction> for TestRegistry {
    fn from_iter<I: IntoIterator<Item = TestFunction>>(iter: I) -> Self {
        Self {
            tests: iter.into_iter().collect(),
        }
    }
}

/// Index of the first element equal to an earlier one.
pub fn find_first_repetition<T: Eq + Hash>(items: &[T]) -> Option<usize> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().position(|item| !seen.insert(item))
}

/// Fail fast when the same function is registered twice.
pub fn require_unique_function_pointers(tests: &[TestFunction]) -> Result<(), HarnessError> {
    let addresses: Vec<usize> = tests.iter().map(TestFunction::address).collect();

    match find_first_repetition(&addresses) {
        Some(index) => Err(HarnessError::DuplicateTest {
            index,
            name: tests[index].name.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::hint::black_box;

    // Distinct bodies keep the functions from being merged into one address.
    fn alpha() -> TestResult {
        black_box(1);
        Ok(())
    }

    fn beta() -> TestResult {
        black_box(2);
        Ok(())
    }

    fn gamma() -> TestResult {
        black_box(3);
        Ok(())
    }

    #[test]
    fn test_find_first_repetition() {
        assert_eq!(find_first_repetition(&[1, 2, 3]), None);
        assert_eq!(find_first_repetition(&[1, 2, 1, 2]), Some(2));
        assert_eq!(find_first_repetition::<u8>(&[]), None);
    }

    #[test]
    fn test_parallel_mode_sorts_by_name() {
        let registry = TestRegistry::new().with("c", gamma).with("a", alpha).with("b", beta);
        let names: Vec<String> = registry
            .prepared(RunMode::parallel())
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sequential_mode_keeps_registration_order() {
        let registry = TestRegistry::new().with("c", gamma).with("a", alpha);
        let names: Vec<String> = registry
            .prepared(RunMode::Sequential)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["c", "a"]);
    }

    #[test]
    fn test_duplicate_function_is_rejected() {
        let registry = TestRegistry::new().with("a", alpha).with("b", beta).with("a again", alpha);
        let err = registry.prepared(RunMode::parallel()).unwrap_err();
        assert!(matches!(err, HarnessError::DuplicateTest { index: 2, ref name } if name == "a again"));
        assert_eq!(err.to_string(), "FunctionPointers are repeating at index 2, name 'a again'.");
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let registry = TestRegistry::new().with("a", alpha).with("", beta);
        assert!(matches!(
            registry.prepared(RunMode::Sequential),
            Err(HarnessError::EmptyName { index: 1 })
        ));
    }

    #[test]
    fn test_filtered_keeps_matching_names() {
        let registry = TestRegistry::new()
            .with("graph_bfs", alpha)
            .with("string_kmp", beta)
            .with("graph_dfs", gamma)
            .filtered("graph");
        assert_eq!(registry.len(), 2);
    }
}
