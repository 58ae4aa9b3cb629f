//! The failure a test body returns instead of throwing.
//!
//! A test is a plain `fn() -> TestResult`. Returning `Err(TestFailure)` is the ordinary way to fail;
//! the harness also accepts panics with a string payload, but explicit failures keep the message intact.

use thiserror::Error;

/// Result type returned by every test body and check.
pub type TestResult = Result<(), TestFailure>;

/// A failed check inside a test body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TestFailure {
    message: String,
}

impl TestFailure {
    /// Create a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Create a failure whose text is `"{details} {context}"`, skipping an empty context.
    pub fn with_context(details: impl Into<String>, context: &str) -> Self {
        let mut message = details.into();
        if !context.is_empty() {
            message.push(' ');
            message.push_str(context);
        }
        Self { message }
    }

    /// The user-facing failure text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Append more detail on a new line, e.g. the test case that triggered the failure.
    pub fn append_details(mut self, details: impl std::fmt::Display) -> Self {
        self.message.push('\n');
        self.message.push_str(&details.to_string());
        self
    }
}

impl From<String> for TestFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TestFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
