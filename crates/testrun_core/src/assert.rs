//! Checks for test bodies.
//!
//! Use these from a test via:
//! - `require_equal(&actual, "result", &expected)?`
//! - `are_equal(&expected, &actual, "sorted output")?`
//!
//! Every helper returns `Err(TestFailure)` instead of panicking, so the caller decides whether to `?` out.

use std::fmt::{Debug, Display};

use crate::errors::{TestFailure, TestResult};

/// Fail unless `one == two`.
pub fn require_equal<T: PartialEq + Display>(one: &T, message: &str, two: &T) -> TestResult {
    if one == two {
        return Ok(());
    }
    Err(TestFailure::with_context(
        format!("The ({one}) must be equal to ({two})."),
        message,
    ))
}

/// Fail when `one == two`.
pub fn require_not_equal<T: PartialEq + Display>(one: &T, message: &str, two: &T) -> TestResult {
    if one != two {
        return Ok(());
    }
    Err(TestFailure::with_context(
        format!("The ({one}) must Not be equal to ({two})."),
        message,
    ))
}

/// Compare an expected value against an actual one, printing both with `Debug`.
///
/// Works for containers (`Vec<Vec<T>>`, tuples, options) where `Display` is unavailable.
pub fn are_equal<T: PartialEq + Debug + ?Sized>(expected: &T, actual: &T, message: &str) -> TestResult {
    if expected == actual {
        return Ok(());
    }
    Err(TestFailure::new(format!(
        "Expected ({expected:?}), but actual ({actual:?}) in '{message}'."
    )))
}

/// Require `value > 0`, returning the value for chaining.
pub fn require_positive<T: PartialOrd + Default + Display + Copy>(value: T, message: &str) -> Result<T, TestFailure> {
    if T::default() < value {
        return Ok(value);
    }
    Err(TestFailure::with_context(format!("The value ({value}) must be positive."), message))
}

/// Require `value >= 0`, returning the value for chaining.
pub fn require_non_negative<T: PartialOrd + Default + Display + Copy>(
    value: T,
    message: &str,
) -> Result<T, TestFailure> {
    if value < T::default() {
        return Err(TestFailure::with_context(
            format!("The value ({value}) must be non-negative."),
            message,
        ));
    }
    Ok(value)
}

/// Require `value <= max_value`.
pub fn require_less_equal<T: PartialOrd + Display + Copy>(value: T, max_value: T, message: &str) -> Result<T, TestFailure> {
    if value <= max_value {
        return Ok(value);
    }
    Err(TestFailure::with_context(
        format!("The value ({value}) must not exceed ({max_value})."),
        message,
    ))
}

/// Require `value > edge_value`.
pub fn require_greater<T: PartialOrd + Display + Copy>(value: T, edge_value: T, message: &str) -> Result<T, TestFailure> {
    if edge_value < value {
        return Ok(value);
    }
    Err(TestFailure::with_context(
        format!("The value ({value}) must be greater than ({edge_value})."),
        message,
    ))
}

/// Require `low <= value <= high`.
pub fn require_between<T: PartialOrd + Display + Copy>(low: T, value: T, high: T, message: &str) -> TestResult {
    if low <= value && value <= high {
        return Ok(());
    }
    Err(TestFailure::with_context(
        format!("The value ({value}) must be between [{low}, {high}]."),
        message,
    ))
}

/// Require a non-empty collection.
pub fn require_non_empty<T>(argument_name: &str, collection: &[T]) -> TestResult {
    if collection.is_empty() {
        return Err(TestFailure::new(format!(
            "The '{argument_name}' argument must be not empty."
        )));
    }
    Ok(())
}

/// Require a non-decreasing sequence; with `strict` it must be increasing.
pub fn require_sorted<T: PartialOrd + Debug>(data: &[T], message: &str, strict: bool) -> TestResult {
    for (index, pair) in data.windows(2).enumerate() {
        let out_of_order = if strict { pair[1] <= pair[0] } else { pair[1] < pair[0] };
        if out_of_order {
            let kind = if strict { "strictly sorted" } else { "sorted" };
            return Err(TestFailure::with_context(
                format!(
                    "The data must be {kind}, but [{}]={:?} is followed by {:?}.",
                    index, pair[0], pair[1]
                ),
                message,
            ));
        }
    }
    Ok(())
}

/// Require that no value repeats; the failure names the first repeated value.
pub fn require_unique<T: Ord + Debug>(data: &[T], message: &str) -> TestResult {
    let mut sorted: Vec<&T> = data.iter().collect();
    sorted.sort();
    if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(TestFailure::with_context(
            format!("The value {:?} is repeating.", pair[0]),
            message,
        ));
    }
    Ok(())
}

/// Require a condition, failing with `message`.
pub fn require_true(condition: bool, message: &str) -> TestResult {
    if condition {
        Ok(())
    } else {
        Err(TestFailure::new(format!("assertion failed: {message}")))
    }
}

/// Explicitly fail a test with a message.
pub fn fail(message: impl Into<String>) -> TestResult {
    Err(TestFailure::new(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_equal_message() {
        let err = require_equal(&1, "size", &2).unwrap_err();
        assert_eq!(err.message(), "The (1) must be equal to (2). size");
    }

    #[test]
    fn test_require_positive_returns_value() {
        assert_eq!(require_positive(5_u32, "count").unwrap(), 5);
        assert!(require_positive(0_i64, "count").is_err());
    }

    #[test]
    fn test_require_sorted_strictness() {
        assert!(require_sorted(&[1, 1, 2], "data", false).is_ok());
        assert!(require_sorted(&[1, 1, 2], "data", true).is_err());
    }
}
