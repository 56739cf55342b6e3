//! Utility macros shared by the message types.

/// A macro for early returns with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
/// The error is converted with `Into`.
///
/// # Example
///
/// ```ignore
/// ensure!(!target.contains(char::is_whitespace), ArgumentError::InvalidRequestTarget { target });
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error.into());
        }
    };
}

pub(crate) use ensure;
