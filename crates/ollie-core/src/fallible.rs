//! Extensions over `Result` and `Option` for layered error handling.
//!
//! Errors fall into three tiers:
//!
//! 1. Recoverable data problems travel as `Err` values ([`ErrorReport`],
//!    [`PartialFailure`], `String`) and are collected rather than thrown.
//! 2. Programming mistakes panic where they are detected.
//! 3. Panics raised by foreign code (callbacks, user scripts) are captured by
//!    [`attempt`] / [`attempt_async`] and re-enter the `Result` pipeline as
//!    [`UnknownError`].

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

/// Boxed error type used for wrapped causes.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A boxed future resolving to a `Result`.
///
/// Combinators come from [`futures::TryFutureExt`] (`map_ok`, `and_then`,
/// `map_err`, `or_else`).
pub type AsyncResult<T, E> = BoxFuture<'static, Result<T, E>>;

/// A boxed future resolving to an `Option`.
pub type AsyncOption<T> = BoxFuture<'static, Option<T>>;

// ---------------------------------------------------------------------------
// Contextual
// ---------------------------------------------------------------------------

/// An error carrying a message with the original error as its source.
#[derive(Debug)]
pub struct Contextual {
    message: String,
    source: BoxError,
}

impl Contextual {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Contextual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for Contextual {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

// ---------------------------------------------------------------------------
// UnknownError
// ---------------------------------------------------------------------------

/// A panic captured from code outside the `Result` discipline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error: {message}")]
pub struct UnknownError {
    /// The panic payload rendered as text.
    pub message: String,
}

impl UnknownError {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_owned()
        };
        Self { message }
    }
}

/// Run `f`, converting a panic into [`UnknownError`].
pub fn attempt<T>(f: impl FnOnce() -> T) -> Result<T, UnknownError> {
    std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(UnknownError::from_panic)
}

/// Await `future`, converting a panic during any poll into [`UnknownError`].
pub async fn attempt_async<F>(future: F) -> Result<F::Output, UnknownError>
where
    F: Future,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(UnknownError::from_panic)
}

// ---------------------------------------------------------------------------
// ResultExt / OptionExt
// ---------------------------------------------------------------------------

pub trait ResultExt<T, E> {
    /// Wrap the error in a [`Contextual`] whose source is the original error.
    fn context(self, message: impl Into<String>) -> Result<T, Contextual>
    where
        E: Into<BoxError>;

    /// Discard the error. Same as [`Result::ok`].
    fn unwrap_or_none(self) -> Option<T>;

    /// Unwrap at a boundary, panicking with `message` and the cause.
    fn unwrap_msg(self, message: &str) -> T
    where
        E: fmt::Display;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T, Contextual>
    where
        E: Into<BoxError>,
    {
        self.map_err(|source| Contextual {
            message: message.into(),
            source: source.into(),
        })
    }

    fn unwrap_or_none(self) -> Option<T> {
        self.ok()
    }

    #[track_caller]
    fn unwrap_msg(self, message: &str) -> T
    where
        E: fmt::Display,
    {
        match self {
            Ok(v) => v,
            Err(e) => panic!("{message}: {e}"),
        }
    }
}

pub trait OptionExt<T> {
    /// Convert to a `Result` with a string error.
    fn ok_or_msg(self, message: impl Into<String>) -> Result<T, String>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_msg(self, message: impl Into<String>) -> Result<T, String> {
        self.ok_or_else(|| message.into())
    }
}

// ---------------------------------------------------------------------------
// ErrorReport
// ---------------------------------------------------------------------------

/// A structured, serializable error: a headline plus its cause chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    #[serde(default)]
    pub cause: Vec<String>,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: Vec::new(),
        }
    }

    /// Append one cause line.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause.push(cause.into());
        self
    }

    /// Build from an error, walking its `source()` chain.
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        let mut report = Self::new(error.to_string());
        let mut next = error.source();
        while let Some(cause) = next {
            report.cause.push(cause.to_string());
            next = cause.source();
        }
        report
    }

    /// Build from an `anyhow::Error`, flattening its context chain.
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let mut chain = error.chain();
        let message = chain
            .next()
            .map(|e| e.to_string())
            .unwrap_or_default();
        Self {
            message,
            cause: chain.map(|e| e.to_string()).collect(),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for cause in &self.cause {
            write!(f, "\n  caused by: {cause}")?;
        }
        Ok(())
    }
}

impl From<String> for ErrorReport {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ErrorReport {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

// ---------------------------------------------------------------------------
// PartialFailure
// ---------------------------------------------------------------------------

/// Error side of an operation that may still have produced something.
///
/// At least one of `result` and `errors` is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialFailure<T> {
    /// Whatever was built before or despite the failures.
    pub result: Option<T>,
    /// One message per failure, in the order they occurred.
    pub errors: Vec<String>,
}

impl<T> PartialFailure<T> {
    /// Nothing was produced.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result: None,
            errors: vec![message.into()],
        }
    }

    /// `result` was produced with `errors` along the way.
    ///
    /// # Panics
    ///
    /// Panics if `errors` is empty; that case is a success, not a partial one.
    pub fn partial(result: T, errors: Vec<String>) -> Self {
        assert!(
            !errors.is_empty(),
            "a partial failure must carry at least one error"
        );
        Self {
            result: Some(result),
            errors,
        }
    }

    /// Whether something usable was produced.
    pub fn is_partial(&self) -> bool {
        self.result.is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PartialFailure<U> {
        PartialFailure {
            result: self.result.map(f),
            errors: self.errors,
        }
    }
}

impl<T> fmt::Display for PartialFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errors.join("; "))
    }
}

impl<T: fmt::Debug> Error for PartialFailure<T> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
