//! Error types and the error-reporting collaborator.
//!
//! The engine never decides how failures are displayed; construction and
//! background-diff failures are handed to an [`ErrorReporter`] supplied by
//! the surrounding layer. Pool and registry operations are infallible by
//! contract (absence is a normal return, not an error).

use std::fmt;

/// A render-target factory failed to construct its presentation object.
#[derive(Debug, Clone)]
pub struct ConstructionError {
    message: String,
}

impl ConstructionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "render target construction failed: {}", self.message)
    }
}

impl std::error::Error for ConstructionError {}

/// Receives `(cause, message)` pairs for failures the engine absorbs instead
/// of propagating: preload construction errors and background diff panics.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, cause: &dyn fmt::Display, message: &str);
}

/// Default reporter that forwards to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, cause: &dyn fmt::Display, message: &str) {
        log::error!("{message}: {cause}");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Captures reports for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingReporter {
        pub(crate) reports: Mutex<Vec<String>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, cause: &dyn fmt::Display, message: &str) {
            self.reports
                .lock()
                .unwrap()
                .push(format!("{message}: {cause}"));
        }
    }
}
