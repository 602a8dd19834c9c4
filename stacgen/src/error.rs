//! Error classification shared by every module.
//!
//! Each module owns its own `thiserror` enum. The worker loop does not match
//! on those enums directly; it asks every error for its [`ErrorClass`] and
//! decides whether to drop the job or stop the process.

use std::fmt;

/// How far a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Transient; the same work may succeed if attempted again
    Retryable,
    /// The current job cannot complete, other jobs are unaffected
    FatalToJob,
    /// The process cannot continue (broker gone, tooling missing)
    FatalToProcess,
}

impl ErrorClass {
    /// Whether the worker loop must stop.
    pub fn is_fatal_to_process(&self) -> bool {
        matches!(self, Self::FatalToProcess)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Retryable => "retryable",
            Self::FatalToJob => "fatal-to-job",
            Self::FatalToProcess => "fatal-to-process",
        };
        f.write_str(s)
    }
}

/// Maps an error to its [`ErrorClass`].
pub trait Classify {
    fn class(&self) -> ErrorClass;
}
