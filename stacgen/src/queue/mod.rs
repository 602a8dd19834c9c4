//! Job queue abstraction.
//!
//! The worker pops job payloads from an input list and pushes finished items
//! to an output list. [`RedisQueue`] talks to a Redis broker;
//! [`MemoryQueue`] keeps both lists in process for tests and one-off runs.

mod memory;
mod redis;

pub use self::memory::MemoryQueue;
pub use self::redis::RedisQueue;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::error::{Classify, ErrorClass};

/// Errors raised by a queue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The broker could not be reached
    #[error("failed to connect to {url}: {message}")]
    Connection { url: String, message: String },

    /// A command failed on an established connection
    #[error("queue command {command} failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
}

impl Classify for QueueError {
    fn class(&self) -> ErrorClass {
        ErrorClass::FatalToProcess
    }
}

/// Source of job payloads and sink for results.
pub trait JobQueue: Send + Sync {
    /// Waits up to `timeout` for the next job payload.
    ///
    /// Payloads are raw bytes; decoding is the consumer's concern. Returns
    /// `Ok(None)` when nothing arrived in time.
    fn pop(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, QueueError>> + Send;

    /// Appends a result payload to the output list.
    fn push_result(&self, payload: &str) -> impl Future<Output = Result<(), QueueError>> + Send;
}
