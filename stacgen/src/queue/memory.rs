//! In-process queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use super::{JobQueue, QueueError};

#[derive(Debug, Default)]
struct Lists {
    input: VecDeque<Vec<u8>>,
    output: Vec<String>,
}

/// Queue holding both lists in memory. Clones share the same lists.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    lists: Arc<Mutex<Lists>>,
    arrived: Arc<Notify>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a job payload to the input list.
    pub fn push_job(&self, payload: impl Into<String>) {
        self.push_bytes(payload.into().into_bytes());
    }

    /// Appends a payload without requiring it to be text.
    pub fn push_bytes(&self, payload: Vec<u8>) {
        if let Ok(mut lists) = self.lists.lock() {
            lists.input.push_back(payload);
        }
        self.arrived.notify_one();
    }

    /// Result payloads pushed so far.
    pub fn results(&self) -> Vec<String> {
        self.lists
            .lock()
            .map(|lists| lists.output.clone())
            .unwrap_or_default()
    }

    /// Job payloads not yet popped.
    pub fn pending(&self) -> usize {
        self.lists.lock().map(|lists| lists.input.len()).unwrap_or(0)
    }

    fn try_pop(&self) -> Result<Option<Vec<u8>>, QueueError> {
        let mut lists = self.lists.lock().map_err(|_| poisoned("pop"))?;
        Ok(lists.input.pop_front())
    }
}

fn poisoned(command: &'static str) -> QueueError {
    QueueError::Command {
        command,
        message: "queue lock poisoned".to_string(),
    }
}

impl JobQueue for MemoryQueue {
    async fn pop(&self, timeout: Duration) -> Result<Option<Vec<u8>>, QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(job) = self.try_pop()? {
                return Ok(Some(job));
            }
            if tokio::time::timeout_at(deadline, self.arrived.notified())
                .await
                .is_err()
            {
                return self.try_pop();
            }
        }
    }

    async fn push_result(&self, payload: &str) -> Result<(), QueueError> {
        let mut lists = self.lists.lock().map_err(|_| poisoned("push"))?;
        lists.output.push(payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MemoryQueue::new();
        queue.push_job("a");
        queue.push_job("b");

        let timeout = Duration::from_millis(10);
        assert_eq!(queue.pop(timeout).await.unwrap().as_deref(), Some(&b"a"[..]));
        assert_eq!(queue.pop(timeout).await.unwrap().as_deref(), Some(&b"b"[..]));
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_times_out() {
        let queue = MemoryQueue::new();
        assert_eq!(queue.pop(Duration::from_secs(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = MemoryQueue::new();
        let producer = queue.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.push_job("late");
        });

        let job = queue.pop(Duration::from_secs(5)).await.unwrap();
        assert_eq!(job.as_deref(), Some(&b"late"[..]));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_binary_payloads_pass_through() {
        let queue = MemoryQueue::new();
        queue.push_bytes(vec![0xff, 0xfe]);
        let job = queue.pop(Duration::from_millis(10)).await.unwrap();
        assert_eq!(job, Some(vec![0xff, 0xfe]));
    }

    #[tokio::test]
    async fn test_results_are_recorded() {
        let queue = MemoryQueue::new();
        queue.push_result("{\"collection\":\"c\"}").await.unwrap();
        assert_eq!(queue.results(), vec!["{\"collection\":\"c\"}"]);
    }
}
