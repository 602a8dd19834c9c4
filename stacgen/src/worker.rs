//! Queue worker loop.
//!
//! One sequential consumer: pop a job, optionally stage its files, assemble
//! the item, deliver it to the output list and/or the catalog API, clean up.
//! Per-job failures are logged and the loop moves on; failures classified
//! [`ErrorClass::FatalToProcess`] stop the loop.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ConfigFile;
use crate::error::{Classify, ErrorClass};
use crate::http::AsyncHttpClient;
use crate::item::{AssemblyError, CatalogItem, ItemAssembler};
use crate::job::JobMessage;
use crate::publish::{CatalogPublisher, PublishError};
use crate::queue::{JobQueue, QueueError};
use crate::resolver::{stage_files, StagedFiles};

/// Any failure while handling one job.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl Classify for WorkerError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Assembly(e) => e.class(),
            Self::Publish(e) => e.class(),
            Self::Queue(e) => e.class(),
        }
    }
}

/// Where finished items go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Push `{collection, item}` to the output list
    pub output_list: bool,
    /// Publish to the catalog API
    pub catalog: bool,
}

/// Worker behavior derived from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOptions {
    pub delivery: Delivery,
    pub pop_timeout: Duration,
    pub download: bool,
    pub cleanup: bool,
}

impl WorkerOptions {
    pub fn from_config(config: &ConfigFile) -> Self {
        Self {
            delivery: Delivery {
                output_list: config.queue.publish,
                catalog: config.catalog.publish,
            },
            pop_timeout: config.queue.pop_timeout(),
            download: config.assets.download,
            cleanup: config.assets.cleanup,
        }
    }
}

/// Result of one [`Worker::process_next`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Nothing arrived before the pop timeout
    Idle,
    /// The item was built and delivered
    Completed {
        item_id: String,
        collection: String,
        item_url: Option<String>,
    },
    /// The job was dropped
    Failed { class: ErrorClass, message: String },
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub completed: u64,
    pub failed: u64,
}

/// Queue consumer.
pub struct Worker<C, Q> {
    assembler: ItemAssembler<C>,
    publisher: CatalogPublisher<C>,
    queue: Q,
    options: WorkerOptions,
}

impl<C: AsyncHttpClient, Q: JobQueue> Worker<C, Q> {
    pub fn new(
        assembler: ItemAssembler<C>,
        publisher: CatalogPublisher<C>,
        queue: Q,
        options: WorkerOptions,
    ) -> Self {
        Self {
            assembler,
            publisher,
            queue,
            options,
        }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Runs until `shutdown` is cancelled or a process-fatal error occurs.
    ///
    /// Shutdown is observed between pops; a job in progress always finishes.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<WorkerStats, WorkerError> {
        info!(
            output_list = self.options.delivery.output_list,
            catalog = self.options.delivery.catalog,
            download = self.options.download,
            "Worker started"
        );

        let mut stats = WorkerStats::default();
        while !shutdown.is_cancelled() {
            match self.process_next().await? {
                JobOutcome::Idle => {}
                JobOutcome::Completed { .. } => stats.completed += 1,
                JobOutcome::Failed { .. } => stats.failed += 1,
            }
        }

        info!(
            completed = stats.completed,
            failed = stats.failed,
            "Worker stopped"
        );
        Ok(stats)
    }

    /// Pops and handles at most one job.
    ///
    /// Returns `Err` only for process-fatal failures.
    pub async fn process_next(&self) -> Result<JobOutcome, WorkerError> {
        let Some(payload) = self.queue.pop(self.options.pop_timeout).await? else {
            return Ok(JobOutcome::Idle);
        };
        info!(bytes = payload.len(), "Received job");

        let job = match JobMessage::from_slice(&payload) {
            Ok(job) => job,
            Err(e) => return self.failed(WorkerError::from(e)),
        };

        let staged = if self.options.download {
            stage_files(self.assembler.client(), self.assembler.resolver(), &staging_list(&job))
                .await
        } else {
            StagedFiles::default()
        };

        let result = self.handle(&job).await;

        if self.options.cleanup && !staged.is_empty() {
            staged.cleanup().await;
        }

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => self.failed(e),
        }
    }

    async fn handle(&self, job: &JobMessage) -> Result<JobOutcome, WorkerError> {
        let item = self.assembler.assemble(job).await?;
        let collection = job.collection().to_string();

        if self.options.delivery.output_list {
            let message = output_message(&item, &collection);
            self.queue.push_result(&message).await?;
            info!(item_id = %item.id, collection = %collection, "Pushed item to output list");
        }

        let item_url = if self.options.delivery.catalog {
            Some(self.publisher.publish(&item, &collection).await?)
        } else {
            None
        };

        Ok(JobOutcome::Completed {
            item_id: item.id,
            collection,
            item_url,
        })
    }

    fn failed(&self, e: WorkerError) -> Result<JobOutcome, WorkerError> {
        let class = e.class();
        if class.is_fatal_to_process() {
            error!(error = %e, class = %class, "Fatal error, stopping worker");
            return Err(e);
        }
        warn!(error = %e, class = %class, "Job failed, dropping it");
        Ok(JobOutcome::Failed {
            class,
            message: e.to_string(),
        })
    }
}

/// Output list payload: `{"collection": ..., "item": ...}`.
pub fn output_message(item: &CatalogItem, collection: &str) -> String {
    serde_json::json!({
        "collection": collection,
        "item": item.to_document(),
    })
    .to_string()
}

/// Job files plus the metadata document, deduplicated.
fn staging_list(job: &JobMessage) -> Vec<String> {
    let mut files = job.files.clone();
    files.extend(job.metadata_url.iter().cloned());
    files.sort();
    files.dedup();
    files
}
