//! Generate command - build one item from a job file and print it.
//!
//! This is the request/response path: the same assembly the worker runs,
//! without a queue. Nothing is printed unless the whole job succeeds.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use stacgen::job::JobMessage;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the generate command.
pub struct GenerateArgs {
    pub job: PathBuf,
    pub collection: Option<String>,
    pub publish: bool,
}

/// Run the generate command.
pub fn run(runner: CliRunner, args: GenerateArgs) -> Result<(), CliError> {
    runner.log_startup("generate");

    let job = read_job(&args.job, args.collection)?;
    let client = runner.http_client()?;
    let assembler = runner.assembler(client.clone())?;
    let publisher = runner.publisher(client);

    let document = runner.runtime()?.block_on(async {
        let item = assembler.assemble(&job).await?;
        info!(item_id = %item.id, assets = item.assets.len(), "Item assembled");

        let mut document = item.to_document();
        if args.publish {
            let collection = job.collection();
            let item_url = publisher.publish(&item, collection).await?;
            eprintln!("Published to {}", item_url);
            if let Value::Object(map) = &mut document {
                map.insert("collection".to_string(), Value::from(collection));
            }
        }
        Ok::<_, CliError>(document)
    })?;

    println!("{}", pretty(&document));
    Ok(())
}

/// Reads and validates the job file, applying the collection override.
fn read_job(path: &Path, collection: Option<String>) -> Result<JobMessage, CliError> {
    let text = std::fs::read_to_string(path).map_err(|error| CliError::FileRead {
        path: path.to_path_buf(),
        error,
    })?;

    let mut job = JobMessage::from_json(&text)?;
    if collection.is_some() {
        job.collection = collection;
    }
    Ok(job)
}

fn pretty(document: &Value) -> String {
    serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_job_applies_collection_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, r#"{"files": ["a.tif"], "collection": "old"}"#).unwrap();

        let job = read_job(&path, Some("new".to_string())).unwrap();
        assert_eq!(job.collection(), "new");

        let job = read_job(&path, None).unwrap();
        assert_eq!(job.collection(), "old");
    }

    #[test]
    fn test_read_job_missing_file() {
        let err = read_job(Path::new("/nonexistent/job.json"), None).unwrap_err();
        assert!(matches!(err, CliError::FileRead { .. }));
    }

    #[test]
    fn test_read_job_rejects_invalid_job() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, r#"{"files": [], "provider": "maxar"}"#).unwrap();

        let err = read_job(&path, None).unwrap_err();
        assert!(matches!(err, CliError::Assembly(_)));
    }
}
