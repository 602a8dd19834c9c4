//! Worker command - consume jobs from the queue until interrupted.

use tokio_util::sync::CancellationToken;
use tracing::info;

use stacgen::queue::RedisQueue;
use stacgen::worker::{Worker, WorkerOptions, WorkerStats};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the queue worker.
pub fn run(runner: CliRunner) -> Result<(), CliError> {
    runner.log_startup("worker");

    let config = runner.config();
    let options = WorkerOptions::from_config(config);

    let client = runner.http_client()?;
    let assembler = runner.assembler(client.clone())?;
    let publisher = runner.publisher(client);

    let stats = runner.runtime()?.block_on(async {
        let queue = RedisQueue::connect(&config.queue).await?;
        println!(
            "Listening on '{}' at {} (Ctrl+C to stop)",
            queue.input_list(),
            config.queue.url
        );

        let worker = Worker::new(assembler, publisher, queue, options);
        let shutdown = CancellationToken::new();
        spawn_interrupt_handler(shutdown.clone());

        let stats = worker.run(shutdown).await?;
        Ok::<_, CliError>(stats)
    })?;

    print_stats(&stats);
    Ok(())
}

/// Cancels `shutdown` on the first Ctrl+C.
fn spawn_interrupt_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current job");
            println!();
            println!("Shutting down after the current job...");
            shutdown.cancel();
        }
    });
}

fn print_stats(stats: &WorkerStats) {
    println!();
    println!("Jobs completed: {}", stats.completed);
    println!("Jobs failed:    {}", stats.failed);
}
