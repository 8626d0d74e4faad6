use super::config::DemoConfig;
use core::ops::Range;
use tidepool::{JobHandler, Pool};

/// Replays the walkthrough: start the initial workers, submit the first batch,
/// let it settle, add one more worker, submit the second batch, let it settle,
/// remove the first worker, and let that settle too.
///
/// Shutdown is left to the caller so that it also runs when the script is
/// interrupted.
pub async fn run<H: JobHandler>(pool: &Pool<H>, config: &DemoConfig) {
    let workers: Vec<_> = (0..config.initial_workers)
        .map(|_| pool.add_worker())
        .collect();
    tracing::info!("Started {} workers", workers.len());

    let first = 0..config.first_batch;
    let second = first.end..first.end + config.second_batch;

    submit_batch(pool, first);
    tokio::time::sleep(config.settle).await;

    let extra = pool.add_worker();
    tracing::info!("Added worker {extra}");

    submit_batch(pool, second);
    tokio::time::sleep(config.settle).await;

    if let Some(&removed) = workers.first() {
        tracing::info!("Removing worker {removed}");
        pool.remove_worker(removed);
    }
    tokio::time::sleep(config.settle).await;
}

/// Submits `Task {i}` for every `i` in `tasks`. Rejections are logged and
/// skipped. Returns how many jobs were accepted.
pub fn submit_batch<H: JobHandler>(pool: &Pool<H>, tasks: Range<usize>) -> usize {
    let mut accepted = 0;
    for i in tasks {
        match pool.send_job(format!("Task {i}")) {
            Ok(()) => accepted += 1,
            Err(e) => tracing::warn!("Failed to send job: {e}"),
        }
    }
    accepted
}
