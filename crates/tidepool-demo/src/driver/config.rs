use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use tidepool::PoolConfig;

/// Runtime configuration for the `tidepool-demo` binary.
///
/// These settings shape the scripted walkthrough: how big the job queue is,
/// how long each simulated job takes, and how many jobs and workers each phase
/// uses. All values are parsed from CLI arguments or environment variables.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tidepool-demo",
    version,
    about = "Walks a resizable worker pool through add, submit, remove, and shutdown"
)]
pub struct CliArgs {
    /// Capacity of the bounded job queue.
    ///
    /// Submissions beyond this many unprocessed jobs are rejected instead of
    /// blocking.
    ///
    /// Environment variable: `BUFFER_SIZE`
    #[arg(long, env = "BUFFER_SIZE", default_value_t = 10)]
    pub buffer_size: usize,

    /// Simulated processing time of a single job, in milliseconds.
    ///
    /// Environment variable: `JOB_LATENCY_MS`
    #[arg(long, env = "JOB_LATENCY_MS", default_value_t = 500)]
    pub job_latency_ms: u64,

    /// Number of workers started before the first batch is submitted.
    ///
    /// Environment variable: `INITIAL_WORKERS`
    #[arg(long, env = "INITIAL_WORKERS", default_value_t = 2)]
    pub initial_workers: usize,

    /// Number of jobs in the first batch.
    ///
    /// Environment variable: `FIRST_BATCH`
    #[arg(long, env = "FIRST_BATCH", default_value_t = 5)]
    pub first_batch: usize,

    /// Number of jobs in the second batch, submitted after one more worker
    /// joins.
    ///
    /// Environment variable: `SECOND_BATCH`
    #[arg(long, env = "SECOND_BATCH", default_value_t = 3)]
    pub second_batch: usize,

    /// Pause between phases, in milliseconds.
    ///
    /// Environment variable: `SETTLE_MS`
    #[arg(long, env = "SETTLE_MS", default_value_t = 2000)]
    pub settle_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub pool: PoolConfig,
    pub job_latency: Duration,
    pub initial_workers: usize,
    pub first_batch: usize,
    pub second_batch: usize,
    pub settle: Duration,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.buffer_size == 0 {
            bail!("BUFFER_SIZE must be greater than 0");
        }

        if args.initial_workers == 0 {
            bail!("INITIAL_WORKERS must be greater than 0");
        }

        Ok(Self {
            pool: PoolConfig::new(args.buffer_size)?,
            job_latency: Duration::from_millis(args.job_latency_ms),
            initial_workers: args.initial_workers,
            first_batch: args.first_batch,
            second_batch: args.second_batch,
            settle: Duration::from_millis(args.settle_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(core::iter::once("tidepool-demo").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn defaults_replay_the_original_walkthrough() -> anyhow::Result<()> {
        let config = DemoConfig::try_from(parse(&[]))?;
        assert_eq!(config.pool.buffer_size(), 10);
        assert_eq!(config.job_latency, Duration::from_millis(500));
        assert_eq!(config.initial_workers, 2);
        assert_eq!(config.first_batch, 5);
        assert_eq!(config.second_batch, 3);
        assert_eq!(config.settle, Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn flags_override_defaults() -> anyhow::Result<()> {
        let config = DemoConfig::try_from(parse(&[
            "--buffer-size",
            "4",
            "--job-latency-ms",
            "10",
            "--settle-ms",
            "50",
        ]))?;
        assert_eq!(config.pool.buffer_size(), 4);
        assert_eq!(config.job_latency, Duration::from_millis(10));
        assert_eq!(config.settle, Duration::from_millis(50));
        Ok(())
    }

    #[test]
    fn rejects_empty_queue_and_no_workers() {
        assert!(DemoConfig::try_from(parse(&["--buffer-size", "0"])).is_err());
        assert!(DemoConfig::try_from(parse(&["--initial-workers", "0"])).is_err());
    }
}
