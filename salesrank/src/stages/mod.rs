//! The two batch stages of the pipeline and what they have in common.

use std::{
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    core::spark::{file_writer::OutputCommitter, Spark},
    error::StageError,
};

pub mod aggregation;
pub mod ranking;

pub use aggregation::AggregationStage;
pub use ranking::RankingStage;

/// Job counters, bumped by tasks while the stage runs.
#[derive(Debug, Default)]
pub struct Counters {
    pub input_lines: AtomicU64,
    pub header_lines: AtomicU64,
    pub skipped_records: AtomicU64,
    pub map_output_records: AtomicU64,
    pub reduce_input_groups: AtomicU64,
    pub reduce_output_records: AtomicU64,
}

impl Counters {
    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            input_lines: self.input_lines.load(Ordering::Relaxed),
            header_lines: self.header_lines.load(Ordering::Relaxed),
            skipped_records: self.skipped_records.load(Ordering::Relaxed),
            map_output_records: self.map_output_records.load(Ordering::Relaxed),
            reduce_input_groups: self.reduce_input_groups.load(Ordering::Relaxed),
            reduce_output_records: self.reduce_output_records.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub input_lines: u64,
    pub header_lines: u64,
    pub skipped_records: u64,
    pub map_output_records: u64,
    pub reduce_input_groups: u64,
    pub reduce_output_records: u64,
}

/// What a finished stage reports. Also written into its `_SUCCESS` marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub map_tasks: usize,
    pub reduce_tasks: usize,
    pub counters: CounterSnapshot,
    pub elapsed_ms: u128,
}

/// One parallel pass over an input directory into an output directory.
///
/// `execute` does the work and writes part files into the committer's work
/// directory; `run` wraps it so the output is either complete or absent.
#[allow(async_fn_in_trait)]
pub trait Stage {
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        spark: &Spark,
        input: &Path,
        committer: &OutputCommitter,
    ) -> Result<StageReport, StageError>;

    async fn run(&self, spark: &Spark, input: &Path, output: &Path) -> Result<StageReport, StageError> {
        let started = Instant::now();
        info!(
            stage = self.name(),
            input = %input.display(),
            output = %output.display(),
            reducers = spark.conf().reducers,
            "stage started"
        );

        let committer = OutputCommitter::new(output);
        committer.setup().await?;

        let result = match self.execute(spark, input, &committer).await {
            Ok(mut report) => {
                report.elapsed_ms = started.elapsed().as_millis();
                committer.commit(&report).await.map(|_| report)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(report) => {
                info!(
                    stage = self.name(),
                    map_tasks = report.map_tasks,
                    reduce_tasks = report.reduce_tasks,
                    counters = ?report.counters,
                    elapsed_ms = report.elapsed_ms as u64,
                    "stage finished"
                );
                Ok(report)
            }
            Err(e) => {
                error!(stage = self.name(), error = %e, "stage failed, discarding its output");
                committer.abort().await;
                Err(e)
            }
        }
    }
}
