use std::{path::Path, sync::Arc, time::Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::JobConf,
    core::spark::Spark,
    error::PipelineError,
    stages::{AggregationStage, RankingStage, Stage, StageReport},
};

/// Reports of both stages of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub aggregation: StageReport,
    pub ranking: StageReport,
    pub elapsed_ms: u128,
}

fn as_secs(elapsed_ms: u128) -> f64 {
    elapsed_ms as f64 / 1000.0
}

async fn run_stage<S: Stage>(
    stage: &S,
    spark: &Spark,
    input: &Path,
    output: &Path,
) -> Result<StageReport, PipelineError> {
    stage
        .run(spark, input, output)
        .await
        .map_err(|source| PipelineError::Stage {
            stage: stage.name(),
            source,
        })
}

/// Runs aggregation into the intermediate directory, then ranking into the
/// output directory. Ranking only starts once aggregation has committed.
pub async fn run(conf: JobConf) -> Result<PipelineReport, PipelineError> {
    let started = Instant::now();
    let conf = Arc::new(conf);
    let spark = Spark::new(conf.clone());
    info!(
        input = %conf.input.display(),
        output = %conf.output.display(),
        reducers = conf.reducers,
        split_size = conf.split_size,
        parallelism = conf.parallelism,
        ranking = %conf.ranking,
        "job configured"
    );

    info!("Aggregation phase started");
    let aggregation = run_stage(&AggregationStage, &spark, &conf.input, &conf.intermediate).await?;

    info!("Sorting phase started");
    let ranking = run_stage(&RankingStage, &spark, &conf.intermediate, &conf.output).await?;

    if !conf.keep_intermediate {
        if let Err(e) = tokio::fs::remove_dir_all(&conf.intermediate).await {
            warn!(dir = %conf.intermediate.display(), error = %e, "couldn't remove intermediate output");
        }
    }

    let elapsed_ms = started.elapsed().as_millis();
    info!("Execution completed");
    info!("Total time: {} ms ({} sec)", elapsed_ms, as_secs(elapsed_ms));
    Ok(PipelineReport {
        aggregation,
        ranking,
        elapsed_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_keep_the_fraction() {
        assert_eq!(as_secs(250), 0.25);
        assert_eq!(as_secs(1500), 1.5);
        assert_eq!(as_secs(0), 0.0);
    }
}
