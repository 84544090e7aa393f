//! Stage 1: transaction lines in, one `category  revenue  quantity` row per
//! category out.

use std::{path::Path, sync::Arc};

use tracing::debug;

use super::{Counters, Stage, StageReport};
use crate::{
    core::{
        rdd::map_partitions::PartitionMapper,
        spark::{file_writer::OutputCommitter, hash_partitioner::HashPartitioner, text_input::TextLine, Spark},
    },
    error::StageError,
    record::{parse_line, CategoryTotal, ParsedLine, RevenueQuantity},
};

/// Parses a split and emits `(category, revenue/quantity)` per transaction.
/// The first malformed line fails the task.
pub struct ParseTransactions {
    counters: Arc<Counters>,
}

impl ParseTransactions {
    pub fn new(counters: Arc<Counters>) -> Self {
        Self { counters }
    }
}

impl PartitionMapper for ParseTransactions {
    type In = TextLine;
    type Out = (String, RevenueQuantity);

    fn map_partitions(&self, v: Vec<Self::In>, partition_id: usize) -> Result<Vec<Self::Out>, StageError> {
        Counters::add(&self.counters.input_lines, v.len());
        let mut out = Vec::with_capacity(v.len());
        let mut headers = 0;
        for line in v {
            match parse_line(&line.text) {
                Ok(ParsedLine::Header) => headers += 1,
                Ok(ParsedLine::Record(record)) => {
                    let value = RevenueQuantity::from(&record);
                    out.push((record.category, value));
                }
                Err(e) => return Err(StageError::malformed(line.location(), e)),
            }
        }
        debug!(partition_id, records = out.len(), headers, "split parsed");
        Counters::add(&self.counters.header_lines, headers);
        Counters::add(&self.counters.map_output_records, out.len());
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationStage;

impl Stage for AggregationStage {
    fn name(&self) -> &'static str {
        "aggregation"
    }

    async fn execute(
        &self,
        spark: &Spark,
        input: &Path,
        committer: &OutputCommitter,
    ) -> Result<StageReport, StageError> {
        let reducers = spark.conf().reducers;
        let counters = Arc::new(Counters::default());

        let lines = spark.read_text(input).await?;
        let map_tasks = lines.partitions_num();

        let pairs = spark
            .map_partitions(lines, ParseTransactions::new(counters.clone()))
            .await?;
        let summed = spark.sum_by_key(pairs, HashPartitioner::new(reducers)).await?;
        Counters::add(&counters.reduce_input_groups, summed.len());

        let totals = spark
            .map(summed, |(category, sums)| CategoryTotal::new(category, sums))
            .await?;
        let written = spark
            .save(totals, &committer.work_dir(), |total: &CategoryTotal| {
                total.to_fields().to_vec()
            })
            .await?;
        Counters::add(&counters.reduce_output_records, written);

        Ok(StageReport {
            stage: self.name().to_string(),
            map_tasks,
            reduce_tasks: reducers,
            counters: counters.snapshot(),
            elapsed_ms: 0,
        })
    }
}
