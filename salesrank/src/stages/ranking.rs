//! Stage 2: category totals in, the same totals ordered by revenue (highest
//! first) out.

use std::{path::Path, sync::Arc};

use tracing::{debug, info, warn};

use super::{Counters, Stage, StageReport};
use crate::{
    config::RankingPartitioning,
    core::{
        rdd::{
            map_partitions::{FnPtrPartitionMapper, PartitionMapper},
            shuffle_rdd::Partitioner,
            Dataset,
        },
        spark::{
            comparator::DoubleDecreasing, file_writer::OutputCommitter,
            hash_partitioner::HashPartitioner, partition_by::SinglePartitioner,
            sample_partitioner::RangePartitioner, text_input::TextLine, Spark,
        },
    },
    error::StageError,
    record::{CategoryTotal, RankPayload, RankedRow, Revenue},
};

/// Re-keys intermediate rows by revenue. Rows without exactly three fields
/// are skipped and counted.
pub struct ParseTotals {
    counters: Arc<Counters>,
}

impl ParseTotals {
    pub fn new(counters: Arc<Counters>) -> Self {
        Self { counters }
    }
}

impl PartitionMapper for ParseTotals {
    type In = TextLine;
    type Out = (Revenue, RankPayload);

    fn map_partitions(&self, v: Vec<Self::In>, _partition_id: usize) -> Result<Vec<Self::Out>, StageError> {
        Counters::add(&self.counters.input_lines, v.len());
        let mut out = Vec::with_capacity(v.len());
        let mut skipped = 0;
        for line in v {
            match CategoryTotal::from_fields(line.text.split('\t')) {
                Ok(Some(total)) => out.push((
                    Revenue(total.total_revenue),
                    RankPayload {
                        category: total.category,
                        quantity: total.total_quantity,
                    },
                )),
                Ok(None) => {
                    warn!(location = %line.location(), "skipping row without 3 fields");
                    skipped += 1;
                }
                Err(e) => return Err(StageError::malformed(line.location(), e)),
            }
        }
        Counters::add(&self.counters.skipped_records, skipped);
        Counters::add(&self.counters.map_output_records, out.len());
        Ok(out)
    }
}

// Within one revenue the categories are emitted in name order.
fn emit_rows(
    v: Vec<(Revenue, Vec<RankPayload>)>,
    _partition_id: usize,
) -> Result<Vec<RankedRow>, StageError> {
    let mut rows = Vec::new();
    for (revenue, mut payloads) in v {
        payloads.sort_by(|a, b| a.category.cmp(&b.category));
        rows.extend(payloads.into_iter().map(|p| RankedRow {
            category: p.category,
            total_revenue: revenue.0,
            total_quantity: p.quantity,
        }));
    }
    Ok(rows)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RankingStage;

impl RankingStage {
    async fn group_and_sort<P>(
        spark: &Spark,
        keyed: Dataset<(Revenue, RankPayload)>,
        partitioner: P,
    ) -> Result<Dataset<(Revenue, Vec<RankPayload>)>, StageError>
    where
        P: Partitioner<Key = Revenue>,
    {
        let grouped = spark.group_by(keyed, partitioner).await?;
        spark.sort_by_key(grouped, DoubleDecreasing).await
    }
}

impl Stage for RankingStage {
    fn name(&self) -> &'static str {
        "ranking"
    }

    async fn execute(
        &self,
        spark: &Spark,
        input: &Path,
        committer: &OutputCommitter,
    ) -> Result<StageReport, StageError> {
        if !OutputCommitter::is_committed(input).await {
            return Err(StageError::IncompleteInput(input.to_path_buf()));
        }

        let conf = spark.conf();
        let counters = Arc::new(Counters::default());

        let lines = spark.read_text(input).await?;
        let map_tasks = lines.partitions_num();
        let keyed = spark
            .map_partitions(lines, ParseTotals::new(counters.clone()))
            .await?;

        let (sorted, reduce_tasks) = match conf.ranking {
            RankingPartitioning::Single => {
                let sorted =
                    Self::group_and_sort(spark, keyed, SinglePartitioner::default()).await?;
                (sorted, 1)
            }
            RankingPartitioning::Range => {
                let sample = spark
                    .sample(keyed.keys(), conf.samples_per_partition)
                    .await?;
                let partitioner =
                    RangePartitioner::from_sample(sample, conf.reducers, DoubleDecreasing);
                debug!(bounds = ?partitioner.bounds(), "range split points chosen");
                let sorted = Self::group_and_sort(spark, keyed, partitioner).await?;
                (sorted, conf.reducers)
            }
            RankingPartitioning::Merge => {
                let sorted =
                    Self::group_and_sort(spark, keyed, HashPartitioner::new(conf.reducers))
                        .await?;
                info!(parts = sorted.partitions_num(), "merging sorted partitions");
                (spark.merge_sorted(sorted, DoubleDecreasing), conf.reducers)
            }
        };
        Counters::add(&counters.reduce_input_groups, sorted.len());

        let rows = spark
            .map_partitions(sorted, FnPtrPartitionMapper(emit_rows))
            .await?;
        let written = spark
            .save(rows, &committer.work_dir(), |row: &RankedRow| {
                row.to_fields().to_vec()
            })
            .await?;
        Counters::add(&counters.reduce_output_records, written);

        Ok(StageReport {
            stage: self.name().to_string(),
            map_tasks,
            reduce_tasks,
            counters: counters.snapshot(),
            elapsed_ms: 0,
        })
    }
}
