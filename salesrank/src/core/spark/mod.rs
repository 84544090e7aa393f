use std::{hash::Hash, ops::Add, path::Path, sync::Arc};

use tracing::debug;

use self::{
    file_writer::FileWriter, group_by::GroupByAggregator, sampler::Sampler,
    sum_by_key::SumByKeyAggregator, text_input::TextLine,
};
use super::{
    cache::{BucketId, BucketStore},
    executor::Executor,
    rdd::{
        map_partitions::{FnPtrMapper, PartitionMapper},
        shuffle_rdd::{Aggregator, KeyComparator, Partitioner, ShuffleDependency},
        Data, Dataset,
    },
};
use crate::{config::JobConf, error::StageError};

/// Local execution context shared by the stages of one run. Every operation
/// runs one task per partition on the executor and finishes all of them
/// before returning.
#[derive(Clone, Debug)]
pub struct Spark {
    conf: Arc<JobConf>,
    executor: Executor,
}

impl Spark {
    pub fn new(conf: Arc<JobConf>) -> Self {
        let executor = Executor::new(conf.parallelism);
        Self { conf, executor }
    }

    pub fn conf(&self) -> &JobConf {
        &self.conf
    }

    /// Lines of the file(s) at `path`, one partition per split.
    pub async fn read_text(&self, path: &Path) -> Result<Dataset<TextLine>, StageError> {
        let splits = text_input::read_splits(path, self.conf.split_size).await?;
        Ok(Dataset::new(splits))
    }

    pub async fn map_partitions<M: PartitionMapper>(
        &self,
        rdd: Dataset<M::In>,
        mapper: M,
    ) -> Result<Dataset<M::Out>, StageError> {
        let partitions = self
            .executor
            .run_tasks(rdd.into_partitions(), move |partition_id, partition| {
                mapper.map_partitions(partition, partition_id)
            })
            .await?;
        Ok(Dataset::new(partitions))
    }

    pub async fn map<T, U>(&self, rdd: Dataset<T>, f: fn(T) -> U) -> Result<Dataset<U>, StageError>
    where
        T: Send + 'static,
        U: Send + 'static,
    {
        self.map_partitions(rdd, FnPtrMapper(f)).await
    }

    /// Moves every pair to the reduce partition its key belongs to and folds
    /// the values of each key with `aggregator`.
    ///
    /// Map tasks bucket and pre-combine their partition and leave one encoded
    /// bucket per reducer in a [`BucketStore`]. Reduce tasks start once every
    /// map task is done.
    pub async fn shuffle<K, V, C, P, A>(
        &self,
        rdd: Dataset<(K, V)>,
        partitioner: P,
        aggregator: A,
    ) -> Result<Dataset<(K, C)>, StageError>
    where
        K: Data + Eq + Hash,
        V: Data,
        C: Data,
        P: Partitioner<Key = K>,
        A: Aggregator<Value = V, Combiner = C>,
    {
        let dependency = Arc::new(ShuffleDependency::new(partitioner, aggregator));
        let store = BucketStore::default();
        let map_tasks = rdd.partitions_num();
        let reduce_tasks = dependency.partitions_num();
        debug!(map_tasks, reduce_tasks, "shuffle started");

        {
            let dependency = dependency.clone();
            let store = store.clone();
            self.executor
                .run_tasks(rdd.into_partitions(), move |map_partition, partition| {
                    let buckets = dependency.partition_data(partition);
                    for (reduce_partition, bucket) in buckets.into_iter().enumerate() {
                        let combined = dependency.aggregate_inside_bucket(bucket);
                        store.put_encoded(
                            BucketId {
                                reduce_partition,
                                map_partition,
                            },
                            &combined,
                        )?;
                    }
                    Ok(())
                })
                .await?;
        }
        debug!(buckets = store.len(), "map side of shuffle done");

        let partitions = self
            .executor
            .run_tasks(
                (0..reduce_tasks).collect(),
                move |reduce_partition, _: usize| {
                    let buckets = (0..map_tasks)
                        .map(|map_partition| {
                            store.take_decoded::<Vec<(K, C)>>(BucketId {
                                reduce_partition,
                                map_partition,
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(dependency.aggregate_buckets(buckets))
                },
            )
            .await?;
        Ok(Dataset::new(partitions))
    }

    // (K, Add) -> (K, Add)
    pub async fn sum_by_key<K, V, P>(
        &self,
        rdd: Dataset<(K, V)>,
        partitioner: P,
    ) -> Result<Dataset<(K, V)>, StageError>
    where
        K: Data + Eq + Hash,
        V: Data + Add<Output = V> + Default,
        P: Partitioner<Key = K>,
    {
        self.shuffle(rdd, partitioner, SumByKeyAggregator::new())
            .await
    }

    // (K, V) -> (K, Vec<V>)
    pub async fn group_by<K, V, P>(
        &self,
        rdd: Dataset<(K, V)>,
        partitioner: P,
    ) -> Result<Dataset<(K, Vec<V>)>, StageError>
    where
        K: Data + Eq + Hash,
        V: Data,
        P: Partitioner<Key = K>,
    {
        self.shuffle(rdd, partitioner, GroupByAggregator::new())
            .await
    }

    /// Sorts every partition by key. Partitions are not merged.
    pub async fn sort_by_key<K, V, C>(
        &self,
        rdd: Dataset<(K, V)>,
        comparator: C,
    ) -> Result<Dataset<(K, V)>, StageError>
    where
        K: Send + 'static,
        V: Send + 'static,
        C: KeyComparator<Key = K>,
    {
        let partitions = self
            .executor
            .run_tasks(rdd.into_partitions(), move |_, mut partition: Vec<(K, V)>| {
                partition.sort_by(|a, b| comparator.compare(&a.0, &b.0));
                Ok(partition)
            })
            .await?;
        Ok(Dataset::new(partitions))
    }

    /// Merges partitions that are already sorted by `comparator` into a
    /// single sorted partition.
    pub fn merge_sorted<K, V, C>(&self, rdd: Dataset<(K, V)>, comparator: C) -> Dataset<(K, V)>
    where
        C: KeyComparator<Key = K>,
    {
        let merged = merge::merge_sorted(rdd.into_partitions(), &comparator);
        Dataset::new(vec![merged])
    }

    /// Up to `amount` items of every partition.
    pub async fn sample<T>(&self, rdd: Dataset<T>, amount: usize) -> Result<Vec<T>, StageError>
    where
        T: Send + Sync + 'static,
    {
        let sampled = self
            .map_partitions(rdd, Sampler::new(amount, self.conf.sample_seed))
            .await?;
        Ok(sampled.collect())
    }

    /// Writes one part file per partition into `dir` and returns the total
    /// number of rows written.
    pub async fn save<T>(
        &self,
        rdd: Dataset<T>,
        dir: &Path,
        encoder: fn(&T) -> Vec<String>,
    ) -> Result<usize, StageError>
    where
        T: Send + 'static,
    {
        let written = self
            .map_partitions(rdd, FileWriter::new(dir.to_path_buf(), encoder))
            .await?;
        Ok(written.collect().into_iter().sum())
    }
}

pub mod comparator;

pub mod file_writer;

pub mod group_by;

pub mod hash_partitioner;

pub mod merge;

pub mod partition_by;

pub mod sample_partitioner;

pub mod sampler;

pub mod sum_by_key;

pub mod text_input;
