use std::{cmp::Ordering, collections::HashMap, hash::Hash};

use super::Data;

/// Decides which reduce partition a key goes to.
pub trait Partitioner: Clone + Send + Sync + 'static {
    type Key: Data;
    fn partitions_num(&self) -> usize;
    fn partition_by(&self, key: &Self::Key) -> usize;
}

// () -> Acc
// (V, Acc) -> Acc
// (Acc, Acc) -> Acc
pub trait Aggregator: Clone + Send + Sync + 'static {
    type Value: Data;
    type Combiner: Data;

    fn create_combiner(&self) -> Self::Combiner;
    fn merge_value(&self, value: Self::Value, combiner: Self::Combiner) -> Self::Combiner;
    fn merge_combiners(
        &self,
        combiner1: Self::Combiner,
        combiner2: Self::Combiner,
    ) -> Self::Combiner;
}

/// Sort order on shuffle keys. Used for the in-partition sort and for merging
/// sorted partitions, so both agree on what "first" means.
pub trait KeyComparator: Clone + Send + Sync + 'static {
    type Key;
    fn compare(&self, a: &Self::Key, b: &Self::Key) -> Ordering;
}

/// A wide dependency: everything needed to move `(K, V)` pairs from map
/// partitions into reduce partitions of `(K, C)`.
///
/// per map partition:
/// 1. `partition_data`: Vec<(K, V)> --> Vec<Vec<(K, V)>>, one bucket per reducer
/// 2. `aggregate_inside_bucket`: Vec<(K, V)> --> Vec<(K, C)>
///
/// per reduce partition:
/// 3. `aggregate_buckets`: Vec<Vec<(K, C)>> --> Vec<(K, C)>
#[derive(Clone)]
pub struct ShuffleDependency<P, A> {
    pub partitioner: P,
    pub aggregator: A,
}

impl<K, V, C, P, A> ShuffleDependency<P, A>
where
    K: Data + Eq + Hash,
    V: Data,
    C: Data,
    P: Partitioner<Key = K>,
    A: Aggregator<Value = V, Combiner = C>,
{
    pub fn new(partitioner: P, aggregator: A) -> Self {
        Self {
            partitioner,
            aggregator,
        }
    }

    pub fn partitions_num(&self) -> usize {
        self.partitioner.partitions_num()
    }

    pub fn partition_data(&self, input_partition: Vec<(K, V)>) -> Vec<Vec<(K, V)>> {
        let mut result: Vec<Vec<(K, V)>> = (0..self.partitions_num()).map(|_| Vec::new()).collect();

        for elem in input_partition.into_iter() {
            let partition_idx = self.partitioner.partition_by(&elem.0);
            result[partition_idx].push(elem);
        }

        result
    }

    pub fn aggregate_inside_bucket(&self, bucket_data: Vec<(K, V)>) -> Vec<(K, C)> {
        let aggr = &self.aggregator;

        let mut combiners_by_keys: HashMap<K, C> = HashMap::new();
        for (k, v) in bucket_data.into_iter() {
            let combiner = combiners_by_keys
                .remove(&k)
                .unwrap_or_else(|| aggr.create_combiner());
            combiners_by_keys.insert(k, aggr.merge_value(v, combiner));
        }

        combiners_by_keys.into_iter().collect()
    }

    pub fn aggregate_buckets(&self, buckets_aggr_data: Vec<Vec<(K, C)>>) -> Vec<(K, C)> {
        let aggr = &self.aggregator;

        let mut combiners_by_keys: HashMap<K, Vec<C>> = HashMap::new();
        for bucket_combiners in buckets_aggr_data.into_iter() {
            for (k, c) in bucket_combiners.into_iter() {
                combiners_by_keys.entry(k).or_insert_with(Vec::new).push(c)
            }
        }
        combiners_by_keys
            .into_iter()
            .map(|(k, cs)| {
                (
                    k,
                    cs.into_iter().fold(aggr.create_combiner(), |acc1, acc2| {
                        aggr.merge_combiners(acc1, acc2)
                    }),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spark::{hash_partitioner::HashPartitioner, sum_by_key::SumByKeyAggregator};

    fn dependency(n: usize) -> ShuffleDependency<HashPartitioner<String>, SumByKeyAggregator<i64>> {
        ShuffleDependency::new(HashPartitioner::new(n), SumByKeyAggregator::new())
    }

    fn pairs(items: &[(&str, i64)]) -> Vec<(String, i64)> {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn same_key_lands_in_same_bucket() {
        let dep = dependency(4);
        let buckets = dep.partition_data(pairs(&[("a", 1), ("b", 1), ("a", 2), ("c", 5), ("a", 3)]));
        assert_eq!(buckets.len(), 4);
        let holding_a: Vec<_> = buckets
            .iter()
            .filter(|b| b.iter().any(|(k, _)| k == "a"))
            .collect();
        assert_eq!(holding_a.len(), 1);
        assert_eq!(holding_a[0].iter().filter(|(k, _)| k == "a").count(), 3);
    }

    #[test]
    fn combines_inside_bucket_then_across_buckets() {
        let dep = dependency(1);
        let left = dep.aggregate_inside_bucket(pairs(&[("a", 1), ("b", 10), ("a", 2)]));
        let right = dep.aggregate_inside_bucket(pairs(&[("a", 4)]));
        let mut merged = dep.aggregate_buckets(vec![left, right, Vec::new()]);
        merged.sort();
        assert_eq!(merged, pairs(&[("a", 7), ("b", 10)]));
    }
}
