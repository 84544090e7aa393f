use serde::{de::DeserializeOwned, Serialize};

/// Anything that can cross a shuffle: it gets encoded into a bucket on the map
/// side and decoded again on the reduce side.
pub trait Data: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Data for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Materialized, partitioned collection. Partition `i` is processed by task `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T> {
    partitions: Vec<Vec<T>>,
}

impl<T> Dataset<T> {
    pub fn new(partitions: Vec<Vec<T>>) -> Self {
        Self { partitions }
    }

    pub fn partitions_num(&self) -> usize {
        self.partitions.len()
    }

    pub fn partitions(&self) -> &[Vec<T>] {
        &self.partitions
    }

    pub fn into_partitions(self) -> Vec<Vec<T>> {
        self.partitions
    }

    /// Total number of items across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenates the partitions in partition order.
    pub fn collect(self) -> Vec<T> {
        self.partitions.into_iter().flatten().collect()
    }
}

impl<K: Clone, V> Dataset<(K, V)> {
    /// Same partitioning, keys only.
    pub fn keys(&self) -> Dataset<K> {
        Dataset::new(
            self.partitions
                .iter()
                .map(|p| p.iter().map(|(k, _)| k.clone()).collect())
                .collect(),
        )
    }
}

pub mod shuffle_rdd;

pub mod map_partitions;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_keeps_partition_order() {
        let ds = Dataset::new(vec![vec![1, 2], vec![], vec![3]]);
        assert_eq!(ds.partitions_num(), 3);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.collect(), vec![1, 2, 3]);
    }

    #[test]
    fn keys_follow_partitioning() {
        let ds = Dataset::new(vec![vec![("a", 1)], vec![("b", 2), ("c", 3)]]);
        assert_eq!(ds.keys().into_partitions(), vec![vec!["a"], vec!["b", "c"]]);
    }
}
