use std::cmp::Ordering;

use crate::core::rdd::{
    shuffle_rdd::{KeyComparator, Partitioner},
    Data,
};

/// Assigns contiguous key ranges to partitions, in comparator order.
///
/// Partition `i` holds the keys after `bounds[i - 1]` up to and including
/// `bounds[i]`, so concatenating the sorted partitions in index order gives
/// one sorted sequence.
#[derive(Clone, Debug)]
pub struct RangePartitioner<C: KeyComparator> {
    bounds: Vec<C::Key>,
    num_partitions: usize,
    comparator: C,
}

impl<C> RangePartitioner<C>
where
    C: KeyComparator,
    C::Key: Clone,
{
    /// Picks `num_partitions - 1` evenly spaced split points from `sample`.
    /// With fewer distinct samples than partitions the trailing partitions
    /// stay empty.
    pub fn from_sample(mut sample: Vec<C::Key>, num_partitions: usize, comparator: C) -> Self {
        sample.sort_by(|a, b| comparator.compare(a, b));

        let mut bounds: Vec<C::Key> = Vec::new();
        if !sample.is_empty() {
            for i in 1..num_partitions {
                let candidate = &sample[i * sample.len() / num_partitions];
                let is_new = bounds
                    .last()
                    .map_or(true, |last| comparator.compare(last, candidate) == Ordering::Less);
                if is_new {
                    bounds.push(candidate.clone());
                }
            }
        }

        Self {
            bounds,
            num_partitions: num_partitions.max(1),
            comparator,
        }
    }

    pub fn bounds(&self) -> &[C::Key] {
        &self.bounds
    }
}

impl<C> Partitioner for RangePartitioner<C>
where
    C: KeyComparator,
    C::Key: Data,
{
    type Key = C::Key;

    fn partitions_num(&self) -> usize {
        self.num_partitions
    }

    fn partition_by(&self, key: &Self::Key) -> usize {
        self.bounds
            .partition_point(|bound| self.comparator.compare(bound, key) == Ordering::Less)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::spark::comparator::DoubleDecreasing, record::Revenue};

    fn revenues(values: &[f64]) -> Vec<Revenue> {
        values.iter().copied().map(Revenue).collect()
    }

    #[test]
    fn descending_ranges() {
        let sample = revenues(&[10.0, 90.0, 50.0, 30.0, 70.0, 20.0]);
        let p = RangePartitioner::from_sample(sample, 3, DoubleDecreasing);
        assert_eq!(p.partitions_num(), 3);
        assert_eq!(p.bounds(), revenues(&[50.0, 20.0]).as_slice());

        assert_eq!(p.partition_by(&Revenue(1000.0)), 0);
        assert_eq!(p.partition_by(&Revenue(50.0)), 0);
        assert_eq!(p.partition_by(&Revenue(49.0)), 1);
        assert_eq!(p.partition_by(&Revenue(20.0)), 1);
        assert_eq!(p.partition_by(&Revenue(-5.0)), 2);
    }

    #[test]
    fn partition_index_never_increases_with_revenue() {
        let sample = revenues(&[5.0, 1.0, 8.0, 3.0, 9.0, 2.0, 7.0]);
        let p = RangePartitioner::from_sample(sample, 4, DoubleDecreasing);
        let mut last = 0;
        for v in (0..=100).rev() {
            let part = p.partition_by(&Revenue(v as f64 / 10.0));
            assert!(part >= last);
            assert!(part < 4);
            last = part;
        }
    }

    #[test]
    fn empty_sample_uses_first_partition() {
        let p = RangePartitioner::from_sample(Vec::new(), 3, DoubleDecreasing);
        assert_eq!(p.partitions_num(), 3);
        assert_eq!(p.partition_by(&Revenue(42.0)), 0);
    }

    #[test]
    fn duplicate_samples_collapse() {
        let p = RangePartitioner::from_sample(revenues(&[7.0; 10]), 4, DoubleDecreasing);
        assert_eq!(p.bounds(), revenues(&[7.0]).as_slice());
        assert_eq!(p.partition_by(&Revenue(7.0)), 0);
        assert_eq!(p.partition_by(&Revenue(6.0)), 1);
    }
}
