use std::marker::PhantomData;

use crate::core::rdd::{shuffle_rdd::Partitioner, Data};

/// Sends every key to partition 0.
#[derive(Clone, Debug)]
pub struct SinglePartitioner<T> {
    _value: PhantomData<T>,
}

impl<T> Default for SinglePartitioner<T> {
    fn default() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<T: Data> Partitioner for SinglePartitioner<T> {
    type Key = T;

    fn partitions_num(&self) -> usize {
        1
    }

    fn partition_by(&self, _key: &Self::Key) -> usize {
        0
    }
}
