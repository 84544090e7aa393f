use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use crate::core::rdd::{shuffle_rdd::Partitioner, Data};

/// `hash(key) mod num_partitions`. `DefaultHasher::new()` is keyed with
/// zeros, so a key gets the same partition on every run.
#[derive(Clone, Debug)]
pub struct HashPartitioner<T> {
    num_partitions: usize,
    _value: PhantomData<T>,
}

impl<T> HashPartitioner<T> {
    pub fn new(num_partitions: usize) -> Self {
        Self {
            num_partitions,
            _value: PhantomData,
        }
    }
}

impl<T: Data + Hash> Partitioner for HashPartitioner<T> {
    type Key = T;

    fn partitions_num(&self) -> usize {
        self.num_partitions
    }

    fn partition_by(&self, key: &Self::Key) -> usize {
        let mut s = DefaultHasher::new();
        key.hash(&mut s);
        (s.finish() % self.num_partitions as u64) as usize
    }
}
