use crate::{core::rdd::map_partitions::PartitionMapper, error::StageError};
use rand::{rngs::StdRng, seq::IteratorRandom, SeedableRng};
use std::marker::PhantomData;

/// Picks up to `amount` items from every partition. Seeded per partition so
/// the same input always yields the same sample.
#[derive(Clone, Debug)]
pub struct Sampler<T> {
    amount: usize,
    seed: u64,
    _value: PhantomData<T>,
}

impl<T> Sampler<T> {
    pub fn new(amount: usize, seed: u64) -> Self {
        Self {
            amount,
            seed,
            _value: PhantomData,
        }
    }
}

impl<T> PartitionMapper for Sampler<T>
where
    T: Send + Sync + 'static,
{
    type In = T;

    type Out = T;

    fn map_partitions(&self, v: Vec<Self::In>, partition_id: usize) -> Result<Vec<Self::Out>, StageError> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(partition_id as u64));
        Ok(v.into_iter().choose_multiple(&mut rng, self.amount))
    }
}
