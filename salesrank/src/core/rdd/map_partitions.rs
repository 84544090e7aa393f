use crate::error::StageError;

/// Per-partition work. Runs once for every partition of a dataset, possibly in
/// parallel with the other partitions; an `Err` fails the whole stage.
pub trait PartitionMapper: Send + Sync + 'static {
    type In: Send + 'static;
    type Out: Send + 'static;

    fn map_partitions(
        &self,
        v: Vec<Self::In>,
        partition_id: usize,
    ) -> Result<Vec<Self::Out>, StageError>;
}

#[derive(Clone, Copy)]
pub struct FnPtrPartitionMapper<T, U>(pub fn(Vec<T>, usize) -> Result<Vec<U>, StageError>);

impl<T, U> PartitionMapper for FnPtrPartitionMapper<T, U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    type In = T;

    type Out = U;

    fn map_partitions(&self, v: Vec<Self::In>, partition_id: usize) -> Result<Vec<Self::Out>, StageError> {
        self.0(v, partition_id)
    }
}

/// Item by item mapping, partition boundaries are kept.
#[derive(Clone, Copy)]
pub struct FnPtrMapper<T, U>(pub fn(T) -> U);

impl<T, U> PartitionMapper for FnPtrMapper<T, U>
where
    T: Send + 'static,
    U: Send + 'static,
{
    type In = T;

    type Out = U;

    fn map_partitions(&self, v: Vec<Self::In>, _partition_id: usize) -> Result<Vec<Self::Out>, StageError> {
        Ok(v.into_iter().map(self.0).collect())
    }
}
