use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StageError;

/// Identifies the slice of one map task's output meant for one reduce task.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Debug)]
pub struct BucketId {
    pub reduce_partition: usize,
    pub map_partition: usize,
}

/// Holds serialized shuffle buckets between the map and reduce halves of a
/// shuffle. Map tasks `put`, reduce tasks `take`; a bucket is handed out once.
#[derive(Clone, Default, Debug)]
pub struct BucketStore {
    inner: Arc<Mutex<HashMap<BucketId, Vec<u8>>>>,
}

impl BucketStore {
    fn lock(&self) -> MutexGuard<'_, HashMap<BucketId, Vec<u8>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn put(&self, id: BucketId, data: Vec<u8>) {
        self.lock().insert(id, data);
    }

    pub fn take(&self, id: BucketId) -> Option<Vec<u8>> {
        self.lock().remove(&id)
    }

    /// MessagePack-encodes `data` and stores it under `id`.
    pub fn put_encoded<T: Serialize + ?Sized>(&self, id: BucketId, data: &T) -> Result<(), StageError> {
        let bytes = rmp_serde::to_vec(data)?;
        self.put(id, bytes);
        Ok(())
    }

    pub fn take_decoded<T: DeserializeOwned>(&self, id: BucketId) -> Result<T, StageError> {
        let bytes = self.take(id).ok_or(StageError::MissingBucket {
            map_partition: id.map_partition,
            reduce_partition: id.reduce_partition,
        })?;
        Ok(rmp_serde::from_slice(&bytes)?)
    }
}
