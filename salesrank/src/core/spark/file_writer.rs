use std::path::{Path, PathBuf};

use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{core::rdd::map_partitions::PartitionMapper, error::StageError};

pub const TEMPORARY_DIR: &str = "_temporary";
pub const SUCCESS_MARKER: &str = "_SUCCESS";

pub fn part_file_name(partition_id: usize) -> String {
    format!("part-r-{partition_id:05}")
}

/// Writes each partition as one tab separated part file inside `dir`.
/// Yields the number of rows written per partition.
#[derive(Clone)]
pub struct FileWriter<T> {
    dir: PathBuf,
    encoder: fn(&T) -> Vec<String>,
}

impl<T> FileWriter<T> {
    pub fn new(dir: PathBuf, encoder: fn(&T) -> Vec<String>) -> Self {
        Self { dir, encoder }
    }
}

impl<T> PartitionMapper for FileWriter<T>
where
    T: Send + 'static,
{
    type In = T;
    type Out = usize;

    fn map_partitions(&self, v: Vec<Self::In>, partition_id: usize) -> Result<Vec<Self::Out>, StageError> {
        let path = self.dir.join(part_file_name(partition_id));
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_path(&path)?;
        for row in v.iter() {
            writer.write_record((self.encoder)(row))?;
        }
        writer.flush().map_err(|e| StageError::io(&path, e))?;
        debug!(path = %path.display(), rows = v.len(), "part file written");
        Ok(vec![v.len()])
    }
}

/// Makes a stage's output directory appear all at once.
///
/// Part files go to `<dir>/_temporary` first; `commit` moves them up and
/// drops a `_SUCCESS` marker, `abort` removes the whole directory.
#[derive(Debug, Clone)]
pub struct OutputCommitter {
    dir: PathBuf,
}

impl OutputCommitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn work_dir(&self) -> PathBuf {
        self.dir.join(TEMPORARY_DIR)
    }

    pub async fn setup(&self) -> Result<(), StageError> {
        if tokio::fs::try_exists(&self.dir)
            .await
            .map_err(|e| StageError::io(&self.dir, e))?
        {
            return Err(StageError::OutputExists(self.dir.clone()));
        }
        let work_dir = self.work_dir();
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|e| StageError::io(&work_dir, e))
    }

    pub async fn commit<R: Serialize>(&self, report: &R) -> Result<(), StageError> {
        let work_dir = self.work_dir();
        let mut entries = tokio::fs::read_dir(&work_dir)
            .await
            .map_err(|e| StageError::io(&work_dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StageError::io(&work_dir, e))?
        {
            let target = self.dir.join(entry.file_name());
            tokio::fs::rename(entry.path(), &target)
                .await
                .map_err(|e| StageError::io(&target, e))?;
        }
        tokio::fs::remove_dir(&work_dir)
            .await
            .map_err(|e| StageError::io(&work_dir, e))?;

        let marker = self.dir.join(SUCCESS_MARKER);
        let json = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&marker, json)
            .await
            .map_err(|e| StageError::io(&marker, e))
    }

    /// Best effort: a failure to clean up is logged, the stage error is what
    /// gets reported.
    pub async fn abort(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), error = %e, "couldn't remove partial output");
            }
        }
    }

    /// Whether `dir` was fully committed by a previous stage.
    pub async fn is_committed(dir: &Path) -> bool {
        tokio::fs::try_exists(dir.join(SUCCESS_MARKER))
            .await
            .unwrap_or(false)
    }
}
