use std::{
    fmt,
    num::{ParseFloatError, ParseIntError},
    path::PathBuf,
};

use thiserror::Error;

/// A data row that does not have the shape the stage expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid price {value:?}: {source}")]
    Price {
        value: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("invalid quantity {value:?}: {source}")]
    Quantity {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid total revenue {value:?}: {source}")]
    Revenue {
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Where a record was read from. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    pub path: PathBuf,
    pub line: usize,
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// Everything that can make a stage fail. Any of these aborts the whole stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("malformed record at {location}: {source}")]
    Malformed {
        location: RecordLocation,
        #[source]
        source: MalformedRecordError,
    },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },

    #[error("couldn't encode shuffle bucket: {0}")]
    BucketEncode(#[from] rmp_serde::encode::Error),

    #[error("couldn't decode shuffle bucket: {0}")]
    BucketDecode(#[from] rmp_serde::decode::Error),

    #[error("shuffle bucket for reduce partition {reduce_partition} from map task {map_partition} is missing")]
    MissingBucket {
        map_partition: usize,
        reduce_partition: usize,
    },

    #[error("couldn't write output rows: {0}")]
    Csv(#[from] csv::Error),

    #[error("couldn't encode stage report: {0}")]
    Report(#[from] serde_json::Error),

    #[error("worker crashed: {0}")]
    WorkerCrashed(String),

    #[error("task cancelled after another task of the stage failed")]
    Cancelled,

    #[error("output directory {} already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("input path {} does not exist", .0.display())]
    MissingInput(PathBuf),

    #[error("input {} has no _SUCCESS marker, the previous stage did not complete", .0.display())]
    IncompleteInput(PathBuf),
}

impl StageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StageError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(location: RecordLocation, source: MalformedRecordError) -> Self {
        StageError::Malformed { location, source }
    }
}

/// Errors surfaced by the pipeline driver.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("couldn't read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },
}
