use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{error::PipelineError, Args};

pub const DEFAULT_REDUCERS: usize = 2;
pub const DEFAULT_BLOCK_SIZE_KB: u64 = 128;
pub const DEFAULT_INTERMEDIATE_SUFFIX: &str = "_temp";
pub const DEFAULT_SAMPLES_PER_PARTITION: usize = 64;
pub const DEFAULT_SAMPLE_SEED: u64 = 0x5a1e_5eed;

/// How the ranking stage spreads revenue keys over its reducers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingPartitioning {
    /// One reducer sees every key.
    Single,
    /// Sampled split points, reducer `i` gets the `i`-th revenue band.
    #[default]
    Range,
    /// Hash partitioned reducers, sorted outputs merged afterwards.
    Merge,
}

impl FromStr for RankingPartitioning {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "range" => Ok(Self::Range),
            "merge" => Ok(Self::Merge),
            other => Err(format!(
                "unknown ranking partitioning {other:?}, expected single, range or merge"
            )),
        }
    }
}

impl fmt::Display for RankingPartitioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Single => "single",
            Self::Range => "range",
            Self::Merge => "merge",
        };
        f.write_str(name)
    }
}

/// Optional TOML file, e.g.
///
/// ```toml
/// ranking = "merge"
/// parallelism = 4
/// keep_intermediate = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub ranking: Option<RankingPartitioning>,
    pub parallelism: Option<usize>,
    pub samples_per_partition: Option<usize>,
    pub sample_seed: Option<u64>,
    pub intermediate_suffix: Option<String>,
    pub keep_intermediate: Option<bool>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Settings of one pipeline run. Built once before the first stage starts and
/// only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobConf {
    pub input: PathBuf,
    pub output: PathBuf,
    pub intermediate: PathBuf,
    pub reducers: usize,
    /// Upper bound for one input split, in bytes.
    pub split_size: usize,
    pub parallelism: usize,
    pub ranking: RankingPartitioning,
    pub samples_per_partition: usize,
    pub sample_seed: u64,
    pub keep_intermediate: bool,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

impl JobConf {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        Self {
            input: input.into(),
            intermediate: with_suffix(&output, DEFAULT_INTERMEDIATE_SUFFIX),
            output,
            reducers: DEFAULT_REDUCERS,
            split_size: (DEFAULT_BLOCK_SIZE_KB * 1024) as usize,
            parallelism: num_cpus::get(),
            ranking: RankingPartitioning::default(),
            samples_per_partition: DEFAULT_SAMPLES_PER_PARTITION,
            sample_seed: DEFAULT_SAMPLE_SEED,
            keep_intermediate: true,
        }
    }

    /// Defaults, then the config file (if any), then command line flags.
    pub fn from_args(args: &Args) -> Result<Self, PipelineError> {
        let file = match &args.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if args.reducers == 0 {
            return Err(PipelineError::InvalidArguments(
                "reducer count must be at least 1".to_string(),
            ));
        }
        if args.block_size_kb == 0 {
            return Err(PipelineError::InvalidArguments(
                "block size must be at least 1 kB".to_string(),
            ));
        }
        let split_size = args
            .block_size_kb
            .checked_mul(1024)
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or_else(|| {
                PipelineError::InvalidArguments(format!(
                    "block size of {} kB is too large",
                    args.block_size_kb
                ))
            })?;

        let mut conf = JobConf::new(&args.input, &args.output)
            .with_reducers(args.reducers)
            .with_split_size(split_size);

        if let Some(suffix) = file.intermediate_suffix {
            if suffix.is_empty() {
                return Err(PipelineError::InvalidArguments(
                    "intermediate_suffix must not be empty".to_string(),
                ));
            }
            conf.intermediate = with_suffix(&conf.output, &suffix);
        }
        if let Some(samples) = file.samples_per_partition {
            conf.samples_per_partition = samples.max(1);
        }
        if let Some(seed) = file.sample_seed {
            conf.sample_seed = seed;
        }
        if let Some(keep) = file.keep_intermediate {
            conf.keep_intermediate = keep;
        }
        if let Some(ranking) = args.ranking.or(file.ranking) {
            conf.ranking = ranking;
        }
        if let Some(parallelism) = args.parallelism.or(file.parallelism) {
            if parallelism == 0 {
                return Err(PipelineError::InvalidArguments(
                    "parallelism must be at least 1".to_string(),
                ));
            }
            conf.parallelism = parallelism;
        }
        Ok(conf)
    }

    pub fn with_reducers(mut self, reducers: usize) -> Self {
        self.reducers = reducers;
        self
    }

    pub fn with_split_size(mut self, bytes: usize) -> Self {
        self.split_size = bytes;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_ranking(mut self, ranking: RankingPartitioning) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = keep;
        self
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("salesrank").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_the_cli_contract() {
        let conf = JobConf::from_args(&args(&["sales.csv", "out"])).unwrap();
        assert_eq!(conf.reducers, 2);
        assert_eq!(conf.split_size, 128 * 1024);
        assert_eq!(conf.intermediate, PathBuf::from("out_temp"));
        assert_eq!(conf.ranking, RankingPartitioning::Range);
        assert!(conf.keep_intermediate);
    }

    #[test]
    fn positional_reducers_and_block_size() {
        let conf = JobConf::from_args(&args(&["in", "out", "5", "64"])).unwrap();
        assert_eq!(conf.reducers, 5);
        assert_eq!(conf.split_size, 64 * 1024);
    }

    #[test]
    fn too_few_arguments_is_rejected() {
        assert!(Args::try_parse_from(["salesrank", "only-input"]).is_err());
    }

    #[test]
    fn zero_reducers_is_invalid() {
        assert!(matches!(
            JobConf::from_args(&args(&["in", "out", "0"])),
            Err(PipelineError::InvalidArguments(_))
        ));
    }

    #[test]
    fn oversized_block_size_is_invalid() {
        let huge = u64::MAX.to_string();
        assert!(matches!(
            JobConf::from_args(&args(&["in", "out", "2", &huge])),
            Err(PipelineError::InvalidArguments(_))
        ));
    }

    #[test]
    fn file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salesrank.toml");
        std::fs::write(
            &path,
            "ranking = \"merge\"\nparallelism = 3\nintermediate_suffix = \".stage1\"\nkeep_intermediate = false\n",
        )
        .unwrap();
        let config = path.to_str().unwrap();

        let conf = JobConf::from_args(&args(&["in", "out", "--config", config])).unwrap();
        assert_eq!(conf.ranking, RankingPartitioning::Merge);
        assert_eq!(conf.parallelism, 3);
        assert_eq!(conf.intermediate, PathBuf::from("out.stage1"));
        assert!(!conf.keep_intermediate);

        let conf = JobConf::from_args(&args(&[
            "in", "out", "--config", config, "--ranking", "single", "--parallelism", "1",
        ]))
        .unwrap();
        assert_eq!(conf.ranking, RankingPartitioning::Single);
        assert_eq!(conf.parallelism, 1);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salesrank.toml");
        std::fs::write(&path, "reducerz = 4\n").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(PipelineError::ConfigParse { .. })
        ));
    }

    #[test]
    fn ranking_names_round_trip() {
        for ranking in [
            RankingPartitioning::Single,
            RankingPartitioning::Range,
            RankingPartitioning::Merge,
        ] {
            assert_eq!(ranking.to_string().parse::<RankingPartitioning>(), Ok(ranking));
        }
        assert!("hash".parse::<RankingPartitioning>().is_err());
    }
}
