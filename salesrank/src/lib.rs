#![allow(clippy::type_complexity)]

use std::path::PathBuf;

use clap::Parser;

use crate::config::RankingPartitioning;

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod record;
pub mod runner;
pub mod stages;

/// Command line of the `salesrank` binary. Can also be built by hand and
/// handed to [`config::JobConf::from_args`].
#[derive(Parser, Debug, Clone)]
#[clap(about = "Ranks product categories by total revenue")]
pub struct Args {
    /// Sales log: a CSV file or a directory of them
    #[clap(value_name = "INPUT", parse(from_os_str))]
    pub input: PathBuf,

    /// Output directory for the ranking; the intermediate totals go next to it
    #[clap(value_name = "OUTPUT", parse(from_os_str))]
    pub output: PathBuf,

    /// Reduce tasks per stage
    #[clap(value_name = "REDUCERS", default_value_t = config::DEFAULT_REDUCERS)]
    pub reducers: usize,

    /// Maximum input split size in kB
    #[clap(value_name = "BLOCK_SIZE_KB", default_value_t = config::DEFAULT_BLOCK_SIZE_KB)]
    pub block_size_kb: u64,

    /// TOML file with extra settings
    #[clap(long, value_name = "FILE", parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// How the ranking stage partitions revenues: single, range or merge
    #[clap(long, takes_value = true)]
    pub ranking: Option<RankingPartitioning>,

    /// Tasks running at the same time (defaults to the number of CPUs)
    #[clap(long, takes_value = true)]
    pub parallelism: Option<usize>,

    /// More logging, repeat for even more
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: u64,
}
