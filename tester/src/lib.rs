//! End-to-end cases for `salesrank`.
//!
//! A case is a directory holding `input.csv` or an `input/` directory, the
//! `expected` ranking, and optionally a `salesrank.toml`.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use salesrank::{config::JobConf, error::PipelineError, runner, Args};

pub const CONFIG_FILE: &str = "salesrank.toml";
pub const EXPECTED_FILE: &str = "expected";

pub fn case_input(case: &Path) -> PathBuf {
    let file = case.join("input.csv");
    if file.exists() {
        file
    } else {
        case.join("input")
    }
}

/// Job configuration for `case`, writing its ranking to `output`.
pub fn case_conf(case: &Path, output: &Path, reducers: usize) -> Result<JobConf, PipelineError> {
    let config = case.join(CONFIG_FILE);
    let args = Args {
        input: case_input(case),
        output: output.to_path_buf(),
        reducers,
        block_size_kb: 1,
        config: config.exists().then_some(config),
        ranking: None,
        parallelism: None,
        verbose: 0,
    };
    JobConf::from_args(&args)
}

/// Part files of a ranking directory, concatenated in part order.
pub fn read_ranking(dir: &Path) -> io::Result<String> {
    let mut parts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_part = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with("part-r-"));
        if is_part {
            parts.push(path);
        }
    }
    parts.sort();

    let mut ranking = String::new();
    for part in parts {
        ranking.push_str(&fs::read_to_string(part)?);
    }
    Ok(ranking)
}

pub fn run_case(case: &Path, output: &Path, reducers: usize) -> Result<String, PipelineError> {
    let conf = case_conf(case, output, reducers)?;
    tokio_test::block_on(runner::run(conf))?;
    read_ranking(output).map_err(|e| {
        PipelineError::InvalidArguments(format!("couldn't read {}: {e}", output.display()))
    })
}
