use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use salesrank::{config::JobConf, logging, runner, Args};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_tracing(args.verbose);

    let conf = match JobConf::from_args(&args) {
        Ok(conf) => conf,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match runner::run(conf).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
