use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use pretty_assertions::Comparison;
use tester::{run_case, EXPECTED_FILE};

#[derive(Parser, Debug)]
#[clap(about = "Runs a salesrank fixture and compares the ranking")]
struct Args {
    #[clap(short, long, parse(from_os_str), default_value = "./fixtures/electronics_toys")]
    case_path: PathBuf,

    #[clap(short, long, parse(from_os_str), default_value = "./target/tester/ranking")]
    output_path: PathBuf,

    #[clap(short, long, default_value_t = 2)]
    reducers: usize,
}

fn main() -> ExitCode {
    let args = Args::parse();
    salesrank::logging::init_tracing(0);

    let ranking = match run_case(&args.case_path, &args.output_path, args.reducers) {
        Ok(ranking) => ranking,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let expected = match fs::read_to_string(args.case_path.join(EXPECTED_FILE)) {
        Ok(expected) => expected,
        Err(e) => {
            eprintln!("couldn't read expected ranking: {e}");
            return ExitCode::FAILURE;
        }
    };

    if ranking == expected {
        println!("{}: ok", args.case_path.display());
        ExitCode::SUCCESS
    } else {
        println!("{}", Comparison::new(&ranking, &expected));
        ExitCode::FAILURE
    }
}
