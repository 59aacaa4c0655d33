use std::process::ExitCode;

use clap::Parser;

use pairpad::cli::{self, CliArgs};
use pairpad::logger;

fn main() -> ExitCode {
    logger::init();
    let args = CliArgs::parse();
    cli::run(args)
}
