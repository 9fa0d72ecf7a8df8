use clap::Parser;
use marketscan::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
