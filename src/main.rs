use clap::Parser;
use investing_cache::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
