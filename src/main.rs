mod archive;
mod cli;
mod commands;
mod env_loader;
mod error;
mod logging;
mod slack;

use std::process::ExitCode;

fn main() -> ExitCode {
    env_loader::load_dotenv();

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
