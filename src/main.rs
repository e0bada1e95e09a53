mod cli;
mod commands;
mod formatting;
mod settings;
mod telemetry;

use std::process::ExitCode;

use commands::run_convert;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();
    telemetry::init(args.verbose);
    run_convert(args).await
}
