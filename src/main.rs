use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use sar_fetch::{cl, pipeline};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = cl::Args::parse();

    simple_logger::init_with_level(args.verbosity).context("Failed to setup logger")?;

    let acquisition = args.resolve()?;
    let summary = pipeline::run(&acquisition).await?;

    println!("{}", summary.render());

    Ok(ExitCode::from(summary.exit_code()))
}
