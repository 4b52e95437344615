use clap::Parser;
use sagemaker_ci_cd::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Settings => cli::pipeline::settings().await,
        Command::Fit(args) => cli::pipeline::fit(args).await,
        Command::Deploy(args) => cli::pipeline::deploy(args).await,
        Command::Run(args) => cli::pipeline::run(args).await,
        Command::Serve => cli::serve::run().await,
    }
}
