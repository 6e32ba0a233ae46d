use anyhow::Result;
use clap::Parser;

use facesync::cli::SubCommandExtend;
use facesync::config::{Opts, SubCommand};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::Run(cmd) => cmd.run(&opts).await,
        SubCommand::Sweep(cmd) => cmd.run(&opts).await,
        SubCommand::Add(cmd) => cmd.run(&opts).await,
        SubCommand::List(cmd) => cmd.run(&opts).await,
    }
}
