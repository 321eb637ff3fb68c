use clap::Parser;
use env_logger::Env;
use leafsearch::cli::SubCommandExtend;
use leafsearch::config::{Opts, SubCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Extract(config) => config.run(&opts).await,
        SubCommand::Import(config) => config.run(&opts).await,
        SubCommand::Search(config) => config.run(&opts).await,
        SubCommand::Show(config) => config.run(&opts).await,
    }
}
