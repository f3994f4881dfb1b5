mod arg_parser;
mod client_cli;
mod error;

use arg_parser::{ArgParser, SubCommand};
use clap::Parser;
use client_cli::ClientCli;
use tracing_subscriber::EnvFilter;
use wire::STATUS_NONE;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = ArgParser::parse();
    let max_message_bytes = wire::mebibytes(args.buffer)
        .ok_or_else(|| format!("message size limit of {} Mb is too large", args.buffer))?;
    let client = ClientCli::new(args.server, max_message_bytes);

    match args.sub_command {
        SubCommand::Run { period, dir } => {
            client.run(&dir, period).await?;
        }
        SubCommand::Submit { dir } => {
            println!("{}", client.submit(&dir).await?);
        }
        SubCommand::Check { location } => match client.check(&location).await? {
            Some(status) => println!("{}", status),
            None => println!("{}", STATUS_NONE),
        },
        SubCommand::Retrieve { location, dir } => {
            client.retrieve(&location, &dir).await?;
        }
    }

    Ok(())
}
