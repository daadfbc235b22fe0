mod cli;

use apsgate::config::Config;
use apsgate::observability::init_tracing;
use apsgate::urn::{self, ObjectId};
use clap::Parser;
use cli::{Cli, Commands, UrnCommand};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let config = Config::load().map_err(|e| format!("Failed to load config: {}", e))?;
            let address = args.address.unwrap_or(config.server.bind_addr);
            apsgate::api::run(config, address, args.offline).await?
        }
        Commands::Urn(UrnCommand::Encode { key, bucket }) => {
            let encoded = match bucket {
                Some(bucket) => ObjectId::new(bucket, key).to_urn(),
                None => urn::encode(&key),
            };
            println!("{encoded}");
        }
        Commands::Urn(UrnCommand::Decode { urn }) => {
            println!("{}", urn::decode(&urn)?);
        }
    }

    Ok(())
}
