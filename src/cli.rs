use clap::{Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Parser, Debug)]
#[command(name = "apsgate")]
#[command(about = "Gateway for design model storage and translation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP gateway
    Server(ServerArgs),
    /// Encode or decode object URNs
    #[command(subcommand)]
    Urn(UrnCommand),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (defaults to `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Serve from the in-memory platform instead of the live API
    #[arg(long)]
    pub offline: bool,
}

#[derive(Subcommand, Debug)]
pub enum UrnCommand {
    /// Print the URN for an object key
    Encode {
        key: String,
        /// Encode the full object id in this bucket instead of the bare key
        #[arg(long)]
        bucket: Option<String>,
    },
    /// Print the identifier a URN was produced from
    Decode { urn: String },
}
