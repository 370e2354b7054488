use actix_web::{web, App, HttpServer};
use clap::{Parser, Subcommand};
use eyre::WrapErr;
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use stake_node::{
    accounts::AccountManager,
    api,
    config::Config,
    init::{self, InitArgs},
    rpc::HttpConsensusClient,
    services::RpcServices,
};

#[derive(Parser, Debug)]
#[command(name = "stake-node", about = "Node setup and staking JSON-RPC gateway")]
struct Cli {
    /// Node home directory
    #[arg(long, global = true, env = "STAKE_NODE_HOME")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize the node home: validator key, genesis files, keystore
    Init(InitArgs),
    /// Serve the JSON-RPC API
    Serve,
}

/// Application entry point
///
/// Sets up logging, loads configuration and runs the chosen subcommand.
#[actix_web::main] // Actix will build a multithreaded runtime
async fn main() -> eyre::Result<()> {
    // Info level for our crate, lower levels for dependencies to reduce noise
    let filter = EnvFilter::from_default_env()
        .add_directive("stake_node=info".parse()?)
        .add_directive("actix_web=error".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.home).wrap_err("Failed to load config")?;

    match cli.command {
        Command::Init(args) => init::run(&config, &args),
        Command::Serve => serve(config).await,
    }
}

/// Connect to the consensus node and start the HTTP server
async fn serve(config: Config) -> eyre::Result<()> {
    let client = HttpConsensusClient::connect(&config.consensus_rpc_url)
        .await
        .wrap_err("Failed to connect to consensus node")?;
    let accounts = Arc::new(AccountManager::new(config.keystore_dir()));
    let services = Arc::new(RpcServices::new(Arc::new(client), accounts, &config));

    info!(address = %config.bind_address(), "Starting JSON-RPC server");
    HttpServer::new(move || {
        App::new()
            // Add logging middleware
            .wrap(TracingLogger::default())
            // Services are shared between requests
            .app_data(web::Data::new(services.clone()))
            .configure(api::configure)
    })
    // Set number of worker threads
    .workers(4)
    .bind(config.bind_address())?
    .run()
    .await?;
    Ok(())
}
