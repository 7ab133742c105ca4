//! safe-delegations: build, sign and redeem ERC-7710 delegations for Safe accounts

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Context;
use eyre::Result;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let ctx = Context::load(cli.config, cli.store, cli.json)?;

    match cli.command {
        Commands::Create(args) => commands::create(&ctx, args),
        Commands::Redelegate(args) => commands::redelegate(&ctx, args),
        Commands::TypedData(args) => commands::typed_data(&ctx, args),
        Commands::Attach(args) => commands::attach(&ctx, args),
        Commands::Sign(args) => commands::sign(&ctx, args),
        Commands::Hash(args) => commands::hash(&ctx, args),
        Commands::Decode(args) => commands::decode(&ctx, args),
        Commands::List => commands::list(&ctx),
        Commands::Status(args) => commands::status(&ctx, args),
        Commands::Sweep => commands::sweep(&ctx),
        Commands::Remove(args) => commands::remove(&ctx, args),
        Commands::Export(args) => commands::export(&ctx, args),
        Commands::Import(args) => commands::import(&ctx, args),
        Commands::Redeem(args) => commands::redeem(&ctx, args),
        Commands::Disable(args) => commands::disable(&ctx, args),
    }
}
