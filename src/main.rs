use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use noticeboard::app::AppContext;
use noticeboard::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::load()?;

    match cli.command {
        Commands::List {
            unread,
            page,
            limit,
        } => {
            commands::list(&ctx, unread, page, limit).await?;
        }
        Commands::Count => {
            commands::count(&ctx).await?;
        }
        Commands::Read { id } => {
            commands::mark_read(&ctx, &id).await?;
        }
        Commands::ReadAll => {
            commands::mark_all_read(&ctx).await?;
        }
        Commands::Delete { id } => {
            commands::delete(&ctx, &id).await?;
        }
        Commands::Open { id } => {
            commands::open(&ctx, &id).await?;
        }
        Commands::Watch { no_push } => {
            commands::watch(&ctx, no_push).await?;
        }
    }

    Ok(())
}
