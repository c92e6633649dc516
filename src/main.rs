use clap::Parser;
use photos::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photos=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { path }) => {
            photos::cli::init::run(path).await?;
        }
        Some(Commands::Serve { host, port }) => {
            photos::cli::serve::run(&cli.config, host, port).await?;
        }
        Some(Commands::Upload {
            file,
            comment,
            mime,
            unpublished,
        }) => {
            photos::cli::upload::run(&cli.config, &file, comment, mime, unpublished).await?;
        }
        Some(Commands::List { page }) => {
            photos::cli::list::run(&cli.config, page).await?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
