use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taxonomy_cli::{commands, CliConfig};
use taxonomy_pipeline::{ImportOptions, ParentPrecedence};

/// Import JSON taxonomies into a nested-set tree and maintain it.
#[derive(Parser, Debug)]
#[command(name = "taxonomy", author, version, about, long_about = None)]
struct Cli {
    /// Database URL; overrides `DATABASE_URL`.
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a file and summarize it without writing anything.
    Preview {
        file: PathBuf,
    },
    #[command(flatten)]
    Store(StoreCommand),
}

/// Subcommands that open the database.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Import a file.
    Import {
        file: PathBuf,
        /// Default parent for entries without a usable parent reference.
        #[arg(long)]
        parent: Option<i64>,
        /// User recorded as creator and importer.
        #[arg(long)]
        actor: Option<i64>,
        /// Which parent reference wins when both are valid: `alias` or `id`.
        #[arg(long)]
        precedence: Option<ParentPrecedence>,
        /// Skip the rebuild after the batch.
        #[arg(long)]
        no_rebuild: bool,
    },
    /// Delete every node created by tracked imports.
    Reset,
    /// Rebuild and verify the nested set.
    Rebuild,
    /// Rebuild, then recompute every stored path.
    RefreshPaths,
    /// Show tree and ledger sizes.
    Status,
    /// List nodes usable as a default parent.
    Parents,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taxonomy_cli=info,taxonomy_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let mut config = CliConfig::from_env().context("invalid configuration")?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let command = match cli.command {
        Command::Preview { file } => {
            let output = commands::preview(&file, config.actor_id).await?;
            return print(&output);
        }
        Command::Store(command) => command,
    };

    // --- Database ---
    let pool = taxonomy_db::create_pool(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;
    taxonomy_db::health_check(&pool)
        .await
        .context("database health check failed")?;
    taxonomy_db::run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;
    tracing::debug!(database_url = %config.database_url, "Database ready");

    let store = taxonomy_db::SqliteTaxonomyStore::new(pool);

    let output = match command {
        StoreCommand::Import {
            file,
            parent,
            actor,
            precedence,
            no_rebuild,
        } => {
            let options = ImportOptions {
                default_parent_id: parent.unwrap_or(config.default_parent_id),
                precedence: precedence.unwrap_or(config.precedence),
                rebuild_after_import: !no_rebuild,
                actor_id: actor.unwrap_or(config.actor_id),
            };
            commands::import(&store, &file, options).await?
        }
        StoreCommand::Reset => commands::reset(&store).await?,
        StoreCommand::Rebuild => commands::rebuild(&store).await?,
        StoreCommand::RefreshPaths => commands::refresh(&store).await?,
        StoreCommand::Status => commands::status(&store).await?,
        StoreCommand::Parents => commands::parents(&store).await?,
    };

    print(&output)
}

fn print(value: &serde_json::Value) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
