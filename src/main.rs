use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use curricula::api;
use curricula::config::{DbConfig, ServerConfig};

#[derive(Parser)]
#[command(name = "curricula")]
#[command(about = "Onboarding program/template association service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(ServerConfig),
    /// Create or upgrade the database schema and exit
    Migrate(DbConfig),
    /// Give a user manager scope over one program
    GrantManager {
        #[command(flatten)]
        db: DbConfig,

        /// User id as sent by the identity provider
        #[arg(long)]
        user: Uuid,

        /// Program to manage
        #[arg(long)]
        program: Uuid,
    },
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    tracing::info!("Starting curricula server on {}", addr);

    let db = config.db.open()?;
    let app = api::create_router(db);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("curricula server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "curricula=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve(config)) => serve(config).await?,
        Some(Commands::Migrate(db)) => {
            db.open()?;
            tracing::info!("Database schema is up to date");
        }
        Some(Commands::GrantManager { db, user, program }) => {
            let db = db.open()?;
            if db.grant_manager(program, user)? {
                tracing::info!(%user, %program, "Granted manager scope");
            } else {
                tracing::info!(%user, %program, "User already manages this program");
            }
        }
        None => serve(ServerConfig::default()).await?,
    }

    Ok(())
}
