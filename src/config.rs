use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use curricula_core::Database;

/// Database location shared by every subcommand.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct DbConfig {
    /// SQLite file to use instead of the platform data directory
    #[arg(long = "db", env = "CURRICULA_DB")]
    pub path: Option<PathBuf>,
}

impl DbConfig {
    /// Opens and migrates the configured database.
    pub fn open(&self) -> anyhow::Result<Database> {
        let db = match &self.path {
            Some(path) => Database::open(path)
                .with_context(|| format!("opening database at {}", path.display()))?,
            None => Database::open_default()?,
        };
        db.migrate().context("running migrations")?;
        Ok(db)
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServerConfig {
    /// Port for HTTP API
    #[arg(short, long, default_value = "3000", env = "CURRICULA_PORT")]
    pub port: u16,

    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1", env = "CURRICULA_HOST")]
    pub host: String,

    #[command(flatten)]
    pub db: DbConfig,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".into(),
            db: DbConfig::default(),
        }
    }
}
