use anyhow::Context;
use clap::Args;

use crate::config::AppConfig;
use crate::server;

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, help = "Keep all data in process memory instead of PostgreSQL")]
    pub memory: bool,

    #[arg(long, help = "Listen port (overrides PORT)")]
    pub port: Option<u16>,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store = if args.memory {
        server::memory_store()
    } else {
        server::postgres_store(&config).await?
    };

    server::run(server::build_state(config, store)?).await
}
