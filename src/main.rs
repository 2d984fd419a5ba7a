#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::{error, info};

mod cli;
mod config;
mod context;
mod db;
mod discord;
mod dispatch;
mod maze;
mod parsers;
mod prefix;
mod utils;

#[cfg(test)]
mod test_support;

use cli::Cli;
use config::Config;
use context::AppContext;
use discord::DiscordGateway;
use dispatch::{EventFilterChain, WorkerPool, route_channels};
use prefix::PrefixService;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Arc::new(Config::load(Some(cli.config.as_str()))?);

    utils::logging::init_tracing(&config.logging);
    info!(project = %config.general.project_name, "maze bot starting up");

    let db_manager = db::DatabaseManager::new(&config.database).await?;
    db_manager.migrate().await?;
    info!(backend = ?db_manager.db_type(), "database ready");

    let prefixes = Arc::new(PrefixService::from_config(
        db_manager.prefix_store(),
        &config,
    ));

    let gateway = DiscordGateway::from_token(&config.auth.bot_token);
    let bot_id = gateway.current_user_id().await?;

    let ctx = Arc::new(AppContext::new(
        config.clone(),
        prefixes.clone(),
        Arc::new(gateway),
    ));

    let (senders, receivers) = route_channels(config.technical.channel_capacity);
    let chain = Arc::new(EventFilterChain::new(
        prefixes,
        bot_id,
        config.general.ignore_bots,
    ));

    let mut workers = WorkerPool::new(ctx, receivers, config.technical.num_workers).spawn();

    let mut client = discord::build_client(&config.auth, chain, senders).await?;
    let gateway_handle = tokio::spawn(async move { client.start_autosharded().await });

    tokio::select! {
        Some(result) = workers.join_next() => {
            let reason = match result {
                Ok(Ok(())) => "worker exited".to_string(),
                Ok(Err(err)) => err.to_string(),
                Err(err) => format!("worker task failed: {err}"),
            };
            error!("worker pool stopped: {reason}");
            Err(anyhow!("worker pool stopped: {reason}"))
        }
        result = gateway_handle => {
            let reason = match result {
                Ok(Ok(())) => "gateway closed".to_string(),
                Ok(Err(err)) => err.to_string(),
                Err(err) => format!("gateway task failed: {err}"),
            };
            error!("discord gateway stopped: {reason}");
            Err(anyhow!("discord gateway stopped: {reason}"))
        }
    }
}
