use anyhow::Result;
use avatarsynth::app::AppStateBuilder;
use avatarsynth::cli::{self, SubmitArgs};
use avatarsynth::config::{Cli, Commands, Config};
use avatarsynth::synthesis::AzureAvatarClient;
use clap::Parser;
use dotenv::dotenv;
use std::fs::File;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, level_filters::LevelFilter};

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();
    let cli = Cli::parse();

    let mut config = match cli.conf.as_deref() {
        Some(path) if std::path::Path::new(path).exists() => Config::load(path)?,
        _ => Config::default(),
    };
    let env_loaded = dotenv().is_ok();
    config.apply_env();

    let mut log_fmt = tracing_subscriber::fmt();
    if let Some(ref level) = config.log_level {
        if let Ok(lv) = level.as_str().parse::<LevelFilter>() {
            log_fmt = log_fmt.with_max_level(lv);
        }
    }

    // keeps the non-blocking writer flushing until main returns
    let mut _guard = None;
    if let Some(ref log_file) = config.log_file {
        let file = File::create(log_file)
            .map_err(|e| anyhow::anyhow!("Failed to create log file {}: {}", log_file, e))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        _guard = Some(guard);
        log_fmt.with_writer(non_blocking).try_init().ok();
    } else {
        log_fmt.try_init().ok();
    }
    if env_loaded {
        debug!("Loaded environment variables from .env file");
    }

    let command = cli.command.unwrap_or(Commands::Serve);
    if let Commands::Serve = command {
        let state = AppStateBuilder::new().config(config).build()?;
        info!("Starting {}", avatarsynth::version::get_useragent());
        select! {
            r = avatarsynth::app::run(state.clone()) => r?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received CTRL+C, shutting down");
                state.token.cancel();
            }
        }
        return Ok(());
    }

    let client = AzureAvatarClient::new(&config.speech)?;
    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received CTRL+C, stop polling");
            ctrl_c_token.cancel();
        }
    });

    let mut out = std::io::stdout();
    match command {
        Commands::Submit {
            text,
            voice,
            style,
            detach,
        } => {
            let args = SubmitArgs {
                text: &text,
                voice: &voice,
                style: &style,
                detach,
            };
            cli::submit(&mut out, &config, &client, args, token).await?;
        }
        Commands::Status { job_id, once } => {
            cli::status(&mut out, &config, &client, &job_id, once, token).await?;
        }
        Commands::List { skip, top } => {
            cli::list(&mut out, &client, skip, top).await?;
        }
        Commands::Serve => {}
    }
    Ok(())
}
