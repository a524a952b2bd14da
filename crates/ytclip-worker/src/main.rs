//! ytclip command-line front end.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ytclip_models::{DownloadStatus, EncodingConfig, Event, JobId, WindowInput};
use ytclip_worker::{App, AppConfig};

#[derive(Debug, Parser)]
#[command(name = "ytclip", version, about = "Download a video and clip a time window out of it")]
struct Cli {
    /// Data directory (defaults to ~/.ytclip)
    #[arg(long, env = "YTCLIP_HOME", global = true)]
    home: Option<PathBuf>,

    /// Where finished clips are written
    #[arg(long, env = "YTCLIP_OUTPUT_DIR", global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify and install the external tools
    Setup,
    /// Download a video and clip a window out of it
    Clip {
        url: String,
        /// Window start, HH:MM:SS
        #[arg(long)]
        start: String,
        /// Window end, HH:MM:SS
        #[arg(long)]
        end: String,
        /// Cut without re-encoding (faster, keyframe accurate only)
        #[arg(long)]
        copy: bool,
        /// Keep the downloaded media after clipping
        #[arg(long)]
        keep_temp: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider was already installed");
    }

    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ytclip=info"));

    // Logs go to stderr; stdout carries the event stream.
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true),
            )
            .with(env_filter)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env_at(cli.home);
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    match cli.command {
        Command::Setup => {
            let app = App::new(config);
            setup(&app).await?;
            info!("All resources ready");
            Ok(())
        }
        Command::Clip {
            url,
            start,
            end,
            copy,
            keep_temp,
        } => {
            if copy {
                config.encoding = EncodingConfig::copy();
            }
            config.keep_temp |= keep_temp;
            let app = App::new(config);
            setup(&app).await?;
            clip(&app, &url, WindowInput::new(start, end)).await
        }
    }
}

/// Run the resource pass, printing its events.
async fn setup(app: &App) -> anyhow::Result<()> {
    let mut events = app.bus().stream_all();
    let pass = app.setup_resources();

    loop {
        match events.next().await {
            Some(event) => {
                print_event(&event);
                if matches!(event, Event::ResourceFinish | Event::ResourceError(_)) {
                    break;
                }
            }
            None => bail!("Event stream closed during setup"),
        }
    }

    pass.await
        .context("Resource setup task failed")?
        .context("Resource setup failed")
}

/// Run one job to completion, printing its events. Ctrl-C cancels it.
async fn clip(app: &App, url: &str, window: WindowInput) -> anyhow::Result<()> {
    let mut events = app.bus().stream_all();
    let job_id: JobId = app.start_download(url, &window)?;
    info!(job_id = %job_id, "Download started, press Ctrl-C to cancel");

    let stop = loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => {
                    print_event(&event);
                    if let Event::DownloadStop(stop) = event {
                        if stop.job_id == job_id {
                            break stop;
                        }
                    }
                }
                None => bail!("Event stream closed before the job finished"),
            },
            _ = tokio::signal::ctrl_c() => {
                app.cancel_download();
            }
        }
    };

    match stop.status {
        DownloadStatus::Done => Ok(()),
        _ => bail!(stop.message.unwrap_or_else(|| "Download failed".to_string())),
    }
}

/// One JSON line per event on stdout.
fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Failed to encode event: {}", e),
    }
}
