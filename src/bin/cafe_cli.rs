use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use love_over_coffee::chat::{ChatRequest, ChatService};
use love_over_coffee::config::AppConfig;
use love_over_coffee::error::ErrorCode;
use love_over_coffee::http::{run_http_server, HttpState};
use love_over_coffee::performance::{evaluate, EffectiveConnectionType, SignalProbe};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "cafe_cli",
    about = "Adaptive rendering classifier and chat proxy for Love Over Coffee"
)]
struct Cli {
    /// Path to the JSON config file (defaults to config/cafe.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP surface until Ctrl-C
    Serve {
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Classify a signal snapshot; unspecified signals use the documented defaults
    Classify {
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        touch: bool,
        #[arg(long)]
        cores: Option<u32>,
        #[arg(long)]
        memory: Option<f32>,
        #[arg(long)]
        save_data: bool,
        #[arg(long)]
        connection: Option<String>,
        #[arg(long)]
        reduced_motion: bool,
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Send one message to the barista and print the reply
    Chat {
        #[arg(long)]
        message: String,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref());
    love_over_coffee::init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));

    match cli.command {
        Commands::Serve { bind } => run_serve(&config, bind),
        Commands::Classify {
            width,
            touch,
            cores,
            memory,
            save_data,
            connection,
            reduced_motion,
            user_agent,
        } => {
            let probe = SignalProbe {
                viewport_width_px: width,
                is_touch_or_coarse_pointer: touch.then_some(true),
                cpu_core_count: cores,
                device_memory_gib: memory,
                network_save_data_requested: save_data.then_some(true),
                network_effective_type: connection.as_deref().map(EffectiveConnectionType::parse),
                prefers_reduced_motion: reduced_motion.then_some(true),
                user_agent,
            };
            run_classify(&probe)
        }
        Commands::Chat { message } => run_chat(&config, message),
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")
}

fn run_serve(config: &AppConfig, bind: Option<SocketAddr>) -> Result<ExitCode> {
    let addr = match bind {
        Some(addr) => addr,
        None => config
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("parsing bind address {}", config.server.bind_addr))?,
    };

    let chat = ChatService::from_config(&config.chat).context("building chat client")?;
    if !chat.is_configured() {
        log::warn!(
            "[Serve] {} is not set; /api/chat will answer 500",
            config.chat.api_key_env
        );
    }
    let state = HttpState::new(chat, config.chat.timeout_ms);

    build_runtime()?.block_on(run_http_server(state, addr, shutdown_signal()))?;
    Ok(ExitCode::from(0))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("[Serve] failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
    log::info!("[Serve] shutdown requested");
}

fn run_classify(probe: &SignalProbe) -> Result<ExitCode> {
    let signals = probe.resolve();
    let output = evaluate(&signals);
    let report = ClassifyReport {
        motion_profile: output.motion_profile(),
        output,
        signals,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_chat(config: &AppConfig, message: String) -> Result<ExitCode> {
    let chat = ChatService::from_config(&config.chat).context("building chat client")?;
    let request = ChatRequest::new(message);

    let result = build_runtime()?.block_on(chat.reply(&request));
    let code = ChatService::result_code(&result);
    match result {
        Ok(reply) => {
            println!("{reply}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{} (code {code})", err.message());
            Ok(ExitCode::FAILURE)
        }
    }
}

#[derive(Serialize)]
struct ClassifyReport {
    #[serde(flatten)]
    output: love_over_coffee::ClassifierOutput,
    motion_profile: love_over_coffee::performance::MotionProfile,
    signals: love_over_coffee::ClassifierSignals,
}
