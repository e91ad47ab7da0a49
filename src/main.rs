// src/main.rs

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{serve, Router};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

mod api;
mod bidding;
mod config;
mod environment;
mod error;
mod logging;
mod protocol;

use bidding::adapter::{BidAdapter, VendorAdapter};
use bidding::tracker::HttpTracker;
use config::adapter_config::{AdapterConfig, ConfigAdapter, FileConfigAdapter};
use error::AdapterError;
use logging::runtime_logger::{LogLevel, RuntimeLogger};

#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<dyn BidAdapter>,
    pub runtime_logger: Arc<RuntimeLogger>,
}

#[derive(Parser, Debug)]
#[command(author = "whiteCcinn", version = "1.0", about = "A banner bid adapter service")]
struct CliArgs {
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    #[arg(long, default_value = "static/adapter_config.json")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), AdapterError> {
    let args = CliArgs::parse();

    // 初始化全局 tracing 日志
    let log_file = rolling::hourly(&args.log_dir, "adapter_log.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AdapterError::Logging(e.to_string()))?;

    // 运行日志：服务状态与每次调用的摘要
    let runtime_logger = RuntimeLogger::new(&args.log_dir, "runtime", 1000, 100, 1000);
    runtime_logger.log(LogLevel::Info, "bid adapter is starting...").await;

    // 配置文件缺失或无效时使用供应商默认值
    let config = FileConfigAdapter::new(&args.config).load().unwrap_or_else(|e| {
        warn!(error = %e, "falling back to vendor default adapter config");
        AdapterConfig::default()
    });
    info!(bidder_code = %config.bidder_code, host = %config.endpoint.host, "adapter config loaded");

    let adapter = VendorAdapter::new(&config, HttpTracker::new(reqwest::Client::new()));
    let state = Arc::new(AppState {
        adapter: Arc::new(adapter),
        runtime_logger: runtime_logger.clone(),
    });

    let app = Router::new()
        .route("/adapter", get(api::handlers::handle_adapter_info))
        .route("/bid-requests", post(api::handlers::handle_bid_requests))
        .route("/bid-responses", post(api::handlers::handle_bid_response))
        .route("/user-syncs", post(api::handlers::handle_user_syncs))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;
    runtime_logger
        .log(LogLevel::Info, &format!("bid adapter running at http://{}", addr))
        .await;

    let shutdown_logger = runtime_logger.clone();
    serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            shutdown_logger.log(LogLevel::Info, "Shutting down gracefully...").await;
        })
        .await?;

    runtime_logger.log(LogLevel::Info, "bid adapter shut down.").await;
    runtime_logger.shutdown().await;
    Ok(())
}
