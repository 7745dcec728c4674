mod api;
mod config;
mod errors;
mod extractor;
mod model;
mod relay;
mod resolver;

use crate::api::http::server::start as start_http;
use crate::api::http::service::GatewayService;
use crate::config::Setting;
use crate::errors::GatewayError;
use crate::extractor::ytdlp::YtDlpExtractor;
use crate::extractor::MetadataExtractor;
use crate::relay::Relay;
use clap::Parser as ClapParser;
use std::fs;
use std::process;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt};

#[derive(ClapParser, Debug)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

fn main() {
    // Initialize tracing
    let subscriber = tracing_subscriber::registry().with(
        fmt::Layer::default()
            .with_target(false)
            .with_thread_names(false)
            .with_ansi(true)
            .with_line_number(false)
            .with_file(false)
            .with_thread_ids(false),
    );
    tracing::subscriber::set_global_default(subscriber)
        .expect("Unable to set a global logger instance");

    let args = Cli::parse();
    let mut setting = setting(&args);
    setting.apply_env();

    let runtime = match common::runtime::build(setting.runtime.threads) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(start(setting)) {
        error!("{}", e);
        process::exit(1);
    }

    info!("done");
}

fn setting(args: &Cli) -> Setting {
    let data = match fs::read_to_string(args.config.as_str()) {
        Ok(data) => data,
        Err(_) => {
            error!("config file '{}' does not exist", args.config);
            process::exit(1);
        }
    };

    match toml::from_str(data.as_str()) {
        Ok(setting) => setting,
        Err(e) => {
            error!("invalid configuration: {}", e);
            process::exit(1);
        }
    }
}

async fn start(setting: Setting) -> Result<(), GatewayError> {
    let extractor: Arc<dyn MetadataExtractor> = Arc::new(YtDlpExtractor::new(&setting.upstream));
    info!("extractor: {}", extractor.name());
    info!("selection: {:?}", setting.selection);

    let relay = Arc::new(Relay::new(&setting.upstream)?);
    let service = GatewayService::new(
        extractor,
        relay,
        setting.selection.clone(),
        setting.cors.allowed_origins.clone(),
    );

    let notifier = Arc::new(Notify::new());
    common::systemd::run(notifier.clone());

    start_http(notifier, setting.http.addr.clone(), service).await
}
