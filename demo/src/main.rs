mod app;
mod config;

use clap::Parser;
use inertia::flash::MemoryFlashProvider;
use inertia::{Inertia, InertiaService};
use metrics_exporter_statsd::StatsdBuilder;
use shared::http::run_http_service;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LoggingConfig, MetricsConfig};

#[derive(Parser)]
#[command(name = "inertia-demo", about = "Demo server for the inertia adapter")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "demo/config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            process::exit(1);
        }
    };

    let _sentry = init_logging(&config.logging);

    if let Some(metrics) = &config.metrics {
        init_metrics(metrics);
    }

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Demo server failed");
        process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), inertia::InertiaError> {
    let flash = Arc::new(MemoryFlashProvider::new());

    let inertia = Inertia::from_file(&config.root_template)?
        .with_config(&config.inertia)?
        .with_flash_provider(flash.clone())
        .build();
    app::configure(&inertia)?;

    tracing::info!(
        version = inertia.version(),
        ssr = inertia.ssr_enabled(),
        template = %config.root_template.display(),
        "Inertia engine ready"
    );

    let service = InertiaService::new(inertia, app::DemoApp::new(flash));
    run_http_service(&config.listener.host, config.listener.port, service).await
}

fn init_logging(logging: &LoggingConfig) -> Option<sentry::ClientInitGuard> {
    let guard = logging.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry::integrations::tracing::layer())
        .init();

    guard
}

fn init_metrics(metrics: &MetricsConfig) {
    let recorder = match StatsdBuilder::from(metrics.statsd_host.clone(), metrics.statsd_port).build(None) {
        Ok(recorder) => recorder,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot build statsd recorder, metrics disabled");
            return;
        }
    };

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Metrics recorder already installed");
        return;
    }

    shared::metrics_defs::describe_all(inertia::metrics_defs::ALL_METRICS);
}
