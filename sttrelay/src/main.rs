use clap::Parser;
use sttrelay::{Application, Config, config::Args, telemetry};

/// Resolves on Ctrl+C, or SIGTERM on unix, so in-flight uploads can finish before exit
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, draining in-flight transcriptions"),
        _ = terminate => tracing::info!("Received SIGTERM, draining in-flight transcriptions"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // reqwest is built without a bundled crypto provider
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("a rustls crypto provider was already installed"))?;

    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!(
            "Configuration is valid: forwarding to {} with model '{}'",
            config.provider.url, config.provider.model_id
        );
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;

    tracing::info!(
        provider = %config.provider.url,
        model_id = %config.provider.model_id,
        upload_limit = ?config.max_upload_size,
        "Starting speech-to-text relay"
    );

    Application::new(config)?.serve(shutdown_signal()).await
}
