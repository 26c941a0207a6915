use spamorigin::app::App;
use spamorigin::cli::Cli;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::from_args();

    // Logs go to stderr so structured stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let code = match App::run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            if cli.error_enabled() {
                eprintln!("Error: {e}");
            }
            1
        }
    };
    std::process::exit(code);
}
