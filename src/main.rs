use anyhow::Result;
use dataloader::{pipeline, LoaderSettings};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) run ──────────────────────────────────────────────────────
    match pipeline::run(&LoaderSettings::default()).await {
        Ok(summary) => {
            info!(
                energy_rows = summary.energy_rows,
                iso_rows = summary.iso_rows,
                "data loading process completed successfully"
            );
            Ok(())
        }
        Err(e) => {
            error!("error occurred during data loading: {:#}", e);
            Err(e)
        }
    }
}
