use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use sumo_bridge::bridge::{Bridge, Config, ErrorHandling};
use sumo_bridge::client::SourceHeaders;
use sumo_bridge::logger::TracingLogger;
use sumo_bridge::metrics::counter::Counter;
use sumo_bridge::metrics::family::Family;
use sumo_bridge::registry::Registry;
use sumo_bridge::CancellationToken;
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::EnvFilter;

/// Push a demo counter to a Sumo Logic HTTP source.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Sumo Logic collector url
    #[arg(long, env = "SUMO_ADDR")]
    addr: String,

    /// Interval to submit metrics, e.g. `6s` or `500ms`
    #[arg(long, env = "SUMO_INTERVAL", default_value = "6s", value_parser = parse_duration)]
    interval: Duration,

    /// Bound on a single submission; defaults to 15s
    #[arg(long, env = "SUMO_TIMEOUT", value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Skip a tick instead of sending partial or empty payloads
    #[arg(long, env = "SUMO_ABORT_ON_ERROR")]
    abort_on_error: bool,

    #[arg(long, env = "SUMO_CATEGORY", default_value = "")]
    category: String,

    #[arg(long, env = "SUMO_SOURCE_NAME", default_value = "")]
    source_name: String,

    #[arg(long, env = "SUMO_SOURCE_HOST", default_value = "")]
    source_host: String,

    #[arg(long, env = "SUMO_SOURCE_CLIENT", default_value = "")]
    source_client: String,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => s.split_at(i),
        None => (s, "s"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|e| format!("invalid duration {s:?}: {e}"))?;
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        _ => Err(format!("invalid duration unit {unit:?}, use ms, s or m")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let bridge_counter = Family::<Vec<(String, String)>, Counter>::default();
    let mut registry = Registry::default();
    registry.register(
        "bridge_counter",
        "The total number of processed events",
        bridge_counter.clone(),
    );

    let error_handling = if args.abort_on_error {
        ErrorHandling::AbortOnError
    } else {
        ErrorHandling::ContinueOnError
    };

    let bridge = Bridge::new(
        Config::new(args.addr)
            .with_interval(args.interval)
            .with_timeout(args.timeout.unwrap_or_default())
            .with_error_handling(error_handling)
            .with_logger(Arc::new(TracingLogger))
            .with_gatherer(Arc::new(registry))
            .with_source_headers(SourceHeaders {
                category: args.category,
                name: args.source_name,
                host: args.source_host,
                client: args.source_client,
            }),
    )?;

    let shutdown = CancellationToken::new();
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
            tracing::info!("shutting down");
            shutdown.cancel();
        }
    });

    tokio::spawn(record_events(bridge_counter, shutdown.clone()));

    tracing::info!(interval = ?bridge.interval(), "starting bridge");
    bridge.run(shutdown).await;

    Ok(())
}

/// Increment the counter once a second, labelled with the current UTC
/// `<hour>-<minute>`.
async fn record_events(counter: Family<Vec<(String, String)>, Counter>, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {
                let secs = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                let name = format!("{}-{}", secs / 3600 % 24, secs / 60 % 60);
                counter.get_or_create(&vec![("name".to_owned(), name)]).inc();
            }
        }
    }
}
