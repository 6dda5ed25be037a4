//! The push bridge: gather, encode and submit on a fixed interval.
//!
//! See [`Bridge`] for details.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::{ConfigError, SourceHeaders, SubmissionClient, SubmitError};
use crate::encoding::text::encode_families;
use crate::gather::{GatherError, Gatherer};
use crate::logger::Logger;
use crate::registry::Registry;

/// Interval and timeout used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// What a push does when gathering fails or yields nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ErrorHandling {
    /// Log the problem and submit whatever was gathered.
    #[default]
    ContinueOnError,
    /// Stop the push before anything is encoded or sent.
    AbortOnError,
}

/// Settings of a [`Bridge`].
///
/// ```
/// # use std::time::Duration;
/// # use sumo_bridge::bridge::{Config, ErrorHandling};
/// let config = Config::new("https://collectors.sumologic.com/receiver/v1/http/abc")
///     .with_interval(Duration::from_secs(30))
///     .with_error_handling(ErrorHandling::AbortOnError);
/// ```
#[derive(Clone, Default)]
pub struct Config {
    url: String,
    interval: Duration,
    timeout: Duration,
    error_handling: ErrorHandling,
    logger: Option<Arc<dyn Logger>>,
    gatherer: Option<Arc<dyn Gatherer>>,
    source_headers: SourceHeaders,
}

impl Config {
    /// Create a configuration that pushes to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Time between two pushes. Zero means [`DEFAULT_INTERVAL`].
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bound on a single submission. Zero means [`DEFAULT_INTERVAL`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How failed or empty gathers are handled.
    pub fn with_error_handling(mut self, error_handling: ErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }

    /// Where diagnostic lines go. Without a logger they are dropped.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Source of the metrics. Defaults to
    /// [`Registry::with_default_collectors`].
    pub fn with_gatherer(mut self, gatherer: Arc<dyn Gatherer>) -> Self {
        self.gatherer = Some(gatherer);
        self
    }

    /// Static `X-Sumo-*` headers.
    pub fn with_source_headers(mut self, source_headers: SourceHeaders) -> Self {
        self.source_headers = source_headers;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("error_handling", &self.error_handling)
            .field("logger", &self.logger.is_some())
            .field("gatherer", &self.gatherer)
            .field("source_headers", &self.source_headers)
            .finish()
    }
}

/// Result of a push that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// A payload was accepted by the endpoint.
    Submitted {
        /// Number of gathered families.
        families: usize,
        /// Size of the encoded payload.
        bytes: usize,
    },
    /// Nothing was gathered and nothing was sent.
    Skipped,
}

/// A failed push.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Gathering failed under [`ErrorHandling::AbortOnError`].
    #[error(transparent)]
    Gather(#[from] GatherError),
    /// The payload could not be delivered.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Periodically pushes gathered metrics to a Sumo Logic HTTP source.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use sumo_bridge::bridge::{Bridge, Config};
/// # use sumo_bridge::metrics::counter::Counter;
/// # use sumo_bridge::registry::Registry;
/// # use tokio_util::sync::CancellationToken;
/// # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
/// let mut registry = Registry::default();
/// let counter: Counter = Counter::default();
/// registry.register("events", "Processed events", counter.clone());
///
/// let bridge = Bridge::new(
///     Config::new("https://collectors.sumologic.com/receiver/v1/http/abc")
///         .with_gatherer(Arc::new(registry)),
/// )?;
///
/// let token = CancellationToken::new();
/// bridge.run(token.clone()).await;
/// # Ok(())
/// # }
/// ```
pub struct Bridge {
    interval: Duration,
    timeout: Duration,
    error_handling: ErrorHandling,
    logger: Option<Arc<dyn Logger>>,
    gatherer: Arc<dyn Gatherer>,
    client: SubmissionClient,
}

impl Bridge {
    /// Validate `config` and build the bridge. Nothing is sent yet.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let interval = non_zero_or_default(config.interval);
        let timeout = non_zero_or_default(config.timeout);
        let client = SubmissionClient::new(&config.url, timeout, config.source_headers)?;
        let gatherer = match config.gatherer {
            Some(gatherer) => gatherer,
            None => Arc::new(Registry::with_default_collectors()),
        };

        Ok(Self {
            interval,
            timeout,
            error_handling: config.error_handling,
            logger: config.logger,
            gatherer,
            client,
        })
    }

    /// Time between two pushes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Bound on a single submission.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured error handling.
    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    /// Push every interval until `cancel` fires.
    ///
    /// The first push happens one interval after the call. A push running
    /// when `cancel` fires is abandoned. Failed pushes are logged and do not
    /// end the loop.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::debug!(interval = ?self.interval, url = %self.client.url(), "starting push loop");

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.push() => {
                    if let Err(e) = result {
                        self.log(format_args!("error pushing to Sumo: {e}"));
                    }
                }
            }
        }

        tracing::debug!("push loop cancelled");
    }

    /// Run a single gather, encode and submit cycle.
    pub async fn push(&self) -> Result<PushOutcome, PushError> {
        tracing::trace!(started_at = ?SystemTime::now(), "push");

        let families = match (self.gatherer.gather(), self.error_handling) {
            (Err(e), ErrorHandling::AbortOnError) => return Err(e.into()),
            (Ok(families), ErrorHandling::AbortOnError) if families.is_empty() => {
                return Ok(PushOutcome::Skipped)
            }
            (Err(e), ErrorHandling::ContinueOnError) => {
                self.log(format_args!("continue on error: {e}"));
                e.into_families()
            }
            (Ok(families), ErrorHandling::ContinueOnError) if families.is_empty() => {
                self.log(format_args!("continue on error: no metrics gathered"));
                families
            }
            (Ok(families), _) => families,
        };

        self.log(format_args!("collected metrics: {}", families.len()));

        let payload = encode_families(&families, |family, e| {
            tracing::warn!(family = family.name(), error = %e, "skipping metric family");
            self.log(format_args!("[WARN] failed to encode {}: {e}", family.name()));
        });
        tracing::trace!(payload = %String::from_utf8_lossy(&payload), "encoded");

        let bytes = payload.len();
        self.client.submit(payload).await?;

        Ok(PushOutcome::Submitted {
            families: families.len(),
            bytes,
        })
    }

    fn log(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = &self.logger {
            logger.println(args);
        }
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("error_handling", &self.error_handling)
            .field("logger", &self.logger.is_some())
            .field("gatherer", &self.gatherer)
            .field("client", &self.client)
            .finish()
    }
}

fn non_zero_or_default(d: Duration) -> Duration {
    if d.is_zero() {
        DEFAULT_INTERVAL
    } else {
        d
    }
}
