#![deny(dead_code)]
#![deny(missing_docs)]
#![deny(unused)]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Push bridge delivering in-process metrics to a [Sumo
//! Logic](https://www.sumologic.com/) HTTP source.
//!
//! Metrics are instrumented the pull-based Prometheus way, registered with a
//! [`Registry`](registry::Registry). A [`Bridge`](bridge::Bridge) gathers them
//! on a fixed interval, encodes them in the Prometheus text exposition format
//! and POSTs the payload to the configured endpoint.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use sumo_bridge::bridge::{Bridge, Config, ErrorHandling};
//! use sumo_bridge::logger::TracingLogger;
//! use sumo_bridge::metrics::counter::Counter;
//! use sumo_bridge::metrics::family::Family;
//! use sumo_bridge::registry::Registry;
//! use sumo_bridge::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a metric registry.
//! let mut registry = Registry::default();
//!
//! // A counter per HTTP method, representing the number of requests received.
//! let http_requests = Family::<Vec<(String, String)>, Counter>::default();
//! registry.register(
//!   "http_requests",
//!   "Number of HTTP requests received",
//!   http_requests.clone(),
//! );
//!
//! // Somewhere in your business logic record a single HTTP GET request.
//! http_requests
//!     .get_or_create(&vec![("method".to_owned(), "GET".to_owned())])
//!     .inc();
//!
//! let bridge = Bridge::new(
//!     Config::new("https://collectors.sumologic.com/receiver/v1/http/abc")
//!         .with_interval(Duration::from_secs(30))
//!         .with_error_handling(ErrorHandling::AbortOnError)
//!         .with_logger(Arc::new(TracingLogger))
//!         .with_gatherer(Arc::new(registry)),
//! )?;
//!
//! // Push every 30 seconds until the token is cancelled.
//! let shutdown = CancellationToken::new();
//! bridge.run(shutdown.clone()).await;
//! # Ok(())
//! # }
//! ```
//!
//! See the `demos/sumo_bridge.rs` program for a complete setup including
//! signal handling.

pub mod bridge;
pub mod client;
pub mod collector;
pub mod encoding;
pub mod gather;
pub mod logger;
pub mod metrics;
pub mod model;
pub mod registry;

pub use tokio_util::sync::CancellationToken;
