//! Metric collector implementation.
//!
//! See [`Collector`] for details.

#[cfg(all(feature = "process", target_os = "linux"))]
pub mod process;

use crate::gather::GatherError;
use crate::model::MetricFamily;

/// The [`Collector`] abstraction allows users to provide additional metrics and
/// their description on each gather.
///
/// An example use-case is an exporter that retrieves a set of operating system metrics
/// ad-hoc on each tick.
///
/// Register a [`Collector`] with a [`Registry`](crate::registry::Registry) via
/// [`Registry::register_collector`](crate::registry::Registry::register_collector).
///
/// ```
/// # use sumo_bridge::collector::Collector;
/// # use sumo_bridge::gather::GatherError;
/// # use sumo_bridge::metrics::MetricType;
/// # use sumo_bridge::model::{Metric, MetricFamily};
/// #
/// #[derive(Debug)]
/// struct MyCollector {}
///
/// impl Collector for MyCollector {
///     fn collect(&self) -> Result<Vec<MetricFamily>, GatherError> {
///         let family = MetricFamily::new("my_counter", "some help", MetricType::Counter)
///             .with_metric(Metric::counter(42.0));
///         Ok(vec![family])
///     }
/// }
/// ```
pub trait Collector: std::fmt::Debug + Send + Sync + 'static {
    /// Once the [`Collector`] is registered, this method is called on each gather.
    fn collect(&self) -> Result<Vec<MetricFamily>, GatherError>;
}
