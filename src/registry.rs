//! Metric registry implementation.
//!
//! See [`Registry`] for details.

use std::collections::HashSet;

use crate::collector::Collector;
use crate::gather::{GatherError, Gatherer};
use crate::metrics::CollectMetric;
use crate::model::MetricFamily;

/// A metric registry.
///
/// First off one registers metrics with the registry via
/// [`Registry::register`]. Later on the bridge gathers the [`Registry`] on
/// every tick, snapshotting each registered metric into a [`MetricFamily`].
///
/// Different types of metrics (e.g. [`Counter`](crate::metrics::counter::Counter)
/// and [`Gauge`](crate::metrics::gauge::Gauge)) can be registered with the same
/// registry.
///
/// ```
/// # use sumo_bridge::gather::Gatherer;
/// # use sumo_bridge::metrics::counter::Counter;
/// # use sumo_bridge::metrics::gauge::Gauge;
/// # use sumo_bridge::registry::Registry;
/// #
/// // Create a metric registry.
/// let mut registry = Registry::default();
///
/// let counter: Counter = Counter::default();
/// let gauge: Gauge = Gauge::default();
///
/// registry.register(
///   "my_counter",
///   "This is my counter",
///   counter.clone(),
/// );
/// registry.register(
///   "my_gauge",
///   "This is my gauge",
///   gauge.clone(),
/// );
///
/// let families = registry.gather().unwrap();
/// assert_eq!("my_counter", families[0].name());
/// assert_eq!("my_gauge", families[1].name());
/// ```
#[derive(Debug, Default)]
pub struct Registry {
    prefix: Option<Prefix>,
    labels: Vec<(String, String)>,
    metrics: Vec<(Descriptor, Box<dyn Metric>)>,
    collectors: Vec<Box<dyn Collector>>,
}

impl Registry {
    /// Creates a new default [`Registry`] with the given prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: Some(Prefix::from(prefix)),
            ..Default::default()
        }
    }

    /// Creates a new default [`Registry`] with the given constant labels,
    /// attached to every metric gathered from it.
    pub fn with_labels<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Default::default()
        }
    }

    /// Creates the registry used when a bridge is configured without a
    /// gatherer. With the `process` feature on Linux it carries a
    /// [`ProcessCollector`](crate::collector::process::ProcessCollector).
    pub fn with_default_collectors() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::default();
        #[cfg(all(feature = "process", target_os = "linux"))]
        registry.register_collector(Box::new(
            crate::collector::process::ProcessCollector::default(),
        ));
        registry
    }

    /// Register a metric with the [`Registry`].
    ///
    /// ```
    /// # use sumo_bridge::metrics::counter::Counter;
    /// # use sumo_bridge::registry::Registry;
    /// #
    /// let mut registry = Registry::default();
    /// let counter: Counter = Counter::default();
    ///
    /// registry.register("my_counter", "This is my counter", counter.clone());
    /// ```
    pub fn register<N: Into<String>, H: Into<String>>(
        &mut self,
        name: N,
        help: H,
        metric: impl Metric,
    ) {
        let descriptor = Descriptor::new(name, help, self.prefix.as_ref());

        self.metrics.push((descriptor, Box::new(metric)));
    }

    /// Register a [`Collector`].
    ///
    /// Families returned by the collector get the registry prefix and
    /// constant labels applied like registered metrics do.
    pub fn register_collector(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    fn enrich(&self, family: MetricFamily) -> MetricFamily {
        if self.prefix.is_none() && self.labels.is_empty() {
            return family;
        }

        let descriptor = Descriptor::new(family.name(), family.help(), self.prefix.as_ref());
        let mut enriched = MetricFamily::new(
            descriptor.name,
            descriptor.help,
            family.metric_type(),
        );
        for metric in family.into_metrics() {
            enriched.push(metric.with_const_labels(&self.labels));
        }
        enriched
    }
}

impl Gatherer for Registry {
    /// Gather registered metrics in registration order, followed by the
    /// families of every registered [`Collector`].
    ///
    /// A failing collector or a family name seen twice does not stop the
    /// gather; the resulting [`GatherError`] carries everything else.
    fn gather(&self) -> Result<Vec<MetricFamily>, GatherError> {
        let mut families = Vec::with_capacity(self.metrics.len());
        let mut errors = Vec::new();

        for (descriptor, metric) in self.metrics.iter() {
            let mut family = MetricFamily::new(
                descriptor.name(),
                descriptor.help(),
                metric.metric_type(),
            );
            for sample in metric.collect() {
                family.push(sample.with_const_labels(&self.labels));
            }
            families.push(family);
        }

        for collector in self.collectors.iter() {
            let collected = match collector.collect() {
                Ok(collected) => collected,
                Err(e) => {
                    errors.push(e.to_string());
                    e.into_families()
                }
            };
            families.extend(collected.into_iter().map(|f| self.enrich(f)));
        }

        let mut seen = HashSet::with_capacity(families.len());
        families.retain(|family| {
            if seen.insert(family.name().to_owned()) {
                true
            } else {
                errors.push(format!(
                    "metric family {} was collected before",
                    family.name()
                ));
                false
            }
        });

        if errors.is_empty() {
            Ok(families)
        } else {
            Err(GatherError::with_families(errors.join("; "), families))
        }
    }
}

/// Metric prefix
#[derive(Clone, Debug)]
pub struct Prefix(String);

impl Prefix {
    fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for Prefix {
    fn from(s: String) -> Self {
        Prefix(s)
    }
}

/// Metric descriptor.
#[derive(Debug, Clone)]
pub struct Descriptor {
    name: String,
    help: String,
}

impl Descriptor {
    /// Create new [`Descriptor`].
    pub fn new<N: Into<String>, H: Into<String>>(
        name: N,
        help: H,
        prefix: Option<&Prefix>,
    ) -> Self {
        let mut name = name.into();
        if let Some(prefix) = prefix {
            name.insert(0, '_');
            name.insert_str(0, prefix.as_str());
        }

        Descriptor {
            name,
            help: help.into(),
        }
    }

    /// Returns the name of the metric [`Descriptor`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the help text of the metric [`Descriptor`].
    pub fn help(&self) -> &str {
        &self.help
    }
}

/// Super trait representing an abstract metric.
pub trait Metric: CollectMetric + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Metric for T where T: CollectMetric + Send + Sync + std::fmt::Debug + 'static {}
