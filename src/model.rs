//! Gathered metric data.
//!
//! A [`MetricFamily`] is a point-in-time snapshot produced by a
//! [`Gatherer`](crate::gather::Gatherer). Once gathered for a tick it is only
//! read, never changed.

use crate::metrics::MetricType;

/// A named group of metrics sharing a type and help text.
///
/// ```
/// # use sumo_bridge::model::{Metric, MetricFamily};
/// # use sumo_bridge::metrics::MetricType;
/// let family = MetricFamily::new("requests", "Requests handled", MetricType::Counter)
///     .with_metric(Metric::counter(5.0).with_label("method", "GET"));
///
/// assert_eq!(family.metrics().len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MetricFamily {
    name: String,
    help: String,
    metric_type: MetricType,
    metrics: Vec<Metric>,
}

impl MetricFamily {
    /// Create an empty [`MetricFamily`].
    pub fn new(name: impl Into<String>, help: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            metric_type,
            metrics: Vec::new(),
        }
    }

    /// Append a metric, keeping insertion order.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Append a metric, keeping insertion order.
    pub fn push(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }

    /// The metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The help text, possibly empty.
    pub fn help(&self) -> &str {
        &self.help
    }

    /// The declared type of every metric in the family.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// The metrics of the family in the order they were added.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Consume the family, returning its metrics.
    pub fn into_metrics(self) -> Vec<Metric> {
        self.metrics
    }
}

/// A single labelled metric within a [`MetricFamily`].
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    labels: Vec<(String, String)>,
    value: Value,
    timestamp_ms: Option<i64>,
}

impl Metric {
    /// Create a metric without labels or timestamp.
    pub fn new(value: Value) -> Self {
        Self {
            labels: Vec::new(),
            value,
            timestamp_ms: None,
        }
    }

    /// Shorthand for a [`Value::Counter`] metric.
    pub fn counter(value: f64) -> Self {
        Self::new(Value::Counter(value))
    }

    /// Shorthand for a [`Value::Gauge`] metric.
    pub fn gauge(value: f64) -> Self {
        Self::new(Value::Gauge(value))
    }

    /// Shorthand for a [`Value::Untyped`] metric.
    pub fn untyped(value: f64) -> Self {
        Self::new(Value::Untyped(value))
    }

    /// Add a label pair. Labels are encoded in the order they were added.
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((name.into(), value.into()));
        self
    }

    /// Add several label pairs.
    pub fn with_labels<I, K, V>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Put `labels` in front of the metric's own labels.
    pub(crate) fn with_const_labels(mut self, labels: &[(String, String)]) -> Self {
        if !labels.is_empty() {
            self.labels.splice(0..0, labels.iter().cloned());
        }
        self
    }

    /// Attach a timestamp in milliseconds since the Unix epoch.
    pub fn with_timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    /// The label pairs of the metric.
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }

    /// The metric value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The explicit timestamp, if any.
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.timestamp_ms
    }
}

/// The value of a [`Metric`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Monotonically increasing value.
    Counter(f64),
    /// Value that can go up and down.
    Gauge(f64),
    /// Value of unknown semantics.
    Untyped(f64),
    /// Pre-computed quantiles.
    Summary(SummaryValue),
    /// Cumulative buckets.
    Histogram(HistogramValue),
}

impl Value {
    /// The [`MetricType`] this value belongs to.
    pub fn metric_type(&self) -> MetricType {
        match self {
            Value::Counter(_) => MetricType::Counter,
            Value::Gauge(_) => MetricType::Gauge,
            Value::Untyped(_) => MetricType::Untyped,
            Value::Summary(_) => MetricType::Summary,
            Value::Histogram(_) => MetricType::Histogram,
        }
    }
}

/// Summary observations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryValue {
    /// Number of observations.
    pub sample_count: u64,
    /// Sum of all observations.
    pub sample_sum: f64,
    /// `(quantile, value)` pairs.
    pub quantiles: Vec<(f64, f64)>,
}

/// Histogram observations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistogramValue {
    /// Number of observations.
    pub sample_count: u64,
    /// Sum of all observations.
    pub sample_sum: f64,
    /// `(upper_bound, cumulative_count)` pairs, ordered by upper bound.
    pub buckets: Vec<(f64, u64)>,
}
