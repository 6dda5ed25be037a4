//! Metric type implementations.

pub mod counter;
pub mod family;
pub mod gauge;

use crate::model::Metric;

/// A metric that is aware of its metric type.
pub trait TypedMetric {
    /// The metric type.
    const TYPE: MetricType = MetricType::Untyped;
}

/// Metric type as announced on the `# TYPE` line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricType {
    /// Returns the given metric type's str representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
            MetricType::Untyped => "untyped",
        }
    }
}

/// Trait implemented by each live metric type, e.g.
/// [`Counter`](counter::Counter), to snapshot its current value(s).
pub trait CollectMetric {
    /// Snapshot the current samples of the instance.
    fn collect(&self) -> Vec<Metric>;

    /// The metric type of the instance.
    // One can not use [`TypedMetric`] directly, as associated constants are not
    // object safe and thus can not be used with dynamic dispatching.
    fn metric_type(&self) -> MetricType;
}

/// Number types a metric can be read as.
pub trait SampleValue: Copy {
    /// Lossy conversion into the exposition value type.
    fn to_f64(self) -> f64;
}

impl SampleValue for u64 {
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl SampleValue for i64 {
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl SampleValue for f64 {
    fn to_f64(self) -> f64 {
        self
    }
}
