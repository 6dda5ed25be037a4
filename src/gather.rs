//! Metric sources.
//!
//! See [`Gatherer`] for details.

use crate::model::MetricFamily;

/// A source producing metric families on demand.
///
/// The bridge calls [`Gatherer::gather`] once per tick and only ever reads
/// through a shared reference. Implementations take care of their own
/// synchronization.
///
/// ```
/// # use sumo_bridge::gather::{GatherError, Gatherer};
/// # use sumo_bridge::metrics::MetricType;
/// # use sumo_bridge::model::{Metric, MetricFamily};
/// #[derive(Debug)]
/// struct Static;
///
/// impl Gatherer for Static {
///     fn gather(&self) -> Result<Vec<MetricFamily>, GatherError> {
///         Ok(vec![MetricFamily::new("up", "", MetricType::Gauge)
///             .with_metric(Metric::gauge(1.0))])
///     }
/// }
/// ```
pub trait Gatherer: std::fmt::Debug + Send + Sync + 'static {
    /// Produce the current metric families.
    ///
    /// On failure the returned [`GatherError`] may still carry the families
    /// that could be gathered.
    fn gather(&self) -> Result<Vec<MetricFamily>, GatherError>;
}

/// The metric source failed.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct GatherError {
    message: String,
    families: Vec<MetricFamily>,
}

impl GatherError {
    /// An error without any gathered families.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            families: Vec::new(),
        }
    }

    /// An error for a partially successful gather.
    pub fn with_families(message: impl Into<String>, families: Vec<MetricFamily>) -> Self {
        Self {
            message: message.into(),
            families,
        }
    }

    /// The families gathered despite the failure.
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    /// Consume the error, returning the families gathered despite the failure.
    pub fn into_families(self) -> Vec<MetricFamily> {
        self.families
    }
}
