//! Module implementing a labelled metric family.
//!
//! See [`Family`] for details.

use super::{CollectMetric, MetricType, TypedMetric};
use crate::model::Metric;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// A set of metrics with the same name, help text and type, differentiated
/// by their label values thus spanning a multidimensional space.
///
/// # Generic over the label set
///
/// A [`Family`] is generic over the label type. For convenience one might
/// choose a `Vec<(String, String)>`, for performance and/or type safety one
/// might use a fixed size array such as `[(&'static str, String); 2]`.
///
/// ```
/// # use sumo_bridge::metrics::counter::Counter;
/// # use sumo_bridge::metrics::family::Family;
/// # use sumo_bridge::registry::Registry;
/// # use sumo_bridge::gather::Gatherer;
/// #
/// let mut registry = Registry::default();
/// let family = Family::<Vec<(String, String)>, Counter>::default();
/// registry.register("requests", "Requests handled", family.clone());
///
/// // Record a single HTTP GET request.
/// family.get_or_create(&vec![("method".to_owned(), "GET".to_owned())]).inc();
///
/// let families = registry.gather().unwrap();
/// assert_eq!(1, families[0].metrics().len());
/// ```
pub struct Family<S, M, C = fn() -> M> {
    metrics: Arc<RwLock<HashMap<S, M>>>,
    /// Function that when called constructs a new metric.
    ///
    /// For most metric types this would simply be its [`Default`]
    /// implementation set through [`Family::default`]. For metric types that
    /// need custom construction logic a custom constructor is set via
    /// [`Family::new_with_constructor`].
    constructor: C,
}

impl<S: std::fmt::Debug, M: std::fmt::Debug, C> std::fmt::Debug for Family<S, M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Family")
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// A constructor for creating new metrics in a [`Family`] when calling
/// [`Family::get_or_create`]. Such constructor is provided via
/// [`Family::new_with_constructor`].
pub trait MetricConstructor<M> {
    /// Create a new instance of the metric type.
    fn new_metric(&self) -> M;
}

impl<M, F: Fn() -> M> MetricConstructor<M> for F {
    fn new_metric(&self) -> M {
        self()
    }
}

/// A label set identifying one metric within a [`Family`].
pub trait LabelSet {
    /// The label pairs in encoding order.
    fn labels(&self) -> Vec<(String, String)>;
}

impl<K: AsRef<str>, V: AsRef<str>> LabelSet for Vec<(K, V)> {
    fn labels(&self) -> Vec<(String, String)> {
        self.as_slice().labels()
    }
}

impl<K: AsRef<str>, V: AsRef<str>, const N: usize> LabelSet for [(K, V); N] {
    fn labels(&self) -> Vec<(String, String)> {
        self.as_slice().labels()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> LabelSet for [(K, V)] {
    fn labels(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned()))
            .collect()
    }
}

impl LabelSet for () {
    fn labels(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

impl<S: Clone + std::hash::Hash + Eq, M: Default> Default for Family<S, M> {
    fn default() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(Default::default())),
            constructor: M::default,
        }
    }
}

impl<S: Clone + std::hash::Hash + Eq, M, C> Family<S, M, C> {
    /// Create a metric family using a custom constructor to construct new
    /// metrics.
    ///
    /// ```
    /// # use sumo_bridge::metrics::family::Family;
    /// # use sumo_bridge::metrics::gauge::Gauge;
    /// let family = Family::<Vec<(String, String)>, Gauge>::new_with_constructor(|| {
    ///     let gauge = Gauge::default();
    ///     gauge.set(1);
    ///     gauge
    /// });
    /// assert_eq!(1, family.get_or_create(&vec![]).get());
    /// ```
    pub fn new_with_constructor(constructor: C) -> Self {
        Self {
            metrics: Arc::new(RwLock::new(Default::default())),
            constructor,
        }
    }
}

impl<S: Clone + std::hash::Hash + Eq, M, C: MetricConstructor<M>> Family<S, M, C> {
    /// Access a metric with the given label set, creating it if one does not
    /// yet exist.
    ///
    /// ```
    /// # use sumo_bridge::metrics::counter::Counter;
    /// # use sumo_bridge::metrics::family::Family;
    /// #
    /// let family = Family::<Vec<(String, String)>, Counter>::default();
    ///
    /// // Will create the metric with label `method="GET"` on first call and
    /// // return a reference.
    /// family.get_or_create(&vec![("method".to_owned(), "GET".to_owned())]).inc();
    ///
    /// // Will return a reference to the existing metric on all subsequent
    /// // calls.
    /// family.get_or_create(&vec![("method".to_owned(), "GET".to_owned())]).inc();
    /// ```
    pub fn get_or_create(&self, label_set: &S) -> MappedRwLockReadGuard<'_, M> {
        if let Ok(metric) =
            RwLockReadGuard::try_map(self.metrics.read(), |metrics| metrics.get(label_set))
        {
            return metric;
        }

        let mut write_guard = self.metrics.write();
        write_guard
            .entry(label_set.clone())
            .or_insert_with(|| self.constructor.new_metric());

        let read_guard = RwLockWriteGuard::downgrade(write_guard);
        RwLockReadGuard::map(read_guard, |metrics| {
            metrics
                .get(label_set)
                .expect("Metric to exist after creating it.")
        })
    }

    /// Remove a label set from the family, returning whether it existed.
    pub fn remove(&self, label_set: &S) -> bool {
        self.metrics.write().remove(label_set).is_some()
    }

    /// Drop all label sets.
    pub fn clear(&self) {
        self.metrics.write().clear()
    }
}

impl<S, M, C: Clone> Clone for Family<S, M, C> {
    fn clone(&self) -> Self {
        Family {
            metrics: self.metrics.clone(),
            constructor: self.constructor.clone(),
        }
    }
}

impl<S, M: TypedMetric, C> TypedMetric for Family<S, M, C> {
    const TYPE: MetricType = <M as TypedMetric>::TYPE;
}

impl<S, M, C> CollectMetric for Family<S, M, C>
where
    S: LabelSet + Clone + std::hash::Hash + Eq,
    M: CollectMetric + TypedMetric,
{
    fn collect(&self) -> Vec<Metric> {
        let mut collected: Vec<Metric> = self
            .metrics
            .read()
            .iter()
            .flat_map(|(label_set, metric)| {
                let labels = label_set.labels();
                metric
                    .collect()
                    .into_iter()
                    .map(move |m| m.with_const_labels(&labels))
            })
            .collect();

        // Hash map order is arbitrary, sort for a stable payload.
        collected.sort_by(|a, b| a.labels().cmp(b.labels()));
        collected
    }

    fn metric_type(&self) -> MetricType {
        <M as TypedMetric>::TYPE
    }
}
