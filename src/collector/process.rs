//! Process metrics read from `/proc/self`.

use procfs::process::{LimitValue, Process, Stat};

use super::Collector;
use crate::gather::GatherError;
use crate::metrics::MetricType;
use crate::model::{Metric, MetricFamily};

/// Collects CPU, memory, file descriptor and start time metrics of the
/// current process.
///
/// ```
/// # use sumo_bridge::collector::process::ProcessCollector;
/// # use sumo_bridge::registry::Registry;
/// let mut registry = Registry::default();
/// registry.register_collector(Box::new(ProcessCollector::with_namespace("bridge")));
/// ```
#[derive(Debug)]
pub struct ProcessCollector {
    namespace: String,
    page_size: u64,
    ticks_per_second: u64,
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::load(None)
    }
}

impl ProcessCollector {
    /// Prefix every metric name with `<namespace>_`.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self::load(Some(namespace.into()))
    }

    fn load(namespace: Option<String>) -> Self {
        let namespace = match namespace {
            Some(mut n) if !n.is_empty() => {
                n.push('_');
                n
            }
            _ => String::new(),
        };

        Self {
            namespace,
            page_size: procfs::page_size(),
            ticks_per_second: procfs::ticks_per_second(),
        }
    }

    fn family(&self, name: &str, help: &str, metric_type: MetricType, value: f64) -> MetricFamily {
        let metric = match metric_type {
            MetricType::Counter => Metric::counter(value),
            _ => Metric::gauge(value),
        };
        MetricFamily::new(format!("{}{}", self.namespace, name), help, metric_type)
            .with_metric(metric)
    }

    fn from_stat(&self, stat: &Stat, families: &mut Vec<MetricFamily>) {
        let tps = self.ticks_per_second.max(1) as f64;
        families.push(self.family(
            "process_cpu_seconds_total",
            "Total user and system CPU time spent in seconds.",
            MetricType::Counter,
            (stat.utime + stat.stime) as f64 / tps,
        ));
        families.push(self.family(
            "process_virtual_memory_bytes",
            "Virtual memory size in bytes.",
            MetricType::Gauge,
            stat.vsize as f64,
        ));
        families.push(self.family(
            "process_resident_memory_bytes",
            "Resident memory size in bytes.",
            MetricType::Gauge,
            (stat.rss * self.page_size) as f64,
        ));
        if let Ok(boot_time) = procfs::boot_time_secs() {
            families.push(self.family(
                "process_start_time_seconds",
                "Start time of the process since unix epoch in seconds.",
                MetricType::Gauge,
                boot_time as f64 + stat.starttime as f64 / tps,
            ));
        }
    }
}

fn limit(value: &LimitValue) -> Option<u64> {
    match value {
        LimitValue::Unlimited => None,
        LimitValue::Value(v) => Some(*v),
    }
}

impl Collector for ProcessCollector {
    fn collect(&self) -> Result<Vec<MetricFamily>, GatherError> {
        let proc = Process::myself()
            .map_err(|e| GatherError::new(format!("reading /proc/self: {e}")))?;

        let mut families = Vec::with_capacity(7);
        let mut errors = Vec::new();

        match proc.stat() {
            Ok(stat) => self.from_stat(&stat, &mut families),
            Err(e) => errors.push(format!("reading process stat: {e}")),
        }

        match proc.fd_count() {
            Ok(open_fds) => families.push(self.family(
                "process_open_fds",
                "Number of open file descriptors.",
                MetricType::Gauge,
                open_fds as f64,
            )),
            Err(e) => errors.push(format!("counting open fds: {e}")),
        }

        match proc.limits() {
            Ok(limits) => {
                let max_fds = limit(&limits.max_open_files.soft_limit)
                    .or_else(|| limit(&limits.max_open_files.hard_limit))
                    .unwrap_or(0);
                families.push(self.family(
                    "process_max_fds",
                    "Maximum number of open file descriptors.",
                    MetricType::Gauge,
                    max_fds as f64,
                ));

                // Unlimited address space is reported as -1.
                let max_vm = limit(&limits.max_address_space.soft_limit)
                    .map(|v| v as f64)
                    .unwrap_or(-1.0);
                families.push(self.family(
                    "process_virtual_memory_max_bytes",
                    "Maximum amount of virtual memory available in bytes.",
                    MetricType::Gauge,
                    max_vm,
                ));
            }
            Err(e) => errors.push(format!("reading process limits: {e}")),
        }

        if errors.is_empty() {
            Ok(families)
        } else {
            Err(GatherError::with_families(errors.join("; "), families))
        }
    }
}
