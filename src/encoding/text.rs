//! Prometheus text exposition format (version 0.0.4).
//!
//! ```
//! # use sumo_bridge::encoding::text::TextEncoder;
//! # use sumo_bridge::metrics::MetricType;
//! # use sumo_bridge::model::{Metric, MetricFamily};
//! #
//! let family = MetricFamily::new("requests_total", "", MetricType::Counter)
//!     .with_metric(Metric::counter(5.0).with_label("method", "GET"));
//!
//! let mut encoder = TextEncoder::new();
//! encoder.encode(&family).unwrap();
//! let buffer = encoder.finish();
//!
//! let expected = "# TYPE requests_total counter\n".to_owned()
//!     + "requests_total{method=\"GET\"} 5\n";
//! assert_eq!(expected, String::from_utf8(buffer).unwrap());
//! ```

use std::collections::HashSet;
use std::fmt::Write;

use super::{is_valid_legacy_label_name, is_valid_legacy_metric_name, EncodeError};
use crate::metrics::MetricType;
use crate::model::{HistogramValue, Metric, MetricFamily, SummaryValue, Value};

/// Encodes [`MetricFamily`] snapshots into a single text payload.
///
/// Each family is written to a scratch buffer first and only appended to the
/// payload once it encoded completely, so a failing family never leaves a
/// partial block behind.
#[derive(Debug, Default)]
pub struct TextEncoder {
    buffer: String,
    scratch: String,
}

impl TextEncoder {
    /// Create an encoder with an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `family` to the payload.
    ///
    /// On error the payload is left as it was before the call.
    pub fn encode(&mut self, family: &MetricFamily) -> Result<(), EncodeError> {
        validate(family)?;

        self.scratch.clear();
        FamilyEncoder {
            writer: &mut self.scratch,
            family,
        }
        .encode()
        .expect("writing to a String never fails");
        self.buffer.push_str(&self.scratch);
        Ok(())
    }

    /// Complete the payload.
    pub fn finish(self) -> Vec<u8> {
        self.buffer.into_bytes()
    }
}

/// Encode `families` in order, skipping those that fail to encode.
///
/// `on_skip` is called once for every skipped family.
pub fn encode_families<F>(families: &[MetricFamily], mut on_skip: F) -> Vec<u8>
where
    F: FnMut(&MetricFamily, &EncodeError),
{
    let mut encoder = TextEncoder::new();
    for family in families {
        if let Err(e) = encoder.encode(family) {
            on_skip(family, &e);
        }
    }
    encoder.finish()
}

fn validate(family: &MetricFamily) -> Result<(), EncodeError> {
    if !is_valid_legacy_metric_name(family.name()) {
        return Err(EncodeError::InvalidMetricName(family.name().to_owned()));
    }
    if family.metrics().is_empty() {
        return Err(EncodeError::NoMetrics(family.name().to_owned()));
    }

    let reserved = match family.metric_type() {
        MetricType::Histogram => Some("le"),
        MetricType::Summary => Some("quantile"),
        _ => None,
    };

    let mut seen = HashSet::new();
    for metric in family.metrics() {
        let found = metric.value().metric_type();
        if found != family.metric_type() {
            return Err(EncodeError::TypeMismatch {
                family: family.name().to_owned(),
                expected: family.metric_type().as_str(),
                found: found.as_str(),
            });
        }

        seen.clear();
        for (name, _) in metric.labels() {
            if !is_valid_legacy_label_name(name) {
                return Err(EncodeError::InvalidLabelName {
                    family: family.name().to_owned(),
                    label: name.clone(),
                });
            }
            if reserved == Some(name.as_str()) {
                return Err(EncodeError::ReservedLabelName {
                    family: family.name().to_owned(),
                    label: name.clone(),
                    metric_type: family.metric_type().as_str(),
                });
            }
            if !seen.insert(name.as_str()) {
                return Err(EncodeError::DuplicateLabelName {
                    family: family.name().to_owned(),
                    label: name.clone(),
                });
            }
        }
    }

    Ok(())
}

struct FamilyEncoder<'a> {
    writer: &'a mut String,
    family: &'a MetricFamily,
}

impl FamilyEncoder<'_> {
    fn encode(&mut self) -> Result<(), std::fmt::Error> {
        let name = self.family.name();
        if !self.family.help().is_empty() {
            self.writer.write_str("# HELP ")?;
            self.writer.write_str(name)?;
            self.writer.write_str(" ")?;
            write_escaped(self.writer, self.family.help(), false)?;
            self.writer.write_str("\n")?;
        }

        self.writer.write_str("# TYPE ")?;
        self.writer.write_str(name)?;
        self.writer.write_str(" ")?;
        self.writer.write_str(self.family.metric_type().as_str())?;
        self.writer.write_str("\n")?;

        for metric in self.family.metrics() {
            match metric.value() {
                Value::Counter(v) | Value::Gauge(v) | Value::Untyped(v) => {
                    self.sample(metric, "", None, *v)?;
                }
                Value::Summary(summary) => self.summary(metric, summary)?,
                Value::Histogram(histogram) => self.histogram(metric, histogram)?,
            }
        }

        Ok(())
    }

    fn summary(&mut self, metric: &Metric, summary: &SummaryValue) -> Result<(), std::fmt::Error> {
        for (quantile, value) in summary.quantiles.iter() {
            self.sample(metric, "", Some(("quantile", *quantile)), *value)?;
        }
        self.sample(metric, "_sum", None, summary.sample_sum)?;
        self.sample(metric, "_count", None, summary.sample_count as f64)
    }

    fn histogram(
        &mut self,
        metric: &Metric,
        histogram: &HistogramValue,
    ) -> Result<(), std::fmt::Error> {
        for (upper_bound, count) in histogram.buckets.iter() {
            self.sample(metric, "_bucket", Some(("le", *upper_bound)), *count as f64)?;
        }
        let has_inf = histogram
            .buckets
            .last()
            .map(|(upper_bound, _)| *upper_bound == f64::INFINITY)
            .unwrap_or(false);
        if !has_inf {
            self.sample(
                metric,
                "_bucket",
                Some(("le", f64::INFINITY)),
                histogram.sample_count as f64,
            )?;
        }
        self.sample(metric, "_sum", None, histogram.sample_sum)?;
        self.sample(metric, "_count", None, histogram.sample_count as f64)
    }

    fn sample(
        &mut self,
        metric: &Metric,
        suffix: &str,
        additional_label: Option<(&str, f64)>,
        value: f64,
    ) -> Result<(), std::fmt::Error> {
        self.writer.write_str(self.family.name())?;
        self.writer.write_str(suffix)?;

        if !metric.labels().is_empty() || additional_label.is_some() {
            self.writer.write_str("{")?;
            let mut first = true;
            for (name, value) in metric.labels() {
                if !first {
                    self.writer.write_str(",")?;
                }
                first = false;
                self.writer.write_str(name)?;
                self.writer.write_str("=\"")?;
                write_escaped(self.writer, value, true)?;
                self.writer.write_str("\"")?;
            }
            if let Some((name, value)) = additional_label {
                if !first {
                    self.writer.write_str(",")?;
                }
                self.writer.write_str(name)?;
                self.writer.write_str("=\"")?;
                write_value(self.writer, value)?;
                self.writer.write_str("\"")?;
            }
            self.writer.write_str("}")?;
        }

        self.writer.write_str(" ")?;
        write_value(self.writer, value)?;

        if let Some(timestamp_ms) = metric.timestamp_ms() {
            self.writer.write_str(" ")?;
            self.writer
                .write_str(itoa::Buffer::new().format(timestamp_ms))?;
        }

        self.writer.write_str("\n")
    }
}

/// Writes `v` the way Go's `strconv.FormatFloat(v, 'g', -1, 64)` does,
/// which is what Prometheus client libraries put on the wire.
fn write_value<W: Write>(writer: &mut W, v: f64) -> Result<(), std::fmt::Error> {
    if v.is_nan() {
        return writer.write_str("NaN");
    } else if v == f64::INFINITY {
        return writer.write_str("+Inf");
    } else if v == f64::NEG_INFINITY {
        return writer.write_str("-Inf");
    } else if v == 0.0 {
        return writer.write_str("0");
    }

    if v < 0.0 {
        writer.write_str("-")?;
    }
    let mut buffer = dtoa::Buffer::new();
    let (digits, point) = shortest_digits(buffer.format(v.abs()));
    let exponent = point - 1;

    if !(-4..6).contains(&exponent) {
        writer.write_str(&digits[..1])?;
        if digits.len() > 1 {
            writer.write_str(".")?;
            writer.write_str(&digits[1..])?;
        }
        writer.write_str(if exponent < 0 { "e-" } else { "e+" })?;
        let exponent = exponent.unsigned_abs();
        if exponent < 10 {
            writer.write_str("0")?;
        }
        return writer.write_str(itoa::Buffer::new().format(exponent));
    }

    if point <= 0 {
        writer.write_str("0.")?;
        for _ in point..0 {
            writer.write_str("0")?;
        }
        return writer.write_str(&digits);
    }

    let point = point as usize;
    if digits.len() <= point {
        writer.write_str(&digits)?;
        for _ in digits.len()..point {
            writer.write_str("0")?;
        }
        Ok(())
    } else {
        writer.write_str(&digits[..point])?;
        writer.write_str(".")?;
        writer.write_str(&digits[point..])
    }
}

/// Splits a positive `dtoa` rendering into its significant digits and the
/// position of the decimal point relative to them, i.e. `0.<digits> * 10^point`.
fn shortest_digits(formatted: &str) -> (String, i32) {
    let (mantissa, exponent) = match formatted.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (formatted, 0),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mut point = int.len() as i32 + exponent;
    let mut digits: String = int.chars().chain(frac.chars()).collect();
    while digits.starts_with('0') {
        digits.remove(0);
        point -= 1;
    }
    digits.truncate(digits.trim_end_matches('0').len());
    (digits, point)
}

fn write_escaped<W: Write>(
    writer: &mut W,
    s: &str,
    escape_quotes: bool,
) -> Result<(), std::fmt::Error> {
    let mut rest = s;
    while let Some(i) = rest.find(['\\', '\n', '"']) {
        let (plain, tail) = rest.split_at(i);
        writer.write_str(plain)?;
        match tail.as_bytes()[0] {
            b'\\' => writer.write_str("\\\\")?,
            b'\n' => writer.write_str("\\n")?,
            _ if escape_quotes => writer.write_str("\\\"")?,
            _ => writer.write_str("\"")?,
        }
        rest = &tail[1..];
    }
    writer.write_str(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gather::Gatherer;
    use crate::metrics::counter::Counter;
    use crate::metrics::family::Family;
    use crate::registry::Registry;

    fn encode(families: &[MetricFamily]) -> String {
        String::from_utf8(encode_families(families, |_, _| {})).unwrap()
    }

    #[test]
    fn encode_counter() {
        let family = MetricFamily::new("requests_total", "", MetricType::Counter)
            .with_metric(Metric::counter(5.0).with_label("method", "GET"));

        let expected = "# TYPE requests_total counter\n".to_owned()
            + "requests_total{method=\"GET\"} 5\n";
        assert_eq!(expected, encode(&[family]));
    }

    #[test]
    fn encode_gauge_with_help_and_timestamp() {
        let family = MetricFamily::new("temperature", "Room temperature", MetricType::Gauge)
            .with_metric(Metric::gauge(21.5).with_timestamp_ms(1_700_000_000_000));

        let expected = "# HELP temperature Room temperature\n".to_owned()
            + "# TYPE temperature gauge\n"
            + "temperature 21.5 1700000000000\n";
        assert_eq!(expected, encode(&[family]));
    }

    #[test]
    fn empty_input_yields_empty_payload() {
        assert!(encode_families(&[], |_, _| panic!("nothing to skip")).is_empty());
        assert!(TextEncoder::new().finish().is_empty());
    }

    #[test]
    fn family_without_metrics_is_skipped() {
        let mut skipped = Vec::new();
        let buffer = encode_families(&[MetricFamily::new("idle", "", MetricType::Gauge)], |_, e| {
            skipped.push(e.clone())
        });

        assert!(buffer.is_empty());
        assert_eq!(vec![EncodeError::NoMetrics("idle".to_owned())], skipped);
    }

    #[test]
    fn const_label_clash_skips_family() {
        let mut registry = Registry::with_labels([("method", "const")]);
        let requests = Family::<Vec<(String, String)>, Counter>::default();
        registry.register("requests_total", "", requests.clone());
        requests
            .get_or_create(&vec![("method".to_owned(), "GET".to_owned())])
            .inc();

        let mut skipped = Vec::new();
        let buffer = encode_families(&registry.gather().unwrap(), |_, e| skipped.push(e.clone()));

        assert!(buffer.is_empty());
        assert_eq!(
            vec![EncodeError::DuplicateLabelName {
                family: "requests_total".to_owned(),
                label: "method".to_owned(),
            }],
            skipped
        );
    }

    #[test]
    fn invalid_family_is_skipped_and_order_preserved() {
        let families = vec![
            MetricFamily::new("first", "", MetricType::Gauge).with_metric(Metric::gauge(1.0)),
            MetricFamily::new("not valid", "", MetricType::Gauge).with_metric(Metric::gauge(2.0)),
            MetricFamily::new("third", "", MetricType::Gauge).with_metric(Metric::gauge(3.0)),
        ];

        let mut skipped = Vec::new();
        let buffer = encode_families(&families, |family, e| {
            skipped.push((family.name().to_owned(), e.clone()))
        });

        let expected = "# TYPE first gauge\n".to_owned()
            + "first 1\n"
            + "# TYPE third gauge\n"
            + "third 3\n";
        assert_eq!(expected, String::from_utf8(buffer).unwrap());
        assert_eq!(
            vec![(
                "not valid".to_owned(),
                EncodeError::InvalidMetricName("not valid".to_owned())
            )],
            skipped
        );
    }

    #[test]
    fn failed_family_leaves_payload_untouched() {
        let mut encoder = TextEncoder::new();
        encoder
            .encode(&MetricFamily::new("ok", "", MetricType::Counter).with_metric(Metric::counter(1.0)))
            .unwrap();

        let mismatched = MetricFamily::new("mixed", "", MetricType::Counter)
            .with_metric(Metric::counter(1.0))
            .with_metric(Metric::gauge(2.0));
        assert_eq!(
            Err(EncodeError::TypeMismatch {
                family: "mixed".to_owned(),
                expected: "counter",
                found: "gauge",
            }),
            encoder.encode(&mismatched)
        );

        assert_eq!(
            "# TYPE ok counter\nok 1\n",
            String::from_utf8(encoder.finish()).unwrap()
        );
    }

    #[test]
    fn label_errors() {
        struct Scenario {
            family: MetricFamily,
            expected: EncodeError,
        }

        let scenarios = vec![
            Scenario {
                family: MetricFamily::new("jobs", "", MetricType::Gauge)
                    .with_metric(Metric::gauge(1.0).with_label("0queue", "a")),
                expected: EncodeError::InvalidLabelName {
                    family: "jobs".to_owned(),
                    label: "0queue".to_owned(),
                },
            },
            Scenario {
                family: MetricFamily::new("jobs", "", MetricType::Gauge).with_metric(
                    Metric::gauge(1.0)
                        .with_label("queue", "a")
                        .with_label("queue", "b"),
                ),
                expected: EncodeError::DuplicateLabelName {
                    family: "jobs".to_owned(),
                    label: "queue".to_owned(),
                },
            },
            Scenario {
                family: MetricFamily::new("latency", "", MetricType::Histogram).with_metric(
                    Metric::new(Value::Histogram(HistogramValue::default())).with_label("le", "1"),
                ),
                expected: EncodeError::ReservedLabelName {
                    family: "latency".to_owned(),
                    label: "le".to_owned(),
                    metric_type: "histogram",
                },
            },
            Scenario {
                family: MetricFamily::new("rpc", "", MetricType::Summary).with_metric(
                    Metric::new(Value::Summary(SummaryValue::default()))
                        .with_label("quantile", "0.5"),
                ),
                expected: EncodeError::ReservedLabelName {
                    family: "rpc".to_owned(),
                    label: "quantile".to_owned(),
                    metric_type: "summary",
                },
            },
        ];

        for scenario in scenarios {
            let mut encoder = TextEncoder::new();
            assert_eq!(Err(scenario.expected), encoder.encode(&scenario.family));
        }
    }

    #[test]
    fn le_is_allowed_outside_histograms() {
        let family = MetricFamily::new("jobs", "", MetricType::Gauge)
            .with_metric(Metric::gauge(1.0).with_label("le", "x"));
        assert_eq!("# TYPE jobs gauge\njobs{le=\"x\"} 1\n", encode(&[family]));
    }

    #[test]
    fn encode_histogram() {
        let family = MetricFamily::new("latency_seconds", "Request latency", MetricType::Histogram)
            .with_metric(
                Metric::new(Value::Histogram(HistogramValue {
                    sample_count: 4,
                    sample_sum: 2.5,
                    buckets: vec![(0.5, 1), (1.0, 3)],
                }))
                .with_label("path", "/"),
            );

        let expected = "# HELP latency_seconds Request latency\n".to_owned()
            + "# TYPE latency_seconds histogram\n"
            + "latency_seconds_bucket{path=\"/\",le=\"0.5\"} 1\n"
            + "latency_seconds_bucket{path=\"/\",le=\"1\"} 3\n"
            + "latency_seconds_bucket{path=\"/\",le=\"+Inf\"} 4\n"
            + "latency_seconds_sum{path=\"/\"} 2.5\n"
            + "latency_seconds_count{path=\"/\"} 4\n";
        assert_eq!(expected, encode(&[family]));
    }

    #[test]
    fn histogram_with_explicit_inf_bucket() {
        let family = MetricFamily::new("size", "", MetricType::Histogram).with_metric(Metric::new(
            Value::Histogram(HistogramValue {
                sample_count: 2,
                sample_sum: 3.0,
                buckets: vec![(1.0, 1), (f64::INFINITY, 2)],
            }),
        ));

        let expected = "# TYPE size histogram\n".to_owned()
            + "size_bucket{le=\"1\"} 1\n"
            + "size_bucket{le=\"+Inf\"} 2\n"
            + "size_sum 3\n"
            + "size_count 2\n";
        assert_eq!(expected, encode(&[family]));
    }

    #[test]
    fn encode_summary() {
        let family = MetricFamily::new("rpc_seconds", "", MetricType::Summary).with_metric(
            Metric::new(Value::Summary(SummaryValue {
                sample_count: 10,
                sample_sum: 1.25,
                quantiles: vec![(0.5, 0.1), (0.99, 0.4)],
            })),
        );

        let expected = "# TYPE rpc_seconds summary\n".to_owned()
            + "rpc_seconds{quantile=\"0.5\"} 0.1\n"
            + "rpc_seconds{quantile=\"0.99\"} 0.4\n"
            + "rpc_seconds_sum 1.25\n"
            + "rpc_seconds_count 10\n";
        assert_eq!(expected, encode(&[family]));
    }

    #[test]
    fn escaping() {
        let family = MetricFamily::new("paths", "Path \\ with\nnewline \"quoted\"", MetricType::Untyped)
            .with_metric(Metric::untyped(1.0).with_label("path", "C:\\dir\n\"x\""));

        let expected = "# HELP paths Path \\\\ with\\nnewline \"quoted\"\n".to_owned()
            + "# TYPE paths untyped\n"
            + "paths{path=\"C:\\\\dir\\n\\\"x\\\"\"} 1\n";
        assert_eq!(expected, encode(&[family]));
    }

    #[test]
    fn value_formatting() {
        struct Scenario {
            input: f64,
            expected: &'static str,
        }

        let scenarios = vec![
            Scenario {
                input: 5.0,
                expected: "5",
            },
            Scenario {
                input: -3.0,
                expected: "-3",
            },
            Scenario {
                input: 0.25,
                expected: "0.25",
            },
            Scenario {
                input: 123456.0,
                expected: "123456",
            },
            Scenario {
                input: 1e6,
                expected: "1e+06",
            },
            Scenario {
                input: 1234567.0,
                expected: "1.234567e+06",
            },
            Scenario {
                input: 1e16,
                expected: "1e+16",
            },
            Scenario {
                input: -1.5e300,
                expected: "-1.5e+300",
            },
            Scenario {
                input: 0.0001,
                expected: "0.0001",
            },
            Scenario {
                input: 0.00001,
                expected: "1e-05",
            },
            Scenario {
                input: 2.5e-7,
                expected: "2.5e-07",
            },
            Scenario {
                input: 1.0 / 3.0,
                expected: "0.3333333333333333",
            },
            Scenario {
                input: -0.0,
                expected: "0",
            },
            Scenario {
                input: f64::INFINITY,
                expected: "+Inf",
            },
            Scenario {
                input: f64::NEG_INFINITY,
                expected: "-Inf",
            },
            Scenario {
                input: f64::NAN,
                expected: "NaN",
            },
        ];

        for scenario in scenarios {
            let mut out = String::new();
            write_value(&mut out, scenario.input).unwrap();
            assert_eq!(scenario.expected, out, "{}", scenario.input);
        }
    }
}
