//! Exposition format implementations.

pub mod text;

/// A metric family that could not be encoded.
///
/// Encoding failures are scoped to a single family; the encoder skips the
/// family and carries on with the next one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    /// The family has an empty or otherwise invalid metric name.
    #[error("invalid metric name {0:?}")]
    InvalidMetricName(String),
    /// A metric carries a label name that is not a valid label name.
    #[error("invalid label name {label:?} in metric family {family}")]
    InvalidLabelName {
        /// The family name.
        family: String,
        /// The offending label name.
        label: String,
    },
    /// The family has no metrics to encode.
    #[error("metric family {0} has no metrics")]
    NoMetrics(String),
    /// A metric carries the same label name more than once.
    #[error("duplicate label name {label:?} in metric family {family}")]
    DuplicateLabelName {
        /// The family name.
        family: String,
        /// The repeated label name.
        label: String,
    },
    /// A metric uses a label name reserved for its type (`le`, `quantile`).
    #[error("label {label:?} is reserved for {metric_type} metric family {family}")]
    ReservedLabelName {
        /// The family name.
        family: String,
        /// The offending label name.
        label: String,
        /// The family type.
        metric_type: &'static str,
    },
    /// A metric's value does not match the declared family type.
    #[error("expected {expected} value in metric family {family}, found {found}")]
    TypeMismatch {
        /// The family name.
        family: String,
        /// The declared family type.
        expected: &'static str,
        /// The type of the offending value.
        found: &'static str,
    },
}

fn is_valid_legacy_char(c: char, i: usize) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || (c.is_ascii_digit() && i > 0)
}

pub(crate) fn is_valid_legacy_metric_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    for (i, c) in name.chars().enumerate() {
        if !is_valid_legacy_char(c, i) {
            return false;
        }
    }
    true
}

pub(crate) fn is_valid_legacy_label_name(label_name: &str) -> bool {
    if label_name.is_empty() {
        return false;
    }
    for (i, b) in label_name.chars().enumerate() {
        if !(b.is_ascii_alphabetic() || b == '_' || (b.is_ascii_digit() && i > 0)) {
            return false;
        }
    }
    true
}
