//! Metric family model.
//!
//! A [`MetricFamily`] is the unit handed from a collector to the exposition
//! layer: a name, help text, label schema and the samples for one cycle.

/// Label carrying the Dkron job name on every exported sample.
pub const JOB_LABEL: &str = "jobname";

/// Kind of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    StateSet,
    Info,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::StateSet => write!(f, "stateset"),
            MetricKind::Info => write!(f, "info"),
        }
    }
}

/// Value of a single state in a state-set sample.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    /// A derived boolean.
    Flag(bool),
    /// An upstream string kept verbatim. Set when non-empty.
    Raw(String),
}

impl StateValue {
    pub fn is_set(&self) -> bool {
        match self {
            StateValue::Flag(flag) => *flag,
            StateValue::Raw(raw) => !raw.is_empty(),
        }
    }
}

/// Value of a single sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleValue {
    Counter(u64),
    Gauge(f64),
    States(Vec<(String, StateValue)>),
    /// Descriptive attributes. Absent attributes are left out.
    Info(Vec<(String, String)>),
}

impl SampleValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            SampleValue::Counter(_) => MetricKind::Counter,
            SampleValue::Gauge(_) => MetricKind::Gauge,
            SampleValue::States(_) => MetricKind::StateSet,
            SampleValue::Info(_) => MetricKind::Info,
        }
    }

    /// Look up a state by key in a state-set value.
    pub fn state(&self, key: &str) -> Option<&StateValue> {
        match self {
            SampleValue::States(states) => states.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// One observation within a family.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Values for the family's label names, in schema order.
    pub label_values: Vec<String>,
    pub value: SampleValue,
}

/// A named set of samples sharing a kind and label schema.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    name: String,
    help: String,
    kind: MetricKind,
    label_names: Vec<String>,
    samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        kind: MetricKind,
        label_names: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
            samples: Vec::new(),
        }
    }

    /// Append a sample.
    ///
    /// The value kind must match the family kind and one label value must be
    /// given per label name.
    pub fn add_metric(&mut self, label_values: &[&str], value: SampleValue) {
        debug_assert_eq!(value.kind(), self.kind, "sample kind mismatch in {}", self.name);
        debug_assert_eq!(
            label_values.len(),
            self.label_names.len(),
            "label arity mismatch in {}",
            self.name
        );
        self.samples.push(Sample {
            label_values: label_values.iter().map(|s| s.to_string()).collect(),
            value,
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The first sample whose leading label value is `job`.
    pub fn sample_for(&self, job: &str) -> Option<&Sample> {
        self.samples
            .iter()
            .find(|s| s.label_values.first().map(String::as_str) == Some(job))
    }

    /// Leading label values of all samples, in order.
    pub fn job_names(&self) -> Vec<&str> {
        self.samples
            .iter()
            .filter_map(|s| s.label_values.first().map(String::as_str))
            .collect()
    }
}
