//! Prometheus metrics exporter.
//!
//! Exports metric families in Prometheus text format (version 0.0.4).

use std::fmt::Write;
use std::sync::Arc;

use super::family::{MetricFamily, MetricKind, Sample, SampleValue};
use super::registry::Registry;
use crate::error::Result;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metrics exporter.
pub struct PrometheusExporter {
    registry: Arc<Registry>,
}

impl PrometheusExporter {
    /// Create a new Prometheus exporter.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Run one collection cycle and export it in Prometheus text format.
    pub async fn export(&self) -> Result<String> {
        let families = self.registry.gather().await?;
        Ok(encode(&families))
    }
}

/// Encode families in Prometheus text format.
pub fn encode(families: &[MetricFamily]) -> String {
    let mut output = String::new();
    for family in families {
        match family.kind() {
            MetricKind::Counter => write_counter(&mut output, family),
            MetricKind::Gauge => write_gauge(&mut output, family),
            MetricKind::StateSet => write_state_set(&mut output, family),
            MetricKind::Info => write_info(&mut output, family),
        }
    }
    output
}

fn write_header(output: &mut String, name: &str, help: &str, kind: MetricKind) {
    let _ = writeln!(output, "# HELP {} {}", name, escape_help(help));
    let _ = writeln!(output, "# TYPE {} {}", name, kind);
}

fn write_sample(output: &mut String, name: &str, labels: &[(&str, &str)], value: &str) {
    if labels.is_empty() {
        let _ = writeln!(output, "{} {}", name, value);
        return;
    }

    let labels_str = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect::<Vec<_>>()
        .join(",");

    let _ = writeln!(output, "{}{{{}}} {}", name, labels_str, value);
}

fn sample_labels<'a>(family: &'a MetricFamily, sample: &'a Sample) -> Vec<(&'a str, &'a str)> {
    family
        .label_names()
        .iter()
        .zip(&sample.label_values)
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

fn write_counter(output: &mut String, family: &MetricFamily) {
    // HELP and TYPE must name the samples, so both carry the `_total` suffix.
    let base = family.name().strip_suffix("_total").unwrap_or(family.name());
    let sample_name = format!("{}_total", base);

    write_header(output, &sample_name, family.help(), MetricKind::Counter);
    for sample in family.samples() {
        if let SampleValue::Counter(value) = sample.value {
            let labels = sample_labels(family, sample);
            write_sample(output, &sample_name, &labels, &value.to_string());
        }
    }
}

fn write_gauge(output: &mut String, family: &MetricFamily) {
    write_header(output, family.name(), family.help(), MetricKind::Gauge);
    for sample in family.samples() {
        if let SampleValue::Gauge(value) = sample.value {
            let labels = sample_labels(family, sample);
            write_sample(output, family.name(), &labels, &format_float(value));
        }
    }
}

/// State sets are exposed as gauges with one sample per state, the state
/// key carried in a label named after the family.
fn write_state_set(output: &mut String, family: &MetricFamily) {
    write_header(output, family.name(), family.help(), MetricKind::Gauge);
    for sample in family.samples() {
        if let SampleValue::States(states) = &sample.value {
            for (state, value) in states {
                let mut labels = sample_labels(family, sample);
                labels.push((family.name(), state.as_str()));
                let flag = if value.is_set() { "1" } else { "0" };
                write_sample(output, family.name(), &labels, flag);
            }
        }
    }
}

/// Info families are exposed as a constant-1 gauge named `<name>_info`.
fn write_info(output: &mut String, family: &MetricFamily) {
    let name = format!("{}_info", family.name());
    write_header(output, &name, family.help(), MetricKind::Gauge);
    for sample in family.samples() {
        if let SampleValue::Info(attributes) = &sample.value {
            let mut labels = sample_labels(family, sample);
            labels.extend(attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            write_sample(output, &name, &labels, "1");
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}
