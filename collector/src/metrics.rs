use crate::counters::CallOutcome;
use eyre::Result;
use prometheus::{
    CounterVec,
    Encoder as _,
    GaugeVec,
    Opts,
    Registry,
    TextEncoder,
};
use sentry_client::QueryKind;
use strum::Display;

#[derive(Debug, Clone, Copy, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// Static shape of an exported metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub label_names: &'static [&'static str],
}

pub const PROJECT_INFO: MetricDescriptor = MetricDescriptor {
    name: "sentry_project_info",
    help: "Informational series so that Projects can be linked to Teams",
    kind: MetricKind::Counter,
    label_names: &["organisation", "team", "project"],
};

pub const PROJECT_ERRORS: MetricDescriptor = MetricDescriptor {
    name: "sentry_project_errors",
    help: "Records the number of errors of a particular type for the specific project",
    kind: MetricKind::Gauge,
    label_names: &["organisation", "project", "query"],
};

pub const API_CALLS: MetricDescriptor = MetricDescriptor {
    name: "sentry_api_calls",
    help: "Records the number of calls made from the exporter to the Sentry API",
    kind: MetricKind::Gauge,
    label_names: &["status"],
};

pub fn descriptors() -> Vec<MetricDescriptor> {
    vec![PROJECT_INFO, PROJECT_ERRORS, API_CALLS]
}

/// One emitted value. `label_values` follow the order of the descriptor's `label_names`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub descriptor: MetricDescriptor,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl MetricSample {
    pub fn project_info(organisation: &str, team: &str, project: &str) -> Self {
        Self {
            descriptor: PROJECT_INFO,
            label_values: vec![organisation.to_string(), team.to_string(), project.to_string()],
            value: 1.0,
        }
    }

    pub fn project_errors(organisation: &str, project: &str, query: QueryKind, value: f64) -> Self {
        Self {
            descriptor: PROJECT_ERRORS,
            label_values: vec![organisation.to_string(), project.to_string(), query.to_string()],
            value,
        }
    }

    pub fn api_calls(outcome: CallOutcome, value: f64) -> Self {
        Self {
            descriptor: API_CALLS,
            label_values: vec![outcome.to_string()],
            value,
        }
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .label_names
            .iter()
            .position(|label| *label == name)
            .and_then(|index| self.label_values.get(index))
            .map(String::as_str)
    }
}

/// Render samples in the Prometheus text exposition format.
pub fn encode_text(samples: &[MetricSample]) -> Result<String> {
    let registry = Registry::new();

    for descriptor in descriptors() {
        let opts = Opts::new(descriptor.name, descriptor.help);
        let matching = samples.iter().filter(|s| s.descriptor == descriptor);
        match descriptor.kind {
            MetricKind::Counter => {
                let vec = CounterVec::new(opts, descriptor.label_names)?;
                // A repeated series keeps the last value instead of accumulating.
                for sample in matching {
                    let counter = vec.get_metric_with_label_values(&label_refs(sample))?;
                    counter.reset();
                    counter.inc_by(sample.value.max(0.0));
                }
                registry.register(Box::new(vec))?;
            }
            MetricKind::Gauge => {
                let vec = GaugeVec::new(opts, descriptor.label_names)?;
                for sample in matching {
                    vec.get_metric_with_label_values(&label_refs(sample))?.set(sample.value);
                }
                registry.register(Box::new(vec))?;
            }
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn label_refs(sample: &MetricSample) -> Vec<&str> {
    sample.label_values.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value_of(text: &str, series: &str) -> Option<f64> {
        text.lines()
            .find_map(|line| line.strip_prefix(series))
            .and_then(|rest| rest.trim().parse().ok())
    }

    #[test]
    fn descriptors_are_static() {
        let names: Vec<_> = descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["sentry_project_info", "sentry_project_errors", "sentry_api_calls"]);
        assert_eq!(API_CALLS.label_names, &["status"]);
    }

    #[test]
    fn samples_expose_labels_by_name() {
        let sample = MetricSample::project_errors("acme", "api", QueryKind::Rejected, 4.0);
        assert_eq!(sample.name(), "sentry_project_errors");
        assert_eq!(sample.label("organisation"), Some("acme"));
        assert_eq!(sample.label("project"), Some("api"));
        assert_eq!(sample.label("query"), Some("rejected"));
        assert_eq!(sample.label("team"), None);
    }

    #[test]
    fn encodes_text_exposition() {
        let samples = vec![
            MetricSample::project_info("acme", "core", "api"),
            MetricSample::project_errors("acme", "api", QueryKind::Received, 12.0),
            MetricSample::api_calls(CallOutcome::Success, 3.0),
            MetricSample::api_calls(CallOutcome::Failure, 1.0),
        ];
        let text = encode_text(&samples).unwrap();

        assert!(text.contains("# TYPE sentry_project_info counter"));
        assert!(text.contains("# TYPE sentry_project_errors gauge"));
        assert_eq!(
            value_of(&text, r#"sentry_project_errors{organisation="acme",project="api",query="received"}"#),
            Some(12.0)
        );
        assert_eq!(value_of(&text, r#"sentry_api_calls{status="success"}"#), Some(3.0));
        assert_eq!(value_of(&text, r#"sentry_api_calls{status="failure"}"#), Some(1.0));
        assert_eq!(
            value_of(&text, r#"sentry_project_info{organisation="acme",project="api",team="core"}"#),
            Some(1.0)
        );
    }

    #[test]
    fn repeated_project_link_is_exported_once() {
        let samples = vec![
            MetricSample::project_info("acme", "core", "api"),
            MetricSample::project_info("acme", "core", "api"),
        ];
        let text = encode_text(&samples).unwrap();

        let series = r#"sentry_project_info{organisation="acme",project="api",team="core"}"#;
        assert_eq!(text.lines().filter(|line| line.starts_with(series)).count(), 1);
        assert_eq!(value_of(&text, series), Some(1.0));
    }
}
