//! Prometheus text rendering of a collection pass
//!
//! Counter and gauge families go through `prometheus::TextEncoder`. The
//! client's text encoder has no untyped support, so untyped families are
//! written here in the same format.

use super::{MetricKind, Observation};
use prometheus::proto::{Counter, Gauge, LabelPair, Metric, MetricFamily, MetricType, Untyped};
use prometheus::{Encoder, TextEncoder};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;

#[derive(Debug, thiserror::Error)]
pub enum ExposeError {
    #[error("encoding failed: {0}")]
    Encode(#[from] prometheus::Error),
    #[error("encoder produced invalid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
    #[error("metric family {0} has no samples")]
    EmptyFamily(String),
}

pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

/// Groups observations into metric families, keeping the order in which
/// metric names first appear.
pub fn families(observations: &[Observation]) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for obs in observations {
        let slot = *index.entry(obs.desc.fq_name.as_str()).or_insert_with(|| {
            let mut family = MetricFamily::default();
            family.set_name(obs.desc.fq_name.clone());
            family.set_help(obs.desc.help.clone());
            family.set_field_type(obs.desc.kind.as_proto());
            families.push(family);
            families.len() - 1
        });
        families[slot].mut_metric().push(to_metric(obs));
    }

    families
}

fn to_metric(obs: &Observation) -> Metric {
    let mut metric = Metric::default();
    for (name, value) in &obs.desc.labels {
        let mut pair = LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(value.clone());
        metric.mut_label().push(pair);
    }

    match obs.desc.kind {
        MetricKind::Counter => {
            let mut counter = Counter::default();
            counter.set_value(obs.value);
            metric.set_counter(counter);
        }
        MetricKind::Gauge => {
            let mut gauge = Gauge::default();
            gauge.set_value(obs.value);
            metric.set_gauge(gauge);
        }
        MetricKind::Untyped => {
            let mut untyped = Untyped::default();
            untyped.set_value(obs.value);
            metric.set_untyped(untyped);
        }
    }
    metric
}

pub fn encode(observations: &[Observation]) -> Result<String, ExposeError> {
    let encoder = TextEncoder::new();
    let mut out = String::new();

    for family in families(observations) {
        match family.get_field_type() {
            MetricType::UNTYPED => write_untyped(&family, &mut out)?,
            _ => {
                let mut buffer = Vec::new();
                encoder.encode(std::slice::from_ref(&family), &mut buffer)?;
                out.push_str(&String::from_utf8(buffer)?);
            }
        }
    }

    Ok(out)
}

fn write_untyped(family: &MetricFamily, out: &mut String) -> Result<(), ExposeError> {
    let name = family.get_name();
    if family.get_metric().is_empty() {
        return Err(ExposeError::EmptyFamily(name.to_string()));
    }

    if !family.get_help().is_empty() {
        writeln!(out, "# HELP {} {}", name, escape(family.get_help(), false))?;
    }
    writeln!(out, "# TYPE {name} untyped")?;

    for metric in family.get_metric() {
        out.push_str(name);
        let mut separator = '{';
        for pair in metric.get_label() {
            write!(out, "{}{}=\"{}\"", separator, pair.get_name(), escape(pair.get_value(), true))?;
            separator = ',';
        }
        if !metric.get_label().is_empty() {
            out.push('}');
        }
        writeln!(out, " {}", metric.get_untyped().get_value())?;
    }
    Ok(())
}

/// Escapes backslashes and newlines, plus double quotes inside label values.
fn escape(value: &str, quote: bool) -> Cow<'_, str> {
    if !value.contains(['\\', '\n']) && !(quote && value.contains('"')) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '"' if quote => escaped.push_str("\\\""),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
