//! Metric construction for beat statistics
//!
//! A `MetricBuilder` owns the filebeat catalog: a fixed set of descriptors
//! built once from the beat identity, plus a per-file set rebuilt from
//! whatever snapshot it is handed on each pass. The runtime sections (beat,
//! libbeat, system, registrar) are plain fixed tables. `Collectors` runs all
//! of them against one snapshot.
//!
//! Evaluators never hold on to a snapshot: they are given one at evaluation
//! time, and per-file evaluators borrow their record from that same snapshot.

mod beat;
pub mod exposition;
mod filebeat;
mod libbeat;

use crate::models::{BeatInfo, FileRecord, Stats};
use prometheus::core::Desc;
use prometheus::proto::MetricType;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid descriptor {name}: {source}")]
    InvalidDescriptor {
        name: String,
        #[source]
        source: prometheus::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("harvester for {path} reports no start_time")]
    MissingStartTime { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Untyped,
}

impl MetricKind {
    pub fn as_proto(&self) -> MetricType {
        match self {
            MetricKind::Counter => MetricType::COUNTER,
            MetricKind::Gauge => MetricType::GAUGE,
            MetricKind::Untyped => MetricType::UNTYPED,
        }
    }
}

/// What to do when a harvester record carries no `start_time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartTimePolicy {
    /// Abort the pass with `EvalError::MissingStartTime`.
    #[default]
    Strict,
    /// Report 0 and log a warning.
    Zero,
}

/// Stable identity of a metric: fully-qualified name plus constant labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub fq_name: String,
    pub help: String,
    pub labels: Vec<(String, String)>,
    pub kind: MetricKind,
}

impl Descriptor {
    pub fn new(
        namespace: &str,
        subsystem: &str,
        name: &str,
        help: &str,
        kind: MetricKind,
        labels: &[(&str, &str)],
    ) -> Self {
        let fq_name = prometheus::Opts::new(name, help)
            .namespace(namespace)
            .subsystem(subsystem)
            .fq_name();
        Self {
            fq_name,
            help: help.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            kind,
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Runs the client library's name and label checks on this descriptor.
    pub fn validate(&self) -> Result<Desc, BuildError> {
        let const_labels: HashMap<String, String> = self.labels.iter().cloned().collect();
        Desc::new(self.fq_name.clone(), self.help.clone(), vec![], const_labels).map_err(|source| {
            BuildError::InvalidDescriptor {
                name: self.fq_name.clone(),
                source,
            }
        })
    }
}

/// Field of a harvester file record exported as its own metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileField {
    Size,
    LastEventPublishedTime,
    LastEventTimestamp,
    StartTime,
    ReadOffset,
}

impl FileField {
    pub const ALL: [FileField; 5] = [
        FileField::Size,
        FileField::LastEventPublishedTime,
        FileField::LastEventTimestamp,
        FileField::StartTime,
        FileField::ReadOffset,
    ];

    pub fn metric_name(&self) -> &'static str {
        match self {
            FileField::Size => "size_bytes",
            FileField::LastEventPublishedTime => "last_event_published_time",
            FileField::LastEventTimestamp => "last_event_timestamp",
            FileField::StartTime => "start_time",
            FileField::ReadOffset => "file_read_offset",
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            FileField::Size | FileField::ReadOffset => MetricKind::Gauge,
            _ => MetricKind::Untyped,
        }
    }

    fn read(&self, record: &FileRecord, policy: StartTimePolicy) -> Result<f64, EvalError> {
        match self {
            FileField::Size => Ok(record.size),
            FileField::ReadOffset => Ok(record.read_offset),
            FileField::LastEventPublishedTime => Ok(record.last_event_published_time.unix_seconds()),
            FileField::LastEventTimestamp => Ok(record.last_event_timestamp.unix_seconds()),
            FileField::StartTime => match (&record.start_time, policy) {
                (Some(t), _) => Ok(crate::models::unix_seconds(t)),
                (None, StartTimePolicy::Zero) => {
                    warn!(path = %record.name, "harvester reports no start_time, exporting 0");
                    Ok(0.0)
                }
                (None, StartTimePolicy::Strict) => Err(EvalError::MissingStartTime {
                    path: record.name.clone(),
                }),
            },
        }
    }
}

pub type Reader = fn(&Stats) -> f64;

/// Reads one value out of the snapshot passed at evaluation time.
///
/// `File` borrows its record from the snapshot the per-file catalog was
/// rebuilt from, so it can only be evaluated within that pass.
#[derive(Debug, Clone)]
pub enum Evaluator<'a> {
    Scalar(Reader),
    File {
        record: &'a FileRecord,
        field: FileField,
    },
}

impl Evaluator<'_> {
    pub fn evaluate(&self, stats: &Stats, policy: StartTimePolicy) -> Result<f64, EvalError> {
        match self {
            Evaluator::Scalar(read) => Ok(read(stats)),
            Evaluator::File { record, field } => field.read(record, policy),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricEntry<'a> {
    pub desc: Descriptor,
    pub eval: Evaluator<'a>,
}

impl MetricEntry<'_> {
    fn observe(&self, stats: &Stats, policy: StartTimePolicy) -> Result<Observation, EvalError> {
        Ok(Observation {
            desc: self.desc.clone(),
            value: self.eval.evaluate(stats, policy)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub desc: Descriptor,
    pub value: f64,
}

/// One descriptor per `(label value, reader)` pair, all sharing one name.
fn labeled(
    namespace: &str,
    subsystem: &str,
    name: &str,
    help: &str,
    kind: MetricKind,
    label: &str,
    readers: &[(&str, Reader)],
) -> Vec<MetricEntry<'static>> {
    readers
        .iter()
        .map(|(value, read)| MetricEntry {
            desc: Descriptor::new(namespace, subsystem, name, help, kind, &[(label, *value)]),
            eval: Evaluator::Scalar(*read),
        })
        .collect()
}

fn single(
    namespace: &str,
    subsystem: &str,
    name: &str,
    help: &str,
    kind: MetricKind,
    read: Reader,
) -> MetricEntry<'static> {
    MetricEntry {
        desc: Descriptor::new(namespace, subsystem, name, help, kind, &[]),
        eval: Evaluator::Scalar(read),
    }
}

fn validated(entries: Vec<MetricEntry<'static>>) -> Result<Vec<MetricEntry<'static>>, BuildError> {
    for entry in &entries {
        entry.desc.validate()?;
    }
    Ok(entries)
}

/// Fixed table of descriptors for one section of the stats document.
pub struct Section {
    name: &'static str,
    entries: Vec<MetricEntry<'static>>,
}

impl Section {
    fn new(name: &'static str, entries: Vec<MetricEntry<'static>>) -> Result<Self, BuildError> {
        Ok(Self {
            name,
            entries: validated(entries)?,
        })
    }

    pub fn name(&self) -> &str {
        self.name
    }

    fn describe(&self) -> impl Iterator<Item = &Descriptor> {
        self.entries.iter().map(|entry| &entry.desc)
    }

    fn collect(&self, stats: &Stats) -> Result<Vec<Observation>, EvalError> {
        self.entries
            .iter()
            .map(|entry| entry.observe(stats, StartTimePolicy::default()))
            .collect()
    }
}

pub struct MetricBuilder {
    beat_info: BeatInfo,
    fixed: Vec<MetricEntry<'static>>,
    start_time_policy: StartTimePolicy,
}

impl MetricBuilder {
    pub fn new(beat_info: BeatInfo) -> Result<Self, BuildError> {
        let fixed = validated(filebeat::fixed_catalog(&beat_info.beat))?;
        // per-file descriptors share these names, only the path label varies
        for field in FileField::ALL {
            filebeat::file_descriptor(&beat_info.beat, field, "").validate()?;
        }

        Ok(Self {
            beat_info,
            fixed,
            start_time_policy: StartTimePolicy::default(),
        })
    }

    pub fn with_start_time_policy(mut self, policy: StartTimePolicy) -> Self {
        self.start_time_policy = policy;
        self
    }

    /// Every descriptor identity for the given snapshot: fixed catalog first,
    /// then one block of per-file descriptors per distinct file name.
    pub fn describe(&self, snapshot: Option<&Stats>) -> Vec<Descriptor> {
        let dynamic = snapshot
            .map(|stats| filebeat::file_catalog(&self.beat_info.beat, stats))
            .unwrap_or_default();

        self.fixed
            .iter()
            .map(|entry| entry.desc.clone())
            .chain(dynamic.into_iter().map(|entry| entry.desc))
            .collect()
    }

    /// Evaluates the per-file catalog, then the fixed catalog, against one
    /// snapshot. Any fault aborts the pass and nothing is returned.
    pub fn collect(&self, snapshot: Option<&Stats>) -> Result<Vec<Observation>, EvalError> {
        let empty = Stats::default();
        let stats = snapshot.unwrap_or(&empty);
        let dynamic = filebeat::file_catalog(&self.beat_info.beat, stats);

        let mut observations = Vec::with_capacity(dynamic.len() + self.fixed.len());
        for entry in &dynamic {
            observations.push(entry.observe(stats, self.start_time_policy)?);
        }
        for entry in &self.fixed {
            observations.push(entry.observe(stats, self.start_time_policy)?);
        }

        debug!(
            observations = observations.len(),
            files = dynamic.len() / FileField::ALL.len(),
            "collection pass complete"
        );
        Ok(observations)
    }
}

/// All collectors that apply to one beat. Runtime sections come first, then
/// the filebeat catalog when the beat is a filebeat.
pub struct Collectors {
    beat_info: BeatInfo,
    sections: Vec<Section>,
    filebeat: Option<MetricBuilder>,
}

impl Collectors {
    pub fn new(beat_info: BeatInfo, policy: StartTimePolicy) -> Result<Self, BuildError> {
        let namespace = beat_info.beat.as_str();
        let mut sections = vec![
            Section::new("beat", beat::beat_catalog(namespace))?,
            Section::new("libbeat", libbeat::catalog(namespace))?,
            Section::new("system", beat::system_catalog(namespace))?,
        ];

        let filebeat = if beat_info.beat == "filebeat" {
            sections.push(Section::new("registrar", filebeat::registrar_catalog(namespace))?);
            Some(MetricBuilder::new(beat_info.clone())?.with_start_time_policy(policy))
        } else {
            None
        };

        Ok(Self {
            beat_info,
            sections,
            filebeat,
        })
    }

    pub fn beat_info(&self) -> &BeatInfo {
        &self.beat_info
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(Section::name)
    }

    pub fn has_filebeat(&self) -> bool {
        self.filebeat.is_some()
    }

    pub fn describe(&self, snapshot: Option<&Stats>) -> Vec<Descriptor> {
        let mut descs: Vec<Descriptor> = self
            .sections
            .iter()
            .flat_map(Section::describe)
            .cloned()
            .collect();
        if let Some(filebeat) = &self.filebeat {
            descs.extend(filebeat.describe(snapshot));
        }
        descs
    }

    /// Evaluates every collector against the same snapshot. The first fault
    /// aborts the pass.
    pub fn collect(&self, snapshot: Option<&Stats>) -> Result<Vec<Observation>, EvalError> {
        let empty = Stats::default();
        let stats = snapshot.unwrap_or(&empty);

        let mut observations = Vec::new();
        for section in &self.sections {
            observations.extend(section.collect(stats)?);
        }
        if let Some(filebeat) = &self.filebeat {
            observations.extend(filebeat.collect(Some(stats))?);
        }
        Ok(observations)
    }
}
