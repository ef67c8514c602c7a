/**
 * STATS MODEL - Decoded snapshot of the beat's `/stats` document
 *
 * ROLE: Typed view of the counters/gauges and the per-file harvester records
 * that Filebeat exposes on its HTTP endpoint.
 *
 * SECTIONS: beat (process runtime), libbeat (output + pipeline), system,
 * registrar and filebeat. Metricbeat and auditd sections are not modelled.
 *
 * DECODING:
 * - unknown fields are ignored, missing scalars decode to 0
 * - a null harvester file name decodes to ""
 * - `last_event_*` timestamps accept "", null or RFC 3339 (FilebeatTime)
 * - `start_time` is a plain RFC 3339 timestamp when present
 */

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Identity of the beat, as returned by `GET /` on its HTTP endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BeatInfo {
    pub beat: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid stats document: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Root of the `/stats` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub beat: BeatStats,
    pub libbeat: LibbeatStats,
    pub system: SystemStats,
    pub registrar: RegistrarStats,
    pub filebeat: FilebeatStats,
}

impl Stats {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Number of distinct file names currently reported by harvesters.
    pub fn distinct_files(&self) -> usize {
        let mut names: Vec<&str> = self
            .filebeat
            .harvester
            .files
            .values()
            .map(|f| f.name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }
}

// ---- beat ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatStats {
    pub cpu: CpuStats,
    pub handles: HandleStats,
    pub info: BeatRuntimeInfo,
    pub memstats: MemStats,
    pub runtime: RuntimeStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuStats {
    pub system: CpuUsage,
    pub user: CpuUsage,
    pub total: CpuUsage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuUsage {
    pub ticks: f64,
    pub time: Millis,
}

/// `{"ms": ...}` duration as reported by beats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Millis {
    pub ms: f64,
}

impl Millis {
    pub fn seconds(&self) -> f64 {
        self.ms / 1000.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandleStats {
    pub open: f64,
    pub limit: HandleLimits,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandleLimits {
    pub hard: f64,
    pub soft: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatRuntimeInfo {
    pub ephemeral_id: String,
    pub uptime: Millis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemStats {
    pub gc_next: f64,
    pub memory_alloc: f64,
    pub memory_total: f64,
    pub rss: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeStats {
    pub goroutines: f64,
}

// ---- libbeat ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibbeatStats {
    pub config: ConfigStats,
    pub output: OutputStats,
    pub pipeline: PipelineStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigStats {
    pub module: ModuleStats,
    pub reloads: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleStats {
    pub running: f64,
    pub starts: f64,
    pub stops: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputStats {
    #[serde(rename = "type")]
    pub kind: String,
    pub events: OutputEvents,
    pub read: IoStats,
    pub write: IoStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputEvents {
    pub acked: f64,
    pub active: f64,
    pub batches: f64,
    pub dropped: f64,
    pub duplicates: f64,
    pub failed: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IoStats {
    pub bytes: f64,
    pub errors: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineStats {
    pub clients: f64,
    pub events: PipelineEvents,
    pub queue: QueueStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineEvents {
    pub active: f64,
    pub dropped: f64,
    pub failed: f64,
    pub filtered: f64,
    pub published: f64,
    pub retry: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueStats {
    pub acked: f64,
}

// ---- system ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStats {
    pub cpu: SystemCpu,
    pub load: LoadStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemCpu {
    pub cores: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadStats {
    #[serde(rename = "1")]
    pub one: f64,
    #[serde(rename = "5")]
    pub five: f64,
    #[serde(rename = "15")]
    pub fifteen: f64,
    pub norm: LoadAverages,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadAverages {
    #[serde(rename = "1")]
    pub one: f64,
    #[serde(rename = "5")]
    pub five: f64,
    #[serde(rename = "15")]
    pub fifteen: f64,
}

// ---- registrar ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarStats {
    pub states: RegistrarStates,
    pub writes: RegistrarWrites,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarStates {
    pub cleanup: f64,
    pub current: f64,
    pub update: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarWrites {
    pub fail: f64,
    pub success: f64,
    pub total: f64,
}

// ---- filebeat ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilebeatStats {
    pub events: EventStats,
    pub harvester: HarvesterStats,
    pub input: InputStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStats {
    pub active: f64,
    pub added: f64,
    pub done: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvesterStats {
    pub closed: f64,
    pub open_files: f64,
    pub running: f64,
    pub skipped: f64,
    pub started: f64,
    /// Keyed by an opaque harvester id; several ids may point at the same file name.
    pub files: BTreeMap<String, FileRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputStats {
    pub log: LogInputStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogInputStats {
    pub files: LogFileStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFileStats {
    pub renamed: f64,
    pub truncated: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecord {
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    pub last_event_published_time: FilebeatTime,
    pub last_event_timestamp: FilebeatTime,
    pub read_offset: f64,
    pub size: f64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
}

/// Timestamp as reported by Filebeat: an RFC 3339 string, or "" / null when
/// the harvester has not seen the event yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilebeatTime {
    #[default]
    Absent,
    Present(OffsetDateTime),
}

impl FilebeatTime {
    /// Unix seconds in UTC, 0 when absent.
    pub fn unix_seconds(&self) -> f64 {
        match self {
            FilebeatTime::Absent => 0.0,
            FilebeatTime::Present(t) => unix_seconds(t),
        }
    }
}

pub fn unix_seconds(t: &OffsetDateTime) -> f64 {
    t.unix_timestamp() as f64
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl<'de> Deserialize<'de> for FilebeatTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None | Some("") => Ok(FilebeatTime::Absent),
            Some(raw) => OffsetDateTime::parse(raw, &Rfc3339)
                .map(FilebeatTime::Present)
                .map_err(|e| D::Error::custom(format!("invalid timestamp {raw:?}: {e}"))),
        }
    }
}

impl Serialize for FilebeatTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FilebeatTime::Absent => serializer.serialize_str(""),
            FilebeatTime::Present(t) => {
                let formatted = t.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&formatted)
            }
        }
    }
}
