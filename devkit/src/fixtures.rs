/*!
Builders for beat HTTP documents

Produce the JSON a beat serves on `GET /` and `GET /stats`, plus a loader
for `/stats` captures recorded from real agents (see `devkit/fixtures/`).
*/

use anyhow::Result;
use chrono::{DateTime, SecondsFormat};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Start time given to every file unless overridden.
pub const DEFAULT_START_TIME: &str = "2023-01-01T00:00:00Z";

/// Formats unix seconds as an RFC 3339 UTC timestamp.
fn rfc3339(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// `GET /` document for a beat of the given type.
pub fn beat_info_doc(beat: &str) -> Value {
    json!({
        "beat": beat,
        "hostname": "devkit-host",
        "name": "devkit-host",
        "uuid": "00000000-0000-4000-8000-000000000000",
        "version": "8.11.0"
    })
}

/// One entry of `filebeat.harvester.files`.
#[derive(Debug, Clone)]
pub struct FileDoc {
    fields: Map<String, Value>,
}

impl FileDoc {
    pub fn new(name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("name".into(), json!(name));
        fields.insert("size".into(), json!(0.0));
        fields.insert("read_offset".into(), json!(0.0));
        fields.insert("start_time".into(), json!(DEFAULT_START_TIME));
        fields.insert("last_event_published_time".into(), json!(""));
        fields.insert("last_event_timestamp".into(), json!(""));
        Self { fields }
    }

    pub fn set_field<S: Into<String>>(mut self, field: S, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    pub fn size(self, bytes: f64) -> Self {
        self.set_field("size", json!(bytes))
    }

    pub fn read_offset(self, offset: f64) -> Self {
        self.set_field("read_offset", json!(offset))
    }

    pub fn start_time(self, ts: &str) -> Self {
        self.set_field("start_time", json!(ts))
    }

    /// Start time as unix seconds.
    pub fn started_at(self, secs: i64) -> Self {
        self.start_time(&rfc3339(secs))
    }

    /// Drops `start_time` entirely, which real agents never do.
    pub fn without_start_time(mut self) -> Self {
        self.fields.remove("start_time");
        self
    }

    pub fn last_event_published_time(self, ts: &str) -> Self {
        self.set_field("last_event_published_time", json!(ts))
    }

    pub fn last_event_timestamp(self, ts: &str) -> Self {
        self.set_field("last_event_timestamp", json!(ts))
    }

    pub fn build(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// `GET /stats` document with a filebeat section.
#[derive(Debug, Clone, Default)]
pub struct StatsDocBuilder {
    events: [f64; 3],
    harvester: [f64; 5],
    input_log: [f64; 2],
    output_events: [f64; 2],
    files: Map<String, Value>,
}

impl StatsDocBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(mut self, active: f64, added: f64, done: f64) -> Self {
        self.events = [active, added, done];
        self
    }

    pub fn harvester(mut self, closed: f64, open_files: f64, running: f64, skipped: f64, started: f64) -> Self {
        self.harvester = [closed, open_files, running, skipped, started];
        self
    }

    pub fn input_log(mut self, renamed: f64, truncated: f64) -> Self {
        self.input_log = [renamed, truncated];
        self
    }

    /// libbeat output events acknowledged and failed; the total is their sum.
    pub fn output_events(mut self, acked: f64, failed: f64) -> Self {
        self.output_events = [acked, failed];
        self
    }

    /// Adds a harvester record under `key`. Keys are opaque; several may share a file name.
    pub fn file(mut self, key: &str, file: FileDoc) -> Self {
        self.files.insert(key.to_string(), file.build());
        self
    }

    pub fn build(&self) -> Value {
        let [active, added, done] = self.events;
        let [closed, open_files, running, skipped, started] = self.harvester;
        let [renamed, truncated] = self.input_log;
        let [acked, failed] = self.output_events;
        json!({
            "beat": {"info": {"uptime": {"ms": 1000}}},
            "filebeat": {
                "events": {"active": active, "added": added, "done": done},
                "harvester": {
                    "closed": closed,
                    "open_files": open_files,
                    "running": running,
                    "skipped": skipped,
                    "started": started,
                    "files": Value::Object(self.files.clone())
                },
                "input": {"log": {"files": {"renamed": renamed, "truncated": truncated}}}
            },
            "libbeat": {"output": {
                "type": "console",
                "events": {"acked": acked, "failed": failed, "total": acked + failed}
            }}
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.build().to_string().into_bytes()
    }
}

/// Recorded `/stats` captures, one JSON file per capture.
pub struct FixtureLoader {
    fixtures: HashMap<String, Value>,
    fixtures_dir: PathBuf,
}

impl FixtureLoader {
    pub fn new<P: AsRef<Path>>(fixtures_dir: P) -> Self {
        Self {
            fixtures: HashMap::new(),
            fixtures_dir: fixtures_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load_all(&mut self) -> Result<usize> {
        if !self.fixtures_dir.exists() {
            log::warn!("Fixtures directory not found: {}", self.fixtures_dir.display());
            return Ok(0);
        }

        let mut count = 0;
        for entry in std::fs::read_dir(&self.fixtures_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            match std::fs::read_to_string(&path).map_err(anyhow::Error::from).and_then(|txt| {
                serde_json::from_str::<Value>(&txt).map_err(anyhow::Error::from)
            }) {
                Ok(doc) => {
                    log::info!("Loaded fixture: {}", name);
                    self.fixtures.insert(name, doc);
                    count += 1;
                }
                Err(e) => log::warn!("Failed to load fixture {}: {}", path.display(), e),
            }
        }
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fixtures.get(name)
    }

    pub fn bytes(&self, name: &str) -> Option<Vec<u8>> {
        self.get(name).map(|v| v.to_string().into_bytes())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fixtures.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
