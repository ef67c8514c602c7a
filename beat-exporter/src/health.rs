use crate::models::BeatInfo;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize, Deserialize)]
pub struct ExporterHealth {
    pub uptime_seconds: u64,
    pub beat: String,
    pub beat_version: String,
    pub beat_hostname: String,
    pub scrapes_total: u64,
    pub scrapes_failed: u64,
    pub last_scrape_status: String,
    pub files_tracked: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStatus {
    Ok,
    FetchError,
    EvalError,
}

impl ScrapeStatus {
    fn as_str(&self) -> &'static str {
        match self {
            ScrapeStatus::Ok => "ok",
            ScrapeStatus::FetchError => "fetch_error",
            ScrapeStatus::EvalError => "eval_error",
        }
    }
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    scrapes: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
    last_status: Arc<parking_lot::Mutex<String>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            scrapes: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
            last_status: Arc::new(parking_lot::Mutex::new("pending".to_string())),
        }
    }

    pub fn record_scrape(&self, status: ScrapeStatus) {
        self.scrapes.fetch_add(1, Ordering::Relaxed);
        if status != ScrapeStatus::Ok {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        *self.last_status.lock() = status.as_str().to_string();
    }

    pub fn get_health(&self, beat: &BeatInfo, files_tracked: usize) -> ExporterHealth {
        ExporterHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            beat: beat.beat.clone(),
            beat_version: beat.version.clone(),
            beat_hostname: beat.hostname.clone(),
            scrapes_total: self.scrapes.load(Ordering::Relaxed),
            scrapes_failed: self.failures.load(Ordering::Relaxed),
            last_scrape_status: self.last_status.lock().clone(),
            files_tracked,
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}
