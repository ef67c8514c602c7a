/**
 * HTTP SURFACE - Scrape endpoint of the exporter
 *
 * ROUTES:
 * - GET /               landing page pointing at the telemetry path
 * - GET /health         liveness, always "ok"
 * - GET /system/health  exporter health as JSON
 * - GET <telemetry>     fetch /stats, swap the snapshot, collect, encode
 *
 * A scrape that fails to fetch, decode or evaluate returns an error status
 * and no metrics; the previously stored snapshot is left untouched.
 */

use crate::config::telemetry_route;
use crate::fetcher::BeatClient;
use crate::health::{ExporterHealth, HealthTracker, ScrapeStatus};
use crate::metrics::{exposition, Collectors};
use crate::state::SnapshotHandle;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub collectors: Arc<Collectors>,
    pub client: BeatClient,
    pub snapshot: SnapshotHandle,
    pub health_tracker: HealthTracker,
    pub telemetry_path: String,
}

pub fn build_router(app_state: AppState) -> anyhow::Result<Router> {
    let telemetry_path = telemetry_route(&app_state.telemetry_path)?;
    Ok(Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route(&telemetry_path, get(scrape))
        .with_state(app_state))
}

async fn index(State(app): State<AppState>) -> Html<String> {
    Html(format!(
        "<html><head><title>Beat Exporter</title></head><body>\
         <h1>Beat Exporter</h1><p><a href=\"{0}\">{0}</a></p></body></html>",
        app.telemetry_path
    ))
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<ExporterHealth> {
    let files_tracked = app.snapshot.load().map(|s| s.distinct_files()).unwrap_or(0);
    Json(app.health_tracker.get_health(app.collectors.beat_info(), files_tracked))
}

// GET <telemetry_path>
async fn scrape(State(app): State<AppState>) -> Response {
    let stats = match app.client.fetch_stats().await {
        Ok(stats) => app.snapshot.replace(stats),
        Err(e) => {
            error!("scrape aborted, fetch failed: {e}");
            app.health_tracker.record_scrape(ScrapeStatus::FetchError);
            return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response();
        }
    };

    let rendered = app
        .collectors
        .collect(Some(&stats))
        .map_err(|e| e.to_string())
        .and_then(|observations| exposition::encode(&observations).map_err(|e| e.to_string()));

    match rendered {
        Ok(body) => {
            app.health_tracker.record_scrape(ScrapeStatus::Ok);
            ([(header::CONTENT_TYPE, exposition::content_type())], body).into_response()
        }
        Err(e) => {
            error!("scrape aborted, collection failed: {e}");
            app.health_tracker.record_scrape(ScrapeStatus::EvalError);
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BeatConf;
    use crate::metrics::StartTimePolicy;
    use crate::models::BeatInfo;
    use beat_devkit::fixtures::{FileDoc, StatsDocBuilder};
    use beat_devkit::test_utils::ExpositionHarness;
    use parking_lot::Mutex;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Fake beat serving whatever `/stats` body is current, or 503 when it is `None`.
    async fn fake_beat(body: Arc<Mutex<Option<String>>>) -> String {
        let router = Router::new().route(
            "/stats",
            get(move || {
                let current = body.lock().clone();
                async move {
                    match current {
                        Some(body) => (StatusCode::OK, body),
                        None => (StatusCode::SERVICE_UNAVAILABLE, String::new()),
                    }
                }
            }),
        );
        serve(router).await
    }

    fn stats_body(doc: StatsDocBuilder) -> Arc<Mutex<Option<String>>> {
        Arc::new(Mutex::new(Some(doc.build().to_string())))
    }

    fn app_state(beat_uri: String, telemetry_path: &str) -> AppState {
        AppState {
            collectors: Arc::new(
                Collectors::new(
                    BeatInfo {
                        beat: "filebeat".into(),
                        version: "8.11.0".into(),
                        ..Default::default()
                    },
                    StartTimePolicy::Strict,
                )
                .unwrap(),
            ),
            client: BeatClient::new(&BeatConf { uri: beat_uri, timeout_secs: 2 }).unwrap(),
            snapshot: SnapshotHandle::new(),
            health_tracker: HealthTracker::new(),
            telemetry_path: telemetry_path.into(),
        }
    }

    async fn exporter(beat_uri: String) -> (String, AppState) {
        let app_state = app_state(beat_uri, "/metrics");
        (serve(build_router(app_state.clone()).unwrap()).await, app_state)
    }

    async fn scrape_text(base: &str) -> ExpositionHarness {
        let response = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        ExpositionHarness::parse(&response.text().await.unwrap())
    }

    #[tokio::test]
    async fn test_scrape_renders_metrics() {
        let doc = StatsDocBuilder::new()
            .events(42.0, 0.0, 0.0)
            .output_events(7.0, 0.0)
            .file("k1", FileDoc::new("/var/log/a.log").size(100.0))
            .file("k2", FileDoc::new("/var/log/a.log").size(100.0));
        let beat = fake_beat(stats_body(doc)).await;
        let (base, app_state) = exporter(beat).await;

        let harness = scrape_text(&base).await;
        harness
            .assert_value("filebeat_filebeat_events", &[("event", "active")], 42.0)
            .unwrap();
        harness
            .assert_value("filebeat_libbeat_output_events", &[("type", "acked")], 7.0)
            .unwrap();
        harness.assert_type("filebeat_uptime_seconds_total", "counter").unwrap();
        assert_eq!(harness.samples_named("filebeat_harvester_size_bytes").len(), 1);
        assert_eq!(app_state.snapshot.load().unwrap().distinct_files(), 1);
    }

    #[tokio::test]
    async fn test_dropped_file_is_no_longer_exported() {
        let body = stats_body(
            StatsDocBuilder::new()
                .file("k1", FileDoc::new("/var/log/a.log").started_at(1_700_000_000))
                .file("k2", FileDoc::new("/var/log/b.log")),
        );
        let beat = fake_beat(body.clone()).await;
        let (base, _) = exporter(beat).await;

        let first = scrape_text(&base).await;
        first
            .assert_value(
                "filebeat_harvester_start_time",
                &[("path", "/var/log/a.log")],
                1_700_000_000.0,
            )
            .unwrap();
        assert_eq!(first.samples_named("filebeat_harvester_start_time").len(), 2);

        *body.lock() = Some(
            StatsDocBuilder::new()
                .file("k2", FileDoc::new("/var/log/b.log"))
                .build()
                .to_string(),
        );
        let second = scrape_text(&base).await;
        assert_eq!(
            second.value("filebeat_harvester_size_bytes", &[("path", "/var/log/a.log")]),
            None
        );
        assert_eq!(second.samples_named("filebeat_harvester_start_time").len(), 1);

        *body.lock() = Some(StatsDocBuilder::new().build().to_string());
        let third = scrape_text(&base).await;
        third.assert_absent("filebeat_harvester_size_bytes").unwrap();
        third.assert_absent("filebeat_harvester_start_time").unwrap();
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_snapshot() {
        let body = stats_body(StatsDocBuilder::new().events(5.0, 0.0, 0.0));
        let beat = fake_beat(body.clone()).await;
        let (base, app_state) = exporter(beat).await;

        let ok = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        *body.lock() = None;
        let failed = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(failed.status(), StatusCode::SERVICE_UNAVAILABLE);

        let kept = app_state.snapshot.load().unwrap();
        assert_eq!(kept.filebeat.events.active, 5.0);

        let health: ExporterHealth = reqwest::get(format!("{base}/system/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health.scrapes_total, 2);
        assert_eq!(health.scrapes_failed, 1);
        assert_eq!(health.last_scrape_status, "fetch_error");
        assert_eq!(health.beat_version, "8.11.0");
    }

    #[tokio::test]
    async fn test_missing_start_time_fails_scrape() {
        let doc = StatsDocBuilder::new().file("k1", FileDoc::new("a.log").without_start_time());
        let beat = fake_beat(stats_body(doc)).await;
        let (base, _) = exporter(beat).await;

        let response = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.text().await.unwrap().contains("a.log"));
    }

    #[tokio::test]
    async fn test_liveness_and_index() {
        let (base, _) = exporter("http://127.0.0.1:1".into()).await;
        let body = reqwest::get(format!("{base}/health")).await.unwrap().text().await.unwrap();
        assert_eq!(body, "ok");
        let index = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
        assert!(index.contains("/metrics"));
    }

    #[test]
    fn test_router_refuses_builtin_telemetry_paths() {
        for path in ["/health", "/system/health", "/", ""] {
            let state = app_state("http://127.0.0.1:1".into(), path);
            assert!(build_router(state).is_err(), "{path:?} should be refused");
        }
    }
}
