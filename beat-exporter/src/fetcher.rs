//! HTTP client for the beat's monitoring endpoint
//!
//! - `GET /` returns the beat identity
//! - `GET /stats` returns the runtime statistics document
//!
//! No retries: a failed fetch fails the scrape that triggered it.

use crate::config::BeatConf;
use crate::models::{BeatInfo, DecodeError, Stats};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Clone)]
pub struct BeatClient {
    client: reqwest::Client,
    base: String,
}

impl BeatClient {
    pub fn new(conf: &BeatConf) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(conf.timeout_secs))
            .user_agent(concat!("beat-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base: conf.uri.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}{}", self.base, path);
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request { url: url.clone(), source })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url,
                status: response.status(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request { url: url.clone(), source })?;

        debug!(%url, bytes = body.len(), elapsed_ms = started.elapsed().as_millis() as u64, "fetched");
        Ok(body.to_vec())
    }

    pub async fn fetch_info(&self) -> Result<BeatInfo, FetchError> {
        let body = self.get("/").await?;
        let info = serde_json::from_slice(&body).map_err(DecodeError::from)?;
        Ok(info)
    }

    pub async fn fetch_stats(&self) -> Result<Stats, FetchError> {
        let body = self.get("/stats").await?;
        Ok(Stats::decode(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use beat_devkit::fixtures::{beat_info_doc, FileDoc, StatsDocBuilder};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(uri: String) -> BeatClient {
        BeatClient::new(&BeatConf { uri, timeout_secs: 2 }).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_info_and_stats() {
        let stats_body = StatsDocBuilder::new()
            .events(3.0, 2.0, 1.0)
            .file("k1", FileDoc::new("/var/log/a.log"))
            .build()
            .to_string();
        let router = Router::new()
            .route("/", get(|| async { beat_info_doc("filebeat").to_string() }))
            .route(
                "/stats",
                get(move || {
                    let body = stats_body.clone();
                    async move { body }
                }),
            );
        let client = client(serve(router).await);

        let info = client.fetch_info().await.unwrap();
        assert_eq!(info.beat, "filebeat");

        let stats = client.fetch_stats().await.unwrap();
        assert_eq!(stats.filebeat.events.active, 3.0);
        assert_eq!(stats.filebeat.harvester.files.len(), 1);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let router = Router::new().route(
            "/stats",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let client = client(serve(router).await);
        let err = client.fetch_stats().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_malformed_stats_is_a_decode_error() {
        let router = Router::new().route(
            "/stats",
            get(|| async {
                r#"{"filebeat":{"harvester":{"files":{"k":{"name":"a","last_event_timestamp":"nope"}}}}}"#
            }),
        );
        let client = client(serve(router).await);
        let err = client.fetch_stats().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
