//! REST query client for a node's stateless HTTP interface.

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use tracing::{debug, info};
use url::form_urlencoded;

use lavapool_common::{
    LavapoolError, LoadTracksResponse, Result, Track, TrackInfo, TrackPlaylist,
};

/// Retry and deadline policy for REST queries.
///
/// Track loading retries on non-200 responses only, with a fixed backoff
/// between attempts. A 200 response that fails to decode is never retried.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Total attempts for a loadtracks query, including the first.
    pub max_attempts: u32,
    /// Fixed sleep between attempts.
    pub retry_backoff: Duration,
    /// Per-request deadline.
    pub request_timeout: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_millis(200),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of a successful track query.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    /// Individual tracks, one per entry of the response's `tracks` list.
    Tracks(Vec<Track>),
    /// The query resolved to a playlist.
    Playlist(TrackPlaylist),
}

/// Client for a node's REST endpoint.
///
/// Stateless beyond the endpoint URI and credential; operations are safe to
/// call concurrently. Each request uses a fresh HTTP connection.
pub struct RestClient {
    base_uri: String,
    password: String,
    config: RestConfig,
}

impl RestClient {
    pub fn new(base_uri: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_config(base_uri, password, RestConfig::default())
    }

    pub fn with_config(
        base_uri: impl Into<String>,
        password: impl Into<String>,
        config: RestConfig,
    ) -> Self {
        let mut base_uri = base_uri.into();
        while base_uri.ends_with('/') {
            base_uri.pop();
        }
        Self {
            base_uri,
            password: password.into(),
            config,
        }
    }

    /// Searches for tracks matching `query`.
    ///
    /// Issues `GET {base_uri}/loadtracks?identifier=<query>` with the node
    /// credential. Non-200 responses are retried up to
    /// [`RestConfig::max_attempts`] times with a fixed backoff; exhausted
    /// retries and an empty `tracks` list both yield `Ok(None)` - "no
    /// results" is a normal outcome, not an error. A response with
    /// non-empty playlist metadata yields a playlist aggregate.
    pub async fn load_tracks(&self, query: &str) -> Result<Option<LoadResult>> {
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let uri = format!("{}/loadtracks?identifier={}", self.base_uri, encoded);

        let mut body = None;
        for attempt in 1..=self.config.max_attempts {
            let (status, bytes) = self.get(&uri).await?;
            if status == StatusCode::OK {
                body = Some(bytes);
                break;
            }

            debug!(
                %status,
                attempt,
                max_attempts = self.config.max_attempts,
                "loadtracks attempt failed"
            );
            if attempt < self.config.max_attempts {
                tokio::time::sleep(self.config.retry_backoff).await;
            }
        }

        let Some(bytes) = body else {
            info!(query, "no tracks found, retries exhausted");
            return Ok(None);
        };

        let decoded: LoadTracksResponse = serde_json::from_slice(&bytes)?;
        if decoded.tracks.is_empty() {
            info!(query, "no tracks found");
            return Ok(None);
        }

        if decoded.is_playlist() {
            return Ok(Some(LoadResult::Playlist(TrackPlaylist::from_response(
                decoded,
            ))));
        }

        let tracks: Vec<Track> = decoded
            .tracks
            .into_iter()
            .map(|raw| Track::new(raw.track, raw.info))
            .collect();
        debug!(query, count = tracks.len(), "found tracks");
        Ok(Some(LoadResult::Tracks(tracks)))
    }

    /// Builds a [`Track`] from its base64 identifier.
    ///
    /// Issues `GET {base_uri}/decodetrack?track=<identifier>`. A non-200
    /// response raises [`LavapoolError::TrackBuild`] carrying the
    /// server-reported status and error message; it is never retried.
    pub async fn build_track(&self, identifier: &str) -> Result<Track> {
        let encoded: String = form_urlencoded::byte_serialize(identifier.as_bytes()).collect();
        let uri = format!("{}/decodetrack?track={}", self.base_uri, encoded);

        let (status, bytes) = self.get(&uri).await?;
        if status != StatusCode::OK {
            let (reported_status, message) = match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => (
                    // Reported status outside the u16 range falls back to
                    // the HTTP status.
                    value
                        .get("status")
                        .and_then(Value::as_u64)
                        .and_then(|s| u16::try_from(s).ok())
                        .unwrap_or_else(|| status.as_u16()),
                    value
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                ),
                Err(_) => (
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("unknown error").to_string(),
                ),
            };
            return Err(LavapoolError::TrackBuild {
                status: reported_status,
                message,
            });
        }

        let info: TrackInfo = serde_json::from_slice(&bytes)?;
        Ok(Track::new(identifier, info))
    }

    /// Issues one authorized GET and returns the status and raw body.
    async fn get(&self, uri: &str) -> Result<(StatusCode, Bytes)> {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header("Authorization", &self.password)
            .body(Full::new(Bytes::new()))
            .map_err(|e| LavapoolError::Transport(format!("failed to build request: {e}")))?;

        let client = Client::builder(TokioExecutor::new()).build_http();

        let response = tokio::time::timeout(self.config.request_timeout, client.request(request))
            .await
            .map_err(|_| LavapoolError::Timeout(self.config.request_timeout.as_millis() as u64))?
            .map_err(|e| LavapoolError::Transport(format!("request failed: {e}")))?;

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| LavapoolError::Transport(format!("failed to read response: {e}")))?
            .to_bytes();

        Ok((status, bytes))
    }
}
