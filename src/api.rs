use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::FetchError;
use crate::models::{CheckRecord, CurrentStatus, UptimeSummary};

const CURRENT_PATH: &str = "/api/status/current";
const UPTIME_PATH: &str = "/api/status/uptime";
const HISTORY_PATH: &str = "/api/status/history";

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Read-only client for the monitoring backend's status endpoints.
#[derive(Debug, Clone)]
pub(crate) struct StatusApi {
    client: Client,
    current_url: Url,
    uptime_url: Url,
    history_url: Url,
}

impl StatusApi {
    pub(crate) fn new(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("base_url must be an http(s) URL: {}", base_url);
        }
        Ok(Self {
            client,
            current_url: base_url.join(CURRENT_PATH)?,
            uptime_url: base_url.join(UPTIME_PATH)?,
            history_url: base_url.join(HISTORY_PATH)?,
        })
    }

    pub(crate) fn origin(&self) -> String {
        self.current_url.origin().ascii_serialization()
    }

    pub(crate) async fn current(&self) -> Result<CurrentStatus, FetchError> {
        self.get_json(&self.current_url).await
    }

    pub(crate) async fn uptime(&self) -> Result<UptimeSummary, FetchError> {
        self.get_json(&self.uptime_url).await
    }

    pub(crate) async fn history(&self) -> Result<Vec<CheckRecord>, FetchError> {
        self.get_json(&self.history_url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(url.clone()).send().await.map_err(network)?;
        let status = resp.status();
        let body = resp.text().await.map_err(network)?;
        decode_body(url, status, &body)
    }
}

fn decode_body<T: DeserializeOwned>(
    url: &Url,
    status: StatusCode,
    body: &str,
) -> Result<T, FetchError> {
    if !status.is_success() {
        return Err(FetchError::Server {
            url: url.to_string(),
            status,
            body: body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }
    serde_json::from_str(body).map_err(|source| FetchError::Malformed {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve the same canned response to every connection and return the base URL.
    pub(crate) async fn serve(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    fn api(base_url: &str) -> StatusApi {
        StatusApi::new(Client::new(), base_url).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let api = api("http://status.example.com/dashboard/");
        assert_eq!(
            api.current_url.as_str(),
            "http://status.example.com/api/status/current"
        );
        assert_eq!(
            api.history_url.as_str(),
            "http://status.example.com/api/status/history"
        );
        assert_eq!(api.origin(), "http://status.example.com");
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(StatusApi::new(Client::new(), "not a url").is_err());
        assert!(StatusApi::new(Client::new(), "mailto:ops@example.com").is_err());
    }

    #[test]
    fn test_decode_body_server_error_keeps_excerpt() {
        let url = Url::parse("http://localhost/api/status/current").unwrap();
        let long_body = "x".repeat(1000);
        let err = decode_body::<CurrentStatus>(&url, StatusCode::NOT_FOUND, &long_body).unwrap_err();
        match err {
            FetchError::Server { status, body, .. } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body.len(), MAX_ERROR_BODY_CHARS);
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_current_status() {
        let base = serve(
            "200 OK",
            r#"{"timestamp":"2024-06-30T12:00:00.5+03:00","is_up":false,"status_code":503,"response_time_ms":812}"#,
        )
        .await;
        let status = api(&base).current().await.unwrap();
        assert!(!status.is_up);
        assert_eq!(status.status_code, 503);
        assert_eq!(status.response_time_ms, 812.0);
    }

    #[tokio::test]
    async fn test_history_unordered_array() {
        let base = serve(
            "200 OK",
            r#"[{"timestamp":"2024-06-30T12:00:00Z","is_up":true},{"timestamp":"2024-06-29T12:00:00Z","is_up":false,"status_code":0,"response_time_ms":10000}]"#,
        )
        .await;
        let history = api(&base).history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].status_code, Some(0));
    }

    #[tokio::test]
    async fn test_server_error() {
        let base = serve("500 Internal Server Error", "Error fetching status history").await;
        let err = api(&base).history().await.unwrap_err();
        assert!(matches!(err, FetchError::Server { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let base = serve("200 OK", r#"{"uptime24h": 99.5}"#).await;
        let err = api(&base).uptime().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_uptime_rejects_array_body() {
        let base = serve("200 OK", "[]").await;
        let err = api(&base).uptime().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_uptime_rejects_unrelated_object() {
        let base = serve("200 OK", r#"{"up":"x"}"#).await;
        let err = api(&base).uptime().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_history_rejects_tuple_entries() {
        let base = serve("200 OK", r#"[["2024-05-01T10:00:00Z", true]]"#).await;
        let err = api(&base).history().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = api(&format!("http://{}", addr)).current().await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
