use async_trait::async_trait;
use deal_core::{DealError, DealSource, RawTable};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, COOKIE, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub const BULK_DEALS_URL: &str = "https://archives.nseindia.com/content/equities/bulk.csv";
pub const BLOCK_DEALS_URL: &str = "https://archives.nseindia.com/content/equities/block.csv";
pub const HOMEPAGE_URL: &str = "https://www.nseindia.com";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Request shaping for the archive host, which rejects clients that do not
/// look like a browser session.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub user_agent: String,
    pub referer: String,
    /// Raw `Cookie` header replayed on every request.
    pub cookie: Option<String>,
    /// Page fetched first so the cookie store picks up session cookies.
    pub homepage_url: Option<String>,
    pub warmup_delay: Duration,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: HOMEPAGE_URL.to_string(),
            cookie: None,
            homepage_url: Some(HOMEPAGE_URL.to_string()),
            warmup_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct NseArchiveClient {
    client: Client,
    settings: ClientSettings,
}

impl NseArchiveClient {
    pub fn new(settings: ClientSettings) -> Result<Self, DealError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .cookie_store(true)
            .default_headers(default_headers(&settings)?)
            .build()
            .map_err(|e| DealError::SourceUnavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self { client, settings })
    }

    /// Best-effort session warm-up. Failures are logged, never returned.
    async fn warm_up(&self) {
        let Some(homepage) = self.settings.homepage_url.as_deref() else {
            return;
        };

        match self.client.get(homepage).send().await {
            Ok(resp) => tracing::info!("Homepage {} answered {}", homepage, resp.status()),
            Err(e) => tracing::warn!("Homepage warm-up against {} failed: {}", homepage, e),
        }

        if !self.settings.warmup_delay.is_zero() {
            tokio::time::sleep(self.settings.warmup_delay).await;
        }
    }

    /// Download a CSV feed and parse it into an untyped table.
    pub async fn fetch_csv(&self, url: &str) -> Result<RawTable, DealError> {
        self.warm_up().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DealError::SourceUnavailable(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Feed {} answered {}", url, status);
            return Err(DealError::SourceUnavailable(describe_status(url, status)));
        }

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("text/html"));

        let body = response.text().await.map_err(|e| {
            DealError::SourceUnavailable(format!("reading body of {} failed: {}", url, e))
        })?;

        // The archive host answers blocked clients with 200 and an HTML page.
        if is_html || body.trim_start().starts_with('<') {
            tracing::warn!("Feed {} answered with an HTML page instead of CSV", url);
            return Err(DealError::DataFormat(format!(
                "{} returned HTML instead of CSV (likely bot detection, missing cookies or headers)",
                url
            )));
        }

        let table = RawTable::from_csv(&body)?;
        tracing::debug!("Fetched {} rows from {}", table.len(), url);
        Ok(table)
    }
}

#[async_trait]
impl DealSource for NseArchiveClient {
    async fn fetch(&self, endpoint: &str) -> Result<RawTable, DealError> {
        self.fetch_csv(endpoint).await
    }

    fn name(&self) -> &str {
        "nse-archives"
    }
}

fn default_headers(settings: &ClientSettings) -> Result<HeaderMap, DealError> {
    let invalid = |name: &str| {
        DealError::SourceUnavailable(format!("invalid {} header value", name))
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&settings.user_agent).map_err(|_| invalid("User-Agent"))?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static("text/csv"));
    headers.insert(
        REFERER,
        HeaderValue::from_str(&settings.referer).map_err(|_| invalid("Referer"))?,
    );
    if let Some(cookie) = settings.cookie.as_deref().filter(|c| !c.is_empty()) {
        headers.insert(COOKIE, HeaderValue::from_str(cookie).map_err(|_| invalid("Cookie"))?);
    }
    Ok(headers)
}

/// Human-readable diagnosis of a non-2xx feed response.
pub fn describe_status(url: &str, status: StatusCode) -> String {
    let mut msg = format!("{} returned HTTP {}", url, status);
    if status == StatusCode::FORBIDDEN {
        msg.push_str(" (likely bot detection, missing cookies or headers)");
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        msg.push_str(" (rate limited)");
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Answers every connection with the same canned response and forwards
    /// each request head to the returned channel.
    async fn spawn_responder(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        spawn_typed_responder(status_line, "text/csv", body).await
    }

    async fn spawn_typed_responder(
        status_line: &'static str,
        content_type: &'static str,
        body: &'static str,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let _ = tx.send(String::from_utf8_lossy(&buf).to_string());

                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_line,
                        content_type,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), rx)
    }

    fn offline_settings() -> ClientSettings {
        ClientSettings {
            homepage_url: None,
            warmup_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            ..ClientSettings::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_parses_csv() {
        let (base, _rx) = spawn_responder(
            "200 OK",
            "Date,Symbol,Client Name\n09-Jun-2025,TCS,XYZ Mutual Fund\n",
        )
        .await;
        let client = NseArchiveClient::new(offline_settings()).unwrap();

        let table = client.fetch(&format!("{}/bulk.csv", base)).await.unwrap();
        assert_eq!(table.headers, vec!["Date", "Symbol", "Client Name"]);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_forbidden_is_source_unavailable() {
        let (base, _rx) = spawn_responder("403 Forbidden", "denied").await;
        let client = NseArchiveClient::new(offline_settings()).unwrap();

        let err = client.fetch(&format!("{}/block.csv", base)).await.unwrap_err();
        match err {
            DealError::SourceUnavailable(msg) => {
                assert!(msg.contains("403"));
                assert!(msg.contains("bot detection"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_source_unavailable() {
        let (base, _rx) = spawn_responder("503 Service Unavailable", "").await;
        let client = NseArchiveClient::new(offline_settings()).unwrap();

        let err = client.fetch(&format!("{}/bulk.csv", base)).await.unwrap_err();
        assert!(matches!(err, DealError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_html_page_is_data_format() {
        let (base, _rx) = spawn_typed_responder(
            "200 OK",
            "text/html; charset=utf-8",
            "<!DOCTYPE html><html><body>Access Denied</body></html>",
        )
        .await;
        let client = NseArchiveClient::new(offline_settings()).unwrap();

        let url = format!("{}/bulk.csv", base);
        match client.fetch(&url).await.unwrap_err() {
            DealError::DataFormat(msg) => {
                assert!(msg.contains(&url));
                assert!(msg.contains("bot detection"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_markup_body_with_csv_content_type_is_data_format() {
        let (base, _rx) =
            spawn_responder("200 OK", "\n<html><body>Access Denied</body></html>").await;
        let client = NseArchiveClient::new(offline_settings()).unwrap();

        let err = client.fetch(&format!("{}/block.csv", base)).await.unwrap_err();
        assert!(matches!(err, DealError::DataFormat(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_source_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = NseArchiveClient::new(offline_settings()).unwrap();
        let err = client.fetch(&format!("http://{}/bulk.csv", addr)).await.unwrap_err();
        assert!(matches!(err, DealError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_browser_headers_and_cookie_are_replayed() {
        let (base, mut rx) = spawn_responder("200 OK", "Date\n").await;
        let settings = ClientSettings {
            cookie: Some("nsit=abc; nseappid=xyz".to_string()),
            ..offline_settings()
        };
        let client = NseArchiveClient::new(settings).unwrap();

        client.fetch(&format!("{}/bulk.csv", base)).await.unwrap();
        let request = rx.recv().await.unwrap().to_lowercase();

        assert!(request.starts_with("get /bulk.csv"));
        assert!(request.contains("accept: text/csv"));
        assert!(request.contains("referer: https://www.nseindia.com"));
        assert!(request.contains("cookie: nsit=abc; nseappid=xyz"));
        assert!(request.contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_warm_up_hits_homepage_first() {
        let (base, mut rx) = spawn_responder("200 OK", "Date\n").await;
        let settings = ClientSettings {
            homepage_url: Some(format!("{}/", base)),
            ..offline_settings()
        };
        let client = NseArchiveClient::new(settings).unwrap();

        client.fetch(&format!("{}/block.csv", base)).await.unwrap();
        assert!(rx.recv().await.unwrap().starts_with("GET / "));
        assert!(rx.recv().await.unwrap().starts_with("GET /block.csv"));
    }

    #[test]
    fn test_invalid_cookie_is_rejected() {
        let settings = ClientSettings {
            cookie: Some("bad\ncookie".to_string()),
            ..offline_settings()
        };
        assert!(NseArchiveClient::new(settings).is_err());
    }

    #[test]
    fn test_describe_status() {
        let msg = describe_status("https://x/bulk.csv", StatusCode::NOT_FOUND);
        assert_eq!(msg, "https://x/bulk.csv returned HTTP 404 Not Found");
    }
}
