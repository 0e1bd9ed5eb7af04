//! Error type shared by all connectors, and HTTP status translation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::RETRY_AFTER;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("speech not recognized: {0}")]
    NoMatch(String),
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Pass successful responses through; turn anything else into a [`ConnectorError`].
pub async fn check_status(resp: reqwest::Response) -> ConnectorResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_retry_after(v, Utc::now()));
    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!(status = status.as_u16(), error = %e, "failed to read error body");
            format!("<unreadable body: {e}>")
        }
    };
    warn!(status = status.as_u16(), body = %body, "vendor request failed");

    Err(status_error(status.as_u16(), retry_after, body))
}

/// Map a non-success status code to the matching error variant.
pub fn status_error(status: u16, retry_after: Option<Duration>, body: String) -> ConnectorError {
    match status {
        401 | 403 => ConnectorError::Unauthorized(body),
        429 => ConnectorError::RateLimited { retry_after },
        _ => ConnectorError::Server { status, body },
    }
}

/// Parse a `Retry-After` header: either delta-seconds or an HTTP-date.
///
/// Dates in the past yield a zero duration.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?;
    Some(
        at.with_timezone(&Utc)
            .signed_duration_since(now)
            .to_std()
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/")
    }

    async fn fetch(response: &'static str) -> ConnectorResult<reqwest::Response> {
        let url = serve_once(response).await;
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let resp = client.get(&url).send().await.unwrap();
        check_status(resp).await
    }

    #[tokio::test]
    async fn check_status_reads_retry_after_header() {
        let err = fetch(
            "HTTP/1.1 429 Too Many Requests\r\nRetry-After: 7\r\nContent-Length: 9\r\nConnection: close\r\n\r\nslow down",
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::RateLimited {
                retry_after: Some(d)
            } if d == Duration::from_secs(7)
        ));
    }

    #[tokio::test]
    async fn check_status_keeps_error_body() {
        let err = fetch(
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: 11\r\nConnection: close\r\n\r\ninvalid key",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConnectorError::Unauthorized(b) if b == "invalid key"));
    }

    #[tokio::test]
    async fn check_status_passes_success_through() {
        let resp = fetch("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
            .await
            .unwrap();
        assert_eq!(resp.text().await.unwrap(), "ok");
    }

    #[test]
    fn unauthorized_statuses() {
        assert!(matches!(
            status_error(401, None, "bad key".into()),
            ConnectorError::Unauthorized(b) if b == "bad key"
        ));
        assert!(matches!(
            status_error(403, None, String::new()),
            ConnectorError::Unauthorized(_)
        ));
    }

    #[test]
    fn rate_limited_keeps_retry_after() {
        let err = status_error(429, Some(Duration::from_secs(20)), "slow down".into());
        assert!(matches!(
            err,
            ConnectorError::RateLimited {
                retry_after: Some(d)
            } if d == Duration::from_secs(20)
        ));
    }

    #[test]
    fn other_statuses_are_server_errors() {
        let err = status_error(503, None, "overloaded".into());
        assert!(matches!(err, ConnectorError::Server { status: 503, .. }));
        assert_eq!(err.to_string(), "server returned 503: overloaded");
    }

    #[test]
    fn retry_after_seconds() {
        let now = Utc::now();
        assert_eq!(parse_retry_after("120", now), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 0 ", now), Some(Duration::ZERO));
    }

    #[test]
    fn retry_after_http_date() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 30).unwrap();
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn retry_after_in_past_is_zero() {
        let now = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", now),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn retry_after_garbage() {
        assert_eq!(parse_retry_after("soon", Utc::now()), None);
    }
}
