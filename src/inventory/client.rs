use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};

use crate::cache::{Method, RequestSpec, Transport};
use crate::config::Config;
use crate::error::FetchError;

/// Longest slice of an error body kept in the error message.
const MAX_ERROR_BODY: usize = 200;

/// HTTP transport for the inventory REST service
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base: Url,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    // Paths are joined onto the base, so it must end in a slash to keep
    // its last segment.
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base =
      Url::parse(&normalized).map_err(|e| eyre!("Invalid API base URL {}: {}", base_url, e))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base })
  }

  pub fn from_config(config: &Config) -> Result<Self> {
    Self::new(&config.base_url()?, config.api.timeout())
  }

  /// Absolute URL for `request`.
  pub fn url_for(&self, request: &RequestSpec) -> Result<Url, FetchError> {
    let mut url = self
      .base
      .join(request.path.trim_start_matches('/'))
      .map_err(|e| FetchError::Network(format!("Invalid request path {}: {}", request.path, e)))?;
    if !request.query.is_empty() {
      url.query_pairs_mut().extend_pairs(&request.query);
    }
    Ok(url)
  }
}

fn to_reqwest(method: Method) -> reqwest::Method {
  match method {
    Method::Get => reqwest::Method::GET,
    Method::Post => reqwest::Method::POST,
    Method::Put => reqwest::Method::PUT,
    Method::Patch => reqwest::Method::PATCH,
    Method::Delete => reqwest::Method::DELETE,
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: &RequestSpec) -> Result<Value, FetchError> {
    let url = self.url_for(request)?;
    let mut builder = self
      .client
      .request(to_reqwest(request.method), url.clone())
      .header(ACCEPT, "application/json");
    if let Some(body) = &request.body {
      let bytes = serde_json::to_vec(body)
        .map_err(|e| FetchError::Parse(format!("Failed to encode request body: {}", e)))?;
      builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| FetchError::Network(format!("Failed to reach {}: {}", url, e)))?;

    let status = response.status();
    let bytes = response
      .bytes()
      .await
      .map_err(|e| FetchError::Network(format!("Failed to read response from {}: {}", url, e)))?;

    if !status.is_success() {
      let text = String::from_utf8_lossy(&bytes);
      let message = if text.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
      } else {
        text.chars().take(MAX_ERROR_BODY).collect()
      };
      return Err(FetchError::Http {
        status: status.as_u16(),
        message,
      });
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
      return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes)
      .map_err(|e| FetchError::Parse(format!("Invalid JSON from {}: {}", url, e)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  fn transport(base: &str) -> HttpTransport {
    HttpTransport::new(base, Duration::from_secs(5)).unwrap()
  }

  /// Serve one canned HTTP response and return the base URL.
  async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut buf = [0u8; 4096];
      let _ = socket.read(&mut buf).await;
      let response = format!(
        "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
      );
      let _ = socket.write_all(response.as_bytes()).await;
      let _ = socket.shutdown().await;
    });
    format!("http://{}", addr)
  }

  #[test]
  fn test_url_keeps_base_path() {
    let t = transport("http://localhost:8000/api");
    let url = t.url_for(&RequestSpec::get("/rest/products")).unwrap();
    assert_eq!(url.as_str(), "http://localhost:8000/api/rest/products");
  }

  #[test]
  fn test_url_encodes_query() {
    let t = transport("http://localhost:8000/");
    let spec = RequestSpec::get("/rest/products/search").with_query("name", "desk lamp");
    let url = t.url_for(&spec).unwrap();
    assert_eq!(
      url.as_str(),
      "http://localhost:8000/rest/products/search?name=desk+lamp"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    assert!(HttpTransport::new("not a url", Duration::from_secs(1)).is_err());
  }

  #[tokio::test]
  async fn test_success_body_is_returned() {
    let base = serve_once("200 OK", r#"[{"productId":"1"}]"#).await;
    let value = transport(&base)
      .send(&RequestSpec::get("/rest/products"))
      .await
      .unwrap();
    assert_eq!(value, serde_json::json!([{ "productId": "1" }]));
  }

  #[tokio::test]
  async fn test_http_error_carries_status() {
    let base = serve_once("503 Service Unavailable", "").await;
    let err = transport(&base)
      .send(&RequestSpec::get("/rest/products"))
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 503, .. }));
    assert!(err.is_retryable());
  }

  #[tokio::test]
  async fn test_malformed_json_is_parse_error() {
    let base = serve_once("200 OK", "{oops").await;
    let err = transport(&base)
      .send(&RequestSpec::get("/rest/statistic"))
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
  }

  #[tokio::test]
  async fn test_unreachable_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = transport(&format!("http://{}", addr))
      .send(&RequestSpec::get("/rest/products"))
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::Network(_)));
  }
}
