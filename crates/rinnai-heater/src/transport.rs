//! HTTP transport to the heater.
//!
//! The device speaks plain unauthenticated `GET http://<host>/<endpoint>` and
//! answers with a comma-separated text body. [`Transport`] is the seam the
//! heater talks through; [`HttpTransport`] is the reqwest implementation.
//! Request serialization lives one level up, in the heater, so every
//! implementation gets the same one-in-flight guarantee.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::HeaterConfig;
use crate::error::{HeaterError, HeaterResult};
use crate::fields::Endpoint;

/// Raw access to the device endpoints.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the body of one endpoint.
    async fn get(&self, endpoint: Endpoint) -> HeaterResult<String>;

    /// Base URL, for logging.
    fn base_url(&self) -> &str;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> HeaterResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| HeaterError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// Build from validated options.
    pub fn from_config(config: &HeaterConfig) -> HeaterResult<Self> {
        config.validate()?;
        Self::new(config.base_url(), config.request_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, endpoint: Endpoint) -> HeaterResult<String> {
        let url = self.url(endpoint);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(HeaterError::Communication(format!(
                "HTTP error on /{}: {}",
                endpoint,
                response.status()
            )));
        }

        let body = response.text().await?;
        debug!(endpoint = %endpoint, "response: {}", body);
        Ok(body)
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer `count` connections with `status` and `body`, returning the
    /// request lines seen.
    async fn serve(status: &'static str, body: &'static str, count: usize) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..count {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap();
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                seen.push(request.lines().next().unwrap_or_default().to_string());
                let reply = format!(
                    "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            seen
        });
        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_get_returns_body() {
        let (base, server) = serve("200 OK", "1,2,,4,5", 1).await;
        let transport = HttpTransport::new(base, Duration::from_secs(5)).unwrap();

        let body = transport.get(Endpoint::Tela).await.unwrap();
        assert_eq!(body, "1,2,,4,5");

        let seen = server.await.unwrap();
        assert_eq!(seen, vec!["GET /tela_ HTTP/1.1".to_string()]);
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let (base, _server) = serve("500 Internal Server Error", "", 1).await;
        let transport = HttpTransport::new(base, Duration::from_secs(5)).unwrap();

        let err = transport.get(Endpoint::Bus).await.unwrap_err();
        assert!(matches!(err, HeaterError::Communication(_)));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport =
            HttpTransport::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        let err = transport.get(Endpoint::Bus).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_from_config() {
        let config = HeaterConfig::new("x", "10.0.0.9").with_request_timeout(3.0);
        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(transport.base_url(), "http://10.0.0.9");
        assert_eq!(transport.url(Endpoint::Consumo), "http://10.0.0.9/consumo");
        assert_eq!(transport.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_from_config_rejects_bad_timeout() {
        let config = HeaterConfig::new("x", "10.0.0.9").with_request_timeout(f64::NAN);
        assert!(matches!(
            HttpTransport::from_config(&config),
            Err(HeaterError::Configuration(_))
        ));
    }
}
