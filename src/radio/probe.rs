//! Host radio link
//!
//! Treats "the server accepts a TCP connection" as "the link is up". Each
//! connect makes an initial association attempt plus a bounded number of
//! retries, all inside one overall timeout.

use super::{LinkState, RadioError, RadioLink};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// Pause between association attempts
const ASSOCIATION_BACKOFF: Duration = Duration::from_millis(500);

pub struct ProbeLink {
    host: String,
    port: u16,
    connect_timeout: Duration,
    max_association_retries: u8,
    retry_count: u8,
    state: LinkState,
}

impl ProbeLink {
    /// Link that probes the host and port of `server_base_url`
    pub fn new(
        server_base_url: &str,
        connect_timeout: Duration,
        max_association_retries: u8,
    ) -> Result<Self, RadioError> {
        let url = reqwest::Url::parse(server_base_url)
            .map_err(|e| RadioError::StackUnavailable(format!("{}: {}", server_base_url, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| RadioError::StackUnavailable(format!("{} has no host", url)))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| RadioError::StackUnavailable(format!("{} has no port", url)))?;

        Ok(Self {
            host,
            port,
            connect_timeout,
            max_association_retries,
            retry_count: 0,
            state: LinkState::Uninitialized,
        })
    }

    /// Association retries used by the most recent connect
    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn associate(&mut self) -> Result<(), RadioError> {
        loop {
            match TcpStream::connect((self.host.as_str(), self.port)).await {
                Ok(_stream) => {
                    tracing::info!("Link up: {}:{}", self.host, self.port);
                    self.retry_count = 0;
                    return Ok(());
                }
                Err(e) if self.retry_count < self.max_association_retries => {
                    self.retry_count += 1;
                    tracing::info!(
                        "Association failed ({}), retry {}/{}",
                        e,
                        self.retry_count,
                        self.max_association_retries
                    );
                    tokio::time::sleep(ASSOCIATION_BACKOFF).await;
                }
                Err(e) => {
                    return Err(RadioError::ConnectFailed {
                        attempts: self.retry_count as u32 + 1,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl RadioLink for ProbeLink {
    async fn connect(&mut self) -> Result<(), RadioError> {
        if self.state == LinkState::Uninitialized {
            tracing::info!("Network stack ready");
            self.state = LinkState::Idle;
        }
        if self.state == LinkState::Connected {
            return Ok(());
        }

        self.state = LinkState::Connecting;
        self.retry_count = 0;
        let timeout = self.connect_timeout;

        let result = match tokio::time::timeout(timeout, self.associate()).await {
            Ok(result) => result,
            Err(_) => Err(RadioError::Timeout(timeout.as_millis() as u64)),
        };

        self.state = match result {
            Ok(()) => LinkState::Connected,
            Err(ref e) => {
                tracing::warn!("Failed to connect to {}: {}", self.endpoint(), e);
                LinkState::Failed
            }
        };
        result
    }

    async fn disconnect(&mut self) {
        if self.state == LinkState::Uninitialized {
            return;
        }
        self.state = LinkState::Idle;
        tracing::info!("Radio powered down");
    }

    fn state(&self) -> LinkState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connects_to_listening_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{}", port);

        let mut link = ProbeLink::new(&url, Duration::from_secs(5), 2).unwrap();
        assert_eq!(link.state(), LinkState::Uninitialized);

        link.connect().await.unwrap();
        assert!(link.is_connected());

        link.disconnect().await;
        assert_eq!(link.state(), LinkState::Idle);
        assert!(!link.is_connected());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_after_retries() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("http://127.0.0.1:{}", port);
        let mut link = ProbeLink::new(&url, Duration::from_secs(10), 2).unwrap();

        let err = link.connect().await.unwrap_err();
        assert!(matches!(err, RadioError::ConnectFailed { attempts: 3, .. }));
        assert_eq!(link.state(), LinkState::Failed);
        assert_eq!(link.retry_count(), 2);
    }

    #[test]
    fn test_default_port_from_scheme() {
        let link = ProbeLink::new("https://example.com/api", Duration::from_secs(1), 0).unwrap();
        assert_eq!(link.endpoint(), "example.com:443");
        assert!(ProbeLink::new("not a url", Duration::from_secs(1), 0).is_err());
    }
}
