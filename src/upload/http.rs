//! HTTP multipart uploader
//!
//! Streams the file as a single multipart part. The response body is read
//! so the exchange completes, and logged truncated.

use super::{UploadClient, UploadError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;

/// Bytes of response body kept for the log
const RESPONSE_LOG_LIMIT: usize = 512;

const AUDIO_MIME: &str = "audio/wav";

pub struct HttpUploadClient {
    client: reqwest::Client,
}

impl HttpUploadClient {
    /// Client whose every request is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("field-recorder/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UploadClient for HttpUploadClient {
    async fn upload_file(
        &mut self,
        url: &str,
        path: &Path,
        field_name: &str,
    ) -> Result<u16, UploadError> {
        let file = tokio::fs::File::open(path).await?;
        let len = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording.wav".to_string());

        let part = Part::stream_with_length(file, len)
            .file_name(file_name)
            .mime_str(AUDIO_MIME)?;
        let form = Form::new().part(field_name.to_string(), part);

        tracing::debug!("POST {} ({} bytes from {:?})", url, len, path);
        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let shown: String = body.chars().take(RESPONSE_LOG_LIMIT).collect();
        tracing::debug!("HTTP POST status = {}, response: {}", status, shown);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    /// Accepts one request, returns `status`, and hands back the raw request
    async fn one_shot_server(status: &'static str) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/recordings", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 8192];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);

                let Some(head_end) = find(&request, b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
                let body = &request[head_end + 4..];
                let content_length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok());
                let done = match content_length {
                    Some(len) => body.len() >= len,
                    None => find(body, b"0\r\n\r\n").is_some(),
                };
                if done {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                status
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_uploads_file_as_multipart_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec_00001.wav");
        std::fs::write(&path, b"RIFF-test-payload").unwrap();

        let (url, server) = one_shot_server("201 Created").await;
        let mut client = HttpUploadClient::new(Duration::from_secs(5)).unwrap();

        let status = client.upload_file(&url, &path, "audio").await.unwrap();
        assert_eq!(status, 201);

        let request = String::from_utf8_lossy(&server.await.unwrap()).into_owned();
        assert!(request.starts_with("POST /v1/recordings"));
        assert!(request.contains("name=\"audio\""));
        assert!(request.contains("filename=\"rec_00001.wav\""));
        assert!(request.contains("RIFF-test-payload"));
    }

    #[tokio::test]
    async fn test_server_error_is_a_status_not_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rec_00002.wav");
        std::fs::write(&path, b"data").unwrap();

        let (url, _server) = one_shot_server("500 Internal Server Error").await;
        let mut client = HttpUploadClient::new(Duration::from_secs(5)).unwrap();

        assert_eq!(client.upload_file(&url, &path, "audio").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/recordings", listener.local_addr().unwrap());
        drop(listener);

        let dir = tempdir().unwrap();
        let path = dir.path().join("rec_00003.wav");
        std::fs::write(&path, b"data").unwrap();

        let mut client = HttpUploadClient::new(Duration::from_secs(5)).unwrap();
        let err = client.upload_file(&url, &path, "audio").await.unwrap_err();
        assert!(matches!(err, UploadError::Transport(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let mut client = HttpUploadClient::new(Duration::from_secs(5)).unwrap();
        let err = client
            .upload_file("http://127.0.0.1:9/x", &dir.path().join("gone.wav"), "audio")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Io(_)));
    }
}
