use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use super::ChunkSource;
use anyhow::{bail, Result};

/// HTTP source streaming a remote body chunk by chunk
///
/// Interrupted transfers are resumed with Range requests from the
/// last received byte.
pub struct HttpSource {
    client: Client,
    url: String,
    response: Option<Response>,
    transferred_bytes: u64,
    max_retry: u32,
    retry_delay: Duration,
    started: bool,
}

impl HttpSource {
    /// Create a new HTTP source
    ///
    /// No request is sent until the first chunk is pulled, so connection
    /// failures surface as content errors of the owning element
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            url,
            response: None,
            transferred_bytes: 0,
            max_retry: 10,
            retry_delay: Duration::from_millis(500),
            started: false,
        })
    }

    /// Name of the last non-empty path segment of the URL
    pub fn file_name(&self) -> Option<&str> {
        file_name_from_url(&self.url)
    }

    /// Get total body bytes received from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    async fn connect(&self) -> Result<Response> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            bail!("HTTP request failed with status: {}", resp.status());
        }
        Ok(resp)
    }

    async fn resume(&self) -> Result<Response> {
        let range = format!("bytes={}-", self.transferred_bytes);
        let resp = self
            .client
            .get(&self.url)
            .header("Range", &range)
            .send()
            .await?;

        if resp.status() != StatusCode::PARTIAL_CONTENT {
            bail!("HTTP resume failed with status: {}", resp.status());
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChunkSource for HttpSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if !self.started {
            self.response = Some(self.connect().await?);
            self.started = true;
        }

        let mut retry_count = 0;

        loop {
            let resp = match self.response.take() {
                Some(resp) => resp,
                None => match self.resume().await {
                    Ok(resp) => resp,
                    Err(e) => {
                        retry_count += 1;
                        if retry_count >= self.max_retry {
                            return Err(e.context("Max retries exceeded"));
                        }
                        tracing::warn!(
                            url = %self.url,
                            "Resume failed, retry {}/{}: {}",
                            retry_count,
                            self.max_retry,
                            e
                        );
                        tokio::time::sleep(self.retry_delay * retry_count).await;
                        continue;
                    }
                },
            };
            let resp = self.response.insert(resp);

            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    self.transferred_bytes += chunk.len() as u64;
                    return Ok(Some(chunk));
                }
                Ok(None) => {
                    tracing::debug!(url = %self.url, bytes = self.transferred_bytes, "Download complete");
                    return Ok(None);
                }
                // a body cut short by the peer surfaces as a decode error
                Err(e) if e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() => {
                    self.response = None;
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(anyhow::Error::from(e).context("Max retries exceeded"));
                    }
                    tracing::warn!(
                        url = %self.url,
                        received = self.transferred_bytes,
                        "Connection error, retry {}/{}: {}",
                        retry_count,
                        self.max_retry,
                        e
                    );
                    tokio::time::sleep(self.retry_delay * retry_count).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn file_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    // skip the host
    let (_, path) = path.split_once('/')?;
    path.rsplit('/').find(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::collect;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const BODY: &[u8] = b"0123456789";

    fn reply(status: &str, headers: &str, body: &[u8]) -> Vec<u8> {
        let mut out =
            format!("HTTP/1.1 {status}\r\n{headers}Connection: close\r\n\r\n").into_bytes();
        out.extend_from_slice(body);
        out
    }

    /// Full-length response whose connection drops after four body bytes
    fn truncated() -> Vec<u8> {
        reply("200 OK", "Content-Length: 10\r\n", &BODY[..4])
    }

    /// Answers one connection per scripted reply, returning the request heads
    async fn serve(replies: Vec<Vec<u8>>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/files/data.bin", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let mut requests = Vec::new();
            for reply in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&buf[..n]);
                }
                requests.push(String::from_utf8_lossy(&head).to_ascii_lowercase());
                socket.write_all(&reply).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            requests
        });

        (url, server)
    }

    fn source(url: String, max_retry: u32) -> HttpSource {
        let mut source = HttpSource::new(url).unwrap();
        source.max_retry = max_retry;
        source.retry_delay = Duration::from_millis(10);
        source
    }

    #[tokio::test]
    async fn resumes_interrupted_body_with_range() {
        let (url, server) = serve(vec![
            truncated(),
            reply(
                "206 Partial Content",
                "Content-Range: bytes 4-9/10\r\nContent-Length: 6\r\n",
                &BODY[4..],
            ),
        ])
        .await;

        let mut source = source(url, 10);
        assert_eq!(collect(&mut source).await.unwrap(), BODY);
        assert_eq!(source.transferred_bytes(), BODY.len() as u64);

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].contains("range:"));
        assert!(requests[1].contains("range: bytes=4-"));
    }

    #[tokio::test]
    async fn resume_without_partial_content_fails() {
        let (url, server) = serve(vec![
            truncated(),
            reply("200 OK", "Content-Length: 10\r\n", BODY),
        ])
        .await;

        let mut source = source(url, 2);
        assert_eq!(source.next_chunk().await.unwrap().unwrap(), &BODY[..4]);
        let err = source.next_chunk().await.unwrap_err();
        assert!(format!("{err:#}").contains("HTTP resume failed with status: 200 OK"));
        assert_eq!(source.transferred_bytes(), 4);
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retry_attempts() {
        let unavailable = || reply("503 Service Unavailable", "Content-Length: 0\r\n", b"");
        let (url, server) = serve(vec![truncated(), unavailable(), unavailable()]).await;

        let mut source = source(url, 3);
        assert_eq!(source.next_chunk().await.unwrap().unwrap(), &BODY[..4]);
        let err = source.next_chunk().await.unwrap_err();
        assert_eq!(err.to_string(), "Max retries exceeded");
        assert_eq!(server.await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn body_error_keeps_its_cause() {
        let (url, server) = serve(vec![truncated()]).await;

        let mut source = source(url, 1);
        assert_eq!(source.next_chunk().await.unwrap().unwrap(), &BODY[..4]);
        let err = source.next_chunk().await.unwrap_err();
        assert_eq!(err.to_string(), "Max retries exceeded");
        assert!(err.chain().nth(1).is_some());
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[test]
    fn file_name_uses_last_path_segment() {
        assert_eq!(
            file_name_from_url("https://example.com/dist/data.csv?sig=1"),
            Some("data.csv")
        );
        assert_eq!(file_name_from_url("http://example.com/a/b/"), Some("b"));
        assert_eq!(file_name_from_url("https://example.com"), None);
        assert_eq!(file_name_from_url("https://example.com/"), None);
    }
}
