//! Blocking `Read + Seek` over HTTP range requests
//!
//! The TIFF decoder wants a seekable reader. This one fetches aligned blocks on
//! demand through the async client, driven from a blocking thread via the
//! runtime handle. Blocks live only as long as the reader.

use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom};

use bytes::Bytes;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};
use tokio::runtime::Handle;
use tracing::debug;

use crate::error::SampleError;

/// Bytes fetched per request
pub const BLOCK_SIZE: u64 = 64 * 1024;

enum Fetched {
    /// 206 with the total length from `Content-Range`, if the server sent one
    Partial { body: Bytes, total: Option<u64> },
    /// 200: the server ignored the range and sent everything
    Whole(Bytes),
}

/// Seekable view of a remote resource
///
/// Must be used from a blocking context (e.g. inside `spawn_blocking`), never
/// from an async task.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    runtime: Handle,
    len: u64,
    position: u64,
    blocks: HashMap<u64, Bytes>,
    whole: Option<Bytes>,
}

impl HttpRangeReader {
    /// Fetch the first block and learn the resource length
    pub fn open(client: Client, url: &str, runtime: Handle) -> Result<Self, SampleError> {
        let mut reader = Self {
            client,
            url: url.to_string(),
            runtime,
            len: 0,
            position: 0,
            blocks: HashMap::new(),
            whole: None,
        };

        match reader.fetch(0, BLOCK_SIZE - 1)? {
            Fetched::Whole(body) => {
                debug!(url, bytes = body.len(), "Server ignored range request");
                reader.len = body.len() as u64;
                reader.whole = Some(body);
            }
            Fetched::Partial { body, total } => {
                reader.len = total.ok_or_else(|| {
                    SampleError::unavailable(url, "response did not state the resource length")
                })?;
                reader.blocks.insert(0, body);
            }
        }

        Ok(reader)
    }

    /// Total resource length in bytes
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of range requests issued so far
    #[must_use]
    pub fn blocks_fetched(&self) -> usize {
        self.blocks.len()
    }

    fn fetch(&self, start: u64, end: u64) -> Result<Fetched, SampleError> {
        let request = self
            .client
            .get(&self.url)
            .header(RANGE, format!("bytes={start}-{end}"));
        let url = self.url.as_str();

        self.runtime.block_on(async {
            let response = request
                .send()
                .await
                .map_err(|e| SampleError::unavailable(url, format!("request failed: {e}")))?;

            let status = response.status();
            let total = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_content_range_total);

            match status {
                StatusCode::PARTIAL_CONTENT | StatusCode::OK => {
                    let body = response.bytes().await.map_err(|e| {
                        SampleError::unavailable(url, format!("body read failed: {e}"))
                    })?;
                    if status == StatusCode::OK {
                        Ok(Fetched::Whole(body))
                    } else {
                        Ok(Fetched::Partial { body, total })
                    }
                }
                StatusCode::NOT_FOUND | StatusCode::GONE | StatusCode::FORBIDDEN => Err(
                    SampleError::unavailable(url, format!("not published (HTTP {status})")),
                ),
                other => Err(SampleError::unavailable(url, format!("HTTP {other}"))),
            }
        })
    }

    fn block(&mut self, index: u64) -> io::Result<Bytes> {
        if let Some(block) = self.blocks.get(&index) {
            return Ok(block.clone());
        }

        let start = index * BLOCK_SIZE;
        let end = (start + BLOCK_SIZE).min(self.len) - 1;
        debug!(url = %self.url, start, end, "Fetching block");

        match self.fetch(start, end).map_err(io::Error::other)? {
            Fetched::Partial { body, .. } => {
                self.blocks.insert(index, body.clone());
                Ok(body)
            }
            Fetched::Whole(body) => {
                // The server stopped honoring ranges; trust the body it sent
                self.len = body.len() as u64;
                self.whole = Some(body.clone());
                if start >= self.len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "server returned a short body",
                    ));
                }
                Ok(body.slice(start as usize..(end as usize + 1).min(body.len())))
            }
        }
    }
}

/// Total length from `bytes 0-99/1234`; `None` for `*` or malformed values
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

impl Read for HttpRangeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.position >= self.len {
            return Ok(0);
        }

        let available = match &self.whole {
            Some(whole) => whole.slice(self.position as usize..),
            None => {
                let index = self.position / BLOCK_SIZE;
                let block = self.block(index)?;
                let offset = (self.position - index * BLOCK_SIZE) as usize;
                if offset >= block.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "server returned a short range",
                    ));
                }
                block.slice(offset..)
            }
        };

        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => self.len.checked_add_signed(offset),
            SeekFrom::Current(offset) => self.position.checked_add_signed(offset),
        };

        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of resource",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::http::header;
    use axum::response::IntoResponse;
    use axum::routing::get;

    /// First request answers 206 for a large resource, later ones a short 200
    async fn flaky_host() -> String {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new().route(
            "/raster.tif",
            get(move || {
                let hits = hits.clone();
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                        (
                            StatusCode::PARTIAL_CONTENT,
                            [(header::CONTENT_RANGE, "bytes 0-65535/200000")],
                            vec![0u8; BLOCK_SIZE as usize],
                        )
                            .into_response()
                    } else {
                        vec![1u8; 10].into_response()
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/raster.tif")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_short_whole_body_after_partial_is_eof() {
        let url = flaky_host().await;
        let runtime = Handle::current();

        let (err, len) = tokio::task::spawn_blocking(move || {
            let mut reader = HttpRangeReader::open(Client::new(), &url, runtime).unwrap();
            assert_eq!(reader.len(), 200_000);
            reader.seek(SeekFrom::Start(70_000)).unwrap();
            let mut buf = [0u8; 16];
            (reader.read(&mut buf).unwrap_err(), reader.len())
        })
        .await
        .unwrap();

        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(len, 10);
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("bytes 0-65535/1048576"), Some(1_048_576));
        assert_eq!(parse_content_range_total("bytes 0-9/10"), Some(10));
        assert_eq!(parse_content_range_total("bytes 0-9/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
