use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use qr_scanner_common::frame::Frame;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::traits::Camera;
use super::{now_ms, CameraError};

const BOUNDARY: &[u8] = b"--frame\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Parse state for the MJPEG multipart stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Looking for the boundary marker `--frame\r\n`.
    SeekingBoundary,
    /// Found boundary, now looking for end of headers `\r\n\r\n`.
    SeekingHeaderEnd,
    /// Collecting JPEG bytes until the next boundary.
    CollectingJpeg,
}

/// Incremental `multipart/x-mixed-replace` parser.
///
/// Chunks are pushed as they arrive from the network; complete JPEG parts are
/// pulled out with [`MultipartParser::next_jpeg`]. A part is only complete once
/// the following boundary has been seen.
pub struct MultipartParser {
    buffer: BytesMut,
    state: ParseState,
    jpeg_start: usize,
}

impl MultipartParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256 * 1024),
            state: ParseState::SeekingBoundary,
            jpeg_start: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = ParseState::SeekingBoundary;
        self.jpeg_start = 0;
    }

    /// Returns the next complete, non-empty JPEG part, if one is buffered.
    pub fn next_jpeg(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.state {
                ParseState::SeekingBoundary => {
                    if let Some(pos) = find_subsequence(&self.buffer, BOUNDARY) {
                        let _ = self.buffer.split_to(pos + BOUNDARY.len());
                        self.state = ParseState::SeekingHeaderEnd;
                    } else {
                        // Keep last few bytes in case boundary spans chunks
                        if self.buffer.len() > BOUNDARY.len() {
                            let _ = self.buffer.split_to(self.buffer.len() - BOUNDARY.len());
                        }
                        return None;
                    }
                }
                ParseState::SeekingHeaderEnd => {
                    if let Some(pos) = find_subsequence(&self.buffer, HEADER_END) {
                        let _ = self.buffer.split_to(pos + HEADER_END.len());
                        self.jpeg_start = 0;
                        self.state = ParseState::CollectingJpeg;
                    } else {
                        return None;
                    }
                }
                ParseState::CollectingJpeg => {
                    let Some(pos) = find_subsequence(&self.buffer[self.jpeg_start..], BOUNDARY)
                    else {
                        // Don't re-scan what was already searched
                        self.jpeg_start = self.buffer.len().saturating_sub(BOUNDARY.len());
                        return None;
                    };

                    let jpeg_end = self.jpeg_start + pos;
                    // Strip trailing \r\n before boundary
                    let end = if jpeg_end >= 2
                        && self.buffer[jpeg_end - 2] == b'\r'
                        && self.buffer[jpeg_end - 1] == b'\n'
                    {
                        jpeg_end - 2
                    } else {
                        jpeg_end
                    };
                    let jpeg = self.buffer[..end].to_vec();
                    let _ = self.buffer.split_to(jpeg_end + BOUNDARY.len());
                    self.state = ParseState::SeekingHeaderEnd;

                    if !jpeg.is_empty() {
                        return Some(jpeg);
                    }
                }
            }
        }
    }
}

impl Default for MultipartParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Camera backed by an HTTP MJPEG stream.
///
/// The connection is opened eagerly so a bad URL fails at startup. If the
/// stream later errors or ends, the read fails and the next read reconnects.
/// A read that produces no complete frame within `read_timeout` drops the
/// connection and fails with [`CameraError::Timeout`].
pub struct MjpegCamera {
    client: reqwest::Client,
    url: String,
    stream: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    parser: MultipartParser,
    read_timeout: Duration,
    seq: u64,
    released: bool,
}

impl MjpegCamera {
    pub async fn open(
        url: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, CameraError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(CameraError::HttpClient)?;
        let mut camera = Self {
            client,
            url: url.to_string(),
            stream: None,
            parser: MultipartParser::new(),
            read_timeout,
            seq: 0,
            released: false,
        };
        camera.connect().await?;
        Ok(camera)
    }

    async fn connect(&mut self) -> Result<(), CameraError> {
        info!(url = self.url, "connecting to MJPEG stream");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(CameraError::HttpConnect)?;

        if !response.status().is_success() {
            return Err(CameraError::HttpStatus(response.status().as_u16()));
        }

        info!(status = %response.status(), "connected to MJPEG stream");
        self.parser.reset();
        self.stream = Some(response.bytes_stream().boxed());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.stream = None;
        self.parser.reset();
    }

    /// Pull chunks until the parser yields a complete JPEG.
    async fn next_frame(&mut self) -> Result<Frame, CameraError> {
        loop {
            if let Some(jpeg) = self.parser.next_jpeg() {
                let seq = self.seq;
                self.seq += 1;
                debug!(seq, bytes = jpeg.len(), "MJPEG frame received");
                return Ok(Frame::from_encoded(&jpeg, now_ms(), seq)?);
            }

            let next = match self.stream.as_mut() {
                Some(stream) => stream.next().await,
                None => {
                    self.connect().await?;
                    continue;
                }
            };
            match next {
                Some(Ok(chunk)) => self.parser.push(&chunk),
                Some(Err(e)) => {
                    warn!(error = %e, url = self.url, "MJPEG stream error, dropping connection");
                    self.disconnect();
                    return Err(CameraError::HttpStream(e));
                }
                None => {
                    self.disconnect();
                    return Err(CameraError::StreamEnded);
                }
            }
        }
    }

    #[cfg(test)]
    fn from_stream(
        stream: BoxStream<'static, reqwest::Result<Bytes>>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: "http://camera.test/stream".into(),
            stream: Some(stream),
            parser: MultipartParser::new(),
            read_timeout,
            seq: 0,
            released: false,
        }
    }
}

impl Camera for MjpegCamera {
    async fn read(&mut self) -> Result<Frame, CameraError> {
        if self.released {
            return Err(CameraError::Released);
        }

        let limit = self.read_timeout;
        let outcome = tokio::time::timeout(limit, self.next_frame()).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    url = self.url,
                    timeout = ?limit,
                    "MJPEG stream stalled, dropping connection"
                );
                self.disconnect();
                Err(CameraError::Timeout(limit))
            }
        }
    }

    fn release(&mut self) {
        self.disconnect();
        self.released = true;
        info!(url = self.url, "MJPEG camera released");
    }

    fn name(&self) -> &str {
        "mjpeg"
    }
}

/// Find the position of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
