//! HTTP event source for the bridge's SSE endpoint

use std::collections::VecDeque;

use bytes::Bytes;
use contracts::{ConnectError, EventSource, SseDecoder, SseEvent, SseEventStream, StreamError};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::{ReaderError, Result};

/// Connects to `<url>` and yields decoded SSE blocks
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: Client,
    url: String,
}

impl HttpEventSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ReaderError::Client {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl EventSource for HttpEventSource {
    #[instrument(name = "reader_connect", skip(self), fields(url = %self.url))]
    async fn connect(&self) -> std::result::Result<SseEventStream, ConnectError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| ConnectError::unreachable(self.url.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectError::from_status(self.url.as_str(), status.as_u16()));
        }
        debug!(status = %status, "connected");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::transport(e.to_string())))
            .boxed();
        Ok(decode_events(body))
    }
}

struct DecodeState {
    body: BoxStream<'static, std::result::Result<Bytes, StreamError>>,
    decoder: SseDecoder,
    ready: VecDeque<SseEvent>,
    finished: bool,
}

/// Decode a raw SSE byte stream into blocks
///
/// End of body surfaces as `StreamError::Ended`; nothing follows an error.
pub fn decode_events(
    body: BoxStream<'static, std::result::Result<Bytes, StreamError>>,
) -> SseEventStream {
    let state = DecodeState {
        body,
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.decoder.push(&chunk)),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                    return Some((Err(StreamError::Ended), state));
                }
            }
        }
    })
    .boxed()
}
