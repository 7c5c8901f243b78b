//! HTTP hub client
//!
//! Talks to a real hub over HTTPS. Hubs present self-signed certificates, so
//! verification is configurable per `HubConfig::accept_invalid_certs`.

use std::collections::VecDeque;

use bytes::Bytes;
use contracts::{
    ConnectError, HubBatchStream, HubClient, HubConfig, HubEventBatch, HubSession, SseDecoder,
    StreamError,
};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::error::{IngestionError, Result};

/// Header carrying the hub application key
const APPLICATION_KEY_HEADER: &str = "hue-application-key";

/// Event feed path
const EVENTSTREAM_PATH: &str = "/eventstream/clip/v2";

/// Bridge resource path, requested to check the credential
const BRIDGE_RESOURCE_PATH: &str = "/clip/v2/resource/bridge";

/// Hub client over reqwest
#[derive(Debug, Clone)]
pub struct HttpHubClient {
    client: Client,
}

impl HttpHubClient {
    /// Build a client from the hub section of the config
    pub fn new(config: &HubConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| IngestionError::Client {
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    fn url(address: &str, path: &str) -> std::result::Result<Url, ConnectError> {
        Url::parse(&format!("https://{address}{path}")).map_err(|e| {
            ConnectError::InvalidAddress {
                address: address.to_string(),
                message: e.to_string(),
            }
        })
    }

    async fn get(
        &self,
        address: &str,
        credential: &str,
        path: &str,
        event_stream: bool,
    ) -> std::result::Result<reqwest::Response, ConnectError> {
        let url = Self::url(address, path)?;
        let mut request = self.client.get(url).header(APPLICATION_KEY_HEADER, credential);
        if event_stream {
            request = request
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache");
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectError::unreachable(address, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectError::from_status(address, status.as_u16()));
        }
        Ok(response)
    }
}

/// `GET /clip/v2/resource/bridge` response body (only the part we read)
#[derive(Debug, Deserialize)]
struct BridgeResource {
    #[serde(default)]
    data: Vec<BridgeEntry>,
}

#[derive(Debug, Deserialize)]
struct BridgeEntry {
    bridge_id: Option<String>,
}

impl HubClient for HttpHubClient {
    #[instrument(name = "hub_authenticate", skip(self, credential), fields(address = %address))]
    async fn authenticate(
        &self,
        address: &str,
        credential: &str,
    ) -> std::result::Result<HubSession, ConnectError> {
        let response = self
            .get(address, credential, BRIDGE_RESOURCE_PATH, false)
            .await?;

        // The hub id is informational; an unexpected body still counts as accepted.
        let bridge_id = match response.json::<BridgeResource>().await {
            Ok(resource) => resource.data.into_iter().find_map(|b| b.bridge_id),
            Err(e) => {
                debug!(error = %e, "bridge resource body not understood");
                None
            }
        };

        Ok(HubSession {
            address: address.to_string(),
            bridge_id,
        })
    }

    #[instrument(name = "hub_subscribe", skip(self, credential), fields(address = %address))]
    async fn subscribe(
        &self,
        address: &str,
        credential: &str,
    ) -> std::result::Result<HubBatchStream, ConnectError> {
        let response = self
            .get(address, credential, EVENTSTREAM_PATH, true)
            .await?;
        debug!(status = %response.status(), "event feed open");

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::transport(e.to_string())))
            .boxed();
        Ok(decode_batches(body))
    }
}

struct FeedState {
    body: BoxStream<'static, std::result::Result<Bytes, StreamError>>,
    decoder: SseDecoder,
    ready: VecDeque<std::result::Result<HubEventBatch, StreamError>>,
    finished: bool,
}

/// Turn a raw SSE byte stream into hub batches
///
/// Every SSE message with a data field is one batch. The first error ends the
/// stream; end of body is reported as `StreamError::Ended`.
pub fn decode_batches(
    body: BoxStream<'static, std::result::Result<Bytes, StreamError>>,
) -> HubBatchStream {
    let state = FeedState {
        body,
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                if item.is_err() {
                    state.ready.clear();
                    state.finished = true;
                }
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    for event in state.decoder.push(&chunk) {
                        if let Some(data) = event.data {
                            trace!(len = data.len(), "hub message");
                            state.ready.push_back(HubEventBatch::from_json(&data));
                        }
                    }
                }
                Some(Err(e)) => state.ready.push_back(Err(e)),
                None => state.ready.push_back(Err(StreamError::Ended)),
            }
        }
    })
    .boxed()
}
