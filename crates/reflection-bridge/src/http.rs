//! HttpBridge - talks to a running bridge over JSON/HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::BridgeError;
use crate::proto::{DumpRequest, FunctionsDump, ProbeRequest, ProbeResult, PropertiesDump};
use crate::{ReflectionBridge, Result};

const DUMP_PROPERTIES_PATH: &str = "/api/dump";
const DUMP_FUNCTIONS_PATH: &str = "/api/dump-functions";
const PROBE_PATH: &str = "/api/discover";
const PERSISTED_PROBE_PATH: &str = "/api/discovery";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Error bodies are echoed to the operator; keep them short.
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct HttpBridge {
    client: Client,
    base_url: String,
}

impl HttpBridge {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST `body` and run the two-step envelope decode on the answer.
    async fn post_envelope<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, "bridge request");

        let response = self.client.post(&url).json(body).send().await?;
        let text = read_success_body(response).await?;
        Envelope::decode(&text)
    }
}

/// Read the body of a 2xx response. Anything else becomes an error.
async fn read_success_body(response: Response) -> Result<String> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(error_from_body(status.as_u16(), text));
    }

    Ok(text)
}

/// A failure envelope on an error status is surfaced as the bridge's own
/// message; any other body is reported as `Status`, truncated.
fn error_from_body(status: u16, text: String) -> BridgeError {
    match Envelope::parse(&text) {
        Ok(envelope) if !envelope.success && !envelope.message.is_empty() => {
            debug!(status, "bridge rejected request with error status");
            BridgeError::Rejected(envelope.message)
        }
        _ => {
            let mut body = text;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
                body.push_str("...");
            }
            BridgeError::Status { status, body }
        }
    }
}

#[async_trait]
impl ReflectionBridge for HttpBridge {
    async fn dump_properties(&self, req: &DumpRequest) -> Result<PropertiesDump> {
        self.post_envelope(DUMP_PROPERTIES_PATH, req).await
    }

    async fn dump_functions(&self, req: &DumpRequest) -> Result<FunctionsDump> {
        self.post_envelope(DUMP_FUNCTIONS_PATH, req).await
    }

    async fn probe(&self, force: bool) -> Result<ProbeResult> {
        self.post_envelope(PROBE_PATH, &ProbeRequest { force }).await
    }

    async fn load_persisted_probe(&self) -> Result<ProbeResult> {
        let url = self.url(PERSISTED_PROBE_PATH);
        debug!(url = %url, "bridge request");

        let response = self.client.get(&url).send().await?;
        let text = read_success_body(response).await?;
        serde_json::from_str(&text)
            .map_err(|e| BridgeError::InvalidResponse(format!("malformed probe result: {e}")))
    }
}
