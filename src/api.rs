// API client module: talks to the hosted fal queue. A request is submitted,
// its status polled until it completes, then the result fetched. The HTTP
// side sits behind `QueueTransport` so the polling driver can run against
// scripted transports in tests.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::credential::Credential;
use crate::error::{FetchError, RemoteError};
use crate::params::GenerationRequest;
use crate::progress::{LogEntry, ProgressEvent};

pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";
pub const DEFAULT_MODEL: &str = "fal-ai/stable-diffusion-v35-large";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One image reference in a result. Other fields the service sends are
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
}

/// Final payload of a generation. A missing or `null` `images` field parses
/// as an empty list; the renderer treats that as "no image produced".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<ImageRef>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ImageRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ImageRef>>::deserialize(deserializer)?.unwrap_or_default())
}

impl GenerationResult {
    pub fn first_image(&self) -> Option<&ImageRef> {
        self.images.first()
    }

    /// Parse a raw result body. `null` is an empty result.
    pub fn from_value(value: Value) -> Result<Self, RemoteError> {
        if value.is_null() {
            return Ok(GenerationResult::default());
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Handle returned by a queue submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    pub request_id: String,
    pub status_url: String,
    pub response_url: String,
}

/// Status body of a queued request, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    InQueue {
        #[serde(default)]
        queue_position: Option<u64>,
    },
    InProgress {
        #[serde(default)]
        logs: Option<Vec<LogEntry>>,
    },
    Completed {
        #[serde(default)]
        logs: Option<Vec<LogEntry>>,
        #[serde(default)]
        error: Option<String>,
    },
}

impl QueueStatus {
    pub fn to_event(&self) -> ProgressEvent {
        match self {
            QueueStatus::InQueue { queue_position } => ProgressEvent::Queued {
                position: *queue_position,
            },
            QueueStatus::InProgress { logs } => ProgressEvent::InProgress {
                logs: logs.clone().unwrap_or_default(),
            },
            QueueStatus::Completed { logs, .. } => ProgressEvent::Completed {
                logs: logs.clone().unwrap_or_default(),
            },
        }
    }
}

/// The three calls of the queue protocol. The credential is borrowed per
/// call; implementations must not keep it.
pub trait QueueTransport {
    fn submit(
        &self,
        model: &str,
        body: &Value,
        credential: &Credential,
    ) -> Result<QueueHandle, RemoteError>;

    fn status(&self, handle: &QueueHandle, credential: &Credential)
        -> Result<QueueStatus, RemoteError>;

    fn result(&self, handle: &QueueHandle, credential: &Credential) -> Result<Value, RemoteError>;
}

/// Blocking HTTP transport for the hosted fal queue.
#[derive(Clone)]
pub struct FalQueue {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    request_id: String,
    #[serde(default)]
    status_url: Option<String>,
    #[serde(default)]
    response_url: Option<String>,
}

/// Build the handle for a submission. When the service omits the status or
/// response URL it is derived from the app id, which is the first two
/// segments of the model path (`owner/app`); sub-paths are not part of it.
fn queue_handle(base_url: &str, model: &str, parsed: SubmitResponse) -> QueueHandle {
    let app_id = model
        .trim_matches('/')
        .split('/')
        .take(2)
        .collect::<Vec<_>>()
        .join("/");
    let request_base = format!("{}/{}/requests/{}", base_url, app_id, parsed.request_id);
    QueueHandle {
        status_url: parsed
            .status_url
            .unwrap_or_else(|| format!("{request_base}/status")),
        response_url: parsed.response_url.unwrap_or(request_base),
        request_id: parsed.request_id,
    }
}

impl FalQueue {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .build()
            .map_err(|e| RemoteError::Network {
                context: "Failed to build HTTP client".into(),
                source: e,
            })?;
        Ok(FalQueue {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn authorized(&self, req: RequestBuilder, credential: &Credential) -> RequestBuilder {
        req.header(AUTHORIZATION, format!("Key {}", credential.expose()))
    }

    /// Send, mapping transport failures and non-2xx statuses to `RemoteError`.
    fn send(req: RequestBuilder, context: &str) -> Result<Response, RemoteError> {
        let res = req.send().map_err(|e| RemoteError::Network {
            context: context.to_string(),
            source: e,
        })?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(RemoteError::Http { status, body });
        }
        Ok(res)
    }

    fn read_json(res: Response) -> Result<Value, RemoteError> {
        let text = res.text().map_err(|e| RemoteError::Network {
            context: "Failed to read response body".into(),
            source: e,
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl QueueTransport for FalQueue {
    fn submit(
        &self,
        model: &str,
        body: &Value,
        credential: &Credential,
    ) -> Result<QueueHandle, RemoteError> {
        let model = model.trim_matches('/');
        let url = format!("{}/{}", self.base_url, model);
        let req = self.authorized(self.client.post(&url).json(body), credential);
        let res = Self::send(req, "Failed to submit generation request")?;
        let parsed: SubmitResponse = serde_json::from_value(Self::read_json(res)?)
            .map_err(|e| RemoteError::InvalidResponse(format!("submit response: {e}")))?;
        Ok(queue_handle(&self.base_url, model, parsed))
    }

    fn status(
        &self,
        handle: &QueueHandle,
        credential: &Credential,
    ) -> Result<QueueStatus, RemoteError> {
        let req = self.authorized(
            self.client.get(&handle.status_url).query(&[("logs", "1")]),
            credential,
        );
        let res = Self::send(req, "Failed to poll request status")?;
        serde_json::from_value(Self::read_json(res)?)
            .map_err(|e| RemoteError::InvalidResponse(format!("status response: {e}")))
    }

    fn result(&self, handle: &QueueHandle, credential: &Credential) -> Result<Value, RemoteError> {
        let req = self.authorized(self.client.get(&handle.response_url), credential);
        let res = Self::send(req, "Failed to fetch generation result")?;
        Self::read_json(res)
    }
}

/// Drives one generation through a `QueueTransport`.
pub struct GenerationClient<T> {
    transport: T,
    model: String,
    poll_interval: Duration,
}

impl<T: QueueTransport> GenerationClient<T> {
    pub fn new(transport: T, model: impl Into<String>) -> Self {
        GenerationClient {
            transport,
            model: model.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit `request` and block until it finishes. Every status poll is
    /// forwarded to `on_progress` in arrival order before this returns.
    /// There is no local deadline.
    pub fn generate(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
        on_progress: &mut dyn FnMut(&ProgressEvent),
    ) -> Result<GenerationResult, RemoteError> {
        let handle = self
            .transport
            .submit(&self.model, &request.to_body(), credential)?;
        info!(request_id = %handle.request_id, model = %self.model, "submitted generation request");

        loop {
            let status = self.transport.status(&handle, credential)?;
            debug!(request_id = %handle.request_id, status = status_label(&status), "polled status");
            on_progress(&status.to_event());

            if let QueueStatus::Completed { error, .. } = status {
                if let Some(error) = error {
                    warn!(request_id = %handle.request_id, %error, "generation reported an error");
                    return Err(RemoteError::Remote(error));
                }
                break;
            }
            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }

        let result = GenerationResult::from_value(self.transport.result(&handle, credential)?)?;
        info!(
            request_id = %handle.request_id,
            images = result.images.len(),
            "generation finished"
        );
        Ok(result)
    }
}

fn status_label(status: &QueueStatus) -> &'static str {
    match status {
        QueueStatus::InQueue { .. } => "IN_QUEUE",
        QueueStatus::InProgress { .. } => "IN_PROGRESS",
        QueueStatus::Completed { .. } => "COMPLETED",
    }
}

/// Retrieves image bytes by URL.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Plain HTTP GET, no credential attached.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().build().map_err(|e| FetchError::Network {
            url: String::new(),
            source: e,
        })?;
        Ok(HttpImageFetcher { client })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!(%url, "downloading image");
        let res = self.client.get(url).send().map_err(|e| FetchError::Network {
            url: url.to_string(),
            source: e,
        })?;
        if !res.status().is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: res.status(),
            });
        }
        let bytes = res.bytes().map_err(|e| FetchError::Network {
            url: url.to_string(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }
}
