//! Batched REST request assembly and concurrent dispatch.
//!
//! Callers collect requests into an owned [`RequestBatch`] and hand the
//! whole batch to [`RestClient::dispatch`], which executes every member
//! concurrently and returns one result slot per request in submission
//! order. A batch belongs to exactly one call context; passing it by
//! value into `dispatch` is what makes the snapshot-and-clear step
//! atomic.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::{self, Credentials};
use crate::config::GmoConfig;

const ERROR_BODY_SNIPPET_LEN: usize = 220;

/// Whether an endpoint requires authentication.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Visibility {
    /// No credentials; request goes to the public base URL.
    Public,
    /// Signed request against the private base URL.
    Private,
}

#[derive(Clone, Debug, PartialEq)]
enum Payload {
    Query(Vec<(String, String)>),
    Json(String),
}

/// A fully formed, possibly signed request. Immutable once pushed onto
/// a batch; consumed exactly once by dispatch.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    payload: Payload,
}

impl PreparedRequest {
    /// HTTP method of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full request URL (base + path).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Header pairs sent with the request.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Query parameters, when the request carries any.
    pub fn query(&self) -> Option<&[(String, String)]> {
        match &self.payload {
            Payload::Query(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// JSON body exactly as it will be transmitted (and as it was
    /// signed, for private requests).
    pub fn body(&self) -> Option<&str> {
        match &self.payload {
            Payload::Json(body) => Some(body),
            _ => None,
        }
    }

    /// Value of a header by name, when present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Ordered collection of prepared requests owned by one call context.
#[derive(Debug)]
pub struct RequestBatch {
    config: Arc<GmoConfig>,
    credentials: Arc<Credentials>,
    requests: Vec<PreparedRequest>,
}

impl RequestBatch {
    pub(crate) fn new(config: Arc<GmoConfig>, credentials: Arc<Credentials>) -> Self {
        Self {
            config,
            credentials,
            requests: Vec::new(),
        }
    }

    /// Number of requests collected so far.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the batch holds no requests.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Requests collected so far, in submission order.
    pub fn requests(&self) -> &[PreparedRequest] {
        &self.requests
    }

    /// Symbol the symbol-scoped endpoint builders use.
    pub(crate) fn symbol(&self) -> String {
        self.config.symbol.clone()
    }

    /// Assembles a request and appends it to the batch.
    ///
    /// No network activity happens here; private requests are signed at
    /// build time over the exact payload that will be transmitted.
    pub fn build(
        &mut self,
        method: Method,
        visibility: Visibility,
        path: &str,
        params: Map<String, Value>,
    ) {
        let request = match visibility {
            Visibility::Public => self.build_public(method, path, params),
            Visibility::Private => {
                self.build_private(method, path, params, auth::api_timestamp())
            }
        };
        self.requests.push(request);
    }

    fn build_public(
        &self,
        method: Method,
        path: &str,
        params: Map<String, Value>,
    ) -> PreparedRequest {
        let url = format!("{}{path}", self.config.public_rest_url);
        let (headers, payload) = if method == Method::GET {
            (Vec::new(), Payload::Query(query_pairs(&params)))
        } else {
            (
                vec![(
                    "Content-Type".to_string(),
                    "application/json".to_string(),
                )],
                Payload::Json(Value::Object(params).to_string()),
            )
        };

        PreparedRequest {
            method,
            url,
            headers,
            payload,
        }
    }

    fn build_private(
        &self,
        method: Method,
        path: &str,
        params: Map<String, Value>,
        timestamp: String,
    ) -> PreparedRequest {
        let url = format!("{}{path}", self.config.private_rest_url);
        let (payload, sign_input) = if method == Method::GET {
            (
                Payload::Query(query_pairs(&params)),
                format!("{timestamp}{method}{path}"),
            )
        } else {
            // Serialized once; the same string is signed and sent.
            let body = Value::Object(params).to_string();
            let sign_input = format!("{timestamp}{method}{path}{body}");
            (Payload::Json(body), sign_input)
        };

        let sign = auth::sign(&self.credentials.api_secret, &sign_input);
        PreparedRequest {
            method,
            url,
            headers: auth::private_headers(&self.credentials, &timestamp, &sign),
            payload,
        }
    }

    fn into_requests(self) -> Vec<PreparedRequest> {
        self.requests
    }
}

/// Renders params as query pairs, without JSON quoting around strings.
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

/// Errors produced while dispatching a single batch member.
#[derive(Debug, Error)]
pub enum RestError {
    /// Transport-level failure (connect, reset, TLS).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The per-request dispatch bound elapsed.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Configured bound, in seconds.
        seconds: u64,
    },

    /// The response body was non-empty but not valid JSON.
    #[error("failed to decode response body: {source}. body={body}")]
    Decode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// Bounded snippet of the offending body.
        body: String,
    },
}

/// REST dispatcher over a single lazily created HTTP client.
///
/// The client is shared across batches and rebuilt on the next dispatch
/// after a transport failure.
pub struct RestClient {
    config: Arc<GmoConfig>,
    credentials: Arc<Credentials>,
    http: Mutex<Option<Client>>,
}

impl RestClient {
    /// Creates a dispatcher for the given configuration and credentials.
    pub fn new(config: Arc<GmoConfig>, credentials: Credentials) -> Self {
        Self {
            config,
            credentials: Arc::new(credentials),
            http: Mutex::new(None),
        }
    }

    /// Shared configuration.
    pub fn config(&self) -> &Arc<GmoConfig> {
        &self.config
    }

    /// Starts an empty request batch bound to this client's
    /// configuration and credentials.
    pub fn batch(&self) -> RequestBatch {
        RequestBatch::new(Arc::clone(&self.config), Arc::clone(&self.credentials))
    }

    /// Executes every request in the batch concurrently.
    ///
    /// Returns exactly one slot per request, index-aligned with build
    /// order. Individual failures become error slots; they never abort
    /// the rest of the batch, and there is no automatic retry. An empty
    /// batch returns an empty vec without touching the network.
    pub async fn dispatch(&self, batch: RequestBatch) -> Vec<Result<Value, RestError>> {
        let requests = batch.into_requests();
        if requests.is_empty() {
            return Vec::new();
        }

        let client = self.client().await;
        let timeout = self.config.request_timeout;
        let results = join_all(
            requests
                .into_iter()
                .map(|request| fetch(&client, timeout, request)),
        )
        .await;

        if results
            .iter()
            .any(|slot| matches!(slot, Err(RestError::Transport(_) | RestError::Timeout { .. })))
        {
            // Completed slots keep their results; only the shared
            // client is torn down, to be rebuilt on next use.
            self.reset_client().await;
        }

        results
    }

    async fn client(&self) -> Client {
        let mut slot = self.http.lock().await;
        slot.get_or_insert_with(Client::new).clone()
    }

    async fn reset_client(&self) {
        debug!("discarding http client after transport failure");
        *self.http.lock().await = None;
    }
}

async fn fetch(
    client: &Client,
    timeout: Duration,
    request: PreparedRequest,
) -> Result<Value, RestError> {
    match tokio::time::timeout(timeout, send_once(client, request)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(seconds = timeout.as_secs(), "request abandoned on timeout");
            Err(RestError::Timeout {
                seconds: timeout.as_secs(),
            })
        }
    }
}

async fn send_once(client: &Client, request: PreparedRequest) -> Result<Value, RestError> {
    let PreparedRequest {
        method,
        url,
        headers,
        payload,
    } = request;

    let mut builder = client.request(method, &url);
    for (name, value) in &headers {
        builder = builder.header(name, value);
    }
    builder = match payload {
        Payload::Query(pairs) => builder.query(&pairs),
        Payload::Json(body) => builder.body(body),
    };

    let response = builder.send().await?;
    let status = response.status();
    if !status.is_success() {
        warn!(%status, %url, "non-success response status");
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        debug!(%status, %url, "empty response body");
        return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|source| {
        let body = String::from_utf8_lossy(&bytes);
        warn!(%status, %url, error = %source, body = %body, "undecodable response body");
        RestError::Decode {
            source,
            body: summarize_body(&body),
        }
    })
}

fn summarize_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_SNIPPET_LEN).collect()
}
