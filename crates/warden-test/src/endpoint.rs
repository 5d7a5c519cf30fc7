//! Scripted health endpoint.
//!
//! Stands in for the daemon's real health/introspection client so
//! readiness behaviour can be tested without a daemon that speaks the
//! protocol. Each connection attempt consumes one [`Response`]; once the
//! script runs out, the last response repeats.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use warden_core::{BoxError, ComponentStatus, Connector, DEFAULT_SKIP_SENTINEL, HealthClient};

/// How the endpoint answers one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Connect fails with this message.
    Unreachable(String),
    /// Connects, reports not serving.
    NotServing,
    /// Connects, the serving query fails with this message.
    ServingError(String),
    /// Connects, serving, but the component listing fails.
    IntrospectionError(String),
    /// Connects, serving, with these components.
    Serving(Vec<ComponentStatus>),
}

impl Response {
    /// Connection refused.
    #[must_use]
    pub fn refused() -> Self {
        Self::Unreachable("connection refused".into())
    }

    /// Serving with no components.
    #[must_use]
    pub fn healthy() -> Self {
        Self::Serving(Vec::new())
    }

    /// Serving with one component that failed to load.
    #[must_use]
    pub fn load_failure(kind: &str, id: &str, message: &str) -> Self {
        Self::Serving(vec![ComponentStatus::failed(kind, id, message)])
    }

    /// Serving with one component that declined to load.
    #[must_use]
    pub fn skipped(kind: &str, id: &str) -> Self {
        Self::Serving(vec![ComponentStatus::failed(
            kind,
            id,
            format!("{id} is not supported on this host: {DEFAULT_SKIP_SENTINEL}"),
        )])
    }
}

#[derive(Default)]
struct EndpointState {
    script: Mutex<Vec<Response>>,
    connects: AtomicUsize,
    open: AtomicUsize,
    addresses: Mutex<Vec<String>>,
}

/// A [`Connector`] that replays a script of [`Response`]s.
///
/// Cloning shares the script and counters.
#[derive(Clone, Default)]
pub struct ScriptedEndpoint {
    state: Arc<EndpointState>,
}

impl ScriptedEndpoint {
    /// Creates an endpoint with an empty script (always refuses).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint that becomes healthy after `n` refused connections.
    #[must_use]
    pub fn healthy_after(n: usize) -> Self {
        Self::new()
            .then_repeat(Response::refused(), n)
            .then(Response::healthy())
    }

    /// Appends one response.
    #[must_use]
    pub fn then(self, response: Response) -> Self {
        self.state.script.lock().push(response);
        self
    }

    /// Appends `response` `n` times.
    #[must_use]
    pub fn then_repeat(self, response: Response, n: usize) -> Self {
        self.state
            .script
            .lock()
            .extend(std::iter::repeat_n(response, n));
        self
    }

    /// Appends a response to a live endpoint, e.g. after a restart.
    pub fn push(&self, response: Response) {
        self.state.script.lock().push(response);
    }

    /// Number of connection attempts so far.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Number of clients handed out and not yet dropped.
    #[must_use]
    pub fn open_clients(&self) -> usize {
        self.state.open.load(Ordering::SeqCst)
    }

    /// Addresses passed to `connect`, in order.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.state.addresses.lock().clone()
    }

    fn next_response(&self) -> Response {
        let n = self.state.connects.fetch_add(1, Ordering::SeqCst);
        let script = self.state.script.lock();
        script
            .get(n)
            .or_else(|| script.last())
            .cloned()
            .unwrap_or_else(Response::refused)
    }
}

/// Client returned by [`ScriptedEndpoint`].
pub struct ScriptedClient {
    response: Response,
    state: Arc<EndpointState>,
}

impl ScriptedClient {
    /// The response this client was created for.
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }
}

impl Drop for ScriptedClient {
    fn drop(&mut self) {
        self.state.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthClient for ScriptedClient {
    async fn is_serving(&self) -> Result<bool, BoxError> {
        match &self.response {
            Response::NotServing => Ok(false),
            Response::ServingError(msg) => Err(msg.clone().into()),
            _ => Ok(true),
        }
    }

    async fn components(&self) -> Result<Vec<ComponentStatus>, BoxError> {
        match &self.response {
            Response::Serving(components) => Ok(components.clone()),
            Response::IntrospectionError(msg) => Err(msg.clone().into()),
            _ => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl Connector for ScriptedEndpoint {
    type Client = ScriptedClient;

    async fn connect(&self, address: &str) -> Result<ScriptedClient, BoxError> {
        self.state.addresses.lock().push(address.to_string());

        match self.next_response() {
            Response::Unreachable(msg) => Err(msg.into()),
            response => {
                self.state.open.fetch_add(1, Ordering::SeqCst);
                Ok(ScriptedClient {
                    response,
                    state: Arc::clone(&self.state),
                })
            }
        }
    }
}
