//! Readiness probing.
//!
//! A daemon is ready when its endpoint accepts a connection, reports
//! serving, and every component it loaded came up without a fatal error.
//! The prober polls on a fixed interval until that holds, a component
//! failure is seen, or the deadline passes.
//!
//! The health protocol itself is consumed through two small traits,
//! [`Connector`] and [`HealthClient`]. Closing a client is dropping it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, ComponentLoadError, ComponentLoadErrors, ProbeError, TransientError};

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Marker a component puts in its init error when it declined to load.
pub const DEFAULT_SKIP_SENTINEL: &str = "skip plugin";

/// Initialization error reported for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitError {
    /// Human-readable message.
    pub message: String,
}

/// One entry of the daemon's component listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Component type identifier.
    pub kind: String,
    /// Component instance identifier.
    pub id: String,
    /// Set if the component failed (or declined) to initialize.
    #[serde(default)]
    pub init_error: Option<InitError>,
}

impl ComponentStatus {
    /// A component that loaded cleanly.
    #[must_use]
    pub fn loaded(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            init_error: None,
        }
    }

    /// A component that reported an init error.
    #[must_use]
    pub fn failed(kind: impl Into<String>, id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            init_error: Some(InitError {
                message: message.into(),
            }),
        }
    }

    /// Returns true if the component intentionally opted out of loading.
    ///
    /// An empty sentinel never matches.
    #[must_use]
    pub fn is_skipped(&self, skip_sentinel: &str) -> bool {
        !skip_sentinel.is_empty()
            && self
                .init_error
                .as_ref()
                .is_some_and(|e| e.message.contains(skip_sentinel))
    }

    /// Returns the fatal load error for this component, if any.
    #[must_use]
    pub fn fatal_error(&self, skip_sentinel: &str) -> Option<ComponentLoadError> {
        if self.is_skipped(skip_sentinel) {
            return None;
        }
        self.init_error.as_ref().map(|e| ComponentLoadError {
            kind: self.kind.clone(),
            id: self.id.clone(),
            message: e.message.clone(),
        })
    }
}

/// Collects every fatal component failure into one error.
pub fn check_components(
    components: &[ComponentStatus],
    skip_sentinel: &str,
) -> Result<(), ComponentLoadErrors> {
    let causes = components
        .iter()
        .filter_map(|c| c.fatal_error(skip_sentinel))
        .collect();
    ComponentLoadErrors::from_causes(causes).map_or(Ok(()), Err)
}

/// A connected health/introspection client.
#[async_trait]
pub trait HealthClient: Send + Sync {
    /// Asks whether the daemon is serving requests.
    async fn is_serving(&self) -> Result<bool, BoxError>;

    /// Lists the daemon's components and their init status.
    async fn components(&self) -> Result<Vec<ComponentStatus>, BoxError>;
}

/// Opens client connections by address.
///
/// A successful connect says nothing about liveness.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Client type produced on success.
    type Client: HealthClient;

    /// Connects to `address`.
    async fn connect(&self, address: &str) -> Result<Self::Client, BoxError>;
}

enum Attempt<T> {
    Ready(T),
    Retry(TransientError),
    Fatal(ProbeError),
}

/// Polls a daemon endpoint until it is ready.
#[derive(Debug, Clone)]
pub struct ReadinessProber {
    address: String,
    interval: Duration,
    skip_sentinel: String,
}

impl ReadinessProber {
    /// Creates a prober for `address` with default interval and sentinel.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            interval: DEFAULT_POLL_INTERVAL,
            skip_sentinel: DEFAULT_SKIP_SENTINEL.to_string(),
        }
    }

    /// Sets the polling interval. Zero is clamped to one millisecond.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Sets the skip sentinel.
    #[must_use]
    pub fn with_skip_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.skip_sentinel = sentinel.into();
        self
    }

    /// Address being probed.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Polling interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits up to `timeout` for the daemon to become ready.
    pub async fn wait_ready<C: Connector>(
        &self,
        connector: &C,
        timeout: Duration,
    ) -> Result<C::Client, ProbeError> {
        self.wait_ready_until(connector, timeout, &CancellationToken::new())
            .await
    }

    /// Waits up to `timeout` for the daemon to become ready, stopping early
    /// if `cancel` fires.
    ///
    /// The first attempt runs one interval after the call. Connection and
    /// serving failures are retried; component load failures end the probe
    /// at once. Deadline and cancellation are honoured mid-attempt.
    pub async fn wait_ready_until<C: Connector>(
        &self,
        connector: &C,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<C::Client, ProbeError> {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut ticker = tokio::time::interval_at(first_tick(self.interval), self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last: Option<TransientError> = None;
        let mut attempt: u32 = 0;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ProbeError::Cancelled { last }),
                () = &mut deadline => return Err(ProbeError::DeadlineExceeded { timeout, last }),
                _ = ticker.tick() => {}
            }

            attempt += 1;
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ProbeError::Cancelled { last }),
                () = &mut deadline => return Err(ProbeError::DeadlineExceeded { timeout, last }),
                outcome = self.attempt(connector) => outcome,
            };

            match outcome {
                Attempt::Ready(client) => {
                    tracing::info!(address = %self.address, attempt, "daemon is ready");
                    return Ok(client);
                }
                Attempt::Retry(err) => {
                    tracing::debug!(address = %self.address, attempt, error = %err, "daemon not ready");
                    last = Some(err);
                }
                Attempt::Fatal(err) => {
                    tracing::warn!(address = %self.address, attempt, error = %err, "daemon failed readiness");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt<C: Connector>(&self, connector: &C) -> Attempt<C::Client> {
        let client = match connector.connect(&self.address).await {
            Ok(client) => client,
            Err(e) => return Attempt::Retry(TransientError::Unreachable(e)),
        };

        match client.is_serving().await {
            Ok(true) => {}
            Ok(false) => return Attempt::Retry(TransientError::NotServing(None)),
            Err(e) => return Attempt::Retry(TransientError::NotServing(Some(e))),
        }

        let components = match client.components().await {
            Ok(components) => components,
            Err(e) => return Attempt::Fatal(ProbeError::Introspection(e)),
        };

        match check_components(&components, &self.skip_sentinel) {
            Ok(()) => Attempt::Ready(client),
            Err(errors) => Attempt::Fatal(errors.into()),
        }
    }
}

/// Start of the first polling interval. An interval too large to add to
/// the clock never ticks.
fn first_tick(interval: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(interval)
        .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30))
}
