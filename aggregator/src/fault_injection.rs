//! Per-request fault injection driven by query parameters.
//!
//! Three controls are read from the inbound query string and applied in a
//! fixed order before any upstream is contacted:
//!
//! 1. `rs.sleep=<ms>` suspends the request.
//! 2. `rs.status=<code>` answers immediately with that status.
//! 3. `rs.failure=<percent>` fails the request with that probability.
//!
//! Values that do not parse are ignored.

use crate::errors::{GatewayError, Result};
use crate::metrics_defs::FAULT_INJECTED;
use http::StatusCode;
use rand::Rng;
use shared::counter;
use std::sync::Arc;
use std::time::Duration;

const SLEEP_KEY: &str = "rs.sleep";
const STATUS_KEY: &str = "rs.status";
const FAILURE_KEY: &str = "rs.failure";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaultControls {
    pub delay: Option<Duration>,
    pub status: Option<StatusCode>,
    /// Failure probability in percent
    pub failure_threshold: Option<u32>,
}

impl FaultControls {
    pub fn from_query(query: Option<&str>) -> Self {
        let mut controls = FaultControls::default();
        let Some(query) = query else {
            return controls;
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                SLEEP_KEY => {
                    if let Ok(ms) = value.trim().parse::<u64>() {
                        controls.delay = Some(Duration::from_millis(ms));
                    }
                }
                STATUS_KEY => {
                    if let Some(status) = value
                        .trim()
                        .parse::<u16>()
                        .ok()
                        .and_then(|code| StatusCode::from_u16(code).ok())
                    {
                        controls.status = Some(status);
                    }
                }
                FAILURE_KEY => {
                    if let Ok(threshold) = value.trim().parse::<u32>() {
                        controls.failure_threshold = Some(threshold);
                    }
                }
                _ => {}
            }
        }

        controls
    }

    pub fn is_empty(&self) -> bool {
        self == &FaultControls::default()
    }
}

#[derive(Debug, PartialEq)]
pub enum FaultOutcome {
    /// Continue to the endpoint
    Proceed,
    /// Answer with this status without contacting any upstream
    ShortCircuit(StatusCode),
}

type Sampler = Arc<dyn Fn() -> u32 + Send + Sync>;

#[derive(Clone)]
pub struct FaultInjector {
    enabled: bool,
    /// Draws a value in `0..100` for the failure control
    sampler: Sampler,
}

impl FaultInjector {
    pub fn new(enabled: bool) -> Self {
        Self::with_sampler(enabled, Arc::new(|| rand::thread_rng().gen_range(0..100u32)))
    }

    pub fn with_sampler(enabled: bool, sampler: Sampler) -> Self {
        Self { enabled, sampler }
    }

    pub async fn apply(&self, query: Option<&str>) -> Result<FaultOutcome> {
        if !self.enabled {
            return Ok(FaultOutcome::Proceed);
        }

        let controls = FaultControls::from_query(query);
        if controls.is_empty() {
            return Ok(FaultOutcome::Proceed);
        }

        if let Some(delay) = controls.delay {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Injecting delay");
            counter!(FAULT_INJECTED, "kind" => "delay").increment(1);
            tokio::time::sleep(delay).await;
        }

        if let Some(status) = controls.status {
            tracing::debug!(status = status.as_u16(), "Injecting status");
            counter!(FAULT_INJECTED, "kind" => "status").increment(1);
            return Ok(FaultOutcome::ShortCircuit(status));
        }

        if let Some(threshold) = controls.failure_threshold {
            let drawn = (self.sampler)();
            if drawn < threshold {
                tracing::error!(drawn, threshold, "Injecting failure");
                counter!(FAULT_INJECTED, "kind" => "failure").increment(1);
                return Err(GatewayError::InjectedFailure);
            }
        }

        Ok(FaultOutcome::Proceed)
    }
}

impl std::fmt::Debug for FaultInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultInjector")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
