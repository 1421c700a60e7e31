/*!
 * Trampoline Configuration
 *
 * Cancellation delivery and EINTR retry policy, loadable from the
 * `TRAMPOLINE_CONFIG` environment variable as JSON.
 */

use super::errors::{Result, TrampolineError};
use super::limits::*;
use libc::c_int;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding a JSON-encoded [`TrampolineConfig`]
pub const CONFIG_ENV: &str = "TRAMPOLINE_CONFIG";

fn default_interrupt_signal() -> c_int {
    libc::SIGRTMIN()
}

/// Configuration for cancellation-point invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrampolineConfig {
    /// Signal sent to a thread blocked in a cancellation point (default: SIGRTMIN)
    pub interrupt_signal: c_int,

    /// Re-send interval while the target stays in a cancellation point (default: 1ms)
    pub kick_interval_us: u64,

    /// How long `cancel()` waits for the target to react (default: 5s)
    pub delivery_timeout_ms: u64,

    /// EINTR retries per call when no cancellation is pending (default: unbounded)
    pub max_eintr_retries: Option<u32>,
}

impl TrampolineConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            interrupt_signal: default_interrupt_signal(),
            kick_interval_us: DEFAULT_KICK_INTERVAL_US,
            delivery_timeout_ms: DEFAULT_DELIVERY_TIMEOUT_MS,
            max_eintr_retries: None,
        }
    }

    /// Retry an unrelated EINTR exactly once, then report it
    pub fn retry_once() -> Self {
        Self {
            max_eintr_retries: Some(1),
            ..Self::new()
        }
    }

    /// Short kick interval and delivery timeout for tests and latency-sensitive callers
    pub fn aggressive() -> Self {
        Self {
            kick_interval_us: AGGRESSIVE_KICK_INTERVAL_US,
            delivery_timeout_ms: AGGRESSIVE_DELIVERY_TIMEOUT_MS,
            ..Self::new()
        }
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TrampolineError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `TRAMPOLINE_CONFIG`, or defaults when the variable is unset
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(json) => Self::from_json(&json),
            Err(std::env::VarError::NotPresent) => Ok(Self::new()),
            Err(e) => Err(TrampolineError::config(format!("{}: {}", CONFIG_ENV, e))),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.interrupt_signal <= 0 || self.interrupt_signal as usize >= KERNEL_NSIG {
            return Err(TrampolineError::config(format!(
                "interrupt_signal {} out of range",
                self.interrupt_signal
            )));
        }
        if matches!(self.interrupt_signal, libc::SIGKILL | libc::SIGSTOP) {
            return Err(TrampolineError::config("interrupt_signal cannot be caught"));
        }
        if self.kick_interval_us == 0 {
            return Err(TrampolineError::config("kick_interval_us must be positive"));
        }
        Ok(())
    }

    #[inline]
    pub fn kick_interval(&self) -> Duration {
        Duration::from_micros(self.kick_interval_us)
    }

    #[inline]
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

impl Default for TrampolineConfig {
    fn default() -> Self {
        Self::new()
    }
}
