/*!
 * Structured Tracing
 * Subscriber setup and per-call spans for cancellation-point invocations
 */

use std::time::Instant;
use tracing::{debug, info, span, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting JSON output
pub const TRACE_JSON_ENV: &str = "TRAMPOLINE_TRACE_JSON";

/// Blocking calls slower than this are reported at debug level with `slow = true`
const SLOW_CALL_MS: u128 = 10;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - TRAMPOLINE_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Span covering one cancellation-point invocation, entry check to kernel return
///
/// Dropped normally when the call returns; during a cancellation unwind it
/// records `cancelled = true` first.
pub struct CallSpan {
    span: tracing::Span,
    start: Instant,
    operation: &'static str,
}

impl CallSpan {
    pub fn new(operation: &'static str, token_id: Option<u64>) -> Self {
        let span = span!(
            Level::DEBUG,
            "cancellation_point",
            operation = operation,
            token = token_id,
            eintr_retries = tracing::field::Empty,
            result = tracing::field::Empty,
            cancelled = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            operation,
        }
    }

    /// Record the raw kernel result
    pub fn record_result(&self, ret: libc::c_long) {
        self.span.record("result", ret);
    }

    pub fn record_retries(&self, retries: u32) {
        self.span.record("eintr_retries", retries);
    }

    pub fn record_cancelled(&self) {
        self.span.record("cancelled", true);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for CallSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        if duration.as_millis() > SLOW_CALL_MS {
            debug!(
                operation = self.operation,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "cancellation point left"
            );
        }
    }
}
