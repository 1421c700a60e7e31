/*!
 * Monitoring Module
 * Structured tracing for the trampoline
 */

pub mod tracer;

pub use tracer::{init_tracing, CallSpan, TRACE_JSON_ENV};
