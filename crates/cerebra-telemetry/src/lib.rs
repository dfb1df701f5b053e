//! Observability for the gateway: structured logging setup, audit
//! logging, and PII redaction for anything that might otherwise land in
//! a log line.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod pii;
pub mod tracing_setup;

pub use audit::{
    AuditActor, AuditEvent, AuditEventBuilder, AuditEventType, AuditLogConfig, AuditLogger,
    AuditOutcome, AuditResource, AuditSeverity, AuditStats,
};
pub use pii::{PiiConfig, PiiPattern, PiiRedactor};
pub use tracing_setup::{init_tracing, TracingConfig, TracingError};
