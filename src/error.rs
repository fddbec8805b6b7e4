// src/error.rs
//! Unified error handling for the ECG acquisition core
//!
//! Every failure and every recoverable condition the core can observe is an
//! [`EcgError`]. Conditions that the core recovers from locally (a field
//! selector that had to fall back, a FIFO overflow seen while polling) are
//! still values of this type so they can be recorded next to the samples;
//! [`EcgError::severity`] tells the caller which is which.

use crate::config::ConfigError;
use crate::hal::TransportError;
use std::collections::TryReserveError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How an error affects the current acquisition session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Recovered locally; the session continues with a recorded warning
    Warning,
    /// Ends the session but still hands back a usable partial result
    Terminal,
    /// Aborts the session; the caller decides whether to start a new one
    Fatal,
}

/// Bus operation that was in flight when a transport error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusOperation {
    Open,
    Configure,
    Write,
    Read,
}

impl fmt::Display for BusOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusOperation::Open => write!(f, "open"),
            BusOperation::Configure => write!(f, "configure"),
            BusOperation::Write => write!(f, "write"),
            BusOperation::Read => write!(f, "read"),
        }
    }
}

/// Where in the core an error was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub component: &'static str,
    pub operation: &'static str,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &'static str, operation: &'static str) -> Self {
        Self {
            component,
            operation,
            file: None,
            line: None,
        }
    }

    /// Create error context with file and line information
    pub fn with_location(
        component: &'static str,
        operation: &'static str,
        file: &'static str,
        line: u32,
    ) -> Self {
        Self {
            file: Some(file),
            line: Some(line),
            ..Self::new(component, operation)
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file, self.line) {
            (Some(file), Some(line)) => write!(
                f,
                "{}::{} at {}:{}",
                self.component, self.operation, file, line
            ),
            _ => write!(f, "{}::{}", self.component, self.operation),
        }
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

/// Error taxonomy of the acquisition core
#[derive(Error, Debug)]
pub enum EcgError {
    /// Invalid handle or argument passed to the core
    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    /// The sample buffer could not be sized
    #[error("cannot allocate a sample buffer for {requested} samples")]
    AllocationFailure {
        requested: usize,
        #[source]
        source: TryReserveError,
    },

    /// Transport open/configure/transfer failure
    #[error("bus {operation} failed{}: {source} ({context})", register_suffix(.address))]
    Bus {
        operation: BusOperation,
        address: Option<u8>,
        #[source]
        source: TransportError,
        context: ErrorContext,
    },

    /// Target sample count not reached within the configured window
    #[error("acquisition timed out after {elapsed:?}: {collected} of {target} samples collected")]
    Timeout {
        collected: usize,
        target: usize,
        elapsed: Duration,
    },

    /// FIFO overflow flag observed while polling (non-fatal)
    #[error("ECG FIFO overflow at poll iteration {iteration} ({collected} samples stored)")]
    FifoOverflow { iteration: u64, collected: usize },

    /// Selector not recognized for a register field; the fallback was applied (non-fatal)
    #[error("unrecognized value {selector} for {field}, falling back to {fallback}")]
    InvalidFieldValue {
        field: &'static str,
        selector: u32,
        fallback: String,
    },

    /// Settings could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn register_suffix(address: &Option<u8>) -> String {
    match address {
        Some(address) => format!(" on register 0x{:02X}", address),
        None => String::new(),
    }
}

impl EcgError {
    /// Classify this error according to the propagation policy
    pub fn severity(&self) -> Severity {
        match self {
            EcgError::InvalidFieldValue { .. } | EcgError::FifoOverflow { .. } => Severity::Warning,
            EcgError::Timeout { .. } => Severity::Terminal,
            EcgError::InvalidParameter { .. }
            | EcgError::AllocationFailure { .. }
            | EcgError::Bus { .. }
            | EcgError::Config(_) => Severity::Fatal,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub(crate) fn invalid_parameter(parameter: &'static str, reason: impl Into<String>) -> Self {
        EcgError::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Result type alias for ECG core operations
pub type EcgResult<T> = Result<T, EcgError>;

/// Lift transport results into [`EcgError::Bus`]
pub trait BusResultExt<T> {
    fn bus_err(self, operation: BusOperation, address: Option<u8>, context: ErrorContext) -> EcgResult<T>;
}

impl<T> BusResultExt<T> for Result<T, TransportError> {
    fn bus_err(self, operation: BusOperation, address: Option<u8>, context: ErrorContext) -> EcgResult<T> {
        self.map_err(|source| EcgError::Bus {
            operation,
            address,
            source,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_location() {
        let context = error_context!("protocol", "write_register");
        assert_eq!(context.component, "protocol");
        assert_eq!(context.operation, "write_register");
        assert!(context.file.is_some());
        assert!(context.line.is_some());
        assert!(context.to_string().starts_with("protocol::write_register at "));
    }

    #[test]
    fn test_severity_classification() {
        let overflow = EcgError::FifoOverflow { iteration: 3, collected: 10 };
        assert_eq!(overflow.severity(), Severity::Warning);
        assert!(overflow.is_warning());

        let timeout = EcgError::Timeout {
            collected: 1,
            target: 2,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(timeout.severity(), Severity::Terminal);
        assert!(!timeout.is_fatal());

        let invalid = EcgError::invalid_parameter("sample_count", "must be non-zero");
        assert!(invalid.is_fatal());
    }

    #[test]
    fn test_bus_error_display() {
        let result: Result<(), TransportError> = Err(TransportError::Fault("line stuck".to_string()));
        let err = result
            .bus_err(BusOperation::Write, Some(0x15), ErrorContext::new("protocol", "write_register"))
            .unwrap_err();

        let display = err.to_string();
        assert!(display.contains("bus write failed on register 0x15"));
        assert!(display.contains("line stuck"));
        assert!(display.contains("protocol::write_register"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_bus_error_without_address() {
        let err = EcgError::Bus {
            operation: BusOperation::Open,
            address: None,
            source: TransportError::Fault("missing".to_string()),
            context: ErrorContext::new("spidev", "open"),
        };
        assert!(err.to_string().starts_with("bus open failed: missing"));
    }

    #[test]
    fn test_invalid_field_value_display() {
        let err = EcgError::InvalidFieldValue {
            field: "ECG gain",
            selector: 33,
            fallback: "20 V/V".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("33"));
        assert!(display.contains("ECG gain"));
        assert!(display.contains("20 V/V"));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EcgError>();
    }
}
