//! Failure taxonomy of the selection stage
//!
//! Every failure of the selection stage is fatal: it is reported as an
//! `eyre::Report` that wraps one of these errors, and bubbles up to the host,
//! which aborts the run. Individual objects never error, they only fail cuts.

use std::fmt;

/// Fatal conditions that can be encountered by the selection stage
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionError {
    /// Invalid, unparsable or missing configuration (raised at load time)
    Configuration(String),

    /// A required upstream collection or decoration is not available
    MissingInput(String),

    /// An identification or isolation tool could not be set up
    ToolInitialization(String),
}
//
impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::MissingInput(msg) => write!(f, "missing input: {msg}"),
            Self::ToolInitialization(msg) => write!(f, "tool initialization failed: {msg}"),
        }
    }
}
//
impl std::error::Error for SelectionError {}

/// Shorthand for failing with a configuration error
macro_rules! config_error {
    ($($arg:tt)*) => {
        eyre::Report::new($crate::error::SelectionError::Configuration(format!($($arg)*)))
    };
}

/// Shorthand for failing with a missing input error
macro_rules! missing_input {
    ($($arg:tt)*) => {
        eyre::Report::new($crate::error::SelectionError::MissingInput(format!($($arg)*)))
    };
}

/// Shorthand for failing with a tool initialization error
macro_rules! tool_error {
    ($($arg:tt)*) => {
        eyre::Report::new($crate::error::SelectionError::ToolInitialization(format!($($arg)*)))
    };
}

pub(crate) use {config_error, missing_input, tool_error};

/// Find the selection error at the root of a report, if any
#[cfg(test)]
pub fn kind_of(report: &eyre::Report) -> Option<&SelectionError> {
    report
        .chain()
        .find_map(|cause| cause.downcast_ref::<SelectionError>())
}
