//! Exit codes and structured error output.

use serde::Serialize;

use crate::duplicates::SieveError;

/// Process exit codes.
///
/// - 0: duplicates found (and handled)
/// - 1: error
/// - 2: no duplicates
/// - 3: duplicates handled, but some files were skipped or failed to delete
/// - 130: interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Duplicates were found.
    Success = 0,
    /// An error stopped the run.
    GeneralError = 1,
    /// Nothing to do.
    NoDuplicates = 2,
    /// Completed with non-fatal failures.
    PartialSuccess = 3,
    /// Ctrl+C.
    Interrupted = 130,
}

impl ExitCode {
    /// Numeric code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code used in error output.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "IS000",
            Self::GeneralError => "IS001",
            Self::NoDuplicates => "IS002",
            Self::PartialSuccess => "IS003",
            Self::Interrupted => "IS130",
        }
    }

    /// Exit code for an error that escaped `run_app`.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let interrupted = err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<SieveError>(),
                Some(SieveError::Interrupted)
            )
        });
        if interrupted {
            Self::Interrupted
        } else {
            Self::GeneralError
        }
    }
}

/// Error rendered as JSON with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code such as "IS001"
    pub code: String,
    /// Process exit code
    pub exit_code: i32,
    /// Message, including context
    pub message: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Build from an error and its exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
