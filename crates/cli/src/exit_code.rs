//! Process exit codes

use s3up_core::Error;

/// Exit status reported by the `s3up` binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Missing or invalid input; nothing was uploaded
    UsageError = 2,
    /// A file failed on every attempt
    UploadFailed = 3,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_error(error: &Error) -> Self {
        match error {
            e if e.is_usage_error() => ExitCode::UsageError,
            Error::UploadFailed { .. } => ExitCode::UploadFailed,
            _ => ExitCode::GeneralError,
        }
    }
}
