//! Exit codes for the sa-core CLI.
//!
//! Exit codes communicate operation outcome without requiring output parsing.
//! They are stable; scripts may branch on them.

use sa_common::Error;

/// Exit codes for sa-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Query matched nothing / lookup found nothing
    Empty = 1,

    /// Configuration error or bad argument
    ConfigError = 10,

    /// Input records failed validation; nothing was published
    ValidationFailed = 11,

    /// Build or publish failed; previous artifact stays live
    BuildFailed = 12,

    /// Another build is already running
    Busy = 13,

    /// Build cancelled before publish
    Cancelled = 14,

    /// Manifest or artifact missing
    NotFound = 15,

    /// Manifest or artifact unreadable or inconsistent
    Corrupt = 16,

    /// I/O error
    IoError = 17,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::Empty)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        self.as_u8() >= 10
    }

    /// Map a boundary error to its exit code.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::InvalidArgument(_) => ExitCode::ConfigError,
            Error::SchemaValidation(_) => ExitCode::ValidationFailed,
            Error::Build(_) => ExitCode::BuildFailed,
            Error::BuildBusy => ExitCode::Busy,
            Error::BuildCancelled => ExitCode::Cancelled,
            Error::NotFound(_) => ExitCode::NotFound,
            Error::Corrupt(_) => ExitCode::Corrupt,
            Error::Io(_) => ExitCode::IoError,
            Error::Query(_) | Error::Json(_) => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_codes() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::Empty.is_success());
        assert!(!ExitCode::Busy.is_success());
    }

    #[test]
    fn error_codes() {
        assert!(!ExitCode::Empty.is_error());
        assert!(ExitCode::ConfigError.is_error());
        assert!(ExitCode::InternalError.is_error());
    }

    #[test]
    fn errors_map_to_distinct_codes() {
        assert_eq!(ExitCode::for_error(&Error::BuildBusy), ExitCode::Busy);
        assert_eq!(
            ExitCode::for_error(&Error::SchemaValidation("x".into())),
            ExitCode::ValidationFailed
        );
        assert_eq!(
            ExitCode::for_error(&Error::NotFound("manifest.json".into())).as_u8(),
            15
        );
    }
}
