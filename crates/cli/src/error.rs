//! Structured CLI errors with meaningful exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: window or GL context could not be created
//! - 11: GPU resource error (allocation, shader, texture, model, render)
//! - 12: input error (bad config, unknown scene, bad arguments)
//! - 13: I/O error (config read, screenshot write)
//! - 14: serialization error

use learngl_core::GlError;
use std::fmt;

/// Errors produced by CLI operations, each mapped to a distinct exit code.
#[derive(Debug)]
pub enum CliError {
    /// The window or context failed to initialise.
    Context(GlError),
    /// A resource or render error from the running scene.
    Gpu(GlError),
    /// A user input error (bad config, unknown scene).
    Input(String),
    /// A file could not be read or written.
    Io(String),
    /// A serialization error (JSON output failure).
    Serialization(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Context(_) => 10,
            CliError::Gpu(_) => 11,
            CliError::Input(_) => 12,
            CliError::Io(_) => 13,
            CliError::Serialization(_) => 14,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Context(e) | CliError::Gpu(e) => write!(f, "{e}"),
            CliError::Input(msg) => write!(f, "{msg}"),
            CliError::Io(msg) => write!(f, "{msg}"),
            CliError::Serialization(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<GlError> for CliError {
    fn from(e: GlError) -> Self {
        match e {
            GlError::ContextInit(_) => CliError::Context(e),
            GlError::Config(_) | GlError::InvalidArgument(_) => CliError::Input(e.to_string()),
            GlError::Io { .. } => CliError::Io(e.to_string()),
            other => CliError::Gpu(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn context_init_exit_code_is_10() {
        let err = CliError::from(GlError::ContextInit("no display".into()));
        assert_eq!(err.exit_code(), 10);
        assert!(err.to_string().contains("no display"));
    }

    #[test]
    fn resource_errors_exit_with_11() {
        let err = CliError::from(GlError::Link {
            label: "lit".into(),
            log: "varying mismatch".into(),
        });
        assert_eq!(err.exit_code(), 11);
        let err = CliError::from(GlError::TextureLoad {
            path: PathBuf::from("wall.jpg"),
            reason: "truncated".into(),
        });
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn config_and_argument_errors_route_to_input() {
        let err = CliError::from(GlError::Config("fov_degrees must be in (0, 180)".into()));
        assert_eq!(err.exit_code(), 12);
        assert!(err.to_string().contains("fov_degrees"));
        let err = CliError::from(GlError::InvalidArgument("unknown scene 'x'".into()));
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn io_error_exit_code_is_13() {
        let err = CliError::from(GlError::Io {
            path: PathBuf::from("shot.png"),
            reason: "disk full".into(),
        });
        assert_eq!(err.exit_code(), 13);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn from_serde_json_error_routes_to_serialization() {
        let bad_json = serde_json::from_str::<serde_json::Value>("{invalid");
        let cli_err = CliError::from(bad_json.unwrap_err());
        assert_eq!(cli_err.exit_code(), 14);
    }
}
