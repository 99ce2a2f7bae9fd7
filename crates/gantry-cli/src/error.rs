//! CLI error types and miette conversion.

use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration loading or validation failures
    #[error("Configuration error: {0}")]
    Config(#[from] gantry_config::ConfigError),

    /// Pipeline failures (compilation, supervision, notification)
    #[error(transparent)]
    Pipeline(#[from] gantry_core::Error),

    /// I/O errors from filesystem operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Convert a CliError into a miette report for terminal rendering.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Config(e) => miette::miette!(
            help = "check gantry.toml and the GANTRY_* environment overrides",
            "Configuration error: {e}"
        ),
        CliError::Pipeline(gantry_core::Error::Compilation { target }) => miette::miette!(
            help = "fix the reported compiler errors and run again",
            "{target} bundle failed to compile"
        ),
        CliError::Pipeline(gantry_core::Error::StartupTimeout { timeout }) => miette::miette!(
            help = "check the serve.ready_marker setting against the server's startup output",
            "server produced no readiness signal within {timeout:?}"
        ),
        _ => miette::miette!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_config::TargetKind;

    #[test]
    fn test_compilation_error_report_names_the_target() {
        let err = CliError::Pipeline(gantry_core::Error::Compilation {
            target: TargetKind::Server,
        });
        let report = cli_error_to_miette(err);
        assert!(format!("{report}").contains("server"));
    }
}
