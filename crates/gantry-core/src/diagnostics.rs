//! Compilation results and diagnostics.

use std::time::Duration;

use gantry_config::TargetKind;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One structured message produced by a compile.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// Opaque build statistics, used for logging only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildStats {
    /// Wall-clock compile duration.
    pub duration: Duration,
    /// Size of the produced bundle, zero when the compile failed.
    pub output_bytes: u64,
}

/// The outcome of one compile of one target.
///
/// A failed result always carries at least one diagnostic; the
/// constructors enforce this.
#[derive(Debug, Clone)]
pub struct CompilationResult {
    pub target: TargetKind,
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: BuildStats,
}

impl CompilationResult {
    /// Successful compile, carrying any warnings the compiler printed.
    pub fn success(target: TargetKind, diagnostics: Vec<Diagnostic>, stats: BuildStats) -> Self {
        Self {
            target,
            success: true,
            diagnostics,
            stats,
        }
    }

    /// Failed compile. An empty diagnostic list gets a placeholder so the
    /// failure is never silent.
    pub fn failure(
        target: TargetKind,
        mut diagnostics: Vec<Diagnostic>,
        stats: BuildStats,
    ) -> Self {
        if diagnostics.is_empty() {
            diagnostics.push(Diagnostic::error("compiler exited with an error"));
        }
        Self {
            target,
            success: false,
            diagnostics,
            stats,
        }
    }

    /// Number of error-severity diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Emit the one structured log line every result produces: info on
    /// success, error on failure.
    pub fn log(&self) {
        if self.success {
            tracing::info!(
                target: "gantry::compile",
                "{} built in {}ms ({} bytes, {} warnings)",
                self.target,
                self.stats.duration.as_millis(),
                self.stats.output_bytes,
                self.diagnostics.len(),
            );
        } else {
            for diag in &self.diagnostics {
                match diag.severity {
                    Severity::Error => {
                        tracing::error!(target: "gantry::compile", "{}: {}", self.target, diag.message)
                    }
                    Severity::Warning => {
                        tracing::warn!(target: "gantry::compile", "{}: {}", self.target, diag.message)
                    }
                }
            }
            tracing::error!(
                target: "gantry::compile",
                "{} build failed with {} errors after {}ms",
                self.target,
                self.error_count(),
                self.stats.duration.as_millis(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_always_carries_a_diagnostic() {
        let result = CompilationResult::failure(TargetKind::Client, vec![], BuildStats::default());
        assert!(!result.success);
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn test_failure_keeps_provided_diagnostics() {
        let result = CompilationResult::failure(
            TargetKind::Server,
            vec![Diagnostic::error("unexpected token")],
            BuildStats::default(),
        );
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].message, "unexpected token");
    }

    #[test]
    fn test_success_counts_only_errors() {
        let result = CompilationResult::success(
            TargetKind::Client,
            vec![Diagnostic::warning("unused import")],
            BuildStats::default(),
        );
        assert!(result.success);
        assert_eq!(result.error_count(), 0);
    }
}
