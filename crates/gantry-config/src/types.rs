//! Configuration types for the Gantry pipeline.
//!
//! `GantryConfig` is the top-level value; the nested structs are the slices
//! handed to individual components at construction time.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Operating mode for a session.
///
/// Development mode enables watch compilation, inline source maps, the
/// process supervisor and the reload notifier. Production mode performs a
/// single clean + build + asset sync and exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    /// Read the mode from the `GANTRY_ENV` environment variable.
    ///
    /// Anything other than `production` (including an unset variable)
    /// selects development mode.
    pub fn from_env() -> Self {
        match std::env::var("GANTRY_ENV") {
            Ok(v) if v.eq_ignore_ascii_case("production") => Mode::Production,
            _ => Mode::Development,
        }
    }

    /// Whether this mode keeps compilers in watch mode and runs the
    /// supervisor/notifier.
    pub fn is_development(self) -> bool {
        matches!(self, Mode::Development)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

/// The two build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Client,
    Server,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Client => "client",
            TargetKind::Server => "server",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-target build configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Source entry point, relative to the project root.
    pub entry: PathBuf,

    /// Output directory for the bundle.
    pub out_dir: PathBuf,

    /// Output bundle filename.
    pub bundle_name: String,

    /// Directory to watch for changes in watch mode.
    ///
    /// Defaults to the entry point's parent directory when absent.
    #[serde(default)]
    pub watch_dir: Option<PathBuf>,
}

impl TargetConfig {
    /// Full path of the produced bundle.
    pub fn bundle_path(&self) -> PathBuf {
        self.out_dir.join(&self.bundle_name)
    }

    /// Directory watched for source changes.
    pub fn watch_root(&self) -> PathBuf {
        self.watch_dir.clone().unwrap_or_else(|| {
            self.entry
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }
}

/// External compiler invocation.
///
/// The compiler itself is an external collaborator: Gantry only runs a
/// command per target and interprets its exit status and stderr. The
/// `{entry}` and `{outfile}` placeholders are substituted per target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Program to invoke.
    pub command: String,

    /// Arguments, with `{entry}` / `{outfile}` placeholders.
    pub args: Vec<String>,

    /// Extra arguments appended in development mode (inline source maps
    /// and friends).
    #[serde(default)]
    pub dev_args: Vec<String>,
}

/// Static asset copying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Glob pattern for source assets, relative to the project root.
    pub glob: String,

    /// Destination directory.
    pub dest: PathBuf,
}

/// Supervised application server process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Program to launch.
    pub command: String,

    /// Arguments for the program.
    #[serde(default)]
    pub args: Vec<String>,

    /// Port the server listens on, passed via the `PORT` env var.
    pub port: u16,

    /// Stdout substring that signals the server is ready.
    ///
    /// When absent, readiness falls back to `ready_grace_ms` elapsing with
    /// the process still alive.
    #[serde(default)]
    pub ready_marker: Option<String>,

    /// Maximum wait for the readiness marker before giving up.
    #[serde(default = "defaults::startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    /// Grace period used as a readiness fallback when no marker is
    /// configured.
    #[serde(default = "defaults::ready_grace_ms")]
    pub ready_grace_ms: u64,

    /// How long to wait after a graceful termination signal before forcing
    /// a kill.
    #[serde(default = "defaults::kill_grace_ms")]
    pub kill_grace_ms: u64,
}

/// Browser reload notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Port for the reload event stream.
    #[serde(default = "defaults::notifier_port")]
    pub port: u16,

    /// Settle window used to coalesce reload and restart bursts.
    #[serde(default = "defaults::settle_ms")]
    pub settle_ms: u64,
}

/// File watching behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay for raw filesystem events.
    #[serde(default = "defaults::debounce_ms")]
    pub debounce_ms: u64,

    /// Path patterns to ignore while watching.
    #[serde(default = "defaults::watch_ignore")]
    pub ignore: Vec<String>,
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GantryConfig {
    /// Operating mode. Not usually set in the file; `Mode::from_env`
    /// and the chosen subcommand decide it.
    pub mode: Mode,

    /// Destination root removed by the clean step. Every output path is
    /// expected to live under it.
    pub dest_root: PathBuf,

    /// Client bundle target.
    pub client: TargetConfig,

    /// Server bundle target.
    pub server: TargetConfig,

    /// Static assets.
    pub assets: AssetsConfig,

    /// External compiler command.
    pub compiler: CompilerConfig,

    /// Supervised server process.
    pub serve: ServeConfig,

    /// Reload notifier.
    pub notifier: NotifierConfig,

    /// File watching.
    pub watch: WatchConfig,
}

impl GantryConfig {
    /// Built-in defaults, mirroring the conventional
    /// `src/{client,server,assets}` / `dist` project layout.
    pub fn default_config() -> Self {
        Self {
            mode: Mode::Development,
            dest_root: PathBuf::from("dist"),
            client: TargetConfig {
                entry: PathBuf::from("src/client/index.js"),
                out_dir: PathBuf::from("dist/public"),
                bundle_name: "bundle.js".to_string(),
                watch_dir: None,
            },
            server: TargetConfig {
                entry: PathBuf::from("src/server/index.js"),
                out_dir: PathBuf::from("dist"),
                bundle_name: "server.js".to_string(),
                watch_dir: None,
            },
            assets: AssetsConfig {
                glob: "src/assets/**".to_string(),
                dest: PathBuf::from("dist/public"),
            },
            compiler: CompilerConfig {
                command: "esbuild".to_string(),
                args: vec![
                    "--bundle".to_string(),
                    "{entry}".to_string(),
                    "--outfile={outfile}".to_string(),
                ],
                dev_args: vec!["--sourcemap=inline".to_string()],
            },
            serve: ServeConfig {
                command: "node".to_string(),
                args: vec!["dist/server.js".to_string()],
                port: 5000,
                ready_marker: Some("Server started".to_string()),
                startup_timeout_ms: defaults::startup_timeout_ms(),
                ready_grace_ms: defaults::ready_grace_ms(),
                kill_grace_ms: defaults::kill_grace_ms(),
            },
            notifier: NotifierConfig {
                port: defaults::notifier_port(),
                settle_ms: defaults::settle_ms(),
            },
            watch: WatchConfig {
                debounce_ms: defaults::debounce_ms(),
                ignore: defaults::watch_ignore(),
            },
        }
    }

    /// Target configuration for one kind.
    pub fn target(&self, kind: TargetKind) -> &TargetConfig {
        match kind {
            TargetKind::Client => &self.client,
            TargetKind::Server => &self.server,
        }
    }
}

pub(crate) mod defaults {
    pub fn startup_timeout_ms() -> u64 {
        10_000
    }

    pub fn ready_grace_ms() -> u64 {
        500
    }

    pub fn kill_grace_ms() -> u64 {
        3_000
    }

    pub fn notifier_port() -> u16 {
        35_729
    }

    pub fn settle_ms() -> u64 {
        300
    }

    pub fn debounce_ms() -> u64 {
        100
    }

    pub fn watch_ignore() -> Vec<String> {
        vec![
            "node_modules".to_string(),
            ".git".to_string(),
            "dist".to_string(),
            "*.log".to_string(),
            ".DS_Store".to_string(),
        ]
    }
}
