use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(name = "folio", version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub api: ApiConfig,

    #[command(flatten)]
    pub session: SessionConfig,

    #[command(flatten)]
    pub gateway: GatewayConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Args)]
pub struct ApiConfig {
    /// Base URL of the portfolio API
    #[arg(long, env = "FOLIO_API_URL", default_value = "http://localhost:5000")]
    pub base_url: String,

    /// Upper bound for a single HTTP request, in seconds
    #[arg(long, env = "FOLIO_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct SessionConfig {
    /// Where the access and refresh tokens are persisted
    #[arg(long, env = "FOLIO_SESSION_FILE", default_value = ".folio/session.json")]
    pub session_file: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct GatewayConfig {
    /// Identity endpoint that exchanges a refresh token for a new access token
    #[arg(long, env = "FOLIO_REFRESH_PATH", default_value = "/api/users/refresh-token")]
    pub refresh_path: String,

    /// Lightweight authenticated endpoint used to check session health
    #[arg(long, env = "FOLIO_STATUS_PATH", default_value = "/api/users/me")]
    pub status_path: String,

    /// How long queued requests wait on a token refresh before giving up, in seconds
    #[arg(long, env = "FOLIO_REFRESH_TIMEOUT_SECS", default_value_t = 30)]
    pub refresh_timeout_secs: u64,
}

impl GatewayConfig {
    #[must_use]
    pub const fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            refresh_path: "/api/users/refresh-token".into(),
            status_path: "/api/users/me".into(),
            refresh_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "FOLIO_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; traces and metrics are only exported when set
    #[arg(long, env = "FOLIO_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Log in and persist the session
    Login {
        #[arg(long)]
        email: String,
        /// Read from FOLIO_PASSWORD when omitted
        #[arg(long, env = "FOLIO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and persist the session
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "FOLIO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the persisted session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Check whether the persisted session is still usable
    Status,
    /// Manage projects
    #[command(subcommand)]
    Projects(ProjectCommand),
    /// Browse and manage case studies
    #[command(subcommand)]
    CaseStudies(CaseStudyCommand),
    /// Read and dismiss notifications
    #[command(subcommand)]
    Notifications(NotificationCommand),
}

#[derive(Clone, Debug, Subcommand)]
pub enum ProjectCommand {
    /// List your projects
    List,
    /// List your most recent projects
    Recent,
    /// Show one project
    Get { id: String },
    /// Flip a project between draft and published
    Publish { id: String },
    /// Delete a project
    Delete { id: String },
}

#[derive(Clone, Debug, Subcommand)]
pub enum CaseStudyCommand {
    /// List case studies
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        /// Only case studies of this project
        #[arg(long)]
        project: Option<String>,
    },
    /// Show one case study
    Get { id: String },
    /// Delete a case study
    Delete { id: String },
}

#[derive(Clone, Debug, Subcommand)]
pub enum NotificationCommand {
    /// List your notifications
    List,
    /// List your most recent notifications
    Recent,
    /// Mark one notification read, or all of them with --all
    Read {
        #[arg(required_unless_present = "all")]
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// Delete a notification
    Delete { id: String },
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
