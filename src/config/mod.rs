mod file_config;

pub use file_config::{FileConfig, MailConfig};

use crate::calendar::{CalendarGate, DEFAULT_HOLIDAYS};
use crate::mail::DEFAULT_BREVO_API_URL;
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GAZETTE_URL: &str = "http://www.dom.salvador.ba.gov.br/";
pub const DEFAULT_SENDER_EMAIL: &str = "meu.diario.oficial.ssa@gmail.com";
pub const DEFAULT_SENDER_NAME: &str = "Meu Diário Oficial";
const DEFAULT_WEEKEND_CODES: &[&str] = &["sat", "sun"];

pub fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

/// Command line options shared by every binary.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the registry database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Landing page of the official gazette.
    #[clap(long, default_value = DEFAULT_GAZETTE_URL)]
    pub gazette_url: String,

    /// Timeout in seconds for each gazette request.
    #[clap(long, default_value_t = 60)]
    pub http_timeout_sec: u64,

    /// Attempts per run before the failure notice goes out.
    #[clap(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Seconds to wait between attempts.
    #[clap(long, default_value_t = 3600)]
    pub retry_interval_secs: u64,

    /// Seconds between scheduler checks.
    #[clap(long, default_value_t = 3600)]
    pub poll_interval_secs: u64,

    /// Scheduled runs do not start before this local hour.
    #[clap(long, default_value_t = 7)]
    pub earliest_run_hour: u32,

    /// The port for the metrics and admin server. 0 disables it.
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// Brevo API key.
    #[clap(long, env = "BREVO_API_KEY", hide_env_values = true)]
    pub brevo_api_key: Option<String>,

    /// Image shown at the top of the emails.
    #[clap(long)]
    pub logo_url: Option<String>,
}

impl ConfigArgs {
    pub fn cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            gazette_url: self.gazette_url.clone(),
            http_timeout_sec: self.http_timeout_sec,
            max_retries: self.max_retries,
            retry_interval_secs: self.retry_interval_secs,
            poll_interval_secs: self.poll_interval_secs,
            earliest_run_hour: self.earliest_run_hour,
            metrics_port: self.metrics_port,
            brevo_api_key: self.brevo_api_key.clone(),
            logo_url: self.logo_url.clone(),
        }
    }

    pub fn file_config(&self) -> Result<Option<FileConfig>> {
        self.config
            .as_deref()
            .map(FileConfig::load)
            .transpose()
    }

    /// Loads the config file, if any, and resolves the full configuration.
    pub fn resolve(&self) -> Result<AppConfig> {
        AppConfig::resolve(&self.cli_config(), self.file_config()?)
    }

    /// Resolves only the registry database location.
    pub fn resolve_registry_db_path(&self) -> Result<PathBuf> {
        let db_dir = resolve_db_dir(&self.cli_config(), self.file_config()?.as_ref())?;
        Ok(db_dir.join(REGISTRY_DB_FILE))
    }
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub gazette_url: String,
    pub http_timeout_sec: u64,
    pub max_retries: u32,
    pub retry_interval_secs: u64,
    pub poll_interval_secs: u64,
    pub earliest_run_hour: u32,
    pub metrics_port: u16,
    pub brevo_api_key: Option<String>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub gazette_url: String,
    pub http_timeout_sec: u64,
    pub metrics_port: u16,

    // Pipeline settings
    pub max_retries: u32,
    pub retry_interval: Duration,
    pub poll_interval: Duration,
    pub earliest_run_hour: u32,
    pub calendar: CalendarGate,

    pub mail: MailSettings,
}

#[derive(Clone)]
pub struct MailSettings {
    pub api_key: String,
    pub api_url: String,
    pub sender_email: String,
    pub sender_name: String,
    pub logo_url: Option<String>,
}

// Keeps the API key out of logs.
impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("sender_email", &self.sender_email)
            .field("sender_name", &self.sender_name)
            .field("logo_url", &self.logo_url)
            .finish()
    }
}

pub const REGISTRY_DB_FILE: &str = "registry.db";

fn resolve_db_dir(cli: &CliConfig, file: Option<&FileConfig>) -> Result<PathBuf> {
    let db_dir = file
        .and_then(|f| f.db_dir.clone())
        .map(PathBuf::from)
        .or_else(|| cli.db_dir.clone())
        .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;

    if !db_dir.exists() {
        bail!("Database directory does not exist: {:?}", db_dir);
    }
    if !db_dir.is_dir() {
        bail!("db_dir is not a directory: {:?}", db_dir);
    }
    Ok(db_dir)
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let db_dir = resolve_db_dir(cli, Some(&file))?;

        let gazette_url = file.gazette_url.unwrap_or_else(|| cli.gazette_url.clone());
        url::Url::parse(&gazette_url)
            .with_context(|| format!("Invalid gazette_url: {}", gazette_url))?;

        let http_timeout_sec = file.http_timeout_sec.unwrap_or(cli.http_timeout_sec);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let max_retries = file.max_retries.unwrap_or(cli.max_retries);
        if max_retries == 0 {
            bail!("max_retries must be at least 1");
        }
        let retry_interval =
            Duration::from_secs(file.retry_interval_secs.unwrap_or(cli.retry_interval_secs));
        let poll_interval_secs = file.poll_interval_secs.unwrap_or(cli.poll_interval_secs);
        if poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than 0");
        }
        let earliest_run_hour = file.earliest_run_hour.unwrap_or(cli.earliest_run_hour);
        if earliest_run_hour > 23 {
            bail!("earliest_run_hour must be between 0 and 23, got {}", earliest_run_hour);
        }

        let holidays = file
            .holidays
            .unwrap_or_else(|| DEFAULT_HOLIDAYS.iter().map(|s| s.to_string()).collect());
        let weekend_days = file
            .weekend_days
            .unwrap_or_else(|| DEFAULT_WEEKEND_CODES.iter().map(|s| s.to_string()).collect());
        let calendar = CalendarGate::from_codes(weekend_days.as_slice(), holidays.as_slice())
            .context("Invalid calendar configuration")?;

        // Mail settings - TOML [mail] section takes precedence over CLI args
        let mail_file = file.mail.unwrap_or_default();
        let api_key = mail_file
            .api_key
            .or_else(|| cli.brevo_api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("Mail API key must be specified via BREVO_API_KEY, --brevo-api-key or [mail] api_key")
            })?;
        let mail = MailSettings {
            api_key,
            api_url: mail_file
                .api_url
                .unwrap_or_else(|| DEFAULT_BREVO_API_URL.to_string()),
            sender_email: mail_file
                .sender_email
                .unwrap_or_else(|| DEFAULT_SENDER_EMAIL.to_string()),
            sender_name: mail_file
                .sender_name
                .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
            logo_url: mail_file.logo_url.or_else(|| cli.logo_url.clone()),
        };

        Ok(Self {
            db_dir,
            gazette_url,
            http_timeout_sec,
            metrics_port,
            max_retries,
            retry_interval,
            poll_interval: Duration::from_secs(poll_interval_secs),
            earliest_run_hour,
            calendar,
            mail,
        })
    }

    pub fn registry_db_path(&self) -> PathBuf {
        self.db_dir.join(REGISTRY_DB_FILE)
    }
}
